use crate::{common, error::{Error, Result}, model, read};

use aws_sdk_dynamodb::{operation::scan::ScanInput, types};

/// Scan operation.
///
/// ```rust,no_run
/// use dynamodb_model::{Model, read};
///
/// # async fn example(users: &Model) -> dynamodb_model::Result<()> {
/// let scan = read::scan::Scan {
///     multiple_read_args: read::common::MultipleReadArgs {
///         limit: Some(100),
///         ..Default::default()
///     },
///     ..Default::default()
/// };
/// let page = users.scan(scan).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scan {
    /// Additional read arguments (index, filter, projection, paging).
    pub multiple_read_args: read::common::MultipleReadArgs,
    /// The segment number for parallel scans (0-indexed).
    pub segment: Option<i32>,
    /// The total number of segments for parallel scans.
    pub total_segments: Option<i32>,
}

impl Scan {
    pub(crate) fn build(self, definition: &model::ModelDefinition) -> Result<ScanInput> {
        match (self.segment, self.total_segments) {
            (None, None) => {}
            (Some(segment), Some(total_segments)) if (0..total_segments).contains(&segment) => {}
            (segment, total_segments) => {
                return Err(Error::InvalidArgument(format!(
                    "invalid scan segment {segment:?} of {total_segments:?}"
                )));
            }
        }
        let mut substitutions = common::Substitutions::default();
        let multiple_read_operation = self.multiple_read_args.build(definition, &mut substitutions)?;
        let (expression_attribute_names, expression_attribute_values) = substitutions.into_parts();
        let builder = ScanInput::builder()
            .set_expression_attribute_names(expression_attribute_names)
            .set_expression_attribute_values(expression_attribute_values)
            .return_consumed_capacity(types::ReturnConsumedCapacity::Total)
            .set_segment(self.segment)
            .set_total_segments(self.total_segments);
        let input = crate::apply_multiple_read_operation!(builder, multiple_read_operation).build()?;
        Ok(input)
    }
}
