use crate::{
    common::{self, condition, key},
    error::{Error, Result},
    model, read,
};

use aws_sdk_dynamodb::{operation::query::QueryInput, types};

/// Query operation.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use dynamodb_model::{Model, common::condition, read};
///
/// # async fn example(users: &Model) -> dynamodb_model::Result<()> {
/// let query = read::query::Query {
///     key_conditions: vec![
///         condition::KeyCondition {
///             name: "status".to_string(),
///             condition: condition::Condition::Equals(AttributeValue::S("active".to_string())),
///         },
///         condition::KeyCondition {
///             name: "created_at".to_string(),
///             condition: condition::Condition::BeginsWith("2024-".to_string()),
///         },
///     ],
///     multiple_read_args: read::common::MultipleReadArgs {
///         index_name: Some("by-status".to_string()),
///         ..Default::default()
///     },
///     scan_index_forward: Some(false),
/// };
/// let page = users.query(query).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    /// Conditions on the key attributes of the table or index: an equality on the
    /// partition key, optionally followed by one condition on the sort key.
    pub key_conditions: Vec<condition::KeyCondition>,
    /// Additional read arguments (index, filter, projection, paging).
    pub multiple_read_args: read::common::MultipleReadArgs,
    /// Whether to read the index forward (ascending) or backward (descending).
    pub scan_index_forward: Option<bool>,
}

impl Query {
    fn validate_key_conditions(
        key_conditions: &[condition::KeyCondition],
        schema: &key::KeySchema,
    ) -> Result<()> {
        let mut has_partition_key = false;
        let mut has_sort_key = false;
        for key_condition in key_conditions {
            let name = key_condition.name.as_str();
            if name == schema.partition_key {
                if has_partition_key
                    || !matches!(key_condition.condition, condition::Condition::Equals(_))
                {
                    return Err(Error::InvalidArgument(format!(
                        "partition key `{name}` takes exactly one equality condition"
                    )));
                }
                has_partition_key = true;
            } else if schema.sort_key.as_deref() == Some(name) {
                let supported = matches!(
                    key_condition.condition,
                    condition::Condition::Equals(_)
                        | condition::Condition::LessThan(_)
                        | condition::Condition::LessThanOrEqual(_)
                        | condition::Condition::GreaterThan(_)
                        | condition::Condition::GreaterThanOrEqual(_)
                        | condition::Condition::Between(_, _)
                        | condition::Condition::BeginsWith(_)
                );
                if has_sort_key || !supported {
                    return Err(Error::InvalidArgument(format!(
                        "sort key `{name}` takes one comparison, between or begins_with condition"
                    )));
                }
                has_sort_key = true;
            } else {
                return Err(Error::InvalidArgument(format!(
                    "`{name}` is not a key attribute"
                )));
            }
        }
        if !has_partition_key {
            return Err(Error::InvalidArgument(format!(
                "missing condition on partition key `{}`",
                schema.partition_key
            )));
        }
        Ok(())
    }

    pub(crate) fn build(self, definition: &model::ModelDefinition) -> Result<QueryInput> {
        let schema = self.multiple_read_args.key_schema(definition)?;
        Self::validate_key_conditions(&self.key_conditions, schema)?;
        let mut substitutions = common::Substitutions::default();
        let key_condition_expression = substitutions.key_conditions(self.key_conditions)?;
        let multiple_read_operation = self.multiple_read_args.build(definition, &mut substitutions)?;
        let (expression_attribute_names, expression_attribute_values) = substitutions.into_parts();
        let builder = QueryInput::builder()
            .set_expression_attribute_names(expression_attribute_names)
            .set_expression_attribute_values(expression_attribute_values)
            .key_condition_expression(key_condition_expression)
            .return_consumed_capacity(types::ReturnConsumedCapacity::Total)
            .set_scan_index_forward(self.scan_index_forward);
        let input = crate::apply_multiple_read_operation!(builder, multiple_read_operation).build()?;
        Ok(input)
    }
}
