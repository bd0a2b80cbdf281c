use crate::{
    common::{self, Item},
    error::Result,
    model, read,
};

use aws_sdk_dynamodb::{operation::get_item::GetItemInput, types};

/// Get item operation.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use dynamodb_model::{Item, Model, read};
///
/// # async fn example(users: &Model) -> dynamodb_model::Result<()> {
/// let get_item = read::get_item::GetItem {
///     key: Item::from([("id".to_string(), AttributeValue::S("1".to_string()))]),
///     consistency: Some(read::common::Consistency::Strong),
///     ..Default::default()
/// };
/// let user = users.get(get_item).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetItem {
    /// Read consistency.
    pub consistency: Option<read::common::Consistency>,
    /// The table key of the item. Non-key attributes are ignored.
    pub key: Item,
    /// Top-level attributes to return; all attributes when `None`.
    pub projection: Option<Vec<String>>,
}

impl GetItem {
    pub(crate) fn build(&self, definition: &model::ModelDefinition) -> Result<GetItemInput> {
        let key = definition.key().project(&self.key)?;
        let mut substitutions = common::Substitutions::default();
        let projection_expression = read::common::non_empty_projection(&self.projection)
            .map(|projection| substitutions.projection(projection));
        let (expression_attribute_names, _) = substitutions.into_parts();
        let input = GetItemInput::builder()
            .set_consistent_read(read::common::Consistency::consistent_read(self.consistency))
            .set_expression_attribute_names(expression_attribute_names)
            .set_key(Some(key))
            .set_projection_expression(projection_expression)
            .return_consumed_capacity(types::ReturnConsumedCapacity::Total)
            .table_name(definition.table_name())
            .build()?;
        Ok(input)
    }

    pub(crate) fn transact_item(
        &self,
        definition: &model::ModelDefinition,
    ) -> Result<types::TransactGetItem> {
        let key = definition.key().project(&self.key)?;
        let mut substitutions = common::Substitutions::default();
        let projection_expression = read::common::non_empty_projection(&self.projection)
            .map(|projection| substitutions.projection(projection));
        let (expression_attribute_names, _) = substitutions.into_parts();
        let get = types::Get::builder()
            .set_expression_attribute_names(expression_attribute_names)
            .set_key(Some(key))
            .set_projection_expression(projection_expression)
            .table_name(definition.table_name())
            .build()?;
        Ok(types::TransactGetItem::builder().get(get).build())
    }
}
