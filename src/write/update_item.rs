use crate::{
    common::{self, Item, condition, update},
    error::{Error, Result},
    model, write,
};

use aws_sdk_dynamodb::{operation::update_item::UpdateItemInput, types};

/// Update item operation.
///
/// The model's updaters run on `attributes` before they are compiled. The store is asked for
/// the full post-update item.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use dynamodb_model::{Item, Model, common::update, write};
///
/// # async fn example(users: &Model) -> dynamodb_model::Result<()> {
/// let update_item = write::update_item::UpdateItem {
///     key: Item::from([("id".to_string(), AttributeValue::S("1".to_string()))]),
///     attributes: update::UpdateAttributes::from([
///         ("name".to_string(), update::UpdateAction::assign(AttributeValue::S("Jane".to_string()))),
///         ("logins".to_string(), update::UpdateAction::Add(AttributeValue::N("1".to_string()))),
///     ]),
///     ..Default::default()
/// };
/// let item = users.update(update_item).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateItem {
    /// Attribute actions, applied in order.
    pub attributes: update::UpdateAttributes,
    /// Condition that must hold for the write to happen.
    pub condition: Option<condition::ConditionMap>,
    /// The table key of the item.
    pub key: Item,
}

/// An update with updaters applied and its expressions compiled.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct UpdateItemRequest {
    pub(crate) key: Item,
    update_expression: String,
    write_operation: write::common::WriteInput,
}

impl UpdateItem {
    pub(crate) fn build(self, definition: &model::ModelDefinition) -> Result<UpdateItemRequest> {
        let key = definition.key().project(&self.key)?;
        let attributes = definition.update(self.attributes);
        if let Some(name) = attributes.keys().find(|name| definition.key().contains(name)) {
            return Err(Error::InvalidArgument(format!(
                "key attribute `{name}` cannot be updated"
            )));
        }
        let mut substitutions = common::Substitutions::default();
        let update_expression = substitutions
            .update(attributes)
            .ok_or_else(|| Error::InvalidArgument("update has no attributes".to_string()))?;
        let write_operation =
            write::common::WriteInput::new(definition, self.condition, substitutions)?;
        let request = UpdateItemRequest {
            key,
            update_expression,
            write_operation,
        };
        Ok(request)
    }
}

impl UpdateItemRequest {
    pub(crate) fn input(&self) -> Result<UpdateItemInput> {
        let builder = UpdateItemInput::builder()
            .set_key(Some(self.key.clone()))
            .return_consumed_capacity(types::ReturnConsumedCapacity::Total)
            .return_values(types::ReturnValue::AllNew)
            .update_expression(self.update_expression.clone());
        let write_operation = self.write_operation.clone();
        let input = crate::apply_write_operation!(builder, write_operation).build()?;
        Ok(input)
    }

    pub(crate) fn transact_item(&self) -> Result<types::TransactWriteItem> {
        let builder = types::Update::builder()
            .set_key(Some(self.key.clone()))
            .update_expression(self.update_expression.clone());
        let write_operation = self.write_operation.clone();
        let update = crate::apply_write_operation!(builder, write_operation).build()?;
        Ok(types::TransactWriteItem::builder().update(update).build())
    }
}
