use crate::{
    common::{self, Item, condition},
    error::Result,
    model, write,
};

use aws_sdk_dynamodb::{operation::delete_item::DeleteItemInput, types};

/// Delete item operation.
///
/// The store is asked for the pre-delete item so triggers can report what was deleted.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use dynamodb_model::{Item, Model, write};
///
/// # async fn example(users: &Model) -> dynamodb_model::Result<()> {
/// let delete_item = write::delete_item::DeleteItem {
///     key: Item::from([("id".to_string(), AttributeValue::S("1".to_string()))]),
///     ..Default::default()
/// };
/// users.delete(delete_item).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeleteItem {
    /// Condition that must hold for the delete to happen.
    pub condition: Option<condition::ConditionMap>,
    /// The table key of the item.
    pub key: Item,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DeleteItemRequest {
    pub(crate) key: Item,
    write_operation: write::common::WriteInput,
}

impl DeleteItem {
    pub(crate) fn build(self, definition: &model::ModelDefinition) -> Result<DeleteItemRequest> {
        let key = definition.key().project(&self.key)?;
        let write_operation = write::common::WriteInput::new(
            definition,
            self.condition,
            common::Substitutions::default(),
        )?;
        Ok(DeleteItemRequest {
            key,
            write_operation,
        })
    }
}

impl DeleteItemRequest {
    pub(crate) fn input(&self) -> Result<DeleteItemInput> {
        let builder = DeleteItemInput::builder()
            .set_key(Some(self.key.clone()))
            .return_consumed_capacity(types::ReturnConsumedCapacity::Total)
            .return_values(types::ReturnValue::AllOld);
        let write_operation = self.write_operation.clone();
        let input = crate::apply_write_operation!(builder, write_operation).build()?;
        Ok(input)
    }

    pub(crate) fn transact_item(&self) -> Result<types::TransactWriteItem> {
        let builder = types::Delete::builder().set_key(Some(self.key.clone()));
        let write_operation = self.write_operation.clone();
        let delete = crate::apply_write_operation!(builder, write_operation).build()?;
        Ok(types::TransactWriteItem::builder().delete(delete).build())
    }

    pub(crate) fn write_request(&self) -> Result<types::WriteRequest> {
        let delete_request = types::DeleteRequest::builder()
            .set_key(Some(self.key.clone()))
            .build()?;
        Ok(types::WriteRequest::builder()
            .delete_request(delete_request)
            .build())
    }
}
