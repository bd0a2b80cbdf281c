use crate::{
    common::{self, Item, condition},
    error::Result,
    model, write,
};

use aws_sdk_dynamodb::{operation::put_item::PutItemInput, types};

/// Put item operation.
///
/// The model's creators run on `item` before it is sent.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use dynamodb_model::{Item, Model, common::condition, write};
///
/// # async fn example(users: &Model) -> dynamodb_model::Result<()> {
/// let put_item = write::put_item::PutItem {
///     item: Item::from([
///         ("id".to_string(), AttributeValue::S("1".to_string())),
///         ("name".to_string(), AttributeValue::S("John".to_string())),
///     ]),
///     condition: Some(condition::ConditionMap::single("id", condition::Condition::Null)),
/// };
/// let item = users.put(put_item).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PutItem {
    /// Condition that must hold for the write to happen.
    pub condition: Option<condition::ConditionMap>,
    /// The caller's item.
    pub item: Item,
}

/// A put with creators applied, ready to be sent alone or inside a batch or transaction.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PutItemRequest {
    pub(crate) item: Item,
    pub(crate) key: Item,
    write_operation: write::common::WriteInput,
}

impl PutItem {
    pub(crate) fn build(self, definition: &model::ModelDefinition) -> Result<PutItemRequest> {
        let item = definition.create(self.item);
        let key = definition.key().project(&item)?;
        let write_operation = write::common::WriteInput::new(
            definition,
            self.condition,
            common::Substitutions::default(),
        )?;
        let request = PutItemRequest {
            item,
            key,
            write_operation,
        };
        Ok(request)
    }
}

impl PutItemRequest {
    pub(crate) fn input(&self) -> Result<PutItemInput> {
        let builder = PutItemInput::builder()
            .set_item(Some(self.item.clone()))
            .return_consumed_capacity(types::ReturnConsumedCapacity::Total);
        let write_operation = self.write_operation.clone();
        let input = crate::apply_write_operation!(builder, write_operation).build()?;
        Ok(input)
    }

    pub(crate) fn transact_item(&self) -> Result<types::TransactWriteItem> {
        let builder = types::Put::builder().set_item(Some(self.item.clone()));
        let write_operation = self.write_operation.clone();
        let put = crate::apply_write_operation!(builder, write_operation).build()?;
        Ok(types::TransactWriteItem::builder().put(put).build())
    }

    pub(crate) fn write_request(&self) -> Result<types::WriteRequest> {
        let put_request = types::PutRequest::builder()
            .set_item(Some(self.item.clone()))
            .build()?;
        Ok(types::WriteRequest::builder().put_request(put_request).build())
    }
}
