use crate::{
    common::{self, Item, condition},
    error::Result,
    model, write,
};

use aws_sdk_dynamodb::types;

/// Condition check inside a write transaction: asserts a condition on an item without
/// writing it. Never fires triggers.
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionCheck {
    /// The condition that must hold.
    pub condition: condition::ConditionMap,
    /// The table key of the item.
    pub key: Item,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ConditionCheckRequest {
    pub(crate) key: Item,
    write_operation: write::common::WriteInput,
}

impl ConditionCheck {
    pub(crate) fn build(
        self,
        definition: &model::ModelDefinition,
    ) -> Result<ConditionCheckRequest> {
        let key = definition.key().project(&self.key)?;
        let write_operation = write::common::WriteInput::new(
            definition,
            Some(self.condition),
            common::Substitutions::default(),
        )?;
        Ok(ConditionCheckRequest {
            key,
            write_operation,
        })
    }
}

impl ConditionCheckRequest {
    pub(crate) fn transact_item(&self) -> Result<types::TransactWriteItem> {
        let builder = types::ConditionCheck::builder().set_key(Some(self.key.clone()));
        let write_operation = self.write_operation.clone();
        let condition_check = crate::apply_write_operation!(builder, write_operation).build()?;
        Ok(types::TransactWriteItem::builder()
            .condition_check(condition_check)
            .build())
    }
}
