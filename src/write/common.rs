use crate::{
    common::{self, condition},
    error::Result,
    model,
};

use aws_sdk_dynamodb::types;
use std::collections;

/// Internal representation of write operation parameters.
///
/// Holds the resolved condition expression and the substitution table shared with any other
/// expression of the same request, ready to be applied to a single-item input or to a
/// transaction element.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct WriteInput {
    pub(crate) condition_expression: Option<String>,
    pub(crate) expression_attribute_names: Option<collections::HashMap<String, String>>,
    pub(crate) expression_attribute_values:
        Option<collections::HashMap<String, types::AttributeValue>>,
    pub(crate) table_name: String,
}

impl WriteInput {
    /// Compiles `condition` into `substitutions` and closes the table.
    pub(crate) fn new(
        definition: &model::ModelDefinition,
        condition: Option<condition::ConditionMap>,
        mut substitutions: common::Substitutions,
    ) -> Result<Self> {
        let condition_expression = condition
            .map(|condition| substitutions.condition(condition))
            .transpose()?;
        let (expression_attribute_names, expression_attribute_values) = substitutions.into_parts();
        let operation = Self {
            condition_expression,
            expression_attribute_names,
            expression_attribute_values,
            table_name: definition.table_name().to_string(),
        };
        Ok(operation)
    }
}

/// apply common write operation settings to a builder
#[macro_export]
macro_rules! apply_write_operation {
    ($builder:expr, $write_operation:expr) => {
        $builder
            .set_condition_expression($write_operation.condition_expression)
            .set_expression_attribute_names($write_operation.expression_attribute_names)
            .set_expression_attribute_values($write_operation.expression_attribute_values)
            .table_name($write_operation.table_name)
    };
}
