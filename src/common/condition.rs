use crate::{
    common,
    error::{Error, Result},
};

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use std::{collections, ops};

/// Logical operator for combining conditions.
#[derive(Clone, Debug, PartialEq)]
pub enum LogicalOperator {
    /// Logical AND - all conditions must be true.
    And,
    /// Logical OR - at least one condition must be true.
    Or,
}

impl ops::Deref for LogicalOperator {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// Condition types for store expressions.
///
/// ```rust
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use dynamodb_model::common::condition;
///
/// let eq = condition::Condition::Equals(AttributeValue::S("value".to_string()));
/// let gt = condition::Condition::GreaterThan(AttributeValue::N("100".to_string()));
/// let null = condition::Condition::Null;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Checks if an attribute begins with a specified prefix (string types only).
    BeginsWith(String),
    /// Checks if an attribute value is between two values (inclusive).
    Between(types::AttributeValue, types::AttributeValue),
    /// Checks if an attribute contains a specified value.
    Contains(types::AttributeValue),
    /// Checks if an attribute value equals a specified value.
    Equals(types::AttributeValue),
    /// Checks if an attribute value is greater than a specified value.
    GreaterThan(types::AttributeValue),
    /// Checks if an attribute value is greater than or equal to a specified value.
    GreaterThanOrEqual(types::AttributeValue),
    /// Checks if an attribute value is in a list of specified values.
    In(Vec<types::AttributeValue>),
    /// Checks if an attribute value is less than a specified value.
    LessThan(types::AttributeValue),
    /// Checks if an attribute value is less than or equal to a specified value.
    LessThanOrEqual(types::AttributeValue),
    /// Checks if an attribute does not contain a specified value.
    NotContains(types::AttributeValue),
    /// Checks if an attribute value does not equal a specified value.
    NotEqual(types::AttributeValue),
    /// Checks if an attribute exists (is not null).
    NotNull,
    /// Checks if an attribute does not exist (is null).
    Null,
}

fn compare(
    values: &mut collections::HashMap<String, types::AttributeValue>,
    key: &str,
    key_placeholder: &str,
    operator: &str,
    suffix: &str,
    value: types::AttributeValue,
    placeholders: &mut common::Placeholders,
) -> String {
    let value_placeholder = placeholders.value(key, suffix);
    let expression = format!("{key_placeholder} {operator} {value_placeholder}");
    values.insert(value_placeholder, value);
    expression
}

impl Condition {
    fn get_expression(
        self,
        key: &str,
        key_placeholder: &str,
        placeholders: &mut common::Placeholders,
    ) -> Result<(String, collections::HashMap<String, types::AttributeValue>)> {
        let mut expression_attribute_values = collections::HashMap::new();
        let values = &mut expression_attribute_values;
        let expression = match self {
            Self::Equals(value) => compare(values, key, key_placeholder, "=", "eq", value, placeholders),
            Self::GreaterThan(value) => {
                compare(values, key, key_placeholder, ">", "gt", value, placeholders)
            }
            Self::GreaterThanOrEqual(value) => {
                compare(values, key, key_placeholder, ">=", "gte", value, placeholders)
            }
            Self::LessThan(value) => compare(values, key, key_placeholder, "<", "lt", value, placeholders),
            Self::LessThanOrEqual(value) => {
                compare(values, key, key_placeholder, "<=", "lte", value, placeholders)
            }
            Self::NotEqual(value) => {
                compare(values, key, key_placeholder, "<>", "ne", value, placeholders)
            }
            Self::BeginsWith(prefix) => {
                let value_placeholder = placeholders.value(key, "begins_with");
                let expression = format!("begins_with({key_placeholder}, {value_placeholder})");
                values.insert(value_placeholder, types::AttributeValue::S(prefix));
                expression
            }
            Self::Between(value1, value2) => {
                let value_placeholder_1 = placeholders.value(key, "between");
                let value_placeholder_2 = placeholders.value(key, "between");
                let expression = format!(
                    "{key_placeholder} BETWEEN {value_placeholder_1} AND {value_placeholder_2}"
                );
                values.insert(value_placeholder_1, value1);
                values.insert(value_placeholder_2, value2);
                expression
            }
            Self::Contains(value) => {
                let value_placeholder = placeholders.value(key, "contains");
                let expression = format!("contains({key_placeholder}, {value_placeholder})");
                values.insert(value_placeholder, value);
                expression
            }
            Self::In(in_values) => {
                if in_values.is_empty() {
                    return Err(Error::InvalidArgument(format!(
                        "IN condition on `{key}` needs at least one value"
                    )));
                }
                let index = placeholders.next_index();
                let identifier = common::identifier(key);
                let mut value_placeholders = Vec::with_capacity(in_values.len());
                for (in_index, value) in in_values.into_iter().enumerate() {
                    let placeholder = format!(":{identifier}_in{index}_{in_index}");
                    values.insert(placeholder.clone(), value);
                    value_placeholders.push(placeholder);
                }
                let value_placeholders = value_placeholders.join(", ");
                format!("{key_placeholder} IN ({value_placeholders})")
            }
            Self::NotContains(value) => {
                let value_placeholder = placeholders.value(key, "not_contains");
                let expression = format!("NOT contains({key_placeholder}, {value_placeholder})");
                values.insert(value_placeholder, value);
                expression
            }
            Self::NotNull => format!("attribute_exists({key_placeholder})"),
            Self::Null => format!("attribute_not_exists({key_placeholder})"),
        };
        Ok((expression, expression_attribute_values))
    }
}

/// Condition applied to an attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyCondition {
    /// The condition to apply to the attribute.
    pub condition: Condition,
    /// The name of the attribute to apply the condition to.
    pub name: String,
}

impl KeyCondition {
    pub(crate) fn get_expression_operation(
        keys: Vec<Self>,
        placeholders: &mut common::Placeholders,
    ) -> Result<common::ExpressionInput> {
        let mut expressions = Vec::with_capacity(keys.len());
        let mut expression_attribute_names = collections::HashMap::with_capacity(keys.len());
        let mut expression_attribute_values = collections::HashMap::new();
        for key in keys {
            let placeholder = placeholders.name(&key.name);
            let (expression, condition_expression_attribute_values) =
                key.condition.get_expression(&key.name, &placeholder, placeholders)?;
            expressions.push(expression);
            expression_attribute_names.insert(placeholder, key.name);
            expression_attribute_values.extend(condition_expression_attribute_values);
        }
        let expression = expressions.join(&*LogicalOperator::And);
        let operation = common::ExpressionInput {
            expression,
            expression_attribute_names,
            expression_attribute_values,
        };
        Ok(operation)
    }
}

/// Map of conditions with logical operators.
///
/// ```rust
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use dynamodb_model::common::condition;
///
/// let map = condition::ConditionMap::Leaves(
///     condition::LogicalOperator::And,
///     vec![
///         condition::KeyCondition {
///             name: "status".to_string(),
///             condition: condition::Condition::Equals(AttributeValue::S("active".to_string())),
///         },
///     ],
/// );
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum ConditionMap {
    /// Leaf conditions - flat list of conditions combined with the logical operator.
    Leaves(LogicalOperator, Vec<KeyCondition>),
    /// Node conditions - nested conditions for hierarchical attribute paths.
    Node(LogicalOperator, IndexMap<String, ConditionMap>),
}

impl ConditionMap {
    /// A single-attribute condition.
    pub fn single(name: impl Into<String>, condition: Condition) -> Self {
        Self::Leaves(
            LogicalOperator::And,
            vec![KeyCondition {
                condition,
                name: name.into(),
            }],
        )
    }

    pub(crate) fn get_expression_operation(
        self,
        placeholders: &mut common::Placeholders,
    ) -> Result<common::ExpressionInput> {
        self.get_expression_operation_recursive(&[], placeholders, false)
    }

    fn is_composite(&self, is_nested: bool) -> bool {
        match self {
            Self::Leaves(_, leaves) => is_nested && leaves.len() > 1,
            Self::Node(_, map) => {
                let has_multiple_keys = map.len() > 1;
                let child_is_nested = is_nested || has_multiple_keys;
                if map.values().any(|value| value.is_composite(child_is_nested)) {
                    // composite children get wrapped individually
                    return false;
                }
                is_nested && has_multiple_keys
            }
        }
    }

    fn get_expression_operation_recursive(
        self,
        keys: &[String],
        placeholders: &mut common::Placeholders,
        mut is_nested: bool,
    ) -> Result<common::ExpressionInput> {
        let mut operations = Vec::new();
        let is_composite = self.is_composite(is_nested);
        let operator = match self {
            Self::Leaves(_, key_conditions) if key_conditions.is_empty() => {
                return Err(Error::InvalidArgument(
                    "condition leaves must not be empty".to_string(),
                ));
            }
            Self::Leaves(operator, key_conditions) => {
                for key_condition in key_conditions {
                    let (placeholder, new_keys) =
                        common::add_placeholder(placeholders, keys, &key_condition.name);
                    let key_placeholder = new_keys.join(".");
                    let (expression, expression_attribute_values) = key_condition
                        .condition
                        .get_expression(&key_condition.name, &key_placeholder, placeholders)?;
                    let expression_attribute_names =
                        collections::HashMap::from([(placeholder, key_condition.name)]);
                    operations.push(common::ExpressionInput {
                        expression,
                        expression_attribute_names,
                        expression_attribute_values,
                    });
                }
                operator
            }
            Self::Node(operator, map) => {
                operations.reserve(map.len());
                is_nested = is_nested || map.len() > 1;
                for (key, value) in map {
                    let (placeholder, new_keys) = common::add_placeholder(placeholders, keys, &key);
                    let mut condition_operation = value.get_expression_operation_recursive(
                        &new_keys,
                        placeholders,
                        is_nested,
                    )?;
                    condition_operation
                        .expression_attribute_names
                        .insert(placeholder, key);
                    operations.push(condition_operation);
                }
                operator
            }
        };
        let mut operation = common::ExpressionInput::merge(&operator, operations);
        if is_composite {
            operation.expression = format!("({})", operation.expression);
        }
        Ok(operation)
    }
}
