//! Common utilities for model operations.
//!
//! This module provides shared types and utilities used across read and write requests,
//! including key handling, condition and update expressions, page tokens and the
//! substitution table every expression of a request is compiled into.

/// Condition expression building for filters, key conditions and conditional writes.
pub mod condition;

/// Key schemas and key values for identifying items.
pub mod key;

/// Opaque pagination cursors.
pub mod token;

/// Update attribute sets compiled into update expressions.
pub mod update;

use crate::error::Result;

use aws_sdk_dynamodb::types;
use std::collections;

/// An item: an open map of attribute names to store-native values.
pub type Item = collections::HashMap<String, types::AttributeValue>;

/// Keeps the characters the store accepts after `#` and `:`, replacing the rest with `_`.
pub(crate) fn identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Name and value placeholder allocator of a single request.
///
/// An attribute keeps one name placeholder for the whole request. Names that are not valid
/// identifiers are rewritten and suffixed until their placeholder is unique.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Placeholders {
    index: usize,
    names: collections::HashMap<String, String>,
    taken: collections::HashSet<String>,
}

impl Placeholders {
    pub(crate) fn name(&mut self, attribute: &str) -> String {
        if let Some(placeholder) = self.names.get(attribute) {
            return placeholder.clone();
        }
        let base = format!("#{}", identifier(attribute));
        let mut placeholder = base.clone();
        let mut suffix = 1;
        while self.taken.contains(&placeholder) {
            placeholder = format!("{base}_{suffix}");
            suffix += 1;
        }
        self.taken.insert(placeholder.clone());
        self.names.insert(attribute.to_string(), placeholder.clone());
        placeholder
    }

    pub(crate) fn next_index(&mut self) -> usize {
        let index = self.index;
        self.index += 1;
        index
    }

    /// `:{attribute}_{operator}{index}`; the trailing index keeps it unique.
    pub(crate) fn value(&mut self, attribute: &str, operator: &str) -> String {
        let index = self.next_index();
        format!(":{}_{operator}{index}", identifier(attribute))
    }
}

pub(crate) fn add_placeholder(
    placeholders: &mut Placeholders,
    keys: &[String],
    attribute: &str,
) -> (String, Vec<String>) {
    let placeholder = placeholders.name(attribute);
    let mut new_keys = Vec::with_capacity(keys.len() + 1);
    new_keys.extend_from_slice(keys);
    new_keys.push(placeholder.clone());
    (placeholder, new_keys)
}

fn get_expression(left: String, operator: &str, right: String) -> String {
    if left.is_empty() {
        right
    } else if right.is_empty() {
        left
    } else {
        format!("{left}{operator}{right}")
    }
}

/// expression operation
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ExpressionInput {
    pub(crate) expression: String,
    pub(crate) expression_attribute_names: collections::HashMap<String, String>,
    pub(crate) expression_attribute_values: collections::HashMap<String, types::AttributeValue>,
}

impl ExpressionInput {
    pub(crate) fn merge(operator: &str, items: Vec<Self>) -> Self {
        let mut operation = Self::default();
        for item in items {
            operation
                .expression_attribute_names
                .extend(item.expression_attribute_names);
            operation
                .expression_attribute_values
                .extend(item.expression_attribute_values);
            operation.expression = get_expression(operation.expression, operator, item.expression);
        }
        operation
    }
}

/// Placeholder namespace shared by every expression of a single request.
///
/// Key conditions, filters, condition expressions, update expressions and projections
/// are all compiled through the same table, so value placeholders are numbered from a
/// single running index and an attribute keeps one name placeholder.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Substitutions {
    placeholders: Placeholders,
    names: collections::HashMap<String, String>,
    values: collections::HashMap<String, types::AttributeValue>,
}

impl Substitutions {
    fn push(&mut self, operation: ExpressionInput) -> String {
        self.names.extend(operation.expression_attribute_names);
        self.values.extend(operation.expression_attribute_values);
        operation.expression
    }

    /// Compiles a condition map (filter or write condition).
    pub fn condition(&mut self, condition: condition::ConditionMap) -> Result<String> {
        let operation = condition.get_expression_operation(&mut self.placeholders)?;
        Ok(self.push(operation))
    }

    /// Compiles key conditions, joined with `AND`.
    pub fn key_conditions(&mut self, keys: Vec<condition::KeyCondition>) -> Result<String> {
        let operation = condition::KeyCondition::get_expression_operation(keys, &mut self.placeholders)?;
        Ok(self.push(operation))
    }

    /// Compiles an update attribute set; `None` when the set is empty.
    pub fn update(&mut self, attributes: update::UpdateAttributes) -> Option<String> {
        let operation = update::get_update_expression(attributes, &mut self.placeholders);
        if operation.expression.is_empty() {
            None
        } else {
            Some(self.push(operation))
        }
    }

    /// Compiles a projection of top-level attribute names.
    pub fn projection(&mut self, attributes: &[String]) -> String {
        let operations = attributes
            .iter()
            .map(|attribute| {
                let (placeholder, _) = add_placeholder(&mut self.placeholders, &[], attribute);
                ExpressionInput {
                    expression: placeholder.clone(),
                    expression_attribute_names: collections::HashMap::from([(
                        placeholder,
                        attribute.clone(),
                    )]),
                    ..Default::default()
                }
            })
            .collect();
        self.push(ExpressionInput::merge(", ", operations))
    }

    /// Splits the table into the optional name and value maps a request carries.
    #[allow(clippy::type_complexity)]
    pub(crate) fn into_parts(
        self,
    ) -> (
        Option<collections::HashMap<String, String>>,
        Option<collections::HashMap<String, types::AttributeValue>>,
    ) {
        let names = (!self.names.is_empty()).then_some(self.names);
        let values = (!self.values.is_empty()).then_some(self.values);
        (names, values)
    }
}
