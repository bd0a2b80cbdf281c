use crate::common;

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use std::collections;

/// SET operation for updating attributes.
///
/// ```rust
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use dynamodb_model::common::update;
///
/// let assign = update::SetInput::Assign(AttributeValue::S("value".to_string()));
/// let increment = update::SetInput::Increment(AttributeValue::N("10".to_string()));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum SetInput {
    /// Assign a new value to the attribute (replaces existing value).
    Assign(types::AttributeValue),
    /// Increment a numeric attribute by the specified value.
    Increment(types::AttributeValue),
    /// Decrement a numeric attribute by the specified value.
    Decrement(types::AttributeValue),
    /// Append values to the end of a list attribute.
    ListAppend(types::AttributeValue),
    /// Prepend values to the beginning of a list attribute.
    ListPrepend(types::AttributeValue),
    /// Assign a value only if the attribute doesn't exist.
    IfNotExists(types::AttributeValue),
}

impl SetInput {
    fn get_set_expression(self, path: &str, value_placeholder: &str) -> (types::AttributeValue, String) {
        match self {
            Self::Assign(value) => (value, format!("{path} = {value_placeholder}")),
            Self::Increment(value) => (value, format!("{path} = {path} + {value_placeholder}")),
            Self::Decrement(value) => (value, format!("{path} = {path} - {value_placeholder}")),
            Self::ListAppend(value) => (
                value,
                format!("{path} = list_append({path}, {value_placeholder})"),
            ),
            Self::ListPrepend(value) => (
                value,
                format!("{path} = list_append({value_placeholder}, {path})"),
            ),
            Self::IfNotExists(value) => (
                value,
                format!("{path} = if_not_exists({path}, {value_placeholder})"),
            ),
        }
    }
}

/// What to do with one attribute in an update.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateAction {
    /// SET the attribute.
    Set(SetInput),
    /// ADD to a number or a set.
    Add(types::AttributeValue),
    /// DELETE elements from a set.
    Delete(types::AttributeValue),
    /// REMOVE the attribute.
    Remove,
}

impl UpdateAction {
    /// Shorthand for `Set(SetInput::Assign(value))`.
    pub fn assign(value: types::AttributeValue) -> Self {
        Self::Set(SetInput::Assign(value))
    }
}

/// Ordered attribute name to action map.
///
/// Updaters merge onto it attribute by attribute, later entries replacing earlier ones.
pub type UpdateAttributes = IndexMap<String, UpdateAction>;

/// Compiles the attribute set into `SET … REMOVE … ADD … DELETE …`, numbering values from the
/// request's running index.
pub(crate) fn get_update_expression(
    attributes: UpdateAttributes,
    placeholders: &mut common::Placeholders,
) -> common::ExpressionInput {
    let mut set = Vec::new();
    let mut remove = Vec::new();
    let mut add = Vec::new();
    let mut delete = Vec::new();
    for (name, action) in attributes {
        let (placeholder, _) = common::add_placeholder(placeholders, &[], &name);
        let expression_attribute_names = collections::HashMap::from([(placeholder.clone(), name)]);
        let (clause, expression, value) = match action {
            UpdateAction::Set(set_input) => {
                let value_placeholder = format!(":set{}", placeholders.next_index());
                let (value, expression) = set_input.get_set_expression(&placeholder, &value_placeholder);
                (&mut set, expression, Some((value_placeholder, value)))
            }
            UpdateAction::Add(value) => {
                let value_placeholder = format!(":add{}", placeholders.next_index());
                let expression = format!("{placeholder} {value_placeholder}");
                (&mut add, expression, Some((value_placeholder, value)))
            }
            UpdateAction::Delete(value) => {
                let value_placeholder = format!(":delete{}", placeholders.next_index());
                let expression = format!("{placeholder} {value_placeholder}");
                (&mut delete, expression, Some((value_placeholder, value)))
            }
            UpdateAction::Remove => (&mut remove, placeholder, None),
        };
        let expression_attribute_values = match value {
            Some((value_placeholder, value)) => {
                collections::HashMap::from([(value_placeholder, value)])
            }
            None => collections::HashMap::new(),
        };
    let clauses = [("SET", set), ("REMOVE", remove), ("ADD", add), ("DELETE", delete)]
        .into_iter()
        .filter(|(_, operations)| !operations.is_empty())
        .map(|(keyword, operations)| {
            let mut operation = common::ExpressionInput::merge(", ", operations);
            operation.expression = format!("{keyword} {}", operation.expression);
            operation
        })
        .collect();
    common::ExpressionInput::merge(" ", clauses)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    fn n(value: &str) -> types::AttributeValue {
        types::AttributeValue::N(value.to_string())
    }

    #[rstest]
    #[case::set_assign(
        UpdateAttributes::from(
            [(
                "attr".to_string(),
                UpdateAction::assign(
                    types::AttributeValue::S(
                        "val".to_string()
                    )
                ),
            )]
        ),
        common::ExpressionInput {
            expression: "SET #attr = :set0".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [("#attr".to_string(), "attr".to_string())]
            ),
            expression_attribute_values: collections::HashMap::from(
                [(":set0".to_string(), types::AttributeValue::S("val".to_string()))]
            ),
        }
    )]
    #[case::set_increment_and_if_not_exists(
        UpdateAttributes::from(
            [
                ("count".to_string(), UpdateAction::Set(SetInput::Increment(n("5")))),
                ("created".to_string(), UpdateAction::Set(SetInput::IfNotExists(n("1")))),
            ]
        ),
        common::ExpressionInput {
            expression: "SET #count = #count + :set0, #created = if_not_exists(#created, :set1)".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [
                    ("#count".to_string(), "count".to_string()),
                    ("#created".to_string(), "created".to_string()),
                ]
            ),
            expression_attribute_values: collections::HashMap::from(
                [
                    (":set0".to_string(), n("5")),
                    (":set1".to_string(), n("1")),
                ]
            ),
        }
    )]
    #[case::all_clauses(
        UpdateAttributes::from(
            [
                ("tags".to_string(), UpdateAction::Delete(types::AttributeValue::Ss(vec!["x".to_string()]))),
                ("old".to_string(), UpdateAction::Remove),
                ("hits".to_string(), UpdateAction::Add(n("1"))),
                ("name".to_string(), UpdateAction::Set(SetInput::ListAppend(types::AttributeValue::L(vec![])))),
            ]
        ),
        common::ExpressionInput {
            expression: "SET #name = list_append(#name, :set2) REMOVE #old ADD #hits :add1 DELETE #tags :delete0".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [
                    ("#tags".to_string(), "tags".to_string()),
                    ("#old".to_string(), "old".to_string()),
                    ("#hits".to_string(), "hits".to_string()),
                    ("#name".to_string(), "name".to_string()),
                ]
            ),
            expression_attribute_values: collections::HashMap::from(
                [
                    (":delete0".to_string(), types::AttributeValue::Ss(vec!["x".to_string()])),
                    (":add1".to_string(), n("1")),
                    (":set2".to_string(), types::AttributeValue::L(vec![])),
                ]
            ),
        }
    )]
    fn test_update_attributes_to_expression(
        #[case] attributes: UpdateAttributes,
        #[case] expected: common::ExpressionInput,
    ) {
        let actual = get_update_expression(attributes, &mut common::Placeholders::default());
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_update_attribute_names_with_separators() {
        let actual = get_update_expression(
            UpdateAttributes::from([
                ("last-login".to_string(), UpdateAction::assign(n("1"))),
                ("address.city".to_string(), UpdateAction::Remove),
            ]),
            &mut common::Placeholders::default(),
        );
        assert_eq!(actual.expression, "SET #last_login = :set0 REMOVE #address_city");
        assert_eq!(
            actual.expression_attribute_names,
            collections::HashMap::from([
                ("#last_login".to_string(), "last-login".to_string()),
                ("#address_city".to_string(), "address.city".to_string()),
            ])
        );
    }
}
