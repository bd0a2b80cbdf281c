use crate::{
    common::{self, Item, key, token},
    error::{Error, Result},
    model,
};

use aws_sdk_dynamodb::types;
use std::collections;

/// Read consistency requested from the store.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Consistency {
    /// Eventually consistent, the store default.
    #[default]
    Eventual,
    /// Strongly consistent. Not supported on global secondary indexes.
    Strong,
}

impl Consistency {
    /// The wire flag: `Some(true)` for strong reads, absent otherwise.
    pub(crate) fn consistent_read(consistency: Option<Self>) -> Option<bool> {
        match consistency {
            Some(Self::Strong) => Some(true),
            Some(Self::Eventual) | None => None,
        }
    }
}

/// A projection list, or `None` when it selects nothing in particular.
pub(crate) fn non_empty_projection(projection: &Option<Vec<String>>) -> Option<&[String]> {
    projection
        .as_deref()
        .filter(|attributes| !attributes.is_empty())
}

/// One page of a scan or query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// The converted items, in store order.
    pub items: Vec<Item>,
    /// Resumes after the last evaluated key; `None` on the last page.
    pub next_page_token: Option<token::PageToken>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct MultipleReadInput {
    pub(crate) consistent_read: Option<bool>,
    pub(crate) exclusive_start_key: Option<Item>,
    pub(crate) filter_expression: Option<String>,
    pub(crate) index_name: Option<String>,
    pub(crate) limit: Option<i32>,
    pub(crate) projection_expression: Option<String>,
    pub(crate) table_name: String,
}

/// Arguments shared by scans and queries.
///
/// ```rust
/// use dynamodb_model::read;
///
/// let args = read::common::MultipleReadArgs {
///     index_name: Some("by-status".to_string()),
///     limit: Some(25),
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultipleReadArgs {
    /// Read consistency.
    pub consistency: Option<Consistency>,
    /// Filter applied after items are read; it does not reduce consumed capacity.
    pub filter: Option<common::condition::ConditionMap>,
    /// Index to read instead of the base table. Must be declared on the model.
    pub index_name: Option<String>,
    /// The maximum number of items to evaluate per page.
    pub limit: Option<i32>,
    /// Cursor returned by a previous page.
    pub page_token: Option<token::PageToken>,
    /// Top-level attributes to return; all attributes when `None`.
    pub projection: Option<Vec<String>>,
}

impl MultipleReadArgs {
    /// The key schema the read runs against: the named index's, or the table's.
    pub(crate) fn key_schema<'a>(
        &self,
        definition: &'a model::ModelDefinition,
    ) -> Result<&'a key::KeySchema> {
        match &self.index_name {
            Some(index_name) => definition.index(index_name).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "model `{}` has no index `{index_name}`",
                    definition.name()
                ))
            }),
            None => Ok(definition.key()),
        }
    }

    pub(crate) fn build(
        self,
        definition: &model::ModelDefinition,
        substitutions: &mut common::Substitutions,
    ) -> Result<MultipleReadInput> {
        self.key_schema(definition)?;
        if let Some(limit) = self.limit.filter(|limit| *limit < 1) {
            return Err(Error::InvalidArgument(format!(
                "limit must be positive, got {limit}"
            )));
        }
        let exclusive_start_key = self
            .page_token
            .as_ref()
            .map(token::PageToken::decode)
            .transpose()?;
        let filter_expression = self
            .filter
            .map(|filter| substitutions.condition(filter))
            .transpose()?;
        let projection_expression = non_empty_projection(&self.projection)
            .map(|projection| substitutions.projection(projection));
        let operation = MultipleReadInput {
            consistent_read: Consistency::consistent_read(self.consistency),
            exclusive_start_key,
            filter_expression,
            index_name: self.index_name,
            limit: self.limit,
            projection_expression,
            table_name: definition.table_name().to_string(),
        };
        Ok(operation)
    }
}

/// Turns a store page into converted items and the next token.
pub(crate) fn into_page(
    definition: &model::ModelDefinition,
    items: Option<Vec<Item>>,
    last_evaluated_key: Option<collections::HashMap<String, types::AttributeValue>>,
    projection: Option<&[String]>,
) -> Result<Page> {
    let items = items
        .unwrap_or_default()
        .into_iter()
        .map(|item| definition.convert(item, projection))
        .collect();
    let next_page_token = last_evaluated_key
        .filter(|key| !key.is_empty())
        .map(|key| token::PageToken::encode(&key))
        .transpose()?;
    Ok(Page {
        items,
        next_page_token,
    })
}

/// apply common multiple read operation settings to a builder
#[macro_export]
macro_rules! apply_multiple_read_operation {
    ($builder:expr, $multiple_read_operation:expr) => {
        $builder
            .set_consistent_read($multiple_read_operation.consistent_read)
            .set_exclusive_start_key($multiple_read_operation.exclusive_start_key)
            .set_filter_expression($multiple_read_operation.filter_expression)
            .set_index_name($multiple_read_operation.index_name)
            .set_limit($multiple_read_operation.limit)
            .set_projection_expression($multiple_read_operation.projection_expression)
            .table_name($multiple_read_operation.table_name)
    };
}
