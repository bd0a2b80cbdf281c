//! In-memory store and shared model definitions for unit tests.

use crate::{
    common::{Item, key::KeySchema, token, update},
    error::{CONDITIONAL_CHECK_FAILED, CancellationReason, Error, Result},
    model::ModelDefinition,
    pipeline::{Creator, Updater},
    store::Store,
};

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    operation::{
        batch_get_item::{BatchGetItemInput, BatchGetItemOutput},
        batch_write_item::{BatchWriteItemInput, BatchWriteItemOutput},
        delete_item::{DeleteItemInput, DeleteItemOutput},
        get_item::{GetItemInput, GetItemOutput},
        put_item::{PutItemInput, PutItemOutput},
        query::{QueryInput, QueryOutput},
        scan::{ScanInput, ScanOutput},
        transact_get_items::{TransactGetItemsInput, TransactGetItemsOutput},
        transact_write_items::{TransactWriteItemsInput, TransactWriteItemsOutput},
        update_item::{UpdateItemInput, UpdateItemOutput},
    },
    types::{self, AttributeValue},
};
use indexmap::IndexMap;
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex},
};

type Names = HashMap<String, String>;
type Values = HashMap<String, AttributeValue>;

/// Table "users" keyed by "id", a "by-status" index, a creator forcing `status = active` and an
/// updater stamping `updated`.
pub(crate) fn definition() -> ModelDefinition {
    let creator: Creator = Arc::new(|_: &Item| {
        Item::from([("status".to_string(), AttributeValue::S("active".to_string()))])
    });
    let updater: Updater = Arc::new(|_: &update::UpdateAttributes| {
        update::UpdateAttributes::from([(
            "updated".to_string(),
            update::UpdateAction::assign(AttributeValue::Bool(true)),
        )])
    });
    ModelDefinition {
        creators: vec![creator],
        indices: IndexMap::from([(
            "by-status".to_string(),
            KeySchema::composite("status", "created_at"),
        )]),
        updaters: vec![updater],
        ..bare_definition()
    }
}

/// Table "users" keyed by "id" with an empty pipeline.
pub(crate) fn bare_definition() -> ModelDefinition {
    ModelDefinition {
        key: KeySchema::hash("id"),
        name: "user".to_string(),
        table_name: "users".to_string(),
        ..Default::default()
    }
}

#[derive(Debug, Default)]
struct Table {
    indices: HashMap<String, KeySchema>,
    items: BTreeMap<String, Item>,
    key: KeySchema,
}

#[derive(Debug, Default)]
struct State {
    calls: HashMap<&'static str, usize>,
    failure: Option<Error>,
    failures: HashMap<&'static str, Error>,
    last_batch_write_keys: Vec<Item>,
    last_client_request_token: Option<String>,
    tables: HashMap<String, Table>,
    unprocessed: HashSet<(String, String)>,
}

/// A `Store` backed by in-memory tables.
///
/// Understands the expressions the crate compiles: `AND`/`OR` chains of comparisons,
/// `begins_with`, `attribute_exists` and `attribute_not_exists`; `SET` assignments and
/// arithmetic, `if_not_exists`, `REMOVE` and numeric `ADD`. Every call yields to the runtime
/// once before touching state so concurrent callers interleave.
#[derive(Clone, Debug, Default)]
pub(crate) struct MemoryStore {
    state: Arc<Mutex<State>>,
}

fn not_found(table_name: &str) -> Error {
    Error::from_code(
        "ResourceNotFoundException",
        format!("table `{table_name}` does not exist"),
    )
}

fn validation(message: impl Into<String>) -> Error {
    Error::from_code("ValidationException", message)
}

fn capacity(table_name: &str, units: f64) -> types::ConsumedCapacity {
    types::ConsumedCapacity::builder()
        .table_name(table_name)
        .capacity_units(units)
        .build()
}

fn capacities(counts: IndexMap<String, usize>) -> Vec<types::ConsumedCapacity> {
    counts
        .into_iter()
        .map(|(table_name, count)| capacity(&table_name, count as f64))
        .collect()
}

fn compare(left: &AttributeValue, right: &AttributeValue) -> Option<Ordering> {
    match (left, right) {
        (AttributeValue::S(left), AttributeValue::S(right)) => Some(left.cmp(right)),
        (AttributeValue::N(left), AttributeValue::N(right)) => left
            .parse::<f64>()
            .ok()?
            .partial_cmp(&right.parse::<f64>().ok()?),
        (left, right) if left == right => Some(Ordering::Equal),
        _ => None,
    }
}

fn number(value: &AttributeValue) -> Result<f64> {
    value
        .as_n()
        .ok()
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| validation("operand is not a number"))
}

fn name<'a>(placeholder: &'a str, names: &'a Names) -> &'a str {
    let placeholder = placeholder.trim();
    names
        .get(placeholder)
        .map(String::as_str)
        .unwrap_or_else(|| placeholder.trim_start_matches('#'))
}

fn value<'a>(placeholder: &str, values: &'a Values) -> Result<&'a AttributeValue> {
    values
        .get(placeholder.trim())
        .ok_or_else(|| validation(format!("unknown value placeholder `{placeholder}`")))
}

fn call_arguments<'a>(term: &'a str, function: &str) -> Option<Vec<&'a str>> {
    term.strip_prefix(function)?
        .strip_prefix('(')?
        .strip_suffix(')')
        .map(|arguments| arguments.split(',').map(str::trim).collect())
}

fn term_holds(term: &str, item: &Item, names: &Names, values: &Values) -> Result<bool> {
    let mut term = term.trim().trim_start_matches('(');
    while term.ends_with(')') && term.matches(')').count() > term.matches('(').count() {
        term = &term[..term.len() - 1];
    }
    if let Some(arguments) = call_arguments(term, "attribute_exists") {
        return Ok(item.contains_key(name(arguments[0], names)));
    }
    if let Some(arguments) = call_arguments(term, "attribute_not_exists") {
        return Ok(!item.contains_key(name(arguments[0], names)));
    }
    if let Some(arguments) = call_arguments(term, "begins_with") {
        let prefix = value(arguments[1], values)?;
        let holds = match (item.get(name(arguments[0], names)), prefix) {
            (Some(AttributeValue::S(actual)), AttributeValue::S(prefix)) => {
                actual.starts_with(prefix.as_str())
            }
            _ => false,
        };
        return Ok(holds);
    }
    let parts = term.split_whitespace().collect::<Vec<_>>();
    let [attribute, operator, placeholder] = parts.as_slice() else {
        return Err(validation(format!("unsupported condition `{term}`")));
    };
    let expected = value(placeholder, values)?;
    let Some(actual) = item.get(name(attribute, names)) else {
        return Ok(*operator == "<>");
    };
    let ordering = compare(actual, expected);
    let holds = match *operator {
        "=" => ordering == Some(Ordering::Equal),
        "<>" => ordering != Some(Ordering::Equal),
        "<" => ordering == Some(Ordering::Less),
        "<=" => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        ">" => ordering == Some(Ordering::Greater),
        ">=" => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        _ => return Err(validation(format!("unsupported operator `{operator}`"))),
    };
    Ok(holds)
}

fn check_placeholders(names: &Names, values: &Values) -> Result<()> {
    let invalid = names
        .keys()
        .map(|placeholder| (placeholder, '#'))
        .chain(values.keys().map(|placeholder| (placeholder, ':')))
        .find(|(placeholder, prefix)| {
            placeholder.strip_prefix(*prefix).is_none_or(|rest| {
                rest.is_empty() || !rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            })
        });
    match invalid {
        Some((placeholder, _)) => Err(validation(format!("invalid placeholder `{placeholder}`"))),
        None => Ok(()),
    }
}

fn holds(expression: Option<&str>, item: &Item, names: &Names, values: &Values) -> Result<bool> {
    check_placeholders(names, values)?;
    let Some(expression) = expression else {
        return Ok(true);
    };
    for alternative in expression.split(" OR ") {
        let mut all = true;
        for term in alternative.split(" AND ") {
            all &= term_holds(term, item, names, values)?;
        }
        if all {
            return Ok(true);
        }
    }
    Ok(false)
}

fn split_actions(section: &str) -> Vec<String> {
    let mut actions: Vec<String> = Vec::new();
    for piece in section.split(", ") {
        match actions.last_mut() {
            Some(last) if !piece.trim_start().starts_with('#') => {
                last.push_str(", ");
                last.push_str(piece);
            }
            _ => actions.push(piece.to_string()),
        }
    }
    actions
}

fn set_action(action: &str, item: &mut Item, names: &Names, values: &Values) -> Result<()> {
    let Some((target, source)) = action.split_once(" = ") else {
        return Err(validation(format!("unsupported SET action `{action}`")));
    };
    let target = name(target, names).to_string();
    let source = source.trim();
    let new_value = if let Some(arguments) = call_arguments(source, "if_not_exists") {
        match item.get(name(arguments[0], names)) {
            Some(current) => current.clone(),
            None => value(arguments[1], values)?.clone(),
        }
    } else if let Some((left, right)) = source.split_once(" + ") {
        let current = item.get(name(left, names)).map(number).transpose()?.unwrap_or(0.0);
        AttributeValue::N((current + number(value(right, values)?)?).to_string())
    } else if let Some((left, right)) = source.split_once(" - ") {
        let current = item.get(name(left, names)).map(number).transpose()?.unwrap_or(0.0);
        AttributeValue::N((current - number(value(right, values)?)?).to_string())
    } else {
        value(source, values)?.clone()
    };
    item.insert(target, new_value);
    Ok(())
}

fn apply_update(expression: &str, item: &mut Item, names: &Names, values: &Values) -> Result<()> {
    check_placeholders(names, values)?;
    let mut sections: Vec<(&str, Vec<&str>)> = Vec::new();
    for word in expression.split_whitespace() {
        match word {
            "SET" | "REMOVE" | "ADD" | "DELETE" => sections.push((word, Vec::new())),
            word => match sections.last_mut() {
                Some((_, words)) => words.push(word),
                None => return Err(validation(format!("malformed update `{expression}`"))),
            },
        }
    }
    for (keyword, words) in sections {
        for action in split_actions(&words.join(" ")) {
            match keyword {
                "SET" => set_action(&action, item, names, values)?,
                "REMOVE" => {
                    item.remove(name(&action, names));
                }
                "ADD" => {
                    let Some((target, placeholder)) = action.trim().split_once(' ') else {
                        return Err(validation(format!("malformed ADD `{action}`")));
                    };
                    let target = name(target, names).to_string();
                    let current = item.get(&target).map(number).transpose()?.unwrap_or(0.0);
                    let sum = current + number(value(placeholder, values)?)?;
                    item.insert(target, AttributeValue::N(sum.to_string()));
                }
                _ => return Err(validation(format!("unsupported update clause `{keyword}`"))),
            }
        }
    }
    Ok(())
}

fn project(item: Item, expression: Option<&str>, names: &Names) -> Item {
    let Some(expression) = expression else {
        return item;
    };
    let wanted = expression
        .split(',')
        .map(|placeholder| name(placeholder, names).to_string())
        .collect::<HashSet<_>>();
    item.into_iter()
        .filter(|(attribute, _)| wanted.contains(attribute))
        .collect()
}

impl Table {
    fn canonical(&self, item: &Item) -> Result<String> {
        token::canonical_key(&self.key.project(item).map_err(|err| validation(err.to_string()))?)
    }

    fn condition_holds(
        &self,
        key: &Item,
        condition: Option<&str>,
        names: &Names,
        values: &Values,
    ) -> Result<bool> {
        let current = self.items.get(&self.canonical(key)?).cloned().unwrap_or_default();
        holds(condition, &current, names, values)
    }

    fn put(&mut self, item: Item) -> Result<Option<Item>> {
        let canonical = self.canonical(&item)?;
        Ok(self.items.insert(canonical, item))
    }

    fn delete(&mut self, key: &Item) -> Result<Option<Item>> {
        let canonical = self.canonical(key)?;
        Ok(self.items.remove(&canonical))
    }

    fn update(
        &mut self,
        key: &Item,
        expression: &str,
        names: &Names,
        values: &Values,
    ) -> Result<Item> {
        let canonical = self.canonical(key)?;
        let mut item = self.items.get(&canonical).cloned().unwrap_or_else(|| key.clone());
        apply_update(expression, &mut item, names, values)?;
        self.items.insert(canonical, item.clone());
        Ok(item)
    }

    fn schema(&self, index_name: Option<&str>) -> Result<&KeySchema> {
        match index_name {
            Some(index_name) => self
                .indices
                .get(index_name)
                .ok_or_else(|| validation(format!("unknown index `{index_name}`"))),
            None => Ok(&self.key),
        }
    }

    /// The item's position key: its index key plus its table key.
    fn position(&self, schema: &KeySchema, item: &Item) -> Result<Item> {
        let mut position = self.key.project(item).map_err(|err| validation(err.to_string()))?;
        for name in schema.names() {
            if let Some(value) = item.get(name) {
                position.insert(name.to_string(), value.clone());
            }
        }
        Ok(position)
    }

    fn ordered(&self, schema: &KeySchema) -> Vec<&Item> {
        let mut items = self
            .items
            .iter()
            .filter(|(_, item)| schema.names().all(|name| item.contains_key(name)))
            .collect::<Vec<_>>();
        items.sort_by(|(left_key, left), (right_key, right)| {
            schema
                .names()
                .map(|name| compare(&left[name], &right[name]).unwrap_or(Ordering::Equal))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| left_key.cmp(right_key))
        });
        items.into_iter().map(|(_, item)| item).collect()
    }
}

struct Selection<'a> {
    exclusive_start_key: Option<Item>,
    filter: Option<&'a str>,
    limit: Option<i32>,
    names: Names,
    projection: Option<&'a str>,
    values: Values,
}

/// A page of matches and the key to resume from, if any items were left unevaluated.
type Selected = (Vec<Item>, Option<Item>);

impl Table {
    fn select(
        &self,
        schema: &KeySchema,
        candidates: Vec<&Item>,
        selection: Selection<'_>,
    ) -> Result<Selected> {
        let start = match &selection.exclusive_start_key {
            Some(start_key) => {
                let start_key = token::canonical_key(start_key)?;
                let mut position = None;
                for (index, item) in candidates.iter().enumerate() {
                    if token::canonical_key(&self.position(schema, item)?)? == start_key {
                        position = Some(index + 1);
                        break;
                    }
                }
                position.ok_or_else(|| validation("exclusive start key matches no item"))?
            }
            None => 0,
        };
        let remaining = &candidates[start.min(candidates.len())..];
        let limit = selection
            .limit
            .map_or(remaining.len(), |limit| limit.max(0) as usize);
        let evaluated = &remaining[..limit.min(remaining.len())];
        let last_evaluated_key = match evaluated.last() {
            Some(last) if evaluated.len() < remaining.len() => Some(self.position(schema, last)?),
            _ => None,
        };
        let mut items = Vec::new();
        for item in evaluated {
            if holds(selection.filter, item, &selection.names, &selection.values)? {
                items.push(project((*item).clone(), selection.projection, &selection.names));
            }
        }
        Ok((items, last_evaluated_key))
    }
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub(crate) fn with_table(self, table_name: &str, key: KeySchema) -> Self {
        self.state().tables.insert(
            table_name.to_string(),
            Table {
                key,
                ..Default::default()
            },
        );
        self
    }

    pub(crate) fn with_index(self, table_name: &str, index_name: &str, key: KeySchema) -> Self {
        if let Some(table) = self.state().tables.get_mut(table_name) {
            table.indices.insert(index_name.to_string(), key);
        }
        self
    }

    pub(crate) fn insert(&self, table_name: &str, item: Item) {
        let mut state = self.state();
        let table = state.tables.get_mut(table_name).unwrap();
        table.put(item).unwrap();
    }

    pub(crate) fn item(&self, table_name: &str, key: &Item) -> Option<Item> {
        let state = self.state();
        let table = state.tables.get(table_name)?;
        table.items.get(&table.canonical(key).ok()?).cloned()
    }

    /// The next call fails with `err` instead of running.
    pub(crate) fn fail_next(&self, err: Error) {
        self.state().failure = Some(err);
    }

    /// The next call to `operation` fails with `err` instead of running.
    pub(crate) fn fail_on(&self, operation: &'static str, err: Error) {
        self.state().failures.insert(operation, err);
    }

    /// The next batch call touching `key` on `table_name` reports it as unprocessed.
    pub(crate) fn leave_unprocessed(&self, table_name: &str, key: Item) {
        let canonical = token::canonical_key(&key).unwrap();
        self.state()
            .unprocessed
            .insert((table_name.to_string(), canonical));
    }

    pub(crate) fn calls(&self, operation: &str) -> usize {
        self.state().calls.get(operation).copied().unwrap_or_default()
    }

    pub(crate) fn last_batch_write_keys(&self) -> Vec<Item> {
        self.state().last_batch_write_keys.clone()
    }

    pub(crate) fn last_client_request_token(&self) -> Option<String> {
        self.state().last_client_request_token.clone()
    }

    async fn enter(&self, operation: &'static str) -> Result<std::sync::MutexGuard<'_, State>> {
        *self.state().calls.entry(operation).or_default() += 1;
        tokio::task::yield_now().await;
        let mut state = self.state();
        let failure = match state.failure.take() {
            Some(err) => Some(err),
            None => state.failures.remove(operation),
        };
        match failure {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }
}

fn table_mut<'a>(state: &'a mut State, table_name: Option<&str>) -> Result<&'a mut Table> {
    let table_name = table_name.unwrap_or_default();
    state
        .tables
        .get_mut(table_name)
        .ok_or_else(|| not_found(table_name))
}

fn conditional_check_failed() -> Error {
    Error::from_code(
        "ConditionalCheckFailedException",
        "The conditional request failed",
    )
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput> {
        let mut state = self.enter("get_item").await?;
        let table_name = input.table_name.unwrap_or_default();
        let table = table_mut(&mut state, Some(&table_name))?;
        let names = input.expression_attribute_names.unwrap_or_default();
        let key = input.key.unwrap_or_default();
        let item = table
            .items
            .get(&table.canonical(&key)?)
            .cloned()
            .map(|item| project(item, input.projection_expression.as_deref(), &names));
        Ok(GetItemOutput::builder()
            .set_item(item)
            .consumed_capacity(capacity(&table_name, 1.0))
            .build())
    }

    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput> {
        let mut state = self.enter("put_item").await?;
        let table_name = input.table_name.unwrap_or_default();
        let table = table_mut(&mut state, Some(&table_name))?;
        let item = input.item.unwrap_or_default();
        let names = input.expression_attribute_names.unwrap_or_default();
        let values = input.expression_attribute_values.unwrap_or_default();
        if !table.condition_holds(&item, input.condition_expression.as_deref(), &names, &values)? {
            return Err(conditional_check_failed());
        }
        table.put(item)?;
        Ok(PutItemOutput::builder()
            .consumed_capacity(capacity(&table_name, 1.0))
            .build())
    }

    async fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput> {
        let mut state = self.enter("update_item").await?;
        let table_name = input.table_name.unwrap_or_default();
        let table = table_mut(&mut state, Some(&table_name))?;
        let key = input.key.unwrap_or_default();
        let names = input.expression_attribute_names.unwrap_or_default();
        let values = input.expression_attribute_values.unwrap_or_default();
        if !table.condition_holds(&key, input.condition_expression.as_deref(), &names, &values)? {
            return Err(conditional_check_failed());
        }
        let expression = input.update_expression.unwrap_or_default();
        let item = table.update(&key, &expression, &names, &values)?;
        let attributes = (input.return_values == Some(types::ReturnValue::AllNew)).then_some(item);
        Ok(UpdateItemOutput::builder()
            .set_attributes(attributes)
            .consumed_capacity(capacity(&table_name, 1.0))
            .build())
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput> {
        let mut state = self.enter("delete_item").await?;
        let table_name = input.table_name.unwrap_or_default();
        let table = table_mut(&mut state, Some(&table_name))?;
        let key = input.key.unwrap_or_default();
        let names = input.expression_attribute_names.unwrap_or_default();
        let values = input.expression_attribute_values.unwrap_or_default();
        if !table.condition_holds(&key, input.condition_expression.as_deref(), &names, &values)? {
            return Err(conditional_check_failed());
        }
        let old = table.delete(&key)?;
        let attributes = old.filter(|_| input.return_values == Some(types::ReturnValue::AllOld));
        Ok(DeleteItemOutput::builder()
            .set_attributes(attributes)
            .consumed_capacity(capacity(&table_name, 1.0))
            .build())
    }

    async fn query(&self, input: QueryInput) -> Result<QueryOutput> {
        let mut state = self.enter("query").await?;
        let table_name = input.table_name.unwrap_or_default();
        let table = table_mut(&mut state, Some(&table_name))?;
        let schema = table.schema(input.index_name.as_deref())?.clone();
        let names = input.expression_attribute_names.unwrap_or_default();
        let values = input.expression_attribute_values.unwrap_or_default();
        let mut candidates = Vec::new();
        for item in table.ordered(&schema) {
            if holds(input.key_condition_expression.as_deref(), item, &names, &values)? {
                candidates.push(item);
            }
        }
        if input.scan_index_forward == Some(false) {
            candidates.reverse();
        }
        let (items, last_evaluated_key) = table.select(
            &schema,
            candidates,
            Selection {
                exclusive_start_key: input.exclusive_start_key,
                filter: input.filter_expression.as_deref(),
                limit: input.limit,
                names,
                projection: input.projection_expression.as_deref(),
                values,
            },
        )?;
        Ok(QueryOutput::builder()
            .count(items.len() as i32)
            .set_items(Some(items))
            .set_last_evaluated_key(last_evaluated_key)
            .consumed_capacity(capacity(&table_name, 1.0))
            .build())
    }

    async fn scan(&self, input: ScanInput) -> Result<ScanOutput> {
        let mut state = self.enter("scan").await?;
        let table_name = input.table_name.unwrap_or_default();
        let table = table_mut(&mut state, Some(&table_name))?;
        let schema = table.schema(input.index_name.as_deref())?.clone();
        let segment = input.segment.zip(input.total_segments);
        let candidates = table
            .ordered(&schema)
            .into_iter()
            .enumerate()
            .filter(|(index, _)| {
                segment.is_none_or(|(segment, total)| *index as i32 % total == segment)
            })
            .map(|(_, item)| item)
            .collect();
        let (items, last_evaluated_key) = table.select(
            &schema,
            candidates,
            Selection {
                exclusive_start_key: input.exclusive_start_key,
                filter: input.filter_expression.as_deref(),
                limit: input.limit,
                names: input.expression_attribute_names.unwrap_or_default(),
                projection: input.projection_expression.as_deref(),
                values: input.expression_attribute_values.unwrap_or_default(),
            },
        )?;
        Ok(ScanOutput::builder()
            .count(items.len() as i32)
            .set_items(Some(items))
            .set_last_evaluated_key(last_evaluated_key)
            .consumed_capacity(capacity(&table_name, 1.0))
            .build())
    }

    async fn batch_get_item(&self, input: BatchGetItemInput) -> Result<BatchGetItemOutput> {
        let mut state = self.enter("batch_get_item").await?;
        let mut responses = HashMap::new();
        let mut unprocessed_keys = HashMap::new();
        let mut counts = IndexMap::new();
        for (table_name, keys_and_attributes) in input.request_items.unwrap_or_default() {
            let mut items = Vec::new();
            let mut unprocessed = Vec::new();
            for key in keys_and_attributes.keys {
                let canonical = table_mut(&mut state, Some(&table_name))?.canonical(&key)?;
                if state.unprocessed.remove(&(table_name.clone(), canonical.clone())) {
                    unprocessed.push(key);
                    continue;
                }
                *counts.entry(table_name.clone()).or_default() += 1;
                if let Some(item) = table_mut(&mut state, Some(&table_name))?.items.get(&canonical) {
                    items.push(item.clone());
                }
            }
            responses.insert(table_name.clone(), items);
            if !unprocessed.is_empty() {
                let keys_and_attributes = types::KeysAndAttributes::builder()
                    .set_keys(Some(unprocessed))
                    .build()?;
                unprocessed_keys.insert(table_name, keys_and_attributes);
            }
        }
        Ok(BatchGetItemOutput::builder()
            .set_responses(Some(responses))
            .set_unprocessed_keys(Some(unprocessed_keys))
            .set_consumed_capacity(Some(capacities(counts)))
            .build())
    }

    async fn batch_write_item(&self, input: BatchWriteItemInput) -> Result<BatchWriteItemOutput> {
        let mut state = self.enter("batch_write_item").await?;
        let mut unprocessed_items = HashMap::new();
        let mut counts = IndexMap::new();
        let mut keys = Vec::new();
        for (table_name, write_requests) in input.request_items.unwrap_or_default() {
            let mut unprocessed = Vec::new();
            for write_request in write_requests {
                let table = table_mut(&mut state, Some(&table_name))?;
                let key = match (write_request.put_request(), write_request.delete_request()) {
                    (Some(put_request), None) => table
                        .key
                        .project(put_request.item())
                        .map_err(|err| validation(err.to_string()))?,
                    (None, Some(delete_request)) => delete_request.key().clone(),
                    _ => return Err(validation("write request needs exactly one action")),
                };
                let canonical = table.canonical(&key)?;
                keys.push(key);
                if state.unprocessed.remove(&(table_name.clone(), canonical)) {
                    unprocessed.push(write_request);
                    continue;
                }
                let table = table_mut(&mut state, Some(&table_name))?;
                match (write_request.put_request(), write_request.delete_request()) {
                    (Some(put_request), _) => {
                        table.put(put_request.item().clone())?;
                    }
                    (_, Some(delete_request)) => {
                        table.delete(delete_request.key())?;
                    }
                    _ => {}
                }
                *counts.entry(table_name.clone()).or_default() += 1;
            }
            if !unprocessed.is_empty() {
                unprocessed_items.insert(table_name, unprocessed);
            }
        }
        state.last_batch_write_keys = keys;
        Ok(BatchWriteItemOutput::builder()
            .set_unprocessed_items(Some(unprocessed_items))
            .set_consumed_capacity(Some(capacities(counts)))
            .build())
    }

    async fn transact_get_items(
        &self,
        input: TransactGetItemsInput,
    ) -> Result<TransactGetItemsOutput> {
        let mut state = self.enter("transact_get_items").await?;
        let mut responses = Vec::new();
        let mut counts = IndexMap::new();
        for transact_item in input.transact_items.unwrap_or_default() {
            let Some(get) = transact_item.get() else {
                return Err(validation("transactional read without a get"));
            };
            let table = table_mut(&mut state, Some(get.table_name()))?;
            let names = get.expression_attribute_names().cloned().unwrap_or_default();
            let item = table
                .items
                .get(&table.canonical(get.key())?)
                .cloned()
                .map(|item| project(item, get.projection_expression(), &names));
            responses.push(types::ItemResponse::builder().set_item(item).build());
            *counts.entry(get.table_name().to_string()).or_default() += 1;
        }
        Ok(TransactGetItemsOutput::builder()
            .set_responses(Some(responses))
            .set_consumed_capacity(Some(capacities(counts)))
            .build())
    }

    async fn transact_write_items(
        &self,
        input: TransactWriteItemsInput,
    ) -> Result<TransactWriteItemsOutput> {
        let mut state = self.enter("transact_write_items").await?;
        state.last_client_request_token = input.client_request_token;
        let transact_items = input.transact_items.unwrap_or_default();
        let mut reasons = Vec::with_capacity(transact_items.len());
        for transact_item in &transact_items {
            let (table_name, key, condition, names, values) = if let Some(put) = transact_item.put() {
                let table = table_mut(&mut state, Some(put.table_name()))?;
                let key = table.key.project(put.item()).map_err(|err| validation(err.to_string()))?;
                (put.table_name(), key, put.condition_expression(), put.expression_attribute_names(), put.expression_attribute_values())
            } else if let Some(update) = transact_item.update() {
                (update.table_name(), update.key().clone(), update.condition_expression(), update.expression_attribute_names(), update.expression_attribute_values())
            } else if let Some(delete) = transact_item.delete() {
                (delete.table_name(), delete.key().clone(), delete.condition_expression(), delete.expression_attribute_names(), delete.expression_attribute_values())
            } else if let Some(check) = transact_item.condition_check() {
                (check.table_name(), check.key().clone(), Some(check.condition_expression()), check.expression_attribute_names(), check.expression_attribute_values())
            } else {
                return Err(validation("transactional write without an action"));
            };
            let table = table_mut(&mut state, Some(table_name))?;
            let names = names.cloned().unwrap_or_default();
            let values = values.cloned().unwrap_or_default();
            let code = if table.condition_holds(&key, condition, &names, &values)? {
                "None"
            } else {
                CONDITIONAL_CHECK_FAILED
            };
            reasons.push(CancellationReason {
                code: Some(code.to_string()),
                message: None,
            });
        }
        if reasons
            .iter()
            .any(|reason| reason.code.as_deref() == Some(CONDITIONAL_CHECK_FAILED))
        {
            return Err(Error::TransactionCancelled {
                message: "Transaction cancelled, please refer cancellation reasons for specific reasons".to_string(),
                reasons,
            });
        }
        let mut counts = IndexMap::new();
        for transact_item in &transact_items {
            if let Some(put) = transact_item.put() {
                table_mut(&mut state, Some(put.table_name()))?.put(put.item().clone())?;
                *counts.entry(put.table_name().to_string()).or_default() += 1;
            } else if let Some(update) = transact_item.update() {
                let names = update.expression_attribute_names().cloned().unwrap_or_default();
                let values = update.expression_attribute_values().cloned().unwrap_or_default();
                table_mut(&mut state, Some(update.table_name()))?.update(
                    update.key(),
                    update.update_expression(),
                    &names,
                    &values,
                )?;
                *counts.entry(update.table_name().to_string()).or_default() += 1;
            } else if let Some(delete) = transact_item.delete() {
                table_mut(&mut state, Some(delete.table_name()))?.delete(delete.key())?;
                *counts.entry(delete.table_name().to_string()).or_default() += 1;
            }
        }
        Ok(TransactWriteItemsOutput::builder()
            .set_consumed_capacity(Some(capacities(counts)))
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    fn s(value: &str) -> AttributeValue {
        AttributeValue::S(value.to_string())
    }

    fn n(value: i64) -> AttributeValue {
        AttributeValue::N(value.to_string())
    }

    #[rstest]
    #[case::equals("#a = :a", true)]
    #[case::not_equal("#a <> :a", false)]
    #[case::exists("attribute_exists(#a)", true)]
    #[case::not_exists("attribute_not_exists(#b)", true)]
    #[case::grouped("(#a = :a AND attribute_exists(#n))", true)]
    #[case::or("#a <> :a OR #n >= :n", true)]
    #[case::prefix("begins_with(#a, :p)", true)]
    #[case::missing_attribute_not_equal("#b <> :a", true)]
    fn test_holds(#[case] expression: &str, #[case] expected: bool) {
        let item = Item::from([("a".to_string(), s("abc")), ("n".to_string(), n(3))]);
        let values = Values::from([
            (":a".to_string(), s("abc")),
            (":p".to_string(), s("ab")),
            (":n".to_string(), n(2)),
        ]);
        assert_eq!(holds(Some(expression), &item, &Names::new(), &values).unwrap(), expected);
    }

    #[rstest]
    #[case::hyphenated_name(Names::from([("#created-at".to_string(), "created-at".to_string())]), Values::new())]
    #[case::dotted_value(Names::new(), Values::from([(":a.b_eq0".to_string(), s("x"))]))]
    #[case::bare_prefix(Names::from([("#".to_string(), "a".to_string())]), Values::new())]
    fn test_holds_rejects_invalid_placeholders(#[case] names: Names, #[case] values: Values) {
        let actual = holds(Some("attribute_exists(#a)"), &Item::new(), &names, &values);
        assert!(matches!(
            actual,
            Err(Error::Store {
                kind: crate::error::StoreErrorKind::Validation,
                ..
            })
        ));
    }

    #[test]
    fn test_apply_update() {
        let mut item = Item::from([("n".to_string(), n(1)), ("old".to_string(), s("x"))]);
        let values = Values::from([
            (":set0".to_string(), n(2)),
            (":set1".to_string(), s("y")),
            (":add2".to_string(), n(5)),
        ]);
        apply_update(
            "SET #n = #n + :set0, #c = if_not_exists(#c, :set1) REMOVE #old ADD #hits :add2",
            &mut item,
            &Names::new(),
            &values,
        )
        .unwrap();
        assert_eq!(
            item,
            Item::from([
                ("n".to_string(), n(3)),
                ("c".to_string(), s("y")),
                ("hits".to_string(), n(5)),
            ])
        );
    }
}
