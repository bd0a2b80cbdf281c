//! The per-table handle and its immutable definition.

/// Staged construction of models.
pub mod builder;

use crate::{
    client::Client,
    common::{
        Item,
        condition::{Condition, ConditionMap},
        key::KeySchema,
        update::UpdateAttributes,
    },
    config,
    error::{Error, Result},
    metrics::CapacityKind,
    pipeline::{self, Command, Converter, Creator, Trigger, TriggerEvent, Updater},
    read::{
        self,
        common::{Consistency, Page},
        get_item::GetItem,
        query::Query,
        scan::Scan,
    },
    write::{delete_item::DeleteItem, put_item::PutItem, update_item::UpdateItem},
};

use futures::{Stream, TryStreamExt, stream};
use indexmap::IndexMap;
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt, future::Future, sync};

/// Everything a model knows about its table. Immutable once built.
#[derive(Clone, Default)]
pub struct ModelDefinition {
    pub(crate) converters: Vec<Converter>,
    pub(crate) creators: Vec<Creator>,
    pub(crate) indices: IndexMap<String, KeySchema>,
    pub(crate) key: KeySchema,
    pub(crate) name: String,
    pub(crate) table_name: String,
    pub(crate) triggers: Vec<Trigger>,
    pub(crate) updaters: Vec<Updater>,
}

impl fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("name", &self.name)
            .field("table_name", &self.table_name)
            .field("key", &self.key)
            .field("indices", &self.indices)
            .field("creators", &self.creators.len())
            .field("updaters", &self.updaters.len())
            .field("converters", &self.converters.len())
            .field("triggers", &self.triggers.len())
            .finish()
    }
}

impl ModelDefinition {
    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The table key.
    pub fn key(&self) -> &KeySchema {
        &self.key
    }

    /// Declared secondary indices, in declaration order.
    pub fn indices(&self) -> &IndexMap<String, KeySchema> {
        &self.indices
    }

    /// The key of a declared index.
    pub fn index(&self, name: &str) -> Option<&KeySchema> {
        self.indices.get(name)
    }

    pub(crate) fn create(&self, item: Item) -> Item {
        pipeline::apply_creators(&self.creators, item)
    }

    pub(crate) fn update(&self, attributes: UpdateAttributes) -> UpdateAttributes {
        pipeline::apply_updaters(&self.updaters, attributes)
    }

    pub(crate) fn convert(&self, mut item: Item, projection: Option<&[String]>) -> Item {
        pipeline::apply_converters(&self.converters, &mut item, projection);
        item
    }

    pub(crate) fn fire(&self, command: Command, key: Item, item: Option<Item>) {
        if self.triggers.is_empty() {
            return;
        }
        let event = TriggerEvent {
            command,
            item,
            key,
            model: self.name.clone(),
            table_name: self.table_name.clone(),
        };
        pipeline::fire_triggers(&self.triggers, &event);
    }
}

/// Parameters of [`Model::atomic_action`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AtomicAction {
    /// Attribute whose value changes on every successful write, e.g. a version or timestamp.
    pub condition_attribute: String,
    /// The table key of the item.
    pub key: Item,
    /// Attempts before giving up; [`config::ATOMIC_ACTION_MAX_ATTEMPTS`] when `None`.
    pub max_attempts: Option<u32>,
}

/// What an atomic action callback gets on each attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct AtomicContext {
    /// Condition to attach to the callback's single write.
    pub condition: ConditionMap,
    /// The freshly fetched item, `None` if it does not exist yet.
    pub item: Option<Item>,
    /// The table key of the item.
    pub key: Item,
}

/// A handle on one table, running every operation through the model's item pipeline.
///
/// Cloning is cheap; clones share the definition and the client.
#[derive(Clone, Debug)]
pub struct Model {
    client: Client,
    definition: sync::Arc<ModelDefinition>,
}

impl Model {
    pub(crate) fn new(client: Client, definition: ModelDefinition) -> Self {
        Self {
            client,
            definition: sync::Arc::new(definition),
        }
    }

    /// The model's definition.
    pub fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    pub(crate) fn shared_definition(&self) -> sync::Arc<ModelDefinition> {
        self.definition.clone()
    }

    /// Fetches one item; `None` when the key does not exist.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.get", skip_all, fields(model = %self.definition.name), err)
    )]
    pub async fn get(&self, get_item: GetItem) -> Result<Option<Item>> {
        let input = get_item.build(&self.definition)?;
        let output = self.client.store().get_item(input).await?;
        self.client
            .record(CapacityKind::Read, output.consumed_capacity());
        let projection = read::common::non_empty_projection(&get_item.projection);
        let item = output
            .item
            .map(|item| self.definition.convert(item, projection));
        Ok(item)
    }

    /// Fetches one item and deserializes it.
    pub async fn get_as<T: DeserializeOwned>(&self, get_item: GetItem) -> Result<Option<T>> {
        let item = self.get(get_item).await?;
        let value = item.map(serde_dynamo::from_item).transpose()?;
        Ok(value)
    }

    /// Reads one page of a scan.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.scan", skip_all, fields(model = %self.definition.name), err)
    )]
    pub async fn scan(&self, scan: Scan) -> Result<Page> {
        let projection = scan.multiple_read_args.projection.clone();
        let input = scan.build(&self.definition)?;
        let output = self.client.store().scan(input).await?;
        self.client
            .record(CapacityKind::Read, output.consumed_capacity());
        read::common::into_page(
            &self.definition,
            output.items,
            output.last_evaluated_key,
            read::common::non_empty_projection(&projection),
        )
    }

    /// Reads one page of a query.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.query", skip_all, fields(model = %self.definition.name), err)
    )]
    pub async fn query(&self, query: Query) -> Result<Page> {
        let projection = query.multiple_read_args.projection.clone();
        let input = query.build(&self.definition)?;
        let output = self.client.store().query(input).await?;
        self.client
            .record(CapacityKind::Read, output.consumed_capacity());
        read::common::into_page(
            &self.definition,
            output.items,
            output.last_evaluated_key,
            read::common::non_empty_projection(&projection),
        )
    }

    /// Scans every page lazily, one item at a time.
    ///
    /// A page is requested only when the previous one is exhausted; the stream ends after the
    /// page that carries no token.
    pub fn scan_iter(&self, scan: Scan) -> impl Stream<Item = Result<Item>> + Send + 'static {
        let model = self.clone();
        stream::try_unfold(Some(scan), move |scan| {
            let model = model.clone();
            async move {
                let Some(scan) = scan else {
                    return Ok::<_, Error>(None);
                };
                let mut next = scan.clone();
                let page = model.scan(scan).await?;
                next.multiple_read_args.page_token = page.next_page_token;
                let next = next.multiple_read_args.page_token.is_some().then_some(next);
                let items = stream::iter(page.items.into_iter().map(Ok));
                Ok(Some((items, next)))
            }
        })
        .try_flatten()
    }

    /// Queries every page lazily, one item at a time.
    pub fn query_iter(&self, query: Query) -> impl Stream<Item = Result<Item>> + Send + 'static {
        let model = self.clone();
        stream::try_unfold(Some(query), move |query| {
            let model = model.clone();
            async move {
                let Some(query) = query else {
                    return Ok::<_, Error>(None);
                };
                let mut next = query.clone();
                let page = model.query(query).await?;
                next.multiple_read_args.page_token = page.next_page_token;
                let next = next.multiple_read_args.page_token.is_some().then_some(next);
                let items = stream::iter(page.items.into_iter().map(Ok));
                Ok(Some((items, next)))
            }
        })
        .try_flatten()
    }

    /// Creates or replaces an item and returns it as written, after creators and converters.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.put", skip_all, fields(model = %self.definition.name), err)
    )]
    pub async fn put(&self, put_item: PutItem) -> Result<Item> {
        let request = put_item.build(&self.definition)?;
        let output = self.client.store().put_item(request.input()?).await?;
        self.client
            .record(CapacityKind::Write, output.consumed_capacity());
        let item = self.definition.convert(request.item, None);
        self.definition
            .fire(Command::Put, request.key, Some(item.clone()));
        Ok(item)
    }

    /// Serializes a value and puts it.
    pub async fn put_as<T: Serialize>(
        &self,
        value: &T,
        condition: Option<ConditionMap>,
    ) -> Result<Item> {
        let item: Item = serde_dynamo::to_item(value)?;
        self.put(PutItem { condition, item }).await
    }

    /// Updates an item and returns the committed item.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.update", skip_all, fields(model = %self.definition.name), err)
    )]
    pub async fn update(&self, update_item: UpdateItem) -> Result<Item> {
        let request = update_item.build(&self.definition)?;
        let output = self.client.store().update_item(request.input()?).await?;
        self.client
            .record(CapacityKind::Write, output.consumed_capacity());
        let item = output.attributes.unwrap_or_else(|| request.key.clone());
        let item = self.definition.convert(item, None);
        self.definition
            .fire(Command::Update, request.key, Some(item.clone()));
        Ok(item)
    }

    /// Deletes an item.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.delete", skip_all, fields(model = %self.definition.name), err)
    )]
    pub async fn delete(&self, delete_item: DeleteItem) -> Result<()> {
        let request = delete_item.build(&self.definition)?;
        let output = self.client.store().delete_item(request.input()?).await?;
        self.client
            .record(CapacityKind::Write, output.consumed_capacity());
        let item = output
            .attributes
            .map(|item| self.definition.convert(item, None));
        self.definition.fire(Command::Delete, request.key, item);
        Ok(())
    }

    /// Runs `action` under optimistic concurrency control.
    ///
    /// Each attempt fetches the item (strongly consistent) and hands the callback a condition
    /// pinning `condition_attribute` to its current value, or to non-existence. A callback
    /// failing with a conditional check error is retried after a random pause of up to
    /// [`config::ATOMIC_ACTION_MAX_DELAY`]; any other error is returned as is. After
    /// `max_attempts` lost races the action fails with [`Error::AtomicActionExhausted`].
    ///
    /// ```rust,no_run
    /// use aws_sdk_dynamodb::types::AttributeValue;
    /// use dynamodb_model::{AtomicAction, Item, Model, common::update, write};
    ///
    /// # async fn example(counters: &Model) -> dynamodb_model::Result<()> {
    /// let key = Item::from([("id".to_string(), AttributeValue::S("visits".to_string()))]);
    /// let params = AtomicAction {
    ///     condition_attribute: "version".to_string(),
    ///     key: key.clone(),
    ///     ..Default::default()
    /// };
    /// counters
    ///     .atomic_action(params, |context| async move {
    ///         let version = context
    ///             .item
    ///             .as_ref()
    ///             .and_then(|item| item.get("version"))
    ///             .and_then(|version| version.as_n().ok())
    ///             .and_then(|version| version.parse::<u64>().ok())
    ///             .unwrap_or(0);
    ///         let update_item = write::update_item::UpdateItem {
    ///             attributes: update::UpdateAttributes::from([(
    ///                 "version".to_string(),
    ///                 update::UpdateAction::assign(AttributeValue::N((version + 1).to_string())),
    ///             )]),
    ///             condition: Some(context.condition),
    ///             key: context.key,
    ///         };
    ///         counters.update(update_item).await
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.atomic_action", skip_all, fields(model = %self.definition.name), err)
    )]
    pub async fn atomic_action<F, Fut, R>(&self, params: AtomicAction, mut action: F) -> Result<R>
    where
        F: FnMut(AtomicContext) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let max_attempts = params
            .max_attempts
            .unwrap_or(config::ATOMIC_ACTION_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(Error::InvalidArgument(
                "atomic action needs at least one attempt".to_string(),
            ));
        }
        let attribute = params.condition_attribute;
        for attempt in 1..=max_attempts {
            let get_item = GetItem {
                consistency: Some(Consistency::Strong),
                key: params.key.clone(),
                projection: None,
            };
            let item = self.get(get_item).await?;
            let condition = match item.as_ref().and_then(|item| item.get(&attribute)) {
                Some(value) => ConditionMap::single(attribute.clone(), Condition::Equals(value.clone())),
                None => ConditionMap::single(attribute.clone(), Condition::Null),
            };
            let context = AtomicContext {
                condition,
                item,
                key: params.key.clone(),
            };
            match action(context).await {
                Ok(result) => return Ok(result),
                Err(err) if err.is_conditional_check_failed() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempt, max_attempts, "atomic action condition failed");
                    if attempt < max_attempts {
                        let delay = config::random_delay(config::ATOMIC_ACTION_MAX_DELAY);
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }
        Err(Error::AtomicActionExhausted(max_attempts))
    }
}
