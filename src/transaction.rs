//! All-or-nothing reads and writes across items and tables.

use crate::{
    client::Client,
    common::Item,
    error::{Error, Result},
    metrics::CapacityKind,
    model::{Model, ModelDefinition},
    pipeline::Command,
    read::{self, get_item::GetItem},
    write::{
        condition_check::ConditionCheck, delete_item::DeleteItem, put_item::PutItem,
        update_item::UpdateItem,
    },
};

use aws_sdk_dynamodb::{
    operation::{
        transact_get_items::TransactGetItemsInput, transact_write_items::TransactWriteItemsInput,
    },
    types,
};
use std::sync;

struct TransactRead {
    definition: sync::Arc<ModelDefinition>,
    projection: Option<Vec<String>>,
}

/// A consistent snapshot read of several items, possibly across tables.
///
/// Results come back in the order the gets were added. No conditions and no triggers.
pub struct TransactGet {
    client: Client,
    items: Vec<types::TransactGetItem>,
    name: Option<String>,
    reads: Vec<TransactRead>,
}

impl TransactGet {
    pub(crate) fn new(client: Client, name: Option<String>) -> Self {
        Self {
            client,
            items: Vec::new(),
            name,
            reads: Vec::new(),
        }
    }

    /// The transaction name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Adds a read. Consistency is ignored: transactional reads are always serializable.
    pub fn get(&mut self, model: &Model, get_item: GetItem) -> Result<&mut Self> {
        let definition = model.shared_definition();
        self.items.push(get_item.transact_item(&definition)?);
        self.reads.push(TransactRead {
            definition,
            projection: get_item.projection,
        });
        Ok(self)
    }

    /// Reads every item at once; `None` where an item does not exist.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.transact_get", skip_all, fields(transaction = ?self.name), err)
    )]
    pub async fn execute(&self) -> Result<Vec<Option<Item>>> {
        let input = TransactGetItemsInput::builder()
            .return_consumed_capacity(types::ReturnConsumedCapacity::Total)
            .set_transact_items(Some(self.items.clone()))
            .build()?;
        let output = self.client.store().transact_get_items(input).await?;
        self.client
            .record(CapacityKind::Read, output.consumed_capacity());
        let responses = output.responses.unwrap_or_default();
        if responses.len() != self.reads.len() {
            return Err(Error::InvalidRequest(format!(
                "{} responses for {} transactional reads",
                responses.len(),
                self.reads.len()
            )));
        }
        let items = responses
            .into_iter()
            .zip(&self.reads)
            .map(|(response, read)| {
                let projection = read::common::non_empty_projection(&read.projection);
                response
                    .item
                    .map(|item| read.definition.convert(item, projection))
            })
            .collect();
        Ok(items)
    }
}

/// Why the last [`TransactWrite::commit`] failed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct CommitFailure {
    cancelled: bool,
    conditional_check_failed: bool,
}

/// A write transaction: puts, updates, deletes and condition checks applied all together or
/// not at all.
///
/// Triggers fire for every put, update and delete once the store confirms the commit, never
/// for condition checks and never after a failed commit.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use dynamodb_model::{Client, Item, Model, write};
///
/// # async fn example(client: &Client, accounts: &Model) -> dynamodb_model::Result<()> {
/// let mut transaction = client.transaction(Some("transfer".to_string()));
/// transaction.delete(
///     accounts,
///     write::delete_item::DeleteItem {
///         key: Item::from([("id".to_string(), AttributeValue::S("a".to_string()))]),
///         ..Default::default()
///     },
/// )?;
/// if let Err(err) = transaction.commit(Some("transfer-a".to_string())).await {
///     if transaction.conditional_check_failed() {
///         // someone else got there first
///     }
///     return Err(err);
/// }
/// # Ok(())
/// # }
/// ```
pub struct TransactWrite {
    client: Client,
    definitions: Vec<sync::Arc<ModelDefinition>>,
    failure: Option<CommitFailure>,
    items: Vec<types::TransactWriteItem>,
    name: Option<String>,
    puts: Vec<Option<Item>>,
}

impl TransactWrite {
    pub(crate) fn new(client: Client, name: Option<String>) -> Self {
        Self {
            client,
            definitions: Vec::new(),
            failure: None,
            items: Vec::new(),
            name,
            puts: Vec::new(),
        }
    }

    fn push(&mut self, model: &Model, item: types::TransactWriteItem, put: Option<Item>) {
        self.definitions.push(model.shared_definition());
        self.items.push(item);
        self.puts.push(put);
    }

    /// The transaction name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Number of queued sub-requests.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Queues a put; the model's creators run now.
    pub fn put(&mut self, model: &Model, put_item: PutItem) -> Result<&mut Self> {
        let request = put_item.build(model.definition())?;
        let item = request.transact_item()?;
        self.push(model, item, Some(request.item));
        Ok(self)
    }

    /// Queues an update; the model's updaters run now.
    pub fn update(&mut self, model: &Model, update_item: UpdateItem) -> Result<&mut Self> {
        let item = update_item.build(model.definition())?.transact_item()?;
        self.push(model, item, None);
        Ok(self)
    }

    /// Queues a delete.
    pub fn delete(&mut self, model: &Model, delete_item: DeleteItem) -> Result<&mut Self> {
        let item = delete_item.build(model.definition())?.transact_item()?;
        self.push(model, item, None);
        Ok(self)
    }

    /// Queues a condition check.
    pub fn condition(&mut self, model: &Model, condition_check: ConditionCheck) -> Result<&mut Self> {
        let item = condition_check.build(model.definition())?.transact_item()?;
        self.push(model, item, None);
        Ok(self)
    }

    /// Whether the last commit was aborted by the store, for any reason.
    pub fn is_cancelled(&self) -> bool {
        self.failure.is_some_and(|failure| failure.cancelled)
    }

    /// Whether the last commit was aborted because at least one condition was not met.
    pub fn conditional_check_failed(&self) -> bool {
        self.failure
            .is_some_and(|failure| failure.conditional_check_failed)
    }

    fn trigger(
        definition: &ModelDefinition,
        item: &types::TransactWriteItem,
        put: Option<Item>,
    ) -> Result<()> {
        let (command, key, item) = match (item.put(), item.update(), item.delete()) {
            (Some(put_request), None, None) => {
                let key = definition.key().project(put_request.item())?;
                let item = put.map(|item| definition.convert(item, None));
                (Command::Put, key, item)
            }
            (None, Some(update), None) => (Command::Update, update.key().clone(), None),
            (None, None, Some(delete)) => (Command::Delete, delete.key().clone(), None),
            (None, None, None) if item.condition_check().is_some() => return Ok(()),
            _ => {
                return Err(Error::InvalidRequest(format!(
                    "transaction item for `{}` has no single write shape",
                    definition.table_name()
                )));
            }
        };
        definition.fire(command, key, item);
        Ok(())
    }

    /// Sends every queued sub-request as one all-or-nothing call.
    ///
    /// `client_request_token` makes the commit idempotent: resending the same token within the
    /// store's idempotency window does not apply the writes twice. On success the queue is
    /// emptied and triggers fire in queue order. On failure the queue is kept and
    /// [`is_cancelled`](Self::is_cancelled) and
    /// [`conditional_check_failed`](Self::conditional_check_failed) describe the cause.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.transact_write", skip_all, fields(transaction = ?self.name), err)
    )]
    pub async fn commit(&mut self, client_request_token: Option<String>) -> Result<()> {
        let input = TransactWriteItemsInput::builder()
            .set_client_request_token(client_request_token)
            .return_consumed_capacity(types::ReturnConsumedCapacity::Total)
            .set_transact_items(Some(self.items.clone()))
            .build()?;
        let output = match self.client.store().transact_write_items(input).await {
            Ok(output) => output,
            Err(err) => {
                self.failure = Some(CommitFailure {
                    cancelled: err.is_transaction_cancelled(),
                    conditional_check_failed: err.is_conditional_check_failed(),
                });
                #[cfg(feature = "tracing")]
                tracing::debug!(failure = ?self.failure, "transaction commit failed");
                return Err(err);
            }
        };
        self.failure = None;
        self.client
            .record(CapacityKind::Write, output.consumed_capacity());
        let definitions = std::mem::take(&mut self.definitions);
        let items = std::mem::take(&mut self.items);
        let puts = std::mem::take(&mut self.puts);
        Self::fire_triggers(&definitions, &items, puts)
    }

    /// Fires a trigger for every committed write, then reports the first item that could not
    /// be classified.
    fn fire_triggers(
        definitions: &[sync::Arc<ModelDefinition>],
        items: &[types::TransactWriteItem],
        puts: Vec<Option<Item>>,
    ) -> Result<()> {
        let mut first_error = None;
        for ((definition, item), put) in definitions.iter().zip(items).zip(puts) {
            if let Err(err) = Self::trigger(definition, item, put) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
