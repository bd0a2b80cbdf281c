//! Multi-table bulk reads and writes with resumable unprocessed-item handling.

use crate::{
    client::Client,
    common::{Item, token},
    config::BackoffConfig,
    error::{Error, Result},
    metrics::CapacityKind,
    model::{Model, ModelDefinition},
    pipeline::Command,
    write::{
        delete_item::{DeleteItem, DeleteItemRequest},
        put_item::{PutItem, PutItemRequest},
    },
};

use aws_sdk_dynamodb::{
    operation::{batch_get_item::BatchGetItemInput, batch_write_item::BatchWriteItemInput},
    types,
};
use futures::{Stream, stream};
use indexmap::IndexMap;
use std::{collections, sync};

#[derive(Clone, Debug)]
enum BatchWrite {
    Put(PutItemRequest),
    Delete(DeleteItemRequest),
}

impl BatchWrite {
    fn key(&self) -> &Item {
        match self {
            Self::Put(request) => &request.key,
            Self::Delete(request) => &request.key,
        }
    }

    fn write_request(&self) -> Result<types::WriteRequest> {
        match self {
            Self::Put(request) => request.write_request(),
            Self::Delete(request) => request.write_request(),
        }
    }
}

#[derive(Clone, Debug)]
struct TableRequests<T> {
    definition: sync::Arc<ModelDefinition>,
    requests: Vec<T>,
}

/// What one [`Batch::execute`] round produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchOutput {
    /// Whether nothing is left to resubmit.
    pub done: bool,
    /// Items read this round, converted, per table name.
    pub items: collections::HashMap<String, Vec<Item>>,
    /// Requested keys the store neither returned nor left unprocessed: they do not exist.
    pub missing: collections::HashMap<String, Vec<Item>>,
    /// Writes the store confirmed this round.
    pub processed_writes: usize,
}

/// Accumulates gets, puts and deletes across tables and sends them as bulk calls.
///
/// Whatever the store leaves unprocessed stays in the batch, so calling
/// [`execute`](Batch::execute) again resubmits exactly that. A batch is meant to be driven by
/// one caller at a time.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use dynamodb_model::{Client, Item, Model};
///
/// # async fn example(client: &Client, users: &Model) -> dynamodb_model::Result<()> {
/// let mut batch = client.batch(None);
/// batch
///     .get(users, Item::from([("id".to_string(), AttributeValue::S("1".to_string()))]))?
///     .delete(users, Item::from([("id".to_string(), AttributeValue::S("2".to_string()))]))?;
/// loop {
///     let output = batch.execute().await?;
///     if output.done {
///         break;
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Batch {
    client: Client,
    gets: IndexMap<String, TableRequests<Item>>,
    name: Option<String>,
    writes: IndexMap<String, TableRequests<BatchWrite>>,
}

fn table_requests<'a, T>(
    tables: &'a mut IndexMap<String, TableRequests<T>>,
    model: &Model,
) -> Result<&'a mut Vec<T>> {
    let definition = model.shared_definition();
    let table = tables
        .entry(definition.table_name().to_string())
        .or_insert_with(|| TableRequests {
            definition: definition.clone(),
            requests: Vec::new(),
        });
    if table.definition.name() != definition.name() {
        return Err(Error::InvalidArgument(format!(
            "table `{}` is already bound to model `{}`",
            definition.table_name(),
            table.definition.name()
        )));
    }
    Ok(&mut table.requests)
}

fn key_set<'a>(keys: impl IntoIterator<Item = &'a Item>) -> Result<collections::HashSet<String>> {
    keys.into_iter().map(token::canonical_key).collect()
}

impl Batch {
    pub(crate) fn new(client: Client, name: Option<String>) -> Self {
        Self {
            client,
            gets: IndexMap::new(),
            name,
            writes: IndexMap::new(),
        }
    }

    /// The batch name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether nothing is waiting to be sent.
    pub fn is_done(&self) -> bool {
        self.gets.is_empty() && self.writes.is_empty()
    }

    /// Queues a read of one item by key.
    pub fn get(&mut self, model: &Model, key: Item) -> Result<&mut Self> {
        let key = model.definition().key().project(&key)?;
        table_requests(&mut self.gets, model)?.push(key);
        Ok(self)
    }

    /// Queues a put; the model's creators run now.
    pub fn put(&mut self, model: &Model, item: Item) -> Result<&mut Self> {
        let request = PutItem {
            condition: None,
            item,
        }
        .build(model.definition())?;
        table_requests(&mut self.writes, model)?.push(BatchWrite::Put(request));
        Ok(self)
    }

    /// Queues a delete by key.
    pub fn delete(&mut self, model: &Model, key: Item) -> Result<&mut Self> {
        let request = DeleteItem {
            condition: None,
            key,
        }
        .build(model.definition())?;
        table_requests(&mut self.writes, model)?.push(BatchWrite::Delete(request));
        Ok(self)
    }

    fn get_input(&self) -> Result<Option<BatchGetItemInput>> {
        if self.gets.is_empty() {
            return Ok(None);
        }
        let mut request_items = collections::HashMap::with_capacity(self.gets.len());
        for (table_name, table) in &self.gets {
            let keys_and_attributes = types::KeysAndAttributes::builder()
                .set_keys(Some(table.requests.clone()))
                .build()?;
            request_items.insert(table_name.clone(), keys_and_attributes);
        }
        let input = BatchGetItemInput::builder()
            .set_request_items(Some(request_items))
            .return_consumed_capacity(types::ReturnConsumedCapacity::Total)
            .build()?;
        Ok(Some(input))
    }

    fn write_input(&self) -> Result<Option<BatchWriteItemInput>> {
        if self.writes.is_empty() {
            return Ok(None);
        }
        let mut request_items = collections::HashMap::with_capacity(self.writes.len());
        for (table_name, table) in &self.writes {
            let write_requests = table
                .requests
                .iter()
                .map(BatchWrite::write_request)
                .collect::<Result<Vec<_>>>()?;
            request_items.insert(table_name.clone(), write_requests);
        }
        let input = BatchWriteItemInput::builder()
            .set_request_items(Some(request_items))
            .return_consumed_capacity(types::ReturnConsumedCapacity::Total)
            .build()?;
        Ok(Some(input))
    }

    /// Sends every queued request once.
    ///
    /// Reads and writes the store reports as unprocessed replace the queue; everything else
    /// is settled. Triggers fire only for writes confirmed in this round. On error the queue
    /// is left untouched: when the writes fail after the reads succeeded, the fetched items
    /// are dropped and the reads are sent again on the next call.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.batch", skip_all, fields(batch = ?self.name), err)
    )]
    pub async fn execute(&mut self) -> Result<BatchOutput> {
        let mut output = BatchOutput::default();
        let get_input = self.get_input()?;
        let write_input = self.write_input()?;
        let mut pending_gets = IndexMap::new();
        let mut pending_writes = IndexMap::new();
        if let Some(input) = get_input {
            let get_output = self.client.store().batch_get_item(input).await?;
            self.client
                .record(CapacityKind::Read, get_output.consumed_capacity());
            let mut responses = get_output.responses.unwrap_or_default();
            let mut unprocessed = get_output.unprocessed_keys.unwrap_or_default();
            for (table_name, table) in &self.gets {
                let items = responses.remove(table_name).unwrap_or_default();
                let unprocessed_keys = unprocessed
                    .remove(table_name)
                    .map(|keys_and_attributes| keys_and_attributes.keys)
                    .unwrap_or_default();
                let returned = items
                    .iter()
                    .map(|item| table.definition.key().project(item))
                    .collect::<Result<Vec<_>>>()?;
                let mut settled = key_set(&returned)?;
                settled.extend(key_set(&unprocessed_keys)?);
                let missing = table
                    .requests
                    .iter()
                    .filter_map(|key| match token::canonical_key(key) {
                        Ok(canonical) if settled.contains(&canonical) => None,
                        Ok(_) => Some(Ok(key.clone())),
                        Err(err) => Some(Err(err)),
                    })
                    .collect::<Result<Vec<_>>>()?;
                if !missing.is_empty() {
                    output.missing.insert(table_name.clone(), missing);
                }
                let items = items
                    .into_iter()
                    .map(|item| table.definition.convert(item, None))
                    .collect();
                output.items.insert(table_name.clone(), items);
                if !unprocessed_keys.is_empty() {
                    pending_gets.insert(
                        table_name.clone(),
                        TableRequests {
                            definition: table.definition.clone(),
                            requests: unprocessed_keys,
                        },
                    );
                }
            }
            if let Some(table_name) = unprocessed.keys().next() {
                return Err(Error::InvalidRequest(format!(
                    "unprocessed keys for unrequested table `{table_name}`"
                )));
            }
        }
        if let Some(input) = write_input {
            let write_output = self.client.store().batch_write_item(input).await?;
            self.client
                .record(CapacityKind::Write, write_output.consumed_capacity());
            let mut unprocessed = write_output.unprocessed_items.unwrap_or_default();
            let mut confirmed = Vec::new();
            for (table_name, table) in &self.writes {
                let unprocessed_keys = unprocessed
                    .remove(table_name)
                    .unwrap_or_default()
                    .iter()
                    .map(|write_request| {
                        match (write_request.put_request(), write_request.delete_request()) {
                            (Some(put_request), None) => {
                                table.definition.key().project(put_request.item())
                            }
                            (None, Some(delete_request)) => Ok(delete_request.key().clone()),
                            _ => Err(Error::InvalidRequest(format!(
                                "unprocessed write for `{table_name}` is neither a put nor a delete"
                            ))),
                        }
                    })
                    .collect::<Result<Vec<_>>>()?;
                let unprocessed_keys = key_set(&unprocessed_keys)?;
                let mut requests = Vec::new();
                for request in &table.requests {
                    if unprocessed_keys.contains(&token::canonical_key(request.key())?) {
                        requests.push(request.clone());
                    } else {
                        confirmed.push((table.definition.clone(), request.clone()));
                    }
                }
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    table_name = %table_name,
                    unprocessed = requests.len(),
                    "batch write round finished"
                );
                if !requests.is_empty() {
                    pending_writes.insert(
                        table_name.clone(),
                        TableRequests {
                            definition: table.definition.clone(),
                            requests,
                        },
                    );
                }
            }
            if let Some(table_name) = unprocessed.keys().next() {
                return Err(Error::InvalidRequest(format!(
                    "unprocessed items for unrequested table `{table_name}`"
                )));
            }
            output.processed_writes = confirmed.len();
            for (definition, request) in confirmed {
                match request {
                    BatchWrite::Put(request) => {
                        let item = definition.convert(request.item, None);
                        definition.fire(Command::Put, request.key, Some(item));
                    }
                    BatchWrite::Delete(request) => {
                        definition.fire(Command::Delete, request.key, None);
                    }
                }
            }
            self.writes = pending_writes;
        }
        self.gets = pending_gets;
        output.done = self.is_done();
        Ok(output)
    }

    /// Executes round after round, pausing with randomized exponential backoff between
    /// rounds, until nothing is left. Yields every round's output.
    pub fn into_stream(
        self,
        backoff: BackoffConfig,
    ) -> impl Stream<Item = Result<BatchOutput>> + Send + 'static {
        stream::try_unfold((self, 0u32), move |(mut batch, round)| async move {
            if round > 0 && batch.is_done() {
                return Ok::<_, Error>(None);
            }
            if round > 0 {
                tokio::time::sleep(backoff.delay(round - 1)).await;
            }
            let output = batch.execute().await?;
            Ok(Some((output, (batch, round + 1))))
        })
    }
}
