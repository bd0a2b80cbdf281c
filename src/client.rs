use crate::{
    batch::Batch,
    metrics::{CapacityKind, Metrics, TableMetrics},
    model::builder::ModelBuilder,
    store::Store,
    transaction::{TransactGet, TransactWrite},
};

use aws_sdk_dynamodb::types;
use std::{collections, fmt, sync};

/// Entry point: owns the store connection and the table metrics every model built from it
/// reports into.
///
/// Cloning is cheap and clones share the store and the metrics.
#[derive(Clone)]
pub struct Client {
    metrics: sync::Arc<Metrics>,
    store: sync::Arc<dyn Store>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Wraps a store, typically an `aws_sdk_dynamodb::Client`.
    pub fn new(store: impl Store + 'static) -> Self {
        Self::from_store(sync::Arc::new(store))
    }

    /// Wraps an already shared store.
    pub fn from_store(store: sync::Arc<dyn Store>) -> Self {
        Self {
            metrics: sync::Arc::default(),
            store,
        }
    }

    /// Starts a model builder bound to this client. The table name defaults to `name`.
    pub fn model(&self, name: impl Into<String>, table_name: Option<String>) -> ModelBuilder {
        let builder = ModelBuilder::new().with_client(self.clone()).with_name(name);
        match table_name {
            Some(table_name) => builder.with_table_name(table_name),
            None => builder,
        }
    }

    /// Starts a write transaction.
    pub fn transaction(&self, name: Option<String>) -> TransactWrite {
        TransactWrite::new(self.clone(), name)
    }

    /// Starts a read transaction.
    pub fn transaction_get(&self, name: Option<String>) -> TransactGet {
        TransactGet::new(self.clone(), name)
    }

    /// Starts a batch.
    pub fn batch(&self, name: Option<String>) -> Batch {
        Batch::new(self.clone(), name)
    }

    /// Capacity consumed so far, per table name.
    pub fn table_metrics(&self) -> collections::HashMap<String, TableMetrics> {
        self.metrics.snapshot()
    }

    /// Resets every table's metrics.
    pub fn clear_table_metrics(&self) {
        self.metrics.clear();
    }

    pub(crate) fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub(crate) fn record<'a>(
        &self,
        kind: CapacityKind,
        capacities: impl IntoIterator<Item = &'a types::ConsumedCapacity>,
    ) {
        self.metrics.record(kind, capacities);
    }
}
