use aws_sdk_dynamodb::types;
use std::{collections, sync};

/// Consumed capacity accumulated for one table.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TableMetrics {
    /// Read capacity units.
    pub read: f64,
    /// Write capacity units.
    pub write: f64,
    /// Combined capacity units.
    pub total: f64,
}

/// Whether an operation spends read or write capacity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum CapacityKind {
    Read,
    Write,
}

/// Per-table accumulator shared by every operation issued through one client.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    tables: sync::Mutex<collections::HashMap<String, TableMetrics>>,
}

impl Metrics {
    /// Adds the reported capacity. When the store only reports the combined figure it is
    /// attributed to `kind`.
    pub(crate) fn record<'a>(
        &self,
        kind: CapacityKind,
        capacities: impl IntoIterator<Item = &'a types::ConsumedCapacity>,
    ) {
        let mut tables = self
            .tables
            .lock()
            .unwrap_or_else(sync::PoisonError::into_inner);
        for capacity in capacities {
            let Some(table_name) = capacity.table_name() else {
                continue;
            };
            let total = capacity.capacity_units().unwrap_or(0.0);
            let metrics = tables.entry(table_name.to_string()).or_default();
            metrics.total += total;
            match kind {
                CapacityKind::Read => {
                    metrics.read += capacity.read_capacity_units().unwrap_or(total);
                    metrics.write += capacity.write_capacity_units().unwrap_or(0.0);
                }
                CapacityKind::Write => {
                    metrics.read += capacity.read_capacity_units().unwrap_or(0.0);
                    metrics.write += capacity.write_capacity_units().unwrap_or(total);
                }
            }
        }
    }

    pub(crate) fn snapshot(&self) -> collections::HashMap<String, TableMetrics> {
        self.tables
            .lock()
            .unwrap_or_else(sync::PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn clear(&self) {
        self.tables
            .lock()
            .unwrap_or_else(sync::PoisonError::into_inner)
            .clear();
    }
}
