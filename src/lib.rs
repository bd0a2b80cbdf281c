#![deny(missing_docs)]

//! # DynamoDB Model
//!
//! A typed data-modeling layer over Amazon DynamoDB.
//!
//! ## Overview
//!
//! A [`Model`] binds a table's key schema, secondary indices and item pipeline:
//! - creators produce base attributes for every put
//! - updaters produce base attributes for every update
//! - converters rewrite every item read back, given the requested projection
//! - triggers run once the store confirms a write
//!
//! On top of single-item operations the crate offers paginated scans and queries with opaque
//! page tokens, a read-modify-write helper with optimistic concurrency control
//! ([`Model::atomic_action`]), multi-table [`Batch`]es that keep whatever the store leaves
//! unprocessed, and all-or-nothing transactions ([`TransactWrite`], [`TransactGet`]).
//! Consumed capacity is accumulated per table on the [`Client`].
//!
//! ## Quick Example
//!
//! ```no_run
//! use aws_sdk_dynamodb::types::AttributeValue;
//! use dynamodb_model::{Client, Item, common, config, read, write};
//!
//! # async fn example() -> dynamodb_model::Result<()> {
//! let client = Client::new(config::load_store(&config::StoreConfig::default()).await);
//! let users = client
//!     .model("user", Some("users".to_string()))
//!     .with_key(common::key::KeySchema::hash("id"))
//!     .with_creator(|_: &Item| {
//!         Item::from([("status".to_string(), AttributeValue::S("new".to_string()))])
//!     })
//!     .build(Default::default())?;
//!
//! let key = Item::from([("id".to_string(), AttributeValue::S("1".to_string()))]);
//! users
//!     .put(write::put_item::PutItem {
//!         condition: Some(common::condition::ConditionMap::single(
//!             "id",
//!             common::condition::Condition::Null,
//!         )),
//!         item: key.clone(),
//!     })
//!     .await?;
//! let user = users
//!     .get(read::get_item::GetItem {
//!         key,
//!         ..Default::default()
//!     })
//!     .await?;
//! assert!(user.is_some());
//! println!("{:?}", client.table_metrics());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mod@common`] - Keys, conditions, update attributes and page tokens
//! - [`mod@read`] - Get, scan and query parameters
//! - [`mod@write`] - Put, update, delete and condition check parameters
//! - [`mod@model`] - Models and their builder
//! - [`mod@batch`] - Bulk reads and writes
//! - [`mod@transaction`] - Transactional reads and writes

pub mod batch;

mod client;

/// Common utilities for keys, conditions, update attributes and page tokens.
pub mod common;

pub mod config;

/// Error taxonomy shared by every operation.
pub mod error;

mod metrics;

pub mod model;

pub mod pipeline;

/// Read operation parameters.
///
/// This module provides parameters for:
/// - Getting individual items by key
/// - Querying items with key conditions
/// - Scanning entire tables or indices
pub mod read;

pub mod store;

pub mod transaction;

/// Write operation parameters.
///
/// This module provides parameters for:
/// - Putting new items or replacing existing ones
/// - Updating items with set, add, delete and remove actions
/// - Deleting items by key
/// - Checking conditions inside transactions
pub mod write;

#[cfg(test)]
mod testing;

pub use batch::{Batch, BatchOutput};
pub use client::Client;
pub use common::{Item, token::PageToken};
pub use error::{Error, Result};
pub use metrics::TableMetrics;
pub use model::{
    AtomicAction, AtomicContext, Model, ModelDefinition,
    builder::{BuildOptions, ModelBuilder},
};
pub use read::common::Page;
pub use store::Store;
pub use transaction::{TransactGet, TransactWrite};
