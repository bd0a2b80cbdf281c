//! Write request factory.
//!
//! Turns a model definition plus write parameters into store requests, running the model's
//! creators and updaters on the way:
//! - Putting new items or replacing existing ones
//! - Updating items with attribute actions
//! - Deleting items by primary key
//! - Checking conditions inside transactions

/// Common utilities and types for write operations.
pub(crate) mod common;

/// Condition check for write transactions.
pub mod condition_check;

/// Delete item operation for removing items from tables.
pub mod delete_item;

/// Put item operation for creating or replacing items.
pub mod put_item;

/// Update item operation for modifying existing items.
pub mod update_item;
