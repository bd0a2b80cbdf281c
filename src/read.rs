//! Read request factory.
//!
//! Turns a model definition plus read parameters into store requests:
//! - Getting individual items by primary key
//! - Querying a table or index with key conditions
//! - Scanning a table or index

/// Common utilities and types for read operations.
pub mod common;

/// Get item operation for retrieving a single item by primary key.
pub mod get_item;

/// Query operation for retrieving items with key conditions.
pub mod query;

/// Scan operation for retrieving all items from a table or index.
pub mod scan;
