#![forbid(unsafe_code)]

//! Command-line support for the `hopscan` binary.
//!
//! Loads a graph and its vertex rows from CSV files into an in-memory store
//! and renders traversal output as JSON.

/// CSV import into a [`MemoryStore`](crate::storage::MemoryStore) and JSON export of result rows.
pub mod import_export;
