//! Embedded relational store for the catalog's entity graph.
//!
//! Backed by SQLite through `rusqlite`. See [`schema`] for table
//! definitions and migration, [`operations`] for writes, and
//! [`queries`] for reads.

pub mod operations;
pub mod queries;
pub mod schema;

pub use operations::OperationError;
pub use rusqlite::Connection;
pub use schema::{DATABASE_FILE_NAME, SchemaError, open_database, open_memory};
