//! SQLite persistence for the wadkeeper library.
//!
//! Provides schema creation, CRUD operations on every table, and
//! [`SqliteStore`], the [`wadkeeper_core::MetadataStore`] the launcher uses
//! outside of tests.

pub mod operations;
pub mod schema;
pub mod store;

pub use operations::OperationError;
pub use schema::{SchemaError, open_database, open_memory};
pub use store::SqliteStore;
