//! Data access layer: the parameterized execution facade and schema.
//!
//! Layout:
//! - `row.rs`: generic row/value types moved by the store
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `datastore.rs`: the facade itself plus transaction scoping

pub mod datastore;
pub mod row;
pub mod schema;

pub use datastore::{DataStore, SqlitePool, Tx};
pub use row::{Row, Value};
pub use schema::SQLITE_INIT;
