//! mv-db: database access and persistence layer.
//!
//! SQLite-backed storage with connection pooling, embedded migrations,
//! typed models, query modules for files and orders, and the
//! [`SqliteRecordStore`] the conversion pipeline writes through.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
pub mod store;

pub use store::SqliteRecordStore;
