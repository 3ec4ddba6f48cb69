//! SQLite backend for the PolicyHub document register.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. The database file is
//! designed to live on a shared network path: WAL journaling plus a
//! bounded busy timeout serialize concurrent writers from independent
//! client processes.

mod encode;
mod error;
mod schema;
mod store;

pub use store::SqliteStore;
