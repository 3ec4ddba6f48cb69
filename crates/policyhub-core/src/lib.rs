//! Core types and trait definitions for the PolicyHub document register.
//!
//! This crate is deliberately free of database and I/O dependencies.
//! All other crates depend on it; it depends on nothing heavier than
//! chrono, serde, and uuid.

pub mod access;
pub mod category;
pub mod clock;
pub mod document;
pub mod error;
pub mod history;
pub mod refcode;
pub mod schedule;
pub mod store;

pub use error::{Error, Result};
