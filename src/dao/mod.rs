//! Persistence layer: record models, the abstract room store, and backends.

pub mod models;
pub mod room_store;
pub mod storage;
