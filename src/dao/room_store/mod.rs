//! Abstract persistence contract for room records.

#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::Duration;

use futures::future::BoxFuture;

use crate::dao::{models::RoomRecord, storage::StorageResult};

/// Abstraction over the persistence layer for room records.
///
/// Records expire `ttl` after their most recent `put` (sliding expiry); the
/// registry treats a recovered record as the latest durable truth.
pub trait RoomStore: Send + Sync {
    /// Fetch the record stored under `room_code`, if any.
    fn get(&self, room_code: String) -> BoxFuture<'static, StorageResult<Option<RoomRecord>>>;
    /// Upsert a record, refreshing its expiry to `ttl` from now.
    fn put(&self, record: RoomRecord, ttl: Duration) -> BoxFuture<'static, StorageResult<()>>;
    /// Cheap connectivity probe used by the supervisor and health endpoint.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
