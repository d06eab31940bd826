//! Room persistence on MongoDB with TTL-driven expiry.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{self, doc},
    options::IndexOptions,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
};
use crate::dao::{models::RoomRecord, room_store::RoomStore, storage::StorageResult};

const ROOM_COLLECTION_NAME: &str = "rooms";

/// Stored document: the room record plus its expiry marker.
///
/// A TTL index on `expires_at` makes MongoDB reap stale rooms; every `put`
/// pushes the marker forward, giving the sliding-expiry behavior.
#[derive(Debug, Serialize, Deserialize)]
struct MongoRoomDocument {
    #[serde(rename = "_id")]
    room_code: String,
    expires_at: bson::DateTime,
    room: RoomRecord,
}

/// MongoDB-backed room store. Cheap to clone; connection state is shared.
#[derive(Clone)]
pub struct MongoRoomStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoRoomStore {
    /// Establish a connection to MongoDB and ensure the TTL index is present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.collection().await;
        let index = IndexModel::builder()
            .keys(doc! {"expires_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("room_ttl_idx".to_owned()))
                    .expire_after(Some(Duration::ZERO))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ROOM_COLLECTION_NAME,
                index: "expires_at",
                source,
            })?;

        Ok(())
    }

    async fn collection(&self) -> Collection<MongoRoomDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoRoomDocument>(ROOM_COLLECTION_NAME)
    }

    async fn find_room(&self, room_code: String) -> MongoResult<Option<RoomRecord>> {
        let collection = self.collection().await;
        let document = collection
            .find_one(doc! {"_id": &room_code})
            .await
            .map_err(|source| MongoDaoError::LoadRoom { room_code, source })?;

        // The TTL reaper only runs periodically; treat overdue docs as gone.
        Ok(document
            .filter(|doc| doc.expires_at.to_system_time() > std::time::SystemTime::now())
            .map(|doc| doc.room))
    }

    async fn save_room(&self, record: RoomRecord, ttl: Duration) -> MongoResult<()> {
        let room_code = record.room_code.clone();
        let document = MongoRoomDocument {
            room_code: room_code.clone(),
            expires_at: bson::DateTime::from_system_time(std::time::SystemTime::now() + ttl),
            room: record,
        };

        let collection = self.collection().await;
        collection
            .replace_one(doc! {"_id": &room_code}, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveRoom { room_code, source })?;

        Ok(())
    }
}

impl RoomStore for MongoRoomStore {
    fn get(&self, room_code: String) -> BoxFuture<'static, StorageResult<Option<RoomRecord>>> {
        let store = self.clone();
        Box::pin(async move { store.find_room(room_code).await.map_err(Into::into) })
    }

    fn put(&self, record: RoomRecord, ttl: Duration) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_room(record, ttl).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
