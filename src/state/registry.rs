//! Authoritative in-memory room registry.
//!
//! Each room lives in a slot holding the current aggregate behind an
//! exclusive async gate plus a broadcast hub for its SSE stream. Every
//! mutation follows the same discipline: lock the gate, recover from storage
//! on a memory miss, apply the action to a scratch clone, commit and
//! broadcast while still holding the lock, then persist after release.
//! Broadcasting in-lock is what makes event versions monotonic per room.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use rand::Rng;
use time::OffsetDateTime;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, warn};

use crate::{
    dao::{models::RoomRecord, room_store::RoomStore},
    dto::{
        room::RoomSnapshot,
        sse::{ROOM_UPDATE_EVENT, ServerEvent},
    },
    error::ServiceError,
    state::{
        machine::{self, ActionError, RoomAction},
        presence::PresencePolicy,
        room::{Room, RoomSettings},
    },
};

/// Length of generated room codes.
pub const ROOM_CODE_LENGTH: usize = 6;
/// Code alphabet; `0/O/1/I` left out so codes survive being read aloud.
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
/// Collision retries before giving up on code allocation.
const CODE_ATTEMPTS: usize = 16;
/// Buffered events per room hub before slow subscribers start lagging.
const HUB_CAPACITY: usize = 32;

struct RoomCell {
    room: Option<Room>,
    touched: Instant,
}

struct RoomSlot {
    cell: Mutex<RoomCell>,
    hub: broadcast::Sender<ServerEvent>,
}

impl RoomSlot {
    fn new() -> Arc<Self> {
        let (hub, _) = broadcast::channel(HUB_CAPACITY);
        Arc::new(Self {
            cell: Mutex::new(RoomCell {
                room: None,
                touched: Instant::now(),
            }),
            hub,
        })
    }

    /// Serialize the committed room and fan it out. Send errors only mean
    /// nobody is listening right now.
    fn publish(&self, room: &Room, presence: &PresencePolicy, now: OffsetDateTime) {
        let snapshot = RoomSnapshot::project(room, presence, now);
        match ServerEvent::json(Some(ROOM_UPDATE_EVENT.to_string()), &snapshot) {
            Ok(event) => {
                let _ = self.hub.send(event);
            }
            Err(err) => {
                warn!(room_code = %room.code, error = %err, "failed to serialize room event");
            }
        }
    }
}

/// Registry of live rooms keyed by room code.
pub struct RoomRegistry {
    slots: DashMap<String, Arc<RoomSlot>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    fn slot(&self, room_code: &str) -> Arc<RoomSlot> {
        self.slots
            .entry(room_code.to_string())
            .or_insert_with(RoomSlot::new)
            .clone()
    }

    /// Subscribe to a room's event stream. Subscribing to a room that does
    /// not exist yet creates an empty slot, which the sweeper reclaims once
    /// the last receiver is dropped.
    pub fn subscribe(&self, room_code: &str) -> broadcast::Receiver<ServerEvent> {
        self.slot(room_code).hub.subscribe()
    }

    /// Codes of every room currently resident in memory.
    pub fn room_codes(&self) -> Vec<String> {
        self.slots.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Clone the in-memory room, if resident. Never touches storage.
    pub async fn peek(&self, room_code: &str) -> Option<Room> {
        let slot = {
            let entry = self.slots.get(room_code)?;
            entry.value().clone()
        };
        let cell = slot.cell.lock().await;
        cell.room.clone()
    }

    /// Allocate a fresh code and install a new room under it.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        host_name: &str,
        questions: Vec<String>,
        settings: RoomSettings,
        presence: &PresencePolicy,
        now: OffsetDateTime,
        store: Option<Arc<dyn RoomStore>>,
        ttl: Duration,
    ) -> Result<Room, ServiceError> {
        for _ in 0..CODE_ATTEMPTS {
            let code = random_code();
            let slot = self.slot(&code);
            let mut cell = slot.cell.lock().await;
            cell.touched = Instant::now();

            if cell.room.is_some() {
                continue;
            }
            // A persisted room may exist without being resident; treat it as
            // a collision. When storage is down the odds of a real collision
            // are small enough to proceed.
            if let Some(store) = store.as_ref() {
                match store.get(code.clone()).await {
                    Ok(Some(_)) => continue,
                    Ok(None) => {}
                    Err(err) => {
                        warn!(room_code = %code, error = %err, "collision check skipped");
                    }
                }
            }

            let room = machine::create_room(code, host_name, questions, settings, now)?;
            cell.room = Some(room.clone());
            slot.publish(&room, presence, now);
            drop(cell);

            spawn_persist(store, &room, ttl);
            return Ok(room);
        }

        Err(ServiceError::CodeExhausted)
    }

    /// Apply one action to a room, serialized on the room's gate.
    ///
    /// Returns the committed room on success. Failed actions leave the
    /// resident state untouched and broadcast nothing.
    pub async fn apply(
        &self,
        room_code: &str,
        action: RoomAction,
        presence: &PresencePolicy,
        now: OffsetDateTime,
        store: Option<Arc<dyn RoomStore>>,
        ttl: Duration,
    ) -> Result<Room, ServiceError> {
        let slot = self.slot(room_code);
        let mut cell = slot.cell.lock().await;
        cell.touched = Instant::now();

        recover_if_missing(&mut cell, room_code, store.as_ref()).await?;
        let Some(current) = cell.room.as_ref() else {
            return Err(ActionError::NotFound("Room not found".into()).into());
        };

        let mut scratch = current.clone();
        machine::apply_action(&mut scratch, action, presence, now)?;

        cell.room = Some(scratch.clone());
        slot.publish(&scratch, presence, now);
        drop(cell);

        spawn_persist(store, &scratch, ttl);
        Ok(scratch)
    }

    /// Read the current room without mutating it, recovering from storage on
    /// a memory miss.
    pub async fn fetch(
        &self,
        room_code: &str,
        store: Option<Arc<dyn RoomStore>>,
    ) -> Result<Room, ServiceError> {
        let slot = self.slot(room_code);
        let mut cell = slot.cell.lock().await;
        cell.touched = Instant::now();

        recover_if_missing(&mut cell, room_code, store.as_ref()).await?;
        cell.room
            .clone()
            .ok_or_else(|| ActionError::NotFound("Room not found".into()).into())
    }

    /// Drop slots nobody is using: empty placeholders with no subscribers,
    /// and resident rooms idle past `idle` with no subscribers. Evicted rooms
    /// remain recoverable from storage until their TTL lapses.
    pub fn evict_idle(&self, idle: Duration) {
        let codes = self.room_codes();
        for code in codes {
            self.slots.remove_if(&code, |_, slot| {
                if slot.hub.receiver_count() > 0 {
                    return false;
                }
                // A held gate means the slot is mid-operation; skip it.
                match slot.cell.try_lock() {
                    Ok(cell) => match &cell.room {
                        None => true,
                        Some(_) => cell.touched.elapsed() >= idle,
                    },
                    Err(_) => false,
                }
            });
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn recover_if_missing(
    cell: &mut RoomCell,
    room_code: &str,
    store: Option<&Arc<dyn RoomStore>>,
) -> Result<(), ServiceError> {
    if cell.room.is_some() {
        return Ok(());
    }
    let Some(store) = store else {
        return Ok(());
    };

    match store.get(room_code.to_string()).await {
        Ok(Some(record)) => {
            debug!(room_code, "recovered room from storage");
            cell.room = Some(Room::from(record));
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => {
            warn!(room_code, error = %err, "room recovery failed");
            Err(err.into())
        }
    }
}

fn spawn_persist(store: Option<Arc<dyn RoomStore>>, room: &Room, ttl: Duration) {
    let Some(store) = store else {
        debug!(room_code = %room.code, "no storage installed; room kept in memory only");
        return;
    };

    let record = RoomRecord::from(room.clone());
    let room_code = room.code.clone();
    tokio::spawn(async move {
        if let Err(err) = store.put(record, ttl).await {
            warn!(room_code, error = %err, "failed to persist room");
        }
    });
}

fn random_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..ROOM_CODE_ALPHABET.len());
            ROOM_CODE_ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::Mutex as StdMutex,
        sync::atomic::{AtomicBool, Ordering},
    };

    use futures::future::BoxFuture;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::{
        dao::storage::{StorageError, StorageResult},
        state::room::RoomStatus,
    };

    #[derive(Default)]
    struct MemoryStore {
        rooms: StdMutex<HashMap<String, RoomRecord>>,
        fail: AtomicBool,
    }

    impl MemoryStore {
        fn insert(&self, record: RoomRecord) {
            self.rooms
                .lock()
                .expect("store lock")
                .insert(record.room_code.clone(), record);
        }
    }

    impl RoomStore for MemoryStore {
        fn get(&self, room_code: String) -> BoxFuture<'static, StorageResult<Option<RoomRecord>>> {
            if self.fail.load(Ordering::SeqCst) {
                return Box::pin(async { Err(StorageError::unavailable(
                        "store offline".into(),
                        std::io::Error::other("connection refused"),
                    )) });
            }
            let found = self.rooms.lock().expect("store lock").get(&room_code).cloned();
            Box::pin(async move { Ok(found) })
        }

        fn put(&self, record: RoomRecord, _ttl: Duration) -> BoxFuture<'static, StorageResult<()>> {
            if self.fail.load(Ordering::SeqCst) {
                return Box::pin(async { Err(StorageError::unavailable(
                        "store offline".into(),
                        std::io::Error::other("connection refused"),
                    )) });
            }
            self.insert(record);
            Box::pin(async { Ok(()) })
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn questions() -> Vec<String> {
        (1..=5).map(|i| format!("q{i}")).collect()
    }

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn create_then_join_bumps_version() {
        let registry = RoomRegistry::new();
        let presence = PresencePolicy::default();
        let now = OffsetDateTime::now_utc();

        let room = registry
            .create(
                "alice",
                questions(),
                RoomSettings::default(),
                &presence,
                now,
                None,
                TTL,
            )
            .await
            .expect("create");
        assert_eq!(room.version, 1);
        assert_eq!(room.code.len(), ROOM_CODE_LENGTH);

        let room = registry
            .apply(
                &room.code,
                RoomAction::Join {
                    player_name: "bob".into(),
                },
                &presence,
                now,
                None,
                TTL,
            )
            .await
            .expect("join");
        assert_eq!(room.version, 2);
        assert_eq!(room.players.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_submits_both_land_and_round_ends_once() {
        let registry = Arc::new(RoomRegistry::new());
        let presence = PresencePolicy::default();
        let now = OffsetDateTime::now_utc();

        let room = registry
            .create(
                "alice",
                questions(),
                RoomSettings::default(),
                &presence,
                now,
                None,
                TTL,
            )
            .await
            .expect("create");
        let code = room.code.clone();

        registry
            .apply(
                &code,
                RoomAction::Join {
                    player_name: "bob".into(),
                },
                &presence,
                now,
                None,
                TTL,
            )
            .await
            .expect("join");
        registry
            .apply(
                &code,
                RoomAction::Start {
                    player_name: "alice".into(),
                },
                &presence,
                now,
                None,
                TTL,
            )
            .await
            .expect("start");

        let mut handles = Vec::new();
        for (name, answer) in [("alice", "red"), ("bob", "blue")] {
            let registry = Arc::clone(&registry);
            let code = code.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .apply(
                        &code,
                        RoomAction::SubmitAnswer {
                            player_name: name.into(),
                            answer: answer.into(),
                        },
                        &PresencePolicy::default(),
                        OffsetDateTime::now_utc(),
                        None,
                        TTL,
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.expect("task").expect("submit");
        }

        let room = registry.peek(&code).await.expect("resident");
        assert_eq!(room.status, RoomStatus::RoundEnd);
        let round = room.current_round.expect("round");
        assert_eq!(round.answers.len(), 2);
        assert!(round.outcome.is_some());
    }

    #[tokio::test]
    async fn memory_miss_recovers_from_store() {
        let presence = PresencePolicy::default();
        let now = OffsetDateTime::now_utc();
        let store = Arc::new(MemoryStore::default());

        let seeded = machine::create_room(
            "SEED42".into(),
            "alice",
            questions(),
            RoomSettings::default(),
            now,
        )
        .expect("seed room");
        store.insert(RoomRecord::from(seeded));

        let registry = RoomRegistry::new();
        let store: Arc<dyn RoomStore> = store;
        let room = registry
            .apply(
                "SEED42",
                RoomAction::Join {
                    player_name: "bob".into(),
                },
                &presence,
                now,
                Some(Arc::clone(&store)),
                TTL,
            )
            .await
            .expect("recovered join");
        assert_eq!(room.players.len(), 2);
        assert_eq!(room.version, 2);
    }

    #[tokio::test]
    async fn recovery_failure_surfaces_unavailable() {
        let presence = PresencePolicy::default();
        let now = OffsetDateTime::now_utc();
        let store = Arc::new(MemoryStore::default());
        store.fail.store(true, Ordering::SeqCst);
        let store: Arc<dyn RoomStore> = store;

        let registry = RoomRegistry::new();
        let err = registry
            .fetch("GHOST1", Some(store))
            .await
            .expect_err("store offline");
        assert!(matches!(err, ServiceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn missing_room_without_store_is_not_found() {
        let registry = RoomRegistry::new();
        let err = registry.fetch("NOPE99", None).await.expect_err("missing");
        assert!(matches!(
            err,
            ServiceError::Action(ActionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn broadcast_versions_are_monotonic() {
        let registry = RoomRegistry::new();
        let presence = PresencePolicy::default();
        let now = OffsetDateTime::now_utc();

        let room = registry
            .create(
                "alice",
                questions(),
                RoomSettings::default(),
                &presence,
                now,
                None,
                TTL,
            )
            .await
            .expect("create");
        let mut rx = registry.subscribe(&room.code);

        for name in ["bob", "carol"] {
            registry
                .apply(
                    &room.code,
                    RoomAction::Join {
                        player_name: name.into(),
                    },
                    &presence,
                    now,
                    None,
                    TTL,
                )
                .await
                .expect("join");
        }

        let mut last = 0u64;
        for _ in 0..2 {
            let event = rx.recv().await.expect("event");
            assert_eq!(event.event.as_deref(), Some(ROOM_UPDATE_EVENT));
            let body: serde_json::Value = serde_json::from_str(&event.data).expect("json");
            let version = body["version"].as_u64().expect("version");
            assert!(version > last);
            last = version;
        }
    }

    #[tokio::test]
    async fn rejected_action_broadcasts_nothing() {
        let registry = RoomRegistry::new();
        let presence = PresencePolicy::default();
        let now = OffsetDateTime::now_utc();

        let room = registry
            .create(
                "alice",
                questions(),
                RoomSettings::default(),
                &presence,
                now,
                None,
                TTL,
            )
            .await
            .expect("create");
        let mut rx = registry.subscribe(&room.code);

        let err = registry
            .apply(
                &room.code,
                RoomAction::Start {
                    player_name: "mallory".into(),
                },
                &presence,
                now,
                None,
                TTL,
            )
            .await
            .expect_err("unknown player");
        assert!(matches!(err, ServiceError::Action(_)));

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        let resident = registry.peek(&room.code).await.expect("resident");
        assert_eq!(resident.version, 1);
    }

    #[tokio::test]
    async fn idle_slots_are_evicted_but_subscribed_ones_stay() {
        let registry = RoomRegistry::new();
        let presence = PresencePolicy::default();
        let now = OffsetDateTime::now_utc();

        let room = registry
            .create(
                "alice",
                questions(),
                RoomSettings::default(),
                &presence,
                now,
                None,
                TTL,
            )
            .await
            .expect("create");

        let _rx = registry.subscribe(&room.code);
        registry.evict_idle(Duration::ZERO);
        assert!(registry.peek(&room.code).await.is_some());

        drop(_rx);
        registry.evict_idle(Duration::ZERO);
        assert!(registry.peek(&room.code).await.is_none());
    }
}
