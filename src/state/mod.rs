pub mod machine;
pub mod presence;
pub mod registry;
pub mod room;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{config::AppConfig, dao::room_store::RoomStore};

use self::{presence::PresencePolicy, registry::RoomRegistry};

pub type SharedState = Arc<AppState>;

/// Central application state: the live room registry, the installable
/// storage backend, and the degraded-mode flag.
pub struct AppState {
    room_store: RwLock<Option<Arc<dyn RoomStore>>>,
    registry: RoomRegistry,
    config: AppConfig,
    presence: PresencePolicy,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let presence = PresencePolicy::new(config.activity_threshold);
        Arc::new(Self {
            room_store: RwLock::new(None),
            registry: RoomRegistry::new(),
            config,
            presence,
            degraded: degraded_tx,
        })
    }

    /// Obtain a handle to the current room store, if one is installed.
    pub async fn room_store(&self) -> Option<Arc<dyn RoomStore>> {
        let guard = self.room_store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a new room store implementation and leave degraded mode.
    pub async fn install_room_store(&self, store: Arc<dyn RoomStore>) {
        {
            let mut guard = self.room_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current room store and enter degraded mode.
    pub async fn clear_room_store(&self) {
        {
            let mut guard = self.room_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// The live room registry.
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Liveness policy shared by snapshots and the action processor.
    pub fn presence(&self) -> &PresencePolicy {
        &self.presence
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        if self.is_degraded() == value {
            return;
        }

        let _ = self.degraded.send(value);
    }
}
