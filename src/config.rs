//! Application-level configuration loading for room defaults and timers.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::room::RoomSettings;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "HERD_BACK_CONFIG_PATH";

/// Players are shown as disconnected after this long without activity.
const DEFAULT_ACTIVITY_THRESHOLD_SECONDS: u64 = 600;
/// Persisted rooms expire this long after their last accepted mutation.
const DEFAULT_ROOM_TTL_SECONDS: u64 = 86_400;
/// How often the sweeper scans rooms for overdue rounds and idle slots.
const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 1;
/// In-memory room slots untouched for this long are evicted to storage.
const DEFAULT_IDLE_EVICTION_SECONDS: u64 = 3_600;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Settings applied to newly created rooms.
    pub default_settings: RoomSettings,
    /// Inactivity window after which a player counts as disconnected.
    pub activity_threshold: Duration,
    /// Sliding time-to-live applied on every persisted write.
    pub room_ttl: Duration,
    /// Interval between sweeper passes.
    pub sweep_interval: Duration,
    /// Idle window after which an in-memory room slot is dropped.
    pub idle_eviction: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration from file");
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_settings: RoomSettings::default(),
            activity_threshold: Duration::from_secs(DEFAULT_ACTIVITY_THRESHOLD_SECONDS),
            room_ttl: Duration::from_secs(DEFAULT_ROOM_TTL_SECONDS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECONDS),
            idle_eviction: Duration::from_secs(DEFAULT_IDLE_EVICTION_SECONDS),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    round_time_limit_seconds: Option<u32>,
    max_players: Option<u32>,
    points_for_herd_answer: Option<i32>,
    points_lost_for_black_sheep: Option<i32>,
    activity_threshold_seconds: Option<u64>,
    room_ttl_seconds: Option<u64>,
    sweep_interval_seconds: Option<u64>,
    idle_eviction_seconds: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        let base_settings = defaults.default_settings.clone();
        Self {
            default_settings: RoomSettings {
                round_time_limit_seconds: value
                    .round_time_limit_seconds
                    .unwrap_or(base_settings.round_time_limit_seconds),
                max_players: value.max_players.unwrap_or(base_settings.max_players),
                points_for_herd_answer: value
                    .points_for_herd_answer
                    .unwrap_or(base_settings.points_for_herd_answer),
                points_lost_for_black_sheep: value
                    .points_lost_for_black_sheep
                    .unwrap_or(base_settings.points_lost_for_black_sheep),
            },
            activity_threshold: value
                .activity_threshold_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.activity_threshold),
            room_ttl: value
                .room_ttl_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.room_ttl),
            sweep_interval: value
                .sweep_interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            idle_eviction: value
                .idle_eviction_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_eviction),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_raw_config_keeps_defaults_for_missing_fields() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"maxPlayers": 12, "roomTtlSeconds": 3600}"#).expect("json");
        let config = AppConfig::from(raw);

        assert_eq!(config.default_settings.max_players, 12);
        assert_eq!(config.room_ttl, Duration::from_secs(3600));
        assert_eq!(
            config.default_settings.round_time_limit_seconds,
            RoomSettings::default().round_time_limit_seconds
        );
        assert_eq!(
            config.activity_threshold,
            Duration::from_secs(DEFAULT_ACTIVITY_THRESHOLD_SECONDS)
        );
    }
}
