use time::OffsetDateTime;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::{
    error::ServiceError,
    state::{SharedState, machine::RoomAction, room::RoomStatus},
};

/// Periodically resolve overdue rounds and evict idle room slots.
///
/// Timeout resolution goes through the normal per-room gate, so it
/// serializes with concurrent submits and can never resolve a round twice.
pub async fn run(state: SharedState) {
    let mut ticker = interval(state.config().sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        sweep_once(&state).await;
    }
}

pub(crate) async fn sweep_once(state: &SharedState) {
    let now = OffsetDateTime::now_utc();
    let store = state.room_store().await;

    for room_code in state.registry().room_codes() {
        let Some(room) = state.registry().peek(&room_code).await else {
            continue;
        };
        let overdue = room.status == RoomStatus::Playing
            && room
                .current_round
                .as_ref()
                .is_some_and(|round| now >= round.end_time);
        if !overdue {
            continue;
        }

        let outcome = state
            .registry()
            .apply(
                &room_code,
                RoomAction::ResolveTimeout,
                state.presence(),
                now,
                store.clone(),
                state.config().room_ttl,
            )
            .await;
        match outcome {
            Ok(room) => {
                info!(
                    room_code,
                    round = room.current_round_index,
                    "round resolved on timeout"
                );
            }
            // Lost the race against the last answer or another sweep pass.
            Err(ServiceError::Action(err)) => {
                debug!(room_code, error = %err, "timeout resolution skipped");
            }
            Err(err) => {
                warn!(room_code, error = %err, "timeout resolution failed");
            }
        }
    }

    state.registry().evict_idle(state.config().idle_eviction);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dto::room::{CreateRoomRequest, JoinRoomRequest, StartGameRequest},
        services::{game_service, room_service},
        state::AppState,
    };

    #[tokio::test]
    async fn sweep_resolves_overdue_round() {
        let mut config = AppConfig::default();
        config.default_settings.round_time_limit_seconds = 0;
        let state = AppState::new(config);

        let snapshot = room_service::create_room(
            &state,
            CreateRoomRequest {
                host_name: "alice".into(),
                questions: (1..=5).map(|i| format!("q{i}")).collect(),
            },
        )
        .await
        .expect("create");
        let code = snapshot.room_code;

        room_service::join_room(
            &state,
            &code,
            JoinRoomRequest {
                player_name: "bob".into(),
            },
        )
        .await
        .expect("join");
        game_service::start_game(
            &state,
            &code,
            StartGameRequest {
                player_name: "alice".into(),
            },
        )
        .await
        .expect("start");

        sweep_once(&state).await;

        let room = state.registry().peek(&code).await.expect("resident");
        assert_eq!(room.status, RoomStatus::RoundEnd);
        let round = room.current_round.expect("round");
        assert!(round.outcome.is_some());
        assert!(round.answers.is_empty());
    }

    #[tokio::test]
    async fn sweep_leaves_open_rounds_alone() {
        let state = AppState::new(AppConfig::default());

        let snapshot = room_service::create_room(
            &state,
            CreateRoomRequest {
                host_name: "alice".into(),
                questions: (1..=5).map(|i| format!("q{i}")).collect(),
            },
        )
        .await
        .expect("create");
        let code = snapshot.room_code;

        room_service::join_room(
            &state,
            &code,
            JoinRoomRequest {
                player_name: "bob".into(),
            },
        )
        .await
        .expect("join");
        game_service::start_game(
            &state,
            &code,
            StartGameRequest {
                player_name: "alice".into(),
            },
        )
        .await
        .expect("start");

        sweep_once(&state).await;

        let room = state.registry().peek(&code).await.expect("resident");
        assert_eq!(room.status, RoomStatus::Playing);
    }
}
