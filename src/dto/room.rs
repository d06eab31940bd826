//! Room action requests and snapshot responses.
//!
//! One explicit request type per inbound action, validated at the boundary
//! before anything reaches the action processor. Snapshots are the only
//! outbound room representation, shared by REST responses and SSE events.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::format_timestamp,
    state::{
        presence::PresencePolicy,
        room::{Player, Room, RoomSettings, RoomStatus, Round},
    },
};

/// Payload used to open a brand-new room.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    /// Display name of the creating player, who becomes host.
    #[validate(length(min = 1, max = 32, message = "Host name is required"))]
    pub host_name: String,
    /// Exactly five prompts for the game.
    #[validate(length(min = 5, max = 5, message = "Five questions are required"))]
    pub questions: Vec<String>,
}

/// Payload for joining (or reconnecting to) an existing room.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    /// Display name to join under; must be unique in the room.
    #[validate(length(min = 1, max = 32, message = "Player name is required"))]
    pub player_name: String,
}

/// Payload for the host-only start action.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartGameRequest {
    /// Name of the player attempting to start the game.
    #[validate(length(min = 1, max = 32, message = "Player name is required"))]
    pub player_name: String,
}

/// Payload carrying one player's answer for the open round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    /// Name of the answering player.
    #[validate(length(min = 1, max = 32, message = "Player name is required"))]
    pub player_name: String,
    /// Raw answer text; normalized server-side.
    #[validate(length(min = 1, max = 200, message = "Answer is required"))]
    pub answer: String,
}

/// Payload for the liveness keep-alive poll.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRequest {
    /// Name of the polling player.
    #[validate(length(min = 1, max = 32, message = "Player name is required"))]
    pub player_name: String,
}

/// Outbound view of a player, with connectivity derived at snapshot time.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    /// Stable player id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Whether this player created the room.
    pub is_host: bool,
    /// Current score.
    pub score: i32,
    /// Derived liveness flag.
    pub is_connected: bool,
    /// Most recent activity, RFC 3339.
    pub last_active: String,
}

/// Outbound view of the current round.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoundSnapshot {
    /// Prompt text.
    pub question: String,
    /// Normalized answers submitted so far, keyed by player id.
    pub answers: IndexMap<Uuid, String>,
    /// Advisory deadline, RFC 3339.
    pub end_time: String,
    /// Tied-for-largest representatives; present once resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub herd_answers: Option<Vec<String>>,
    /// Sole unique answer, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub black_sheep_answer: Option<String>,
    /// Equivalence groups for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_groups: Option<IndexMap<String, Vec<String>>>,
    /// Per-player answers at resolution time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_answers: Option<IndexMap<Uuid, String>>,
}

/// Outbound settings block.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSnapshot {
    /// Round deadline in seconds.
    pub round_time_limit_seconds: u32,
    /// Join cap.
    pub max_players: u32,
    /// Herd bonus.
    pub points_for_herd_answer: i32,
    /// Black-sheep penalty.
    pub points_lost_for_black_sheep: i32,
}

/// Full outbound view of a room, broadcast on every accepted mutation.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    /// Room code.
    pub room_code: String,
    /// Version of the room this snapshot was taken at.
    pub version: u64,
    /// Lifecycle status.
    pub status: RoomStatus,
    /// Players in join order.
    pub players: Vec<PlayerSnapshot>,
    /// Prompt list.
    pub questions: Vec<String>,
    /// `-1` before start, else index into `questions`.
    pub current_round_index: i32,
    /// Current round, when one is open or on display.
    pub current_round: Option<RoundSnapshot>,
    /// Creation timestamp, RFC 3339.
    pub started_at: String,
    /// Per-room settings.
    pub settings: SettingsSnapshot,
}

impl RoomSnapshot {
    /// Project a room into its outbound shape, deriving player connectivity
    /// from `presence` at `now`.
    pub fn project(room: &Room, presence: &PresencePolicy, now: OffsetDateTime) -> Self {
        Self {
            room_code: room.code.clone(),
            version: room.version,
            status: room.status,
            players: room
                .players
                .iter()
                .map(|player| PlayerSnapshot::project(player, presence, now))
                .collect(),
            questions: room.questions.clone(),
            current_round_index: room.current_round_index,
            current_round: room.current_round.as_ref().map(RoundSnapshot::project),
            started_at: format_timestamp(room.started_at),
            settings: SettingsSnapshot::from(&room.settings),
        }
    }
}

impl PlayerSnapshot {
    fn project(player: &Player, presence: &PresencePolicy, now: OffsetDateTime) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            is_host: player.is_host,
            score: player.score,
            is_connected: presence.is_connected(player.last_active, now),
            last_active: format_timestamp(player.last_active),
        }
    }
}

impl RoundSnapshot {
    fn project(round: &Round) -> Self {
        let outcome = round.outcome.as_ref();
        Self {
            question: round.question.clone(),
            answers: round.answers.clone(),
            end_time: format_timestamp(round.end_time),
            herd_answers: outcome.map(|o| o.herd_answers.clone()),
            black_sheep_answer: outcome.and_then(|o| o.black_sheep_answer.clone()),
            answer_groups: outcome.map(|o| o.answer_groups.clone()),
            original_answers: outcome.map(|o| o.original_answers.clone()),
        }
    }
}

impl From<&RoomSettings> for SettingsSnapshot {
    fn from(settings: &RoomSettings) -> Self {
        Self {
            round_time_limit_seconds: settings.round_time_limit_seconds,
            max_players: settings.max_players,
            points_for_herd_answer: settings.points_for_herd_answer,
            points_lost_for_black_sheep: settings.points_lost_for_black_sheep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{machine::create_room, room::QUESTIONS_PER_ROOM};

    #[test]
    fn snapshot_derives_connectivity_from_last_active() {
        let now = OffsetDateTime::now_utc();
        let mut room = create_room(
            "SNAP01".into(),
            "alice",
            (1..=QUESTIONS_PER_ROOM)
                .map(|i| format!("q{i}"))
                .collect(),
            RoomSettings::default(),
            now,
        )
        .expect("valid room");
        room.players[0].last_active = now - time::Duration::minutes(20);

        let snapshot = RoomSnapshot::project(&room, &PresencePolicy::default(), now);
        assert!(!snapshot.players[0].is_connected);
        assert!(snapshot.current_round.is_none());
        assert_eq!(snapshot.status, RoomStatus::Waiting);
    }

    #[test]
    fn create_request_validation() {
        let valid = CreateRoomRequest {
            host_name: "alice".into(),
            questions: (1..=5).map(|i| format!("q{i}")).collect(),
        };
        assert!(valid.validate().is_ok());

        let bad_count = CreateRoomRequest {
            host_name: "alice".into(),
            questions: vec!["q1".into()],
        };
        assert!(bad_count.validate().is_err());

        let empty_host = CreateRoomRequest {
            host_name: String::new(),
            questions: (1..=5).map(|i| format!("q{i}")).collect(),
        };
        assert!(empty_host.validate().is_err());
    }
}
