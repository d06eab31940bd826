//! Persisted record types for the room aggregate.
//!
//! Records mirror the room's wire shape (camelCase keys, unix-millisecond
//! timestamps) and must round-trip the aggregate exactly, including the
//! nested answers map and a null round outside PLAYING/ROUND_END.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::state::room::RoomStatus;

/// Aggregate room record persisted by the storage layer, keyed by room code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    /// Room code, also the storage key.
    pub room_code: String,
    /// Version counter, incremented on every accepted mutation.
    pub version: u64,
    /// Lifecycle status.
    pub status: RoomStatus,
    /// Creation timestamp (unix milliseconds).
    pub started_at: i64,
    /// Players in join order.
    pub players: Vec<PlayerRecord>,
    /// Prompt list, fixed at creation.
    pub questions: Vec<String>,
    /// `-1` before start, else index into `questions`.
    pub current_round_index: i32,
    /// Current round, null outside PLAYING/ROUND_END.
    pub current_round: Option<RoundRecord>,
    /// Per-room settings.
    pub settings: SettingsRecord,
}

/// Player entry inside a room record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    /// Stable player id.
    pub id: Uuid,
    /// Display name, unique within the room.
    pub name: String,
    /// Whether this player created the room.
    pub is_host: bool,
    /// Current score.
    pub score: i32,
    /// Most recent activity (unix milliseconds). Connectivity is derived
    /// from this at read time, never persisted.
    pub last_active: i64,
}

/// Round entry inside a room record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    /// Prompt text.
    pub question: String,
    /// Normalized answers keyed by player id.
    pub answers: IndexMap<Uuid, String>,
    /// Advisory deadline (unix milliseconds).
    pub end_time: i64,
    /// Tied-for-largest representative answers; present once resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub herd_answers: Option<Vec<String>>,
    /// Sole unique answer, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub black_sheep_answer: Option<String>,
    /// Equivalence groups keyed by representative; presence marks the round
    /// as resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_groups: Option<IndexMap<String, Vec<String>>>,
    /// Snapshot of per-player answers at resolution time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_answers: Option<IndexMap<Uuid, String>>,
}

/// Settings entry inside a room record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRecord {
    /// Round deadline in seconds.
    pub round_time_limit_seconds: u32,
    /// Join cap.
    pub max_players: u32,
    /// Herd bonus.
    pub points_for_herd_answer: i32,
    /// Black-sheep penalty.
    pub points_lost_for_black_sheep: i32,
}

/// Convert a timestamp to unix milliseconds for persistence.
pub(crate) fn to_unix_ms(timestamp: OffsetDateTime) -> i64 {
    (timestamp.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Convert unix milliseconds back to a timestamp. Out-of-range values fall
/// back to the epoch rather than failing the whole record.
pub(crate) fn from_unix_ms(millis: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::room::{Player, Room, RoomSettings, Round};

    fn sample_room() -> Room {
        let now = from_unix_ms(to_unix_ms(OffsetDateTime::now_utc()));
        let mut room = Room {
            code: "ABCD23".into(),
            version: 7,
            status: RoomStatus::Playing,
            players: vec![
                Player::new("alice".into(), true, now),
                Player::new("bob".into(), false, now),
            ],
            questions: (1..=5).map(|i| format!("question {i}")).collect(),
            current_round_index: 1,
            current_round: Some(Round::open(
                "question 2".into(),
                now,
                &RoomSettings::default(),
            )),
            started_at: now,
            settings: RoomSettings::default(),
        };
        if let Some(round) = room.current_round.as_mut() {
            round.answers.insert(room.players[0].id, "red".into());
        }
        room
    }

    #[test]
    fn room_round_trips_through_record_json() {
        let room = sample_room();
        let record: RoomRecord = room.clone().into();
        let json = serde_json::to_string(&record).expect("serialize record");
        let parsed: RoomRecord = serde_json::from_str(&json).expect("parse record");
        assert_eq!(record, parsed);
        assert_eq!(Room::from(parsed), room);
    }

    #[test]
    fn absent_round_serializes_as_null() {
        let mut room = sample_room();
        room.status = RoomStatus::Waiting;
        room.current_round = None;
        room.current_round_index = -1;

        let record: RoomRecord = room.into();
        let json = serde_json::to_value(&record).expect("serialize record");
        assert!(json["currentRound"].is_null());
        assert_eq!(json["status"], "waiting");
    }

    #[test]
    fn unresolved_round_omits_outcome_fields() {
        let record: RoomRecord = sample_room().into();
        let json = serde_json::to_value(&record).expect("serialize record");
        let round = &json["currentRound"];
        assert!(round.get("answerGroups").is_none());
        assert!(round.get("herdAnswers").is_none());
    }

    #[test]
    fn timestamp_helpers_invert_each_other() {
        let ms = 1_756_000_000_123_i64;
        assert_eq!(to_unix_ms(from_unix_ms(ms)), ms);
    }
}
