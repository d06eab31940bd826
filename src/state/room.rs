//! Runtime representation of a game room and its round state.
//!
//! The `Room` aggregate is the unit of concurrency: it is only ever mutated by
//! the action processor while the registry holds that room's gate, and it is
//! cheap to clone so a failed action never leaves partial mutation visible.

use indexmap::IndexMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{
    PlayerRecord, RoomRecord, RoundRecord, SettingsRecord, from_unix_ms, to_unix_ms,
};

/// Number of prompts a room is created with.
pub const QUESTIONS_PER_ROOM: usize = 5;

/// Lifecycle status of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum RoomStatus {
    /// Players are gathering; the host has not started the game.
    Waiting,
    /// A round is open for answers.
    Playing,
    /// The current round has been resolved; scores are on display.
    RoundEnd,
    /// All questions have been played; terminal.
    GameOver,
}

/// Tunable per-room settings, fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSettings {
    /// Advisory round deadline, in seconds from round start.
    pub round_time_limit_seconds: u32,
    /// Maximum number of players allowed to join.
    pub max_players: u32,
    /// Points awarded to each member of a uniquely-largest answer group.
    pub points_for_herd_answer: i32,
    /// Points deducted from a lone unique answerer, floored at zero.
    pub points_lost_for_black_sheep: i32,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            round_time_limit_seconds: 30,
            max_players: 8,
            points_for_herd_answer: 1,
            points_lost_for_black_sheep: 1,
        }
    }
}

/// A participant in a room. Players have no identity outside their room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Stable id, assigned at first join and reused across reconnects.
    pub id: Uuid,
    /// Display name, unique within the room (exact match).
    pub name: String,
    /// Exactly one player is host for the room's lifetime.
    pub is_host: bool,
    /// Current score; never negative.
    pub score: i32,
    /// Timestamp of the player's most recent action.
    pub last_active: OffsetDateTime,
}

impl Player {
    /// Build a fresh player with a newly-generated id and zero score.
    pub fn new(name: String, is_host: bool, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            is_host,
            score: 0,
            last_active: now,
        }
    }
}

/// Results attached to a round once every outstanding answer has arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    /// Equivalence groups keyed by their representative answer, in creation
    /// order.
    pub answer_groups: IndexMap<String, Vec<String>>,
    /// Representative answers tied for the largest group.
    pub herd_answers: Vec<String>,
    /// The sole unique answer, when exactly one singleton group exists.
    pub black_sheep_answer: Option<String>,
    /// Per-player answers as submitted (normalized), kept for display.
    pub original_answers: IndexMap<Uuid, String>,
}

/// One question-and-answer cycle. Replaced wholesale on every advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    /// Prompt text for this round.
    pub question: String,
    /// Normalized answers keyed by player id, populated incrementally.
    pub answers: IndexMap<Uuid, String>,
    /// Deadline after which the sweeper force-resolves the round.
    pub end_time: OffsetDateTime,
    /// Present once the round has been resolved.
    pub outcome: Option<RoundOutcome>,
}

impl Round {
    /// Open a fresh round for `question` with an empty answer set.
    pub fn open(question: String, now: OffsetDateTime, settings: &RoomSettings) -> Self {
        Self {
            question,
            answers: IndexMap::new(),
            end_time: now + time::Duration::seconds(i64::from(settings.round_time_limit_seconds)),
            outcome: None,
        }
    }
}

/// The room aggregate, keyed by room code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Unique room code; also the persistence key.
    pub code: String,
    /// Incremented on every accepted mutation.
    pub version: u64,
    /// Current lifecycle status.
    pub status: RoomStatus,
    /// Players in join order; order drives deterministic display.
    pub players: Vec<Player>,
    /// Prompt list, fixed at creation.
    pub questions: Vec<String>,
    /// `-1` before start, else index into `questions`.
    pub current_round_index: i32,
    /// Present iff status is `Playing` or `RoundEnd`.
    pub current_round: Option<Round>,
    /// Creation timestamp.
    pub started_at: OffsetDateTime,
    /// Per-room settings.
    pub settings: RoomSettings,
}

impl Room {
    /// Look up a player by exact name.
    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|player| player.name == name)
    }

    /// Mutable lookup by exact name.
    pub fn player_by_name_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| player.name == name)
    }

    /// Mutable lookup by player id.
    pub fn player_by_id_mut(&mut self, id: Uuid) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| player.id == id)
    }

    /// Invariant check used by tests: a round exists iff the status says so.
    pub fn round_presence_consistent(&self) -> bool {
        match self.status {
            RoomStatus::Playing | RoomStatus::RoundEnd => self.current_round.is_some(),
            RoomStatus::Waiting | RoomStatus::GameOver => self.current_round.is_none(),
        }
    }
}

impl From<RoomRecord> for Room {
    fn from(record: RoomRecord) -> Self {
        Self {
            code: record.room_code,
            version: record.version,
            status: record.status,
            players: record.players.into_iter().map(Into::into).collect(),
            questions: record.questions,
            current_round_index: record.current_round_index,
            current_round: record.current_round.map(Into::into),
            started_at: from_unix_ms(record.started_at),
            settings: record.settings.into(),
        }
    }
}

impl From<Room> for RoomRecord {
    fn from(room: Room) -> Self {
        Self {
            room_code: room.code,
            version: room.version,
            status: room.status,
            players: room.players.into_iter().map(Into::into).collect(),
            questions: room.questions,
            current_round_index: room.current_round_index,
            current_round: room.current_round.map(Into::into),
            started_at: to_unix_ms(room.started_at),
            settings: room.settings.into(),
        }
    }
}

impl From<PlayerRecord> for Player {
    fn from(record: PlayerRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            is_host: record.is_host,
            score: record.score,
            last_active: from_unix_ms(record.last_active),
        }
    }
}

impl From<Player> for PlayerRecord {
    fn from(player: Player) -> Self {
        Self {
            id: player.id,
            name: player.name,
            is_host: player.is_host,
            score: player.score,
            last_active: to_unix_ms(player.last_active),
        }
    }
}

impl From<RoundRecord> for Round {
    fn from(record: RoundRecord) -> Self {
        let outcome = record.answer_groups.map(|groups| RoundOutcome {
            answer_groups: groups,
            herd_answers: record.herd_answers.unwrap_or_default(),
            black_sheep_answer: record.black_sheep_answer,
            original_answers: record.original_answers.unwrap_or_default(),
        });

        Self {
            question: record.question,
            answers: record.answers,
            end_time: from_unix_ms(record.end_time),
            outcome,
        }
    }
}

impl From<Round> for RoundRecord {
    fn from(round: Round) -> Self {
        let (answer_groups, herd_answers, black_sheep_answer, original_answers) =
            match round.outcome {
                Some(outcome) => (
                    Some(outcome.answer_groups),
                    Some(outcome.herd_answers),
                    outcome.black_sheep_answer,
                    Some(outcome.original_answers),
                ),
                None => (None, None, None, None),
            };

        Self {
            question: round.question,
            answers: round.answers,
            end_time: to_unix_ms(round.end_time),
            herd_answers,
            black_sheep_answer,
            answer_groups,
            original_answers,
        }
    }
}

impl From<SettingsRecord> for RoomSettings {
    fn from(record: SettingsRecord) -> Self {
        Self {
            round_time_limit_seconds: record.round_time_limit_seconds,
            max_players: record.max_players,
            points_for_herd_answer: record.points_for_herd_answer,
            points_lost_for_black_sheep: record.points_lost_for_black_sheep,
        }
    }
}

impl From<RoomSettings> for SettingsRecord {
    fn from(settings: RoomSettings) -> Self {
        Self {
            round_time_limit_seconds: settings.round_time_limit_seconds,
            max_players: settings.max_players,
            points_for_herd_answer: settings.points_for_herd_answer,
            points_lost_for_black_sheep: settings.points_lost_for_black_sheep,
        }
    }
}
