//! Room action processor.
//!
//! One action is validated and applied at a time against a single room. The
//! registry always hands this module a scratch clone, so any error leaves the
//! committed state untouched. Every accepted action bumps the room version.

use thiserror::Error;

use crate::{
    state::{
        presence::PresencePolicy,
        room::{
            Player, QUESTIONS_PER_ROOM, Room, RoomSettings, RoomStatus, Round, RoundOutcome,
        },
    },
    text::{are_similar, normalize},
};

use indexmap::IndexMap;
use time::OffsetDateTime;

/// A room-scoped action submitted by a client (or the sweeper).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomAction {
    /// Add a player to a waiting room, or reconnect a lapsed one.
    Join {
        /// Display name of the joining player.
        player_name: String,
    },
    /// Host-only transition from WAITING to the first round.
    Start {
        /// Name of the player attempting to start.
        player_name: String,
    },
    /// Record (or overwrite) a player's answer for the open round.
    SubmitAnswer {
        /// Name of the answering player.
        player_name: String,
        /// Raw answer text; normalized before storage.
        answer: String,
    },
    /// Move from ROUND_END to the next round, or to GAME_OVER.
    AdvanceRound,
    /// Refresh a player's liveness timestamp without other effect.
    RecordPresence {
        /// Name of the polling player.
        player_name: String,
    },
    /// Force-resolve an overdue round; applied by the sweeper.
    ResolveTimeout,
}

/// Typed rejection for a single action. Terminal for that action only: the
/// room state is never partially mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// Input shape is invalid.
    #[error("{0}")]
    Validation(String),
    /// Room or player does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Action is not valid for the room's current status.
    #[error("{0}")]
    InvalidState(String),
    /// Actor lacks permission for a host-only action.
    #[error("{0}")]
    Unauthorized(String),
    /// A uniqueness constraint was violated.
    #[error("{0}")]
    Conflict(String),
    /// A readiness requirement is not met.
    #[error("{0}")]
    Precondition(String),
}

/// Build a fresh room in WAITING with the creator as host.
pub fn create_room(
    code: String,
    host_name: &str,
    questions: Vec<String>,
    settings: RoomSettings,
    now: OffsetDateTime,
) -> Result<Room, ActionError> {
    let host_name = host_name.trim();
    if host_name.is_empty() {
        return Err(ActionError::Validation("Host name is required".into()));
    }
    if questions.len() != QUESTIONS_PER_ROOM {
        return Err(ActionError::Validation(format!(
            "Exactly {QUESTIONS_PER_ROOM} questions are required"
        )));
    }
    if questions.iter().any(|question| question.trim().is_empty()) {
        return Err(ActionError::Validation("Questions must not be empty".into()));
    }

    Ok(Room {
        code,
        version: 1,
        status: RoomStatus::Waiting,
        players: vec![Player::new(host_name.to_string(), true, now)],
        questions,
        current_round_index: -1,
        current_round: None,
        started_at: now,
        settings,
    })
}

/// Validate and apply one action in place, bumping the version on success.
///
/// Callers must pass a scratch clone: on error the room may not be inspected
/// further, as no partial-mutation guarantee is made for the clone itself.
pub fn apply_action(
    room: &mut Room,
    action: RoomAction,
    presence: &PresencePolicy,
    now: OffsetDateTime,
) -> Result<(), ActionError> {
    match action {
        RoomAction::Join { player_name } => join(room, &player_name, presence, now)?,
        RoomAction::Start { player_name } => start(room, &player_name, now)?,
        RoomAction::SubmitAnswer {
            player_name,
            answer,
        } => submit_answer(room, &player_name, &answer, now)?,
        RoomAction::AdvanceRound => advance_round(room, now)?,
        RoomAction::RecordPresence { player_name } => record_presence(room, &player_name, now)?,
        RoomAction::ResolveTimeout => resolve_timeout(room, now)?,
    }

    room.version += 1;
    Ok(())
}

fn join(
    room: &mut Room,
    player_name: &str,
    presence: &PresencePolicy,
    now: OffsetDateTime,
) -> Result<(), ActionError> {
    let player_name = player_name.trim();
    if player_name.is_empty() {
        return Err(ActionError::Validation("Player name is required".into()));
    }

    if let Some(existing) = room.player_by_name(player_name) {
        if presence.is_connected(existing.last_active, now) {
            return Err(ActionError::Conflict("Name already taken".into()));
        }
        if room.status == RoomStatus::GameOver {
            return Err(ActionError::InvalidState("Game is already over".into()));
        }
        // Reconnect: the existing player record keeps its id and score.
        touch(room, player_name, now);
        return Ok(());
    }

    if room.status != RoomStatus::Waiting {
        return Err(ActionError::InvalidState("Game already in progress".into()));
    }
    if room.players.len() >= room.settings.max_players as usize {
        return Err(ActionError::Precondition("Room is full".into()));
    }

    room.players
        .push(Player::new(player_name.to_string(), false, now));
    Ok(())
}

fn start(room: &mut Room, player_name: &str, now: OffsetDateTime) -> Result<(), ActionError> {
    let actor = room
        .player_by_name(player_name)
        .ok_or_else(|| ActionError::NotFound("Player not found".into()))?;
    if !actor.is_host {
        return Err(ActionError::Unauthorized(
            "Only host can start the game".into(),
        ));
    }
    if room.status != RoomStatus::Waiting {
        return Err(ActionError::InvalidState("Game already started".into()));
    }
    // Total player count, liveness ignored: presence is advisory.
    if room.players.len() < 2 {
        return Err(ActionError::Precondition(
            "Need at least 2 players".into(),
        ));
    }

    room.status = RoomStatus::Playing;
    room.current_round_index = 0;
    room.current_round = Some(Round::open(room.questions[0].clone(), now, &room.settings));
    touch(room, player_name, now);
    Ok(())
}

fn submit_answer(
    room: &mut Room,
    player_name: &str,
    answer: &str,
    now: OffsetDateTime,
) -> Result<(), ActionError> {
    if room.status != RoomStatus::Playing {
        return Err(ActionError::InvalidState(
            "Game is not in playing state".into(),
        ));
    }

    let player_id = {
        let player = room
            .player_by_name_mut(player_name)
            .ok_or_else(|| ActionError::NotFound("Player not found".into()))?;
        player.last_active = now;
        player.id
    };

    let normalized = normalize(answer);
    let all_answered = {
        let round = room
            .current_round
            .as_mut()
            .ok_or_else(|| ActionError::InvalidState("No round is open".into()))?;
        // Re-submission overwrites; one-shot enforcement belongs to callers.
        round.answers.insert(player_id, normalized);
        let answers = &round.answers;
        room.players
            .iter()
            .all(|player| answers.contains_key(&player.id))
    };

    if all_answered {
        resolve_round(room);
        room.status = RoomStatus::RoundEnd;
    }

    Ok(())
}

fn advance_round(room: &mut Room, now: OffsetDateTime) -> Result<(), ActionError> {
    if room.status != RoomStatus::RoundEnd {
        return Err(ActionError::InvalidState(
            "Round is not finished".into(),
        ));
    }

    room.current_round_index += 1;
    if room.current_round_index as usize >= room.questions.len() {
        room.status = RoomStatus::GameOver;
        room.current_round = None;
    } else {
        room.status = RoomStatus::Playing;
        let question = room.questions[room.current_round_index as usize].clone();
        room.current_round = Some(Round::open(question, now, &room.settings));
    }
    Ok(())
}

fn record_presence(
    room: &mut Room,
    player_name: &str,
    now: OffsetDateTime,
) -> Result<(), ActionError> {
    let player = room
        .player_by_name_mut(player_name)
        .ok_or_else(|| ActionError::NotFound("Player not found".into()))?;
    player.last_active = now;
    Ok(())
}

fn resolve_timeout(room: &mut Room, now: OffsetDateTime) -> Result<(), ActionError> {
    if room.status != RoomStatus::Playing {
        return Err(ActionError::InvalidState(
            "Game is not in playing state".into(),
        ));
    }
    let round = room
        .current_round
        .as_ref()
        .ok_or_else(|| ActionError::InvalidState("No round is open".into()))?;
    if now < round.end_time {
        return Err(ActionError::Precondition(
            "Round deadline has not passed".into(),
        ));
    }

    // Non-respondents are simply absent from scoring.
    resolve_round(room);
    room.status = RoomStatus::RoundEnd;
    Ok(())
}

/// Refresh `last_active` for a named player, if present.
fn touch(room: &mut Room, player_name: &str, now: OffsetDateTime) {
    if let Some(player) = room.player_by_name_mut(player_name) {
        player.last_active = now;
    }
}

/// Cluster the submitted answers, award the herd bonus, penalize the black
/// sheep, and attach the outcome to the round.
///
/// Clustering is deliberately greedy and representative-only: each answer is
/// matched against existing group keys in creation order and attaches to the
/// first similar key, otherwise it starts a new group. Answers similar to a
/// non-representative member of a group will not match that group.
fn resolve_round(room: &mut Room) {
    let Some(round) = room.current_round.as_mut() else {
        return;
    };

    let mut groups: IndexMap<String, Vec<String>> = IndexMap::new();
    for answer in round.answers.values() {
        let existing = groups
            .keys()
            .find(|key| are_similar(answer, key))
            .cloned();
        match existing {
            Some(key) => {
                if let Some(members) = groups.get_mut(&key) {
                    members.push(answer.clone());
                }
            }
            None => {
                groups.insert(answer.clone(), vec![answer.clone()]);
            }
        }
    }

    let max_count = groups.values().map(Vec::len).max().unwrap_or(0);
    let herd_answers: Vec<String> = groups
        .iter()
        .filter(|(_, members)| max_count > 0 && members.len() == max_count)
        .map(|(key, _)| key.clone())
        .collect();

    let settings = room.settings.clone();
    let answers = round.answers.clone();

    // Herd bonus only when the largest group is unique.
    if let [herd_key] = herd_answers.as_slice() {
        for (player_id, answer) in &answers {
            if are_similar(answer, herd_key) {
                if let Some(player) = room.players.iter_mut().find(|p| p.id == *player_id) {
                    player.score += settings.points_for_herd_answer;
                }
            }
        }
    }

    let singletons: Vec<String> = groups
        .iter()
        .filter(|(_, members)| members.len() == 1)
        .map(|(key, _)| key.clone())
        .collect();

    // Black sheep only when exactly one singleton group exists; a tie among
    // unique answers penalizes nobody.
    let black_sheep_answer = if let [lone_key] = singletons.as_slice() {
        let sheep_id = answers
            .iter()
            .find(|(_, answer)| are_similar(answer, lone_key))
            .map(|(player_id, _)| *player_id);
        if let Some(player_id) = sheep_id {
            if let Some(player) = room.players.iter_mut().find(|p| p.id == player_id) {
                player.score = (player.score - settings.points_lost_for_black_sheep).max(0);
            }
        }
        Some(lone_key.clone())
    } else {
        None
    };

    let Some(round) = room.current_round.as_mut() else {
        return;
    };
    round.outcome = Some(RoundOutcome {
        answer_groups: groups,
        herd_answers,
        black_sheep_answer,
        original_answers: round.answers.clone(),
    });
}
