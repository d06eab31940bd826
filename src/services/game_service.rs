use crate::{
    dto::room::{RoomSnapshot, StartGameRequest, SubmitAnswerRequest},
    error::ServiceError,
    services::room_service,
    state::{SharedState, machine::RoomAction},
};

/// Start the game. Host-only; requires at least two players.
pub async fn start_game(
    state: &SharedState,
    room_code: &str,
    payload: StartGameRequest,
) -> Result<RoomSnapshot, ServiceError> {
    room_service::apply(
        state,
        room_code,
        RoomAction::Start {
            player_name: payload.player_name,
        },
    )
    .await
}

/// Submit (or overwrite) an answer for the open round. The round resolves
/// as soon as every player has answered.
pub async fn submit_answer(
    state: &SharedState,
    room_code: &str,
    payload: SubmitAnswerRequest,
) -> Result<RoomSnapshot, ServiceError> {
    room_service::apply(
        state,
        room_code,
        RoomAction::SubmitAnswer {
            player_name: payload.player_name,
            answer: payload.answer,
        },
    )
    .await
}

/// Advance past a finished round, opening the next one or ending the game.
pub async fn advance_round(
    state: &SharedState,
    room_code: &str,
) -> Result<RoomSnapshot, ServiceError> {
    room_service::apply(state, room_code, RoomAction::AdvanceRound).await
}
