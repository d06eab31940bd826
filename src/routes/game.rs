use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use axum_valid::Valid;

use crate::{
    dto::room::{RoomSnapshot, StartGameRequest, SubmitAnswerRequest},
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes handling in-game actions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms/{code}/start", post(start_game))
        .route("/rooms/{code}/answers", post(submit_answer))
        .route("/rooms/{code}/advance", post(advance_round))
}

/// Start the game. Host-only; needs at least two players.
#[utoipa::path(
    post,
    path = "/rooms/{code}/start",
    tag = "game",
    params(("code" = String, Path, description = "Room code")),
    request_body = StartGameRequest,
    responses(
        (status = 200, description = "Game started", body = RoomSnapshot),
        (status = 403, description = "Only the host can start"),
        (status = 409, description = "Game already started"),
        (status = 422, description = "Not enough players")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<StartGameRequest>>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let snapshot = game_service::start_game(&state, &code, payload).await?;
    Ok(Json(snapshot))
}

/// Submit (or overwrite) an answer for the open round.
#[utoipa::path(
    post,
    path = "/rooms/{code}/answers",
    tag = "game",
    params(("code" = String, Path, description = "Room code")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = RoomSnapshot),
        (status = 404, description = "Room or player not found"),
        (status = 409, description = "No round is open")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<SubmitAnswerRequest>>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let snapshot = game_service::submit_answer(&state, &code, payload).await?;
    Ok(Json(snapshot))
}

/// Advance past a finished round to the next question, or end the game.
#[utoipa::path(
    post,
    path = "/rooms/{code}/advance",
    tag = "game",
    params(("code" = String, Path, description = "Room code")),
    responses(
        (status = 200, description = "Advanced", body = RoomSnapshot),
        (status = 409, description = "Round still open")
    )
)]
pub async fn advance_round(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let snapshot = game_service::advance_round(&state, &code).await?;
    Ok(Json(snapshot))
}
