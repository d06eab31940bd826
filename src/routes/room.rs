use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::room::{CreateRoomRequest, JoinRoomRequest, PresenceRequest, RoomSnapshot},
    error::AppError,
    services::room_service,
    state::SharedState,
};

/// Routes handling room lifecycle and presence.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/{code}", get(get_room))
        .route("/rooms/{code}/join", post(join_room))
        .route("/rooms/{code}/presence", post(record_presence))
}

/// Create a room under a freshly generated code.
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "room",
    request_body = CreateRoomRequest,
    responses(
        (status = 200, description = "Room created", body = RoomSnapshot),
        (status = 400, description = "Invalid payload")
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateRoomRequest>>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let snapshot = room_service::create_room(&state, payload).await?;
    Ok(Json(snapshot))
}

/// Read the current room state. Doubles as the polling endpoint.
#[utoipa::path(
    get,
    path = "/rooms/{code}",
    tag = "room",
    params(("code" = String, Path, description = "Room code")),
    responses(
        (status = 200, description = "Current room state", body = RoomSnapshot),
        (status = 404, description = "Room not found")
    )
)]
pub async fn get_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let snapshot = room_service::get_room(&state, &code).await?;
    Ok(Json(snapshot))
}

/// Join a room, or reconnect under a lapsed player's name.
#[utoipa::path(
    post,
    path = "/rooms/{code}/join",
    tag = "room",
    params(("code" = String, Path, description = "Room code")),
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Joined", body = RoomSnapshot),
        (status = 404, description = "Room not found"),
        (status = 409, description = "Name taken or room not joinable")
    )
)]
pub async fn join_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<JoinRoomRequest>>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let snapshot = room_service::join_room(&state, &code, payload).await?;
    Ok(Json(snapshot))
}

/// Record a player's liveness poll.
#[utoipa::path(
    post,
    path = "/rooms/{code}/presence",
    tag = "room",
    params(("code" = String, Path, description = "Room code")),
    request_body = PresenceRequest,
    responses(
        (status = 200, description = "Presence recorded", body = RoomSnapshot),
        (status = 404, description = "Room or player not found")
    )
)]
pub async fn record_presence(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<PresenceRequest>>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let snapshot = room_service::record_presence(&state, &code, payload).await?;
    Ok(Json(snapshot))
}
