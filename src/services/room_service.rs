use time::OffsetDateTime;

use crate::{
    dto::room::{CreateRoomRequest, JoinRoomRequest, PresenceRequest, RoomSnapshot},
    error::ServiceError,
    state::{SharedState, machine::RoomAction},
};

/// Create a room under a freshly allocated code, with the caller as host.
pub async fn create_room(
    state: &SharedState,
    payload: CreateRoomRequest,
) -> Result<RoomSnapshot, ServiceError> {
    let now = OffsetDateTime::now_utc();
    let store = state.room_store().await;
    let room = state
        .registry()
        .create(
            &payload.host_name,
            payload.questions,
            state.config().default_settings.clone(),
            state.presence(),
            now,
            store,
            state.config().room_ttl,
        )
        .await?;
    Ok(RoomSnapshot::project(&room, state.presence(), now))
}

/// Join a room, or reconnect when the name belongs to a lapsed player.
pub async fn join_room(
    state: &SharedState,
    room_code: &str,
    payload: JoinRoomRequest,
) -> Result<RoomSnapshot, ServiceError> {
    apply(
        state,
        room_code,
        RoomAction::Join {
            player_name: payload.player_name,
        },
    )
    .await
}

/// Read the current room state without mutating it.
pub async fn get_room(state: &SharedState, room_code: &str) -> Result<RoomSnapshot, ServiceError> {
    let now = OffsetDateTime::now_utc();
    let store = state.room_store().await;
    let room = state.registry().fetch(room_code, store).await?;
    Ok(RoomSnapshot::project(&room, state.presence(), now))
}

/// Refresh a player's activity timestamp.
pub async fn record_presence(
    state: &SharedState,
    room_code: &str,
    payload: PresenceRequest,
) -> Result<RoomSnapshot, ServiceError> {
    apply(
        state,
        room_code,
        RoomAction::RecordPresence {
            player_name: payload.player_name,
        },
    )
    .await
}

pub(crate) async fn apply(
    state: &SharedState,
    room_code: &str,
    action: RoomAction,
) -> Result<RoomSnapshot, ServiceError> {
    let now = OffsetDateTime::now_utc();
    let store = state.room_store().await;
    let room = state
        .registry()
        .apply(
            room_code,
            action,
            state.presence(),
            now,
            store,
            state.config().room_ttl,
        )
        .await?;
    Ok(RoomSnapshot::project(&room, state.presence(), now))
}
