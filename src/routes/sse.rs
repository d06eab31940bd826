use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/rooms/{code}/events",
    tag = "sse",
    params(("code" = String, Path, description = "Room code")),
    responses((status = 200, description = "Room event stream", content_type = "text/event-stream", body = String))
)]
/// Stream realtime room updates to connected clients.
pub async fn room_stream(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe_room(&state, &code);
    info!(room_code = %code, "new room SSE connection");
    sse_service::to_sse_stream(receiver, code)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/rooms/{code}/events", get(room_stream))
}
