use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Herd Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::room::create_room,
        crate::routes::room::get_room,
        crate::routes::room::join_room,
        crate::routes::room::record_presence,
        crate::routes::game::start_game,
        crate::routes::game::submit_answer,
        crate::routes::game::advance_round,
        crate::routes::sse::room_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::CreateRoomRequest,
            crate::dto::room::JoinRoomRequest,
            crate::dto::room::StartGameRequest,
            crate::dto::room::SubmitAnswerRequest,
            crate::dto::room::PresenceRequest,
            crate::dto::room::RoomSnapshot,
            crate::dto::room::PlayerSnapshot,
            crate::dto::room::RoundSnapshot,
            crate::dto::room::SettingsSnapshot,
            crate::state::room::RoomStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "room", description = "Room lifecycle and presence"),
        (name = "game", description = "In-game actions"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
