/// OpenAPI documentation generation.
pub mod documentation;
/// In-game actions: start, answers, round advancement.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Room lifecycle: creation, joining, reads, presence.
pub mod room_service;
/// Background timeout resolution and slot eviction.
pub mod round_sweeper;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor with reconnect backoff.
pub mod storage_supervisor;
