//! Event payloads carried on the per-room SSE stream.

use serde::Serialize;

/// Dispatched payload carried across a room's SSE channel.
#[derive(Clone, Debug)]
pub struct ServerEvent {
    /// Optional SSE event name.
    pub event: Option<String>,
    /// Serialized event body.
    pub data: String,
}

impl ServerEvent {
    /// Build a plain-text event.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

/// Event name used for every accepted room mutation.
pub const ROOM_UPDATE_EVENT: &str = "room_update";
