/**
 * Socket Frames
 *
 * Every WebSocket message exchanged with clients is a JSON object with an
 * event name and an arbitrary payload:
 *
 * ```json
 * { "event": "message", "data": { "text": "hello" } }
 * ```
 *
 * Incoming frames are dispatched by `event` to the registered handler, and
 * outgoing frames use the same shape so clients can route them the same way.
 */
use serde::{Deserialize, Serialize};

use crate::shared::error::SharedError;

/// A named event with a JSON payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocketFrame {
    /// Event name used for dispatch
    pub event: String,
    /// Event payload (null when absent)
    #[serde(default)]
    pub data: serde_json::Value,
}

impl SocketFrame {
    /// Create a new frame
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Parse a text frame received from a client
    pub fn parse(text: &str) -> Result<Self, SharedError> {
        let frame: SocketFrame = serde_json::from_str(text)?;
        if frame.event.trim().is_empty() {
            return Err(SharedError::frame("event name cannot be empty"));
        }
        Ok(frame)
    }

    /// Encode the frame as a JSON text message
    pub fn to_text(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }
}
