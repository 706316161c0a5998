//! Message parser for engine push-stream payloads

use crate::error::{LabError, Result};
use crate::types::messages::{PlaybackMessage, StreamMessage, Topic, TrainingMessage};

/// Parse a JSON value from a push stream into a typed message
///
/// The same `status` tag means different things on the two topics, so the
/// topic selects the wire shape.
///
/// # Errors
/// Returns `LabError::ProtocolViolation` if the value does not match the topic's shape
pub fn parse_message(topic: Topic, data: serde_json::Value) -> Result<StreamMessage> {
    let parsed = match topic {
        Topic::Training => serde_json::from_value::<TrainingMessage>(data).map(StreamMessage::from),
        Topic::Playback => serde_json::from_value::<PlaybackMessage>(data).map(StreamMessage::from),
    };

    parsed.map_err(|e| {
        LabError::protocol_violation(format!("Failed to parse {topic} message: {e}"))
    })
}
