//! Stream message type definitions
//!
//! Wire shapes for the two push topics (`training` and `playback`) and the
//! typed messages the controller consumes.

use serde::{Deserialize, Serialize};

use super::identifiers::SessionId;
use super::parameters::ParameterSet;

// ============================================================================
// Frames
// ============================================================================

/// Rendered environment frame
///
/// Opaque payload as delivered by the engine (base64 image text). Nothing in
/// this crate inspects the encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frame(String);

impl Frame {
    /// Wrap a payload
    pub fn new(payload: impl Into<String>) -> Self {
        Self(payload.into())
    }

    /// Payload text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Payload length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Topics
// ============================================================================

/// Push-stream topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Per-episode training results
    Training,
    /// One-shot frame list for the trained policy
    Playback,
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Training => f.write_str("training"),
            Self::Playback => f.write_str("playback"),
        }
    }
}

// ============================================================================
// Stream Messages
// ============================================================================

/// One training-stream episode result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeEvent {
    /// Episode index, 1-based
    pub episode: u64,
    /// Scalar episode reward
    pub reward: f64,
    /// Rendered frame at the end of the episode
    pub frame: Frame,
    /// Auxiliary learning-state snapshot, forwarded verbatim
    #[serde(default, rename = "learning_data", skip_serializing_if = "Option::is_none")]
    pub learning_snapshot: Option<serde_json::Value>,
}

/// Training topic wire message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrainingMessage {
    /// Episode finished
    Training(EpisodeEvent),
    /// Training finished
    Complete {
        /// Completion note
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Training failed on the engine side
    Error {
        /// Failure description
        message: String,
    },
}

/// Playback topic wire message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlaybackMessage {
    /// Complete frame list for the policy rollout
    Complete {
        /// Frames in display order
        frames: Vec<Frame>,
        /// Frame count as reported by the engine
        #[serde(default, skip_serializing_if = "Option::is_none")]
        num_frames: Option<usize>,
    },
    /// Rollout failed on the engine side
    Error {
        /// Failure description
        message: String,
    },
}

/// Typed message delivered by a subscription, independent of topic
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// Training episode result
    Episode(EpisodeEvent),
    /// Training stream finished; carries the completion note if any
    Complete(Option<String>),
    /// Playback frame list
    Frames(Vec<Frame>),
    /// Transport or engine-side failure
    Error(String),
}

impl From<TrainingMessage> for StreamMessage {
    fn from(msg: TrainingMessage) -> Self {
        match msg {
            TrainingMessage::Training(event) => Self::Episode(event),
            TrainingMessage::Complete { message } => Self::Complete(message),
            TrainingMessage::Error { message } => Self::Error(message),
        }
    }
}

impl From<PlaybackMessage> for StreamMessage {
    fn from(msg: PlaybackMessage) -> Self {
        match msg {
            PlaybackMessage::Complete { frames, .. } => Self::Frames(frames),
            PlaybackMessage::Error { message } => Self::Error(message),
        }
    }
}

// ============================================================================
// Request / Response Shapes
// ============================================================================

/// Body of a session start request
#[derive(Debug, Clone, Serialize)]
pub struct StartRequest {
    /// Algorithm id
    pub algorithm: String,
    /// Environment id
    pub environment: String,
    /// Parameter set
    pub parameters: ParameterSet,
    /// Optional RNG seed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Engine answer to a session start request
#[derive(Debug, Clone, Deserialize)]
pub struct StartResponse {
    /// Issued session id
    pub session_id: SessionId,
    /// Parameters the engine actually applied, when it reports them
    #[serde(default, alias = "config", alias = "effective_config")]
    pub effective_config: Option<ParameterSet>,
}

/// Engine answer to a preview request
#[derive(Debug, Clone, Deserialize)]
pub struct PreviewResponse {
    /// Initial-state frame
    pub frame: Frame,
}
