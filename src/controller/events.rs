//! The tagged-union event type consumed by the controller
//!
//! Everything that can change controller state arrives as an [`Event`]:
//! user intents, subscription messages, and playback ticks. Background tasks
//! only ever produce events; they never touch controller state directly.

use crate::types::identifiers::HandleId;
use crate::types::messages::{Frame, StreamMessage};
use crate::types::parameters::ParameterSet;

/// Requests from the host UI
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Start a new training session, replacing any current one
    Start,
    /// Stop everything and return to idle
    Stop,
    /// Replay the policy of the completed session
    PlayPolicy,
    /// Abandon a pending or running replay
    StopPlayback,
    /// Select another algorithm
    ChangeAlgorithm(String),
    /// Select another environment
    ChangeEnvironment(String),
    /// Replace the parameter set used by the next start
    SetParameters(ParameterSet),
    /// Fetch the parameter schema for the current selection and apply its defaults
    LoadParameterSchema,
}

impl Intent {
    /// Short verb used in logs and rejection messages
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::PlayPolicy => "play policy",
            Self::StopPlayback => "stop playback",
            Self::ChangeAlgorithm(_) => "change algorithm",
            Self::ChangeEnvironment(_) => "change environment",
            Self::SetParameters(_) => "set parameters",
            Self::LoadParameterSchema => "load parameter schema",
        }
    }
}

/// One playback scheduler emission
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackTick {
    /// Show frame `index` of the list
    Frame {
        /// Position in the frame list
        index: usize,
        /// Frame to show
        frame: Frame,
    },
    /// The list is exhausted
    Finished,
}

/// Everything the controller reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Host request
    Intent(Intent),
    /// Message from the subscription identified by `handle`
    Stream {
        /// Producing subscription
        handle: HandleId,
        /// Typed message
        message: StreamMessage,
    },
    /// Tick from the scheduler identified by `handle`
    Playback {
        /// Producing scheduler
        handle: HandleId,
        /// Emission
        tick: PlaybackTick,
    },
}

impl From<Intent> for Event {
    fn from(intent: Intent) -> Self {
        Self::Intent(intent)
    }
}
