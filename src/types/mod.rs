//! Type definitions for the RL Lab controller
//!
//! - [`identifiers`] - Type-safe ID wrappers (`SessionId`, `HandleId`)
//! - [`messages`] - Stream topics, wire messages, and request/response shapes
//! - [`options`] - Controller configuration
//! - [`parameters`] - Parameter sets and the engine parameter schema

pub mod identifiers;
pub mod messages;
pub mod options;
pub mod parameters;

pub use identifiers::{HandleId, SessionId};
pub use messages::{
    EpisodeEvent, Frame, PlaybackMessage, PreviewResponse, StartRequest, StartResponse,
    StreamMessage, Topic, TrainingMessage,
};
pub use options::{LabOptions, LabOptionsBuilder};
pub use parameters::{ParameterSchema, ParameterSet, ParameterSpec, ParameterType, ParameterValue};
