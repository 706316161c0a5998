//! Error types for the RL Lab controller

use thiserror::Error;

/// Main error type for the RL Lab controller
#[derive(Error, Debug)]
pub enum LabError {
    /// Transport failure: subscription open, stream read, or request failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP client error
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The engine answered with a non-success status
    #[error("Engine error (status {status}): {message}")]
    Engine {
        /// HTTP status code
        status: u16,
        /// Error message reported by the engine
        message: String,
    },

    /// JSON decode error
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A message violated the stream protocol (stale handle, excess episodes, bad shape)
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Parameters failed validation before reaching the network
    #[error("Invalid parameter '{parameter}': {message}")]
    Validation {
        /// Parameter name
        parameter: String,
        /// What is wrong with it
        message: String,
    },

    /// An intent is not legal in the current phase
    #[error("Cannot {intent} while {phase}")]
    InvalidTransition {
        /// Phase the controller was in
        phase: String,
        /// Intent that was rejected
        intent: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, LabError>;

/// Coarse error taxonomy used to decide how an error is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network, stream, or engine failure; surfaced to the user
    Transport,
    /// Stale or malformed stream traffic; logged and dropped
    ProtocolViolation,
    /// Malformed parameters; blocks `start`
    Validation,
    /// Intent rejected by the state machine
    Rejected,
    /// Bad configuration
    Config,
}

impl LabError {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a protocol violation
    pub fn protocol_violation(msg: impl Into<String>) -> Self {
        Self::ProtocolViolation(msg.into())
    }

    /// Create a validation error for a parameter
    pub fn validation(parameter: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            parameter: parameter.into(),
            message: msg.into(),
        }
    }

    /// Create an invalid transition error
    pub fn invalid_transition(phase: impl std::fmt::Display, intent: impl Into<String>) -> Self {
        Self::InvalidTransition {
            phase: phase.to_string(),
            intent: intent.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_)
            | Self::Engine { .. }
            | Self::JsonDecode(_)
            | Self::Io(_)
            | Self::Timeout(_) => ErrorKind::Transport,
            #[cfg(feature = "http")]
            Self::Http(_) => ErrorKind::Transport,
            Self::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::InvalidTransition { .. } => ErrorKind::Rejected,
            Self::InvalidConfig(_) => ErrorKind::Config,
        }
    }
}
