//! Transport layer for communicating with the remote training engine
//!
//! This module provides the engine abstraction and its HTTP implementation.
//! The controller only ever talks to an [`Engine`]; tests substitute their own.

#[cfg(feature = "http")]
pub mod http;

use tokio::sync::mpsc;

use crate::error::Result;
use crate::types::messages::{Frame, StartRequest, StartResponse, Topic};
use crate::types::identifiers::SessionId;
use crate::types::parameters::ParameterSchema;

/// Receiver of raw push-stream payloads
///
/// Yields JSON values in send order. An `Err` item is terminal; the channel
/// closing without a completion message means the stream broke.
pub type RawStream = mpsc::UnboundedReceiver<Result<serde_json::Value>>;

/// Remote training engine
///
/// This trait defines every request the controller issues. Implementations must
/// be cheap to share behind an `Arc`.
pub trait Engine: Send + Sync + 'static {
    /// Start a training session
    ///
    /// # Errors
    /// Returns error if the request fails or the engine rejects it
    fn start_session(
        &self,
        request: StartRequest,
    ) -> impl std::future::Future<Output = Result<StartResponse>> + Send;

    /// Open a push stream for a session
    ///
    /// Returns a receiver fed by a background task. Dropping the receiver
    /// stops the task at its next delivery.
    fn open_stream(&self, session_id: &SessionId, topic: Topic) -> RawStream;

    /// Drop every session on the engine; safe with no active session
    ///
    /// # Errors
    /// Returns error if the request fails
    fn reset_session(&self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Initial-state frame for an environment
    ///
    /// # Errors
    /// Returns error if the request fails or the environment is unknown
    fn preview_frame(
        &self,
        environment: &str,
    ) -> impl std::future::Future<Output = Result<Frame>> + Send;

    /// Parameter schema for an algorithm, specialized to an environment
    ///
    /// # Errors
    /// Returns error if the request fails or the algorithm is unknown
    fn parameter_schema(
        &self,
        algorithm: &str,
        environment: &str,
    ) -> impl std::future::Future<Output = Result<ParameterSchema>> + Send;

    /// Available algorithm ids
    ///
    /// # Errors
    /// Returns error if the request fails
    fn algorithms(&self) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// Available environment ids
    ///
    /// # Errors
    /// Returns error if the request fails
    fn environments(&self) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

#[cfg(feature = "http")]
pub use http::{HttpEngine, SseCodec};
