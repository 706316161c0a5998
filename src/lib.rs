//! # RL Lab Controller
//!
//! Client-side controller that drives and visualizes a remote reinforcement-learning
//! training run. The remote engine owns algorithms and environments; this crate
//! owns the session lifecycle, the live reward chart, and policy replay.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rl_lab_controller::{HttpEngine, LabOptions, ParameterSet, Phase, SessionController};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = LabOptions::builder()
//!         .algorithm("Q-Learning")
//!         .environment("FrozenLake-v1-NoSlip")
//!         .parameters(ParameterSet::new().with("num_episodes", 500_i64))
//!         .build();
//!
//!     let engine = HttpEngine::new(&options)?;
//!     let mut controller = SessionController::new(engine, options);
//!
//!     controller.start().await?;
//!     while controller.phase() == Phase::Training {
//!         controller.pump().await?;
//!     }
//!
//!     for point in controller.snapshot().chart.points() {
//!         log::info!("{:>6} {:.3}", point.episode, point.average);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Driving from a UI
//!
//! Hosts that prefer message passing hand the controller an intent channel and
//! watch its snapshots:
//!
//! ```no_run
//! # use rl_lab_controller::{HttpEngine, Intent, LabOptions, SessionController};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = LabOptions::default();
//! let controller = SessionController::new(HttpEngine::new(&options)?, options);
//! let mut snapshots = controller.subscribe();
//!
//! let (intents, rx) = tokio::sync::mpsc::unbounded_channel();
//! tokio::spawn(controller.run(rx));
//!
//! intents.send(Intent::Start)?;
//! while snapshots.changed().await.is_ok() {
//!     let snapshot = snapshots.borrow_and_update().clone();
//!     log::info!("{} at episode {}", snapshot.phase, snapshot.current_episode);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`controller`]: The session state machine and its event loop
//! - [`subscription`]: Push-stream reader tasks
//! - [`playback`]: Timer-driven frame replay
//! - [`metrics`]: Windowed reward averages and the chart series
//! - [`transport`]: The [`Engine`] boundary and its HTTP implementation
//! - [`message`]: Push-stream payload parsing
//! - [`types`]: Identifiers, wire shapes, parameters, and options
//! - [`error`]: Error types and handling
//!
//! ## Feature Flags
//!
//! - `http` (default) - Enables [`HttpEngine`] over `reqwest` and the `rl-lab` binary
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, LabError>`](Result). Errors are
//! classified by [`LabError::kind`]; transport errors also land in the
//! snapshot's `last_error`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod controller;
pub mod error;
pub mod message;
pub mod metrics;
pub mod playback;
pub mod subscription;
pub mod transport;
pub mod types;

// Re-export commonly used types for external API
pub use controller::{
    Event, Intent, LastError, Phase, PlaybackTick, Selection, SessionController, Snapshot,
};
pub use error::{ErrorKind, LabError, Result};
pub use message::parse_message;
pub use metrics::{ChartPoint, ChartSeries, ChartStats, moving_average, window_size};
pub use playback::PlaybackScheduler;
pub use subscription::StreamSubscription;
pub use transport::{Engine, RawStream};
#[cfg(feature = "http")]
pub use transport::{HttpEngine, SseCodec};

// Re-export type submodules for flat public API
pub use types::identifiers::{HandleId, SessionId};
pub use types::messages::{EpisodeEvent, Frame, StartRequest, StartResponse, StreamMessage, Topic};
pub use types::options::{LabOptions, LabOptionsBuilder};
pub use types::parameters::{
    ParameterSchema, ParameterSet, ParameterSpec, ParameterType, ParameterValue,
};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
