//! `SessionController`, the owner of one remote training session
//!
//! The controller is a single owned value driven by one event queue. Host
//! intents, subscription messages, and playback ticks all arrive as an
//! [`Event`] and are applied one at a time by [`SessionController::dispatch`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    SessionController                      │
//! │                                                           │
//! │  intents ──┐                                              │
//! │            ▼                                              │
//! │      ┌───────────┐   open/close    ┌──────────────────┐   │
//! │      │ dispatch  │ ──────────────→ │ StreamSubscription│  │
//! │      │ (phase    │                 │  reader task      │  │
//! │      │  machine) │ ──────────────→ │ PlaybackScheduler │  │
//! │      └─────┬─────┘  start/cancel   │  timer task       │  │
//! │            │                       └────────┬─────────┘   │
//! │            │      handle-tagged events      │             │
//! │            │ ◀──────── event queue ◀────────┘             │
//! │            ▼                                              │
//! │      watch::Sender<Snapshot>                              │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! **Key Design Points:**
//! - Background tasks only send events; all state lives in the controller
//! - Every event from a task carries the task's handle; events whose handle is
//!   not the current one are dropped
//! - The previous subscription or scheduler is closed before a new one opens
//! - A fresh [`Snapshot`] is published after every processed event
//!
//! # Example
//!
//! ```no_run
//! use rl_lab_controller::{HttpEngine, LabOptions, Phase, SessionController};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = LabOptions::default();
//! let engine = HttpEngine::new(&options)?;
//! let mut controller = SessionController::new(engine, options);
//!
//! controller.start().await?;
//! while controller.phase() == Phase::Training {
//!     controller.pump().await?;
//! }
//!
//! if let Some(stats) = controller.snapshot().stats {
//!     log::info!("Best average: {}", stats.best_average);
//! }
//! # Ok(())
//! # }
//! ```

mod events;
mod session;
mod tasks;
mod transitions;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::error::{LabError, Result};
use crate::metrics::{ChartSeries, MIN_WINDOW};
use crate::playback::PlaybackScheduler;
use crate::subscription::StreamSubscription;
use crate::transport::Engine;
use crate::types::identifiers::{HandleId, SessionId};
use crate::types::options::LabOptions;
use crate::types::parameters::{ParameterSchema, ParameterSet};

pub use events::{Event, Intent, PlaybackTick};
pub use session::{LastError, Phase, Selection, Snapshot};

use session::{DisplayState, Session};

/// State machine driving one remote training session at a time
pub struct SessionController<E: Engine> {
    engine: Arc<E>,
    options: LabOptions,

    phase: Phase,
    selection: Selection,
    schema: Option<ParameterSchema>,
    session: Option<Session>,

    rewards: Vec<f64>,
    chart: Arc<ChartSeries>,
    display: DisplayState,
    last_error: Option<LastError>,

    subscription: Option<StreamSubscription>,
    scheduler: Option<PlaybackScheduler>,
    next_handle: u64,

    event_tx: mpsc::UnboundedSender<Event>,
    event_rx: mpsc::UnboundedReceiver<Event>,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl<E: Engine> SessionController<E> {
    /// Create an idle controller with the selection taken from `options`
    #[must_use]
    pub fn new(engine: E, options: LabOptions) -> Self {
        Self::with_shared_engine(Arc::new(engine), options)
    }

    /// Create an idle controller over an engine shared with other owners
    #[must_use]
    pub fn with_shared_engine(engine: Arc<E>, options: LabOptions) -> Self {
        let selection = Selection {
            algorithm: options.algorithm.clone(),
            environment: options.environment.clone(),
            parameters: options.parameters.clone(),
        };
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, _) = watch::channel(Snapshot::initial(selection.clone()));

        Self {
            engine,
            options,
            phase: Phase::Idle,
            selection,
            schema: None,
            session: None,
            rewards: Vec::new(),
            chart: Arc::new(ChartSeries::new()),
            display: DisplayState::default(),
            last_error: None,
            subscription: None,
            scheduler: None,
            next_handle: 0,
            event_tx,
            event_rx,
            snapshot_tx,
        }
    }

    // ========================================================================
    // Intents
    // ========================================================================

    /// Start a new training session, replacing the current one
    ///
    /// # Errors
    /// Returns `LabError::InvalidTransition` during playback, `LabError::Validation`
    /// for bad parameters, or the engine's error if the start request fails
    pub async fn start(&mut self) -> Result<()> {
        self.dispatch(Intent::Start.into()).await
    }

    /// Stop everything and return to idle
    ///
    /// # Errors
    /// Never fails; the signature matches the other intents
    pub async fn stop(&mut self) -> Result<()> {
        self.dispatch(Intent::Stop.into()).await
    }

    /// Replay the completed session's policy
    ///
    /// # Errors
    /// Returns `LabError::InvalidTransition` unless the phase is `Completed`
    pub async fn play_policy(&mut self) -> Result<()> {
        self.dispatch(Intent::PlayPolicy.into()).await
    }

    /// Abandon a pending or running replay
    ///
    /// # Errors
    /// Never fails; outside playback this is a no-op
    pub async fn stop_playback(&mut self) -> Result<()> {
        self.dispatch(Intent::StopPlayback.into()).await
    }

    /// Select another algorithm, stopping any active session
    ///
    /// # Errors
    /// Never fails; schema and preview failures are logged
    pub async fn change_algorithm(&mut self, algorithm: impl Into<String>) -> Result<()> {
        self.dispatch(Intent::ChangeAlgorithm(algorithm.into()).into())
            .await
    }

    /// Select another environment, stopping any active session
    ///
    /// # Errors
    /// Never fails; schema and preview failures are logged
    pub async fn change_environment(&mut self, environment: impl Into<String>) -> Result<()> {
        self.dispatch(Intent::ChangeEnvironment(environment.into()).into())
            .await
    }

    /// Replace the parameters used by the next start
    ///
    /// # Errors
    /// Never fails; parameters are validated on start
    pub async fn set_parameters(&mut self, parameters: ParameterSet) -> Result<()> {
        self.dispatch(Intent::SetParameters(parameters).into()).await
    }

    /// Fetch the parameter schema for the current selection and apply its defaults
    ///
    /// # Errors
    /// Returns the engine's error if the schema cannot be fetched
    pub async fn load_parameter_schema(&mut self) -> Result<()> {
        self.dispatch(Intent::LoadParameterSchema.into()).await
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Algorithms the engine offers
    ///
    /// # Errors
    /// Returns error if the request fails
    pub async fn algorithms(&self) -> Result<Vec<String>> {
        self.engine.algorithms().await
    }

    /// Environments the engine offers
    ///
    /// # Errors
    /// Returns error if the request fails
    pub async fn environments(&self) -> Result<Vec<String>> {
        self.engine.environments().await
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Id of the active session
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session.as_ref().map(|s| &s.id)
    }

    /// Current selection
    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Loaded parameter schema, if any
    #[must_use]
    pub const fn parameter_schema(&self) -> Option<&ParameterSchema> {
        self.schema.as_ref()
    }

    /// Options the controller was built with
    #[must_use]
    pub const fn options(&self) -> &LabOptions {
        &self.options
    }

    /// Handle of the open subscription
    #[must_use]
    pub fn subscription_handle(&self) -> Option<HandleId> {
        self.subscription.as_ref().map(StreamSubscription::handle)
    }

    /// Handle of the running playback scheduler
    #[must_use]
    pub fn playback_handle(&self) -> Option<HandleId> {
        self.scheduler.as_ref().map(PlaybackScheduler::handle)
    }

    /// Sender into the controller's event queue
    #[must_use]
    pub fn event_sender(&self) -> mpsc::UnboundedSender<Event> {
        self.event_tx.clone()
    }

    /// Build a snapshot of the current state
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let session = self.session.as_ref();
        Snapshot {
            phase: self.phase,
            session_id: session.map(|s| s.id.clone()),
            started_at: session.map(|s| s.started_at),
            selection: self.selection.clone(),
            current_frame: self.display.frame.clone(),
            current_episode: self.display.episode,
            learning_snapshot: self.display.learning_snapshot.clone(),
            chart: Arc::clone(&self.chart),
            stats: self.chart.stats(),
            window_size: session.map_or(MIN_WINDOW, |s| s.window),
            total_episodes: session.map_or(0, |s| s.total_episodes),
            rewards_received: self.rewards.len(),
            playback_position: self.display.playback_position,
            last_error: self.last_error.clone(),
        }
    }

    /// Receiver that sees a new snapshot after every processed event
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    fn allocate_handle(&mut self) -> HandleId {
        self.next_handle += 1;
        HandleId::new(self.next_handle)
    }

    fn record_error(&mut self, error: &LabError) {
        self.last_error = Some(LastError::from_error(error));
    }

    fn reject(&self, intent: &Intent) -> LabError {
        log::debug!("Rejected '{}' while {}", intent.name(), self.phase);
        LabError::invalid_transition(self.phase, intent.name())
    }
}

impl<E: Engine> std::fmt::Debug for SessionController<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("phase", &self.phase)
            .field("selection", &self.selection)
            .field("session", &self.session.as_ref().map(|s| &s.id))
            .field("rewards", &self.rewards.len())
            .field("subscription", &self.subscription_handle())
            .field("scheduler", &self.playback_handle())
            .finish_non_exhaustive()
    }
}
