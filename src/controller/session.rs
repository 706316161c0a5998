//! Session state structures
//!
//! Defines the phase machine states, the per-session record, and the immutable
//! snapshot published to observers.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{ErrorKind, LabError};
use crate::metrics::{ChartSeries, ChartStats, MIN_WINDOW};
use crate::types::identifiers::SessionId;
use crate::types::messages::Frame;
use crate::types::parameters::ParameterSet;

/// Controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// No training or playback running
    #[default]
    Idle,
    /// Start request in flight
    Starting,
    /// Consuming the training stream
    Training,
    /// Training finished; policy can be replayed
    Completed,
    /// Waiting for the playback frame list
    PlaybackPending,
    /// Replaying frames
    Playing,
}

impl Phase {
    /// Whether a playback subscription or scheduler belongs to this phase
    #[must_use]
    pub const fn is_playback(self) -> bool {
        matches!(self, Self::PlaybackPending | Self::Playing)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Training => "training",
            Self::Completed => "completed",
            Self::PlaybackPending => "waiting for playback frames",
            Self::Playing => "playing",
        };
        f.write_str(name)
    }
}

/// Algorithm, environment, and parameters chosen for the next start
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Algorithm id
    pub algorithm: String,
    /// Environment id
    pub environment: String,
    /// Parameter set
    pub parameters: ParameterSet,
}

/// One remote training run, created on start
#[derive(Debug, Clone)]
pub(super) struct Session {
    /// Engine-issued id
    pub id: SessionId,
    /// Configuration the session was started with
    pub selection: Selection,
    /// Configured episode count
    pub total_episodes: u64,
    /// Chart window, fixed for the session's lifetime
    pub window: usize,
    /// When the start request succeeded
    pub started_at: DateTime<Utc>,
}

/// Live display state updated by stream events and playback ticks
#[derive(Debug, Clone, Default)]
pub(super) struct DisplayState {
    pub frame: Option<Frame>,
    pub episode: u64,
    pub learning_snapshot: Option<serde_json::Value>,
    pub playback_position: Option<(usize, usize)>,
}

/// Most recent user-visible error
#[derive(Debug, Clone, PartialEq)]
pub struct LastError {
    /// Message for display
    pub message: String,
    /// Taxonomy bucket
    pub kind: ErrorKind,
    /// When it was recorded
    pub at: DateTime<Utc>,
}

impl LastError {
    pub(super) fn from_error(error: &LabError) -> Self {
        Self {
            message: error.to_string(),
            kind: error.kind(),
            at: Utc::now(),
        }
    }
}

/// Immutable view of the controller published after every event
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Current phase
    pub phase: Phase,
    /// Active session id
    pub session_id: Option<SessionId>,
    /// When the active session started
    pub started_at: Option<DateTime<Utc>>,
    /// Current selection
    pub selection: Selection,
    /// Frame to show (live, playback, or preview)
    pub current_frame: Option<Frame>,
    /// Last episode index received
    pub current_episode: u64,
    /// Last learning-state snapshot, verbatim
    pub learning_snapshot: Option<serde_json::Value>,
    /// Windowed-average chart
    pub chart: Arc<ChartSeries>,
    /// Chart summary figures
    pub stats: Option<ChartStats>,
    /// Chart window of the active session
    pub window_size: usize,
    /// Configured episode count of the active session, 0 without one
    pub total_episodes: u64,
    /// Rewards received so far
    pub rewards_received: usize,
    /// `(frame index, frame count)` while playing
    pub playback_position: Option<(usize, usize)>,
    /// Most recent user-visible error
    pub last_error: Option<LastError>,
}

impl Snapshot {
    pub(super) fn initial(selection: Selection) -> Self {
        Self {
            phase: Phase::Idle,
            session_id: None,
            started_at: None,
            selection,
            current_frame: None,
            current_episode: 0,
            learning_snapshot: None,
            chart: Arc::new(ChartSeries::new()),
            stats: None,
            window_size: MIN_WINDOW,
            total_episodes: 0,
            rewards_received: 0,
            playback_position: None,
            last_error: None,
        }
    }

    /// Whether the training stream is being consumed
    #[must_use]
    pub fn is_training(&self) -> bool {
        matches!(self.phase, Phase::Starting | Phase::Training)
    }

    /// Whether a replay is pending or running
    #[must_use]
    pub fn is_playback(&self) -> bool {
        self.phase.is_playback()
    }

    /// Whether the policy can be replayed now
    #[must_use]
    pub fn can_play_policy(&self) -> bool {
        self.phase == Phase::Completed
    }

    /// X-axis ticks for the active run
    #[must_use]
    pub fn axis_ticks(&self) -> Vec<u64> {
        ChartSeries::axis_ticks(self.total_episodes)
    }
}
