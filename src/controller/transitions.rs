//! Phase transitions
//!
//! [`SessionController::dispatch`] is the only place controller state changes.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{LabError, Result};
use crate::metrics::{ChartSeries, is_window_boundary, window_size};
use crate::playback::PlaybackScheduler;
use crate::subscription::StreamSubscription;
use crate::transport::Engine;
use crate::types::identifiers::HandleId;
use crate::types::messages::{EpisodeEvent, Frame, StartRequest, StreamMessage, Topic};
use crate::types::parameters::ParameterSet;

use super::session::{DisplayState, Session};
use super::{Event, Intent, Phase, PlaybackTick, SessionController};

impl<E: Engine> SessionController<E> {
    /// Apply one event and publish the resulting snapshot
    ///
    /// Stream messages and playback ticks never fail here; their errors are
    /// recorded as the last error instead.
    ///
    /// # Errors
    /// Returns the intent's error for rejected or failed intents
    pub async fn dispatch(&mut self, event: Event) -> Result<()> {
        let result = match event {
            Event::Intent(intent) => self.apply_intent(intent).await,
            Event::Stream { handle, message } => {
                self.apply_stream(handle, message);
                Ok(())
            }
            Event::Playback { handle, tick } => {
                self.apply_tick(handle, tick);
                Ok(())
            }
        };
        self.publish();
        result
    }

    async fn apply_intent(&mut self, intent: Intent) -> Result<()> {
        log::debug!("Intent '{}' while {}", intent.name(), self.phase);
        match intent {
            Intent::Start => self.start_session().await,
            Intent::Stop => {
                self.stop_session().await;
                Ok(())
            }
            Intent::PlayPolicy => self.request_playback(),
            Intent::StopPlayback => {
                self.cancel_playback();
                Ok(())
            }
            Intent::ChangeAlgorithm(algorithm) => {
                self.selection.algorithm = algorithm;
                self.selection_changed().await;
                Ok(())
            }
            Intent::ChangeEnvironment(environment) => {
                self.selection.environment = environment;
                self.selection_changed().await;
                Ok(())
            }
            Intent::SetParameters(parameters) => {
                self.selection.parameters = parameters;
                Ok(())
            }
            Intent::LoadParameterSchema => self.fetch_schema().await,
        }
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    async fn start_session(&mut self) -> Result<()> {
        if self.phase.is_playback() {
            return Err(self.reject(&Intent::Start));
        }

        let validated = match self.schema {
            Some(ref schema) => self.selection.parameters.validate_against(schema),
            None => self.selection.parameters.validate(),
        };
        if let Err(e) = validated {
            log::warn!("Start blocked: {e}");
            self.record_error(&e);
            return Err(e);
        }

        self.release_session().await;
        self.last_error = None;
        self.phase = Phase::Starting;
        self.publish();

        let request = StartRequest {
            algorithm: self.selection.algorithm.clone(),
            environment: self.selection.environment.clone(),
            parameters: self.selection.parameters.clone(),
            seed: self.options.seed,
        };

        let response = match self.engine.start_session(request).await {
            Ok(response) => response,
            Err(e) => {
                log::error!("Failed to start training: {e}");
                self.record_error(&e);
                self.phase = Phase::Idle;
                return Err(e);
            }
        };

        let total_episodes = response
            .effective_config
            .as_ref()
            .and_then(ParameterSet::num_episodes)
            .or_else(|| self.selection.parameters.num_episodes())
            .unwrap_or(self.options.default_episodes);
        let window = window_size(total_episodes);

        let handle = self.allocate_handle();
        let subscription = StreamSubscription::open(
            self.engine.as_ref(),
            handle,
            &response.session_id,
            Topic::Training,
            self.event_tx.clone(),
        );

        log::info!(
            "Training session {} started: {} on {}, {total_episodes} episodes, window {window}",
            response.session_id,
            self.selection.algorithm,
            self.selection.environment
        );

        self.session = Some(Session {
            id: response.session_id,
            selection: self.selection.clone(),
            total_episodes,
            window,
            started_at: Utc::now(),
        });
        self.subscription = Some(subscription);
        self.phase = Phase::Training;
        Ok(())
    }

    async fn stop_session(&mut self) {
        self.release_session().await;
        self.last_error = None;
        self.publish();
        self.load_preview().await;
    }

    /// Close everything, reset the engine, and drop all session data
    ///
    /// Leaves the controller `Idle` with the selection and schema intact.
    pub(super) async fn release_session(&mut self) {
        self.close_subscription();
        self.cancel_scheduler();

        if let Err(e) = self.engine.reset_session().await {
            log::warn!("Remote reset failed: {e}");
        }

        if let Some(session) = self.session.take() {
            log::debug!(
                "Released session {} ({} on {}, {} rewards)",
                session.id,
                session.selection.algorithm,
                session.selection.environment,
                self.rewards.len()
            );
        }
        self.rewards.clear();
        self.chart = Arc::new(ChartSeries::new());
        self.display = DisplayState::default();
        self.phase = Phase::Idle;
    }

    async fn selection_changed(&mut self) {
        if self.phase != Phase::Idle || self.session.is_some() {
            self.release_session().await;
            self.last_error = None;
        }

        if self.schema.is_some() {
            match self
                .engine
                .parameter_schema(&self.selection.algorithm, &self.selection.environment)
                .await
            {
                Ok(schema) => {
                    self.selection.parameters = schema.defaults();
                    self.schema = Some(schema);
                }
                Err(e) => {
                    log::warn!(
                        "Failed to reload parameter schema for {}: {e}",
                        self.selection.algorithm
                    );
                    self.schema = None;
                }
            }
        }

        self.publish();
        self.load_preview().await;
    }

    async fn fetch_schema(&mut self) -> Result<()> {
        match self
            .engine
            .parameter_schema(&self.selection.algorithm, &self.selection.environment)
            .await
        {
            Ok(schema) => {
                log::debug!(
                    "Loaded {} parameters for {}",
                    schema.iter().count(),
                    self.selection.algorithm
                );
                self.selection.parameters = schema.defaults();
                self.schema = Some(schema);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to load parameter schema: {e}");
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// Fetch the initial-state frame of the selected environment
    ///
    /// Only shown while idle. Failures are logged, never surfaced.
    pub async fn load_preview(&mut self) {
        match self.engine.preview_frame(&self.selection.environment).await {
            Ok(frame) if self.phase == Phase::Idle => {
                self.display.frame = Some(frame);
                self.publish();
            }
            Ok(_) => log::debug!("Ignoring preview frame while {}", self.phase),
            Err(e) => log::warn!(
                "Failed to load preview for {}: {e}",
                self.selection.environment
            ),
        }
    }

    // ========================================================================
    // Playback
    // ========================================================================

    fn request_playback(&mut self) -> Result<()> {
        if self.phase != Phase::Completed {
            return Err(self.reject(&Intent::PlayPolicy));
        }
        let Some(session_id) = self.session.as_ref().map(|s| s.id.clone()) else {
            return Err(self.reject(&Intent::PlayPolicy));
        };

        let handle = self.allocate_handle();
        self.subscription = Some(StreamSubscription::open(
            self.engine.as_ref(),
            handle,
            &session_id,
            Topic::Playback,
            self.event_tx.clone(),
        ));
        self.last_error = None;
        self.phase = Phase::PlaybackPending;
        Ok(())
    }

    fn cancel_playback(&mut self) {
        if !self.phase.is_playback() {
            log::debug!("Nothing to stop while {}", self.phase);
            return;
        }
        self.close_subscription();
        self.cancel_scheduler();
        self.display.playback_position = None;
        self.phase = Phase::Completed;
    }

    fn start_scheduler(&mut self, frames: Vec<Frame>) {
        if frames.is_empty() {
            log::info!("Policy rollout returned no frames");
            self.phase = Phase::Completed;
            return;
        }

        let handle = self.allocate_handle();
        log::info!("Replaying {} frames", frames.len());
        self.scheduler = Some(PlaybackScheduler::start(
            handle,
            frames,
            self.options.playback_interval(),
            self.event_tx.clone(),
        ));
        self.phase = Phase::Playing;
    }

    fn apply_tick(&mut self, handle: HandleId, tick: PlaybackTick) {
        let Some(frame_count) = self
            .scheduler
            .as_ref()
            .filter(|s| s.handle() == handle)
            .map(PlaybackScheduler::frame_count)
        else {
            log::debug!("Discarding tick from retired scheduler {handle}");
            return;
        };

        match tick {
            PlaybackTick::Frame { index, frame } => {
                self.display.frame = Some(frame);
                self.display.playback_position = Some((index, frame_count));
            }
            PlaybackTick::Finished => {
                self.cancel_scheduler();
                self.display.playback_position = None;
                self.phase = Phase::Completed;
                log::debug!("Playback {handle} finished");
            }
        }
    }

    // ========================================================================
    // Stream messages
    // ========================================================================

    fn apply_stream(&mut self, handle: HandleId, message: StreamMessage) {
        let Some(topic) = self
            .subscription
            .as_ref()
            .filter(|s| s.handle() == handle)
            .map(StreamSubscription::topic)
        else {
            log::debug!("Discarding message from retired subscription {handle}");
            return;
        };

        match (topic, message) {
            (Topic::Training, StreamMessage::Episode(event)) => self.record_episode(event),
            (Topic::Training, StreamMessage::Complete(note)) => self.finish_training(note),
            (Topic::Training, StreamMessage::Error(message)) => self.fail_training(message),
            (Topic::Playback, StreamMessage::Frames(frames)) => {
                self.close_subscription();
                self.start_scheduler(frames);
            }
            (Topic::Playback, StreamMessage::Error(message)) => self.fail_playback(message),
            (topic, message) => {
                log::warn!("Unexpected message on {topic} subscription {handle}: {message:?}");
            }
        }
    }

    fn record_episode(&mut self, event: EpisodeEvent) {
        let Some((total_episodes, window)) =
            self.session.as_ref().map(|s| (s.total_episodes, s.window))
        else {
            return;
        };

        if self.rewards.len() as u64 >= total_episodes {
            log::warn!(
                "Dropping episode {} beyond the configured {total_episodes}",
                event.episode
            );
            return;
        }
        if event.episode <= self.display.episode {
            log::warn!(
                "Dropping out-of-order episode {} after {}",
                event.episode,
                self.display.episode
            );
            return;
        }

        self.rewards.push(event.reward);
        if is_window_boundary(self.rewards.len(), window)
            && let Some(point) = Arc::make_mut(&mut self.chart).observe(&self.rewards, window)
        {
            log::debug!(
                "Chart point at episode {}: {:.4}",
                point.episode,
                point.average
            );
        }

        self.display.frame = Some(event.frame);
        self.display.episode = event.episode;
        self.display.learning_snapshot = event.learning_snapshot;
    }

    fn finish_training(&mut self, note: Option<String>) {
        let window = self.session.as_ref().map_or(0, |s| s.window);
        if let Some(point) = Arc::make_mut(&mut self.chart).complete(&self.rewards, window) {
            log::debug!("Trailing chart point at episode {}", point.episode);
        }

        self.close_subscription();
        self.phase = Phase::Completed;
        log::info!(
            "Training complete after {} episodes{}",
            self.rewards.len(),
            note.map(|n| format!(": {n}")).unwrap_or_default()
        );
    }

    fn fail_training(&mut self, message: String) {
        let error = LabError::transport(message);
        log::error!("Training failed: {error}");
        self.record_error(&error);
        self.close_subscription();
        self.phase = Phase::Idle;
    }

    fn fail_playback(&mut self, message: String) {
        let error = LabError::transport(message);
        log::error!("Playback failed: {error}");
        self.record_error(&error);
        self.close_subscription();
        self.phase = Phase::Completed;
    }

    // ========================================================================
    // Task ownership
    // ========================================================================

    fn close_subscription(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.close();
        }
    }

    fn cancel_scheduler(&mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.cancel();
        }
    }
}
