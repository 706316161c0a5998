//! Timer-driven replay of a fetched frame list
//!
//! The scheduler emits one frame per period, then one more period later a
//! finished tick, so the last frame stays on screen for a full period. Every
//! tick carries the scheduler's handle; after [`cancel`](PlaybackScheduler::cancel)
//! no further tick is sent.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::controller::{Event, PlaybackTick};
use crate::types::identifiers::HandleId;
use crate::types::messages::Frame;

/// Running playback of one frame list
#[derive(Debug)]
pub struct PlaybackScheduler {
    handle: HandleId,
    frame_count: usize,
    cancelled: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl PlaybackScheduler {
    /// Start replaying `frames` at `period` into `events`
    pub fn start(
        handle: HandleId,
        frames: Vec<Frame>,
        period: Duration,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        let frame_count = frames.len();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            for (index, frame) in frames.into_iter().enumerate() {
                interval.tick().await;
                if flag.load(Ordering::SeqCst) {
                    return;
                }
                let tick = PlaybackTick::Frame { index, frame };
                if events.send(Event::Playback { handle, tick }).is_err() {
                    return;
                }
            }

            interval.tick().await;
            if !flag.load(Ordering::SeqCst) {
                let _ = events.send(Event::Playback {
                    handle,
                    tick: PlaybackTick::Finished,
                });
            }
        });

        log::debug!("Playback {handle} started: {frame_count} frames every {period:?}");

        Self {
            handle,
            frame_count,
            cancelled,
            task: Some(task),
        }
    }

    /// Handle tagging this scheduler's ticks
    #[must_use]
    pub const fn handle(&self) -> HandleId {
        self.handle
    }

    /// Number of frames being replayed
    #[must_use]
    pub const fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Whether [`cancel`](Self::cancel) has been called
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Stop emitting; idempotent
    pub fn cancel(&mut self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        log::debug!("Playback {} cancelled", self.handle);
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
