//! Event loop driving for `SessionController`
//!
//! Hosts either hand the controller an intent channel and let [`run`] own it,
//! or call the intent methods themselves and pump queued events in between.
//!
//! [`run`]: SessionController::run

use tokio::sync::mpsc;

use crate::error::{LabError, Result};
use crate::transport::Engine;

use super::{Intent, SessionController};

impl<E: Engine> SessionController<E> {
    /// Wait for the next queued stream message or playback tick and apply it
    ///
    /// # Errors
    /// Returns `LabError::Transport` if the event queue is closed
    pub async fn pump(&mut self) -> Result<()> {
        let Some(event) = self.event_rx.recv().await else {
            return Err(LabError::transport("Controller event queue closed"));
        };
        self.dispatch(event).await
    }

    /// Apply every event already queued without waiting
    ///
    /// Returns how many events were applied. Intent errors are logged.
    pub async fn pump_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.event_rx.try_recv() {
            if let Err(e) = self.dispatch(event).await {
                log::warn!("Queued event failed: {e}");
            }
            applied += 1;
        }
        applied
    }

    /// Drive the controller until `intents` closes, then tear down
    ///
    /// Intent errors are logged; the resulting state is visible through
    /// [`subscribe`](Self::subscribe).
    pub async fn run(mut self, mut intents: mpsc::UnboundedReceiver<Intent>) {
        log::debug!("Controller loop started");
        self.load_preview().await;

        loop {
            tokio::select! {
                intent = intents.recv() => {
                    let Some(intent) = intent else {
                        break;
                    };
                    let name = intent.name();
                    if let Err(e) = self.dispatch(intent.into()).await {
                        log::warn!("Intent '{name}' failed: {e}");
                    }
                }
                Some(event) = self.event_rx.recv() => {
                    if let Err(e) = self.dispatch(event).await {
                        log::warn!("Event failed: {e}");
                    }
                }
            }
        }

        self.teardown().await;
        log::debug!("Controller loop stopped");
    }

    /// Close the subscription, cancel playback, and reset the engine
    ///
    /// Drops all session data and leaves the controller idle.
    pub async fn teardown(&mut self) {
        self.release_session().await;
        self.publish();
    }
}
