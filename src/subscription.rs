//! Push-stream subscriptions
//!
//! A [`StreamSubscription`] owns the background task that reads one engine
//! stream, parses each payload for its topic, and forwards the typed message
//! into the controller's event queue tagged with the subscription's handle.
//!
//! After [`close`](StreamSubscription::close) returns, the task forwards
//! nothing more. A message it had already queued still carries the retired
//! handle, and the controller drops it on arrival.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::controller::Event;
use crate::message::parse_message;
use crate::transport::{Engine, RawStream};
use crate::types::identifiers::{HandleId, SessionId};
use crate::types::messages::{StreamMessage, Topic};

/// Live subscription to one topic of one session
#[derive(Debug)]
pub struct StreamSubscription {
    handle: HandleId,
    topic: Topic,
    session_id: SessionId,
    closed: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl StreamSubscription {
    /// Open a subscription and start forwarding into `events`
    pub fn open<E: Engine>(
        engine: &E,
        handle: HandleId,
        session_id: &SessionId,
        topic: Topic,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        let raw = engine.open_stream(session_id, topic);
        let closed = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(forward_messages(
            raw,
            handle,
            topic,
            Arc::clone(&closed),
            events,
        ));

        log::debug!("Opened {topic} subscription {handle} for session {session_id}");

        Self {
            handle,
            topic,
            session_id: session_id.clone(),
            closed,
            task: Some(task),
        }
    }

    /// Handle tagging this subscription's messages
    #[must_use]
    pub const fn handle(&self) -> HandleId {
        self.handle
    }

    /// Subscribed topic
    #[must_use]
    pub const fn topic(&self) -> Topic {
        self.topic
    }

    /// Session this subscription reads
    #[must_use]
    pub const fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Stop forwarding; idempotent
    pub fn close(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        log::debug!("Closed {} subscription {}", self.topic, self.handle);
    }
}

impl Drop for StreamSubscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// Reader task: raw payloads in, handle-tagged typed messages out
///
/// Stops after forwarding a terminal message (completion, frame list, or
/// error). A stream that ends without one is reported as an error.
async fn forward_messages(
    mut raw: RawStream,
    handle: HandleId,
    topic: Topic,
    closed: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<Event>,
) {
    while let Some(item) = raw.recv().await {
        if closed.load(Ordering::SeqCst) {
            return;
        }

        let message = match item {
            Ok(value) => match parse_message(topic, value) {
                Ok(message) => message,
                Err(e) => {
                    log::warn!("[{handle}] {e}");
                    continue;
                }
            },
            Err(e) => StreamMessage::Error(e.to_string()),
        };

        let terminal = !matches!(message, StreamMessage::Episode(_));
        if events.send(Event::Stream { handle, message }).is_err() || terminal {
            return;
        }
    }

    if !closed.load(Ordering::SeqCst) {
        let _ = events.send(Event::Stream {
            handle,
            message: StreamMessage::Error(format!("{topic} stream closed unexpectedly")),
        });
    }
}
