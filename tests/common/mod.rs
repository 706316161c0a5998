//! Shared test fixtures: an in-memory `Engine` with scriptable streams

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rl_lab_controller::{
    Engine, Frame, LabError, LabOptions, ParameterSchema, ParameterSet, Phase, RawStream,
    Result, SessionController, SessionId, StartRequest, StartResponse, Topic,
};
use serde_json::{Value, json};
use tokio::sync::mpsc;

/// Stream opened by the controller, with the sending half kept for the test
pub struct OpenedStream {
    pub session_id: SessionId,
    pub topic: Topic,
    pub tx: mpsc::UnboundedSender<Result<Value>>,
}

/// Everything the fake engine has been asked to do, plus scripted answers
#[derive(Default)]
pub struct FakeState {
    pub starts: Vec<StartRequest>,
    pub sessions: Vec<SessionId>,
    pub resets: usize,
    pub previews: Vec<String>,
    pub schema_requests: Vec<(String, String)>,
    pub streams: Vec<OpenedStream>,
    pub fail_start: Option<String>,
    pub effective_episodes: Option<i64>,
    pub schema: Option<ParameterSchema>,
}

/// In-memory engine
#[derive(Default)]
pub struct FakeEngine {
    pub state: Mutex<FakeState>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_schema(schema: ParameterSchema) -> Arc<Self> {
        let engine = Self::default();
        engine.state.lock().schema = Some(schema);
        Arc::new(engine)
    }

    /// Sender feeding the most recently opened stream of `topic`
    pub fn sender(&self, topic: Topic) -> mpsc::UnboundedSender<Result<Value>> {
        self.state
            .lock()
            .streams
            .iter()
            .rev()
            .find(|s| s.topic == topic)
            .map(|s| s.tx.clone())
            .expect("stream opened")
    }

    /// Drop every sender of `topic`, ending those streams without a terminal message
    pub fn close_streams(&self, topic: Topic) {
        self.state.lock().streams.retain(|s| s.topic != topic);
    }

    pub fn start_count(&self) -> usize {
        self.state.lock().starts.len()
    }

    pub fn reset_count(&self) -> usize {
        self.state.lock().resets
    }

    pub fn stream_count(&self, topic: Topic) -> usize {
        self.state
            .lock()
            .streams
            .iter()
            .filter(|s| s.topic == topic)
            .count()
    }
}

impl Engine for FakeEngine {
    async fn start_session(&self, request: StartRequest) -> Result<StartResponse> {
        let mut state = self.state.lock();
        state.starts.push(request);
        if let Some(ref message) = state.fail_start {
            return Err(LabError::Engine {
                status: 500,
                message: message.clone(),
            });
        }

        let session_id = SessionId::new(uuid::Uuid::new_v4().to_string());
        state.sessions.push(session_id.clone());
        Ok(StartResponse {
            session_id,
            effective_config: state
                .effective_episodes
                .map(|n| ParameterSet::new().with("num_episodes", n)),
        })
    }

    fn open_stream(&self, session_id: &SessionId, topic: Topic) -> RawStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().streams.push(OpenedStream {
            session_id: session_id.clone(),
            topic,
            tx,
        });
        rx
    }

    async fn reset_session(&self) -> Result<()> {
        self.state.lock().resets += 1;
        Ok(())
    }

    async fn preview_frame(&self, environment: &str) -> Result<Frame> {
        self.state.lock().previews.push(environment.to_string());
        Ok(Frame::new(format!("preview:{environment}")))
    }

    async fn parameter_schema(&self, algorithm: &str, environment: &str) -> Result<ParameterSchema> {
        let mut state = self.state.lock();
        state
            .schema_requests
            .push((algorithm.to_string(), environment.to_string()));
        state
            .schema
            .clone()
            .ok_or_else(|| LabError::Engine {
                status: 400,
                message: format!("Unknown algorithm: {algorithm}"),
            })
    }

    async fn algorithms(&self) -> Result<Vec<String>> {
        Ok(vec!["Q-Learning".to_string(), "SARSA".to_string()])
    }

    async fn environments(&self) -> Result<Vec<String>> {
        Ok(vec![
            "FrozenLake-v1-NoSlip".to_string(),
            "Taxi-v3".to_string(),
        ])
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Controller over a shared fake engine with `num_episodes` configured
pub fn controller(engine: &Arc<FakeEngine>, num_episodes: i64) -> SessionController<FakeEngine> {
    let options = LabOptions::builder()
        .parameters(ParameterSet::new().with("num_episodes", num_episodes))
        .build();
    SessionController::with_shared_engine(Arc::clone(engine), options)
}

pub fn episode(n: u64, reward: f64) -> Value {
    json!({
        "status": "training",
        "episode": n,
        "reward": reward,
        "frame": format!("frame-{n}"),
        "learning_data": {"episode": n}
    })
}

pub fn complete() -> Value {
    json!({"status": "complete", "message": "Training finished"})
}

pub fn frames(count: usize) -> Value {
    let frames: Vec<String> = (0..count).map(|i| format!("play-{i}")).collect();
    json!({"status": "complete", "frames": frames, "num_frames": count})
}

/// Feed episodes `1..=count` with reward equal to the episode index
pub fn send_episodes(tx: &mpsc::UnboundedSender<Result<Value>>, count: u64) {
    for n in 1..=count {
        tx.send(Ok(episode(n, n as f64))).expect("stream open");
    }
}

/// Apply one queued event, failing the test if none arrives
pub async fn pump_one<E: Engine>(controller: &mut SessionController<E>) {
    tokio::time::timeout(Duration::from_secs(5), controller.pump())
        .await
        .expect("event before timeout")
        .expect("pump");
}

/// Pump until the controller leaves `phase`
pub async fn pump_while<E: Engine>(controller: &mut SessionController<E>, phase: Phase) {
    while controller.phase() == phase {
        pump_one(controller).await;
    }
}

/// Run a session with `count` episodes through to completion
pub async fn train_to_completion<E: Engine>(
    controller: &mut SessionController<E>,
    engine: &FakeEngine,
    count: u64,
) {
    controller.start().await.expect("start");
    let tx = engine.sender(Topic::Training);
    send_episodes(&tx, count);
    tx.send(Ok(complete())).expect("stream open");
    pump_while(controller, Phase::Training).await;
    assert_eq!(controller.phase(), Phase::Completed);
}

/// Let spawned tasks run without advancing time
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
