//! Integration tests for policy replay
//!
//! Uses a paused clock so scheduler timing is deterministic.

mod common;

use std::time::Duration;

use common::{
    FakeEngine, controller, frames, init_logging, pump_one, settle, train_to_completion,
};
use rl_lab_controller::{ErrorKind, Event, HandleId, Phase, PlaybackScheduler, PlaybackTick, Topic};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Paused-clock timers fire on their deadline, give or take a millisecond
fn assert_period(elapsed: Duration, expected_ms: u64) {
    let expected = Duration::from_millis(expected_ms);
    assert!(
        elapsed >= expected && elapsed <= expected + Duration::from_millis(5),
        "elapsed {elapsed:?}, expected {expected:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_playback_runs_to_completion() {
    init_logging();
    let engine = FakeEngine::new();
    let mut controller = controller(&engine, 10);
    train_to_completion(&mut controller, &engine, 10).await;

    controller.play_policy().await.expect("play");
    assert_eq!(controller.phase(), Phase::PlaybackPending);
    engine
        .sender(Topic::Playback)
        .send(Ok(frames(2)))
        .expect("send");
    pump_one(&mut controller).await;
    assert_eq!(controller.phase(), Phase::Playing);
    assert!(controller.subscription_handle().is_none());
    assert!(controller.playback_handle().is_some());

    let started = Instant::now();
    pump_one(&mut controller).await;
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.current_frame.as_ref().map(|f| f.as_str()), Some("play-0"));
    assert_eq!(snapshot.playback_position, Some((0, 2)));
    assert_period(started.elapsed(), 200);

    pump_one(&mut controller).await;
    assert_eq!(controller.snapshot().playback_position, Some((1, 2)));

    // Last frame stays up for a full period
    pump_one(&mut controller).await;
    assert_period(started.elapsed(), 600);
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, Phase::Completed);
    assert_eq!(snapshot.current_frame.as_ref().map(|f| f.as_str()), Some("play-1"));
    assert_eq!(snapshot.playback_position, None);
    assert!(controller.playback_handle().is_none());

    // Training results survive a replay
    assert_eq!(snapshot.rewards_received, 10);
    assert_eq!(snapshot.chart.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_playing_emits_nothing_further() {
    init_logging();
    let engine = FakeEngine::new();
    let mut controller = controller(&engine, 10);
    train_to_completion(&mut controller, &engine, 10).await;

    controller.play_policy().await.expect("play");
    engine
        .sender(Topic::Playback)
        .send(Ok(frames(5)))
        .expect("send");
    pump_one(&mut controller).await;
    pump_one(&mut controller).await;
    assert_eq!(controller.phase(), Phase::Playing);
    assert_eq!(controller.snapshot().playback_position, Some((0, 5)));

    controller.stop().await.expect("stop");
    assert_eq!(controller.phase(), Phase::Idle);

    tokio::time::advance(Duration::from_secs(2)).await;
    settle().await;
    assert_eq!(controller.pump_pending().await, 0);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, Phase::Idle);
    assert_eq!(
        snapshot.current_frame.as_ref().map(|f| f.as_str()),
        Some("preview:FrozenLake-v1-NoSlip")
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_playback_returns_to_completed() {
    init_logging();
    let engine = FakeEngine::new();
    let mut controller = controller(&engine, 10);
    train_to_completion(&mut controller, &engine, 10).await;

    // While waiting for the frame list
    controller.play_policy().await.expect("play");
    controller.stop_playback().await.expect("stop playback");
    assert_eq!(controller.phase(), Phase::Completed);
    assert!(controller.subscription_handle().is_none());

    // While playing
    controller.play_policy().await.expect("play again");
    engine
        .sender(Topic::Playback)
        .send(Ok(frames(3)))
        .expect("send");
    pump_one(&mut controller).await;
    assert_eq!(controller.phase(), Phase::Playing);
    controller.stop_playback().await.expect("stop playback");
    assert_eq!(controller.phase(), Phase::Completed);

    tokio::time::advance(Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(controller.pump_pending().await, 0);
    assert_eq!(controller.phase(), Phase::Completed);
    assert!(controller.snapshot().session_id.is_some());

    // Outside playback it does nothing
    controller.stop_playback().await.expect("no-op");
    assert_eq!(controller.phase(), Phase::Completed);
}

#[tokio::test]
async fn test_empty_frame_list_completes_immediately() {
    init_logging();
    let engine = FakeEngine::new();
    let mut controller = controller(&engine, 10);
    train_to_completion(&mut controller, &engine, 10).await;

    controller.play_policy().await.expect("play");
    engine
        .sender(Topic::Playback)
        .send(Ok(frames(0)))
        .expect("send");
    pump_one(&mut controller).await;

    assert_eq!(controller.phase(), Phase::Completed);
    assert!(controller.playback_handle().is_none());
}

#[tokio::test]
async fn test_playback_error_returns_to_completed() {
    init_logging();
    let engine = FakeEngine::new();
    let mut controller = controller(&engine, 10);
    train_to_completion(&mut controller, &engine, 10).await;

    controller.play_policy().await.expect("play");
    engine
        .sender(Topic::Playback)
        .send(Ok(json!({"status": "error", "message": "No trained agent"})))
        .expect("send");
    pump_one(&mut controller).await;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, Phase::Completed);
    let last = snapshot.last_error.expect("surfaced");
    assert_eq!(last.kind, ErrorKind::Transport);
    assert!(last.message.contains("No trained agent"));

    // A new replay clears it
    controller.play_policy().await.expect("retry");
    assert!(controller.snapshot().last_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_stale_ticks_are_discarded() {
    init_logging();
    let engine = FakeEngine::new();
    let mut controller = controller(&engine, 10);
    train_to_completion(&mut controller, &engine, 10).await;

    controller.play_policy().await.expect("play");
    engine
        .sender(Topic::Playback)
        .send(Ok(frames(3)))
        .expect("send");
    pump_one(&mut controller).await;
    let current = controller.playback_handle().expect("scheduler");

    controller
        .event_sender()
        .send(Event::Playback {
            handle: HandleId::new(current.get() + 100),
            tick: PlaybackTick::Finished,
        })
        .expect("queue open");
    pump_one(&mut controller).await;
    assert_eq!(controller.phase(), Phase::Playing);
    assert_eq!(controller.playback_handle(), Some(current));
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_cancel_stops_ticks() {
    init_logging();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let list = (0..4)
        .map(|i| rl_lab_controller::Frame::new(format!("f{i}")))
        .collect();
    let mut scheduler =
        PlaybackScheduler::start(HandleId::new(7), list, Duration::from_millis(200), tx);
    assert_eq!(scheduler.frame_count(), 4);

    let first = rx.recv().await.expect("tick");
    assert!(matches!(
        first,
        Event::Playback { tick: PlaybackTick::Frame { index: 0, .. }, .. }
    ));

    scheduler.cancel();
    scheduler.cancel();
    assert!(scheduler.is_cancelled());

    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;
    assert!(rx.try_recv().is_err());
}
