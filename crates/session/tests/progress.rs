mod common;

use avplay_session::{PlaybackPhase, StatusUpdate};
use common::*;
use std::thread;
use std::time::Duration;

#[test]
fn test_periodic_updates_while_playing() {
    let factory = FakeEngineFactory::new(OpenBehavior::Ready);
    let session = spawn_session(factory.clone(), FakeFocus::granting());
    let recorder = Recorder::new();
    session.set_status_update_listener(Some(recorder.clone()));
    session.load(StatusUpdate::new().with_should_play(true)).wait().unwrap();

    factory.probe().with(|r| r.position_ms = 3_000);
    assert!(eventually(|| recorder
        .statuses()
        .iter()
        .any(|s| s.position_millis() == Some(3_000))));
    assert!(eventually(|| recorder.status_count() >= 5));
    assert!(recorder.statuses().iter().all(|s| s.is_loaded));
}

#[test]
fn test_no_updates_while_paused() {
    let factory = FakeEngineFactory::new(OpenBehavior::Ready);
    let session = spawn_session(factory, FakeFocus::granting());
    session.load(StatusUpdate::new()).wait().unwrap();
    let recorder = Recorder::new();
    session.set_status_update_listener(Some(recorder.clone()));

    thread::sleep(Duration::from_millis(PROGRESS_INTERVAL_MS * 6));

    assert_eq!(recorder.status_count(), 0);
}

#[test]
fn test_no_updates_after_release() {
    let factory = FakeEngineFactory::new(OpenBehavior::Ready);
    let session = spawn_session(factory, FakeFocus::granting());
    let recorder = Recorder::new();
    session.set_status_update_listener(Some(recorder.clone()));
    session.load(StatusUpdate::new().with_should_play(true)).wait().unwrap();
    assert!(eventually(|| recorder.status_count() >= 2));

    session.release();
    thread::sleep(Duration::from_millis(PROGRESS_INTERVAL_MS * 2));
    let pushed = recorder.status_count();
    thread::sleep(Duration::from_millis(PROGRESS_INTERVAL_MS * 6));

    assert_eq!(recorder.status_count(), pushed);
}

#[test]
fn test_removing_listener_silences_updates() {
    let factory = FakeEngineFactory::new(OpenBehavior::Ready);
    let session = spawn_session(factory, FakeFocus::granting());
    let recorder = Recorder::new();
    session.set_status_update_listener(Some(recorder.clone()));
    session.load(StatusUpdate::new().with_should_play(true)).wait().unwrap();
    assert!(eventually(|| recorder.status_count() >= 2));

    session.set_status_update_listener(None);
    // Let a delivery already in flight finish
    thread::sleep(Duration::from_millis(PROGRESS_INTERVAL_MS * 2));
    let pushed = recorder.status_count();
    thread::sleep(Duration::from_millis(PROGRESS_INTERVAL_MS * 6));

    assert_eq!(recorder.status_count(), pushed);
}

#[test]
fn test_updates_stop_when_engine_stops_on_its_own() {
    let factory = FakeEngineFactory::new(OpenBehavior::Ready);
    let session = spawn_session(factory.clone(), FakeFocus::granting());
    let recorder = Recorder::new();
    session.set_status_update_listener(Some(recorder.clone()));
    session.load(StatusUpdate::new().with_should_play(true)).wait().unwrap();
    assert!(eventually(|| recorder.status_count() >= 2));

    let probe = factory.probe();
    probe.with(|r| r.play_when_ready = false);
    probe.enter_phase(PlaybackPhase::Ended);
    thread::sleep(Duration::from_millis(PROGRESS_INTERVAL_MS * 3));
    let pushed = recorder.status_count();
    thread::sleep(Duration::from_millis(PROGRESS_INTERVAL_MS * 6));

    assert_eq!(recorder.status_count(), pushed);
}

#[test]
fn test_interval_change_applies_to_running_updates() {
    let factory = FakeEngineFactory::new(OpenBehavior::Ready);
    let session = spawn_session(factory, FakeFocus::granting());
    let recorder = Recorder::new();
    session.set_status_update_listener(Some(recorder.clone()));
    session.load(StatusUpdate::new().with_should_play(true)).wait().unwrap();

    session
        .set_status(StatusUpdate::new().with_progress_update_interval_millis(5_000))
        .wait()
        .unwrap();
    // Let the tick scheduled under the old interval go by
    thread::sleep(Duration::from_millis(PROGRESS_INTERVAL_MS * 3));
    let pushed = recorder.status_count();
    thread::sleep(Duration::from_millis(PROGRESS_INTERVAL_MS * 6));

    assert_eq!(recorder.status_count(), pushed);
}
