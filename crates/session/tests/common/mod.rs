// Scriptable doubles shared by the session integration tests
#![allow(dead_code)]

use avplay_session::{
    AudioFocus, EngineError, EngineEvent, EngineEventSink, EngineFactory, ErrorListener,
    MediaEngine, MediaSource, PlaybackPhase, PlaybackSession, RepeatMode, SessionConfig,
    SessionContext, SessionId, StatusListener, StatusSnapshot,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const IMPLEMENTATION: &str = "FakeEngine";
pub const PROGRESS_INTERVAL_MS: u64 = 20;

/// What a fake engine does when opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenBehavior {
    /// Reports not-loading and the ready phase right away
    Ready,
    /// Accepts the source but never reports anything on its own
    Silent,
    /// `open` itself fails
    FailOnOpen,
    /// `open` succeeds, then an error event follows
    FailAsync,
}

#[derive(Debug)]
pub struct EngineRecord {
    pub phase: PlaybackPhase,
    pub play_when_ready: bool,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub repeat_mode: RepeatMode,
    pub duration_ms: i64,
    pub position_ms: i64,
    pub buffered_ms: i64,
    pub calls: Vec<String>,
    pub release_count: usize,
    pub fail_on: Option<&'static str>,
    sink: Option<EngineEventSink>,
}

/// Test-side view of one fake engine
#[derive(Clone)]
pub struct EngineProbe {
    record: Arc<Mutex<EngineRecord>>,
}

impl EngineProbe {
    fn new(duration_ms: i64) -> Self {
        Self {
            record: Arc::new(Mutex::new(EngineRecord {
                phase: PlaybackPhase::Idle,
                play_when_ready: false,
                rate: 1.0,
                pitch: 1.0,
                volume: 1.0,
                repeat_mode: RepeatMode::Off,
                duration_ms,
                position_ms: 0,
                buffered_ms: 0,
                calls: Vec::new(),
                release_count: 0,
                fail_on: None,
                sink: None,
            })),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut EngineRecord) -> R) -> R {
        f(&mut self.record.lock())
    }

    pub fn calls(&self) -> Vec<String> {
        self.with(|r| r.calls.clone())
    }

    pub fn clear_calls(&self) {
        self.with(|r| r.calls.clear());
    }

    pub fn fail_on(&self, method: Option<&'static str>) {
        self.with(|r| r.fail_on = method);
    }

    pub fn is_released(&self) -> bool {
        self.with(|r| r.release_count > 0)
    }

    pub fn emit(&self, event: EngineEvent) {
        let sink = self.with(|r| r.sink.clone());
        if let Some(sink) = sink {
            sink.emit(event);
        }
    }

    /// Move the engine to `phase` and report it
    pub fn enter_phase(&self, phase: PlaybackPhase) {
        self.with(|r| r.phase = phase);
        self.emit(EngineEvent::PhaseChanged(phase));
    }
}

pub struct FakeEngine {
    probe: EngineProbe,
    behavior: OpenBehavior,
}

impl FakeEngine {
    fn call(&self, name: String) -> Result<(), EngineError> {
        let mut record = self.probe.record.lock();
        let failing = record
            .fail_on
            .is_some_and(|method| name.starts_with(method));
        record.calls.push(name.clone());
        if failing {
            return Err(EngineError::illegal_state(format!("{} refused", name)));
        }
        Ok(())
    }
}

impl MediaEngine for FakeEngine {
    fn open(&mut self, _source: &MediaSource, events: EngineEventSink) -> Result<(), EngineError> {
        self.call("open".to_string())?;
        self.probe.with(|r| r.sink = Some(events.clone()));

        match self.behavior {
            OpenBehavior::Ready => {
                self.probe.with(|r| r.phase = PlaybackPhase::Ready);
                events.loading_changed(false);
                events.phase_changed(PlaybackPhase::Ready);
            }
            OpenBehavior::Silent => {}
            OpenBehavior::FailOnOpen => return Err(EngineError::io("source unreachable")),
            OpenBehavior::FailAsync => events.error(EngineError::io("source unreachable")),
        }
        Ok(())
    }

    fn set_play_when_ready(&mut self, play_when_ready: bool) -> Result<(), EngineError> {
        self.call(format!("set_play_when_ready({})", play_when_ready))?;
        self.probe.with(|r| r.play_when_ready = play_when_ready);
        Ok(())
    }

    fn set_playback_parameters(&mut self, rate: f32, pitch: f32) -> Result<(), EngineError> {
        self.call("set_playback_parameters".to_string())?;
        self.probe.with(|r| {
            r.rate = rate;
            r.pitch = pitch;
        });
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), EngineError> {
        self.call("set_volume".to_string())?;
        self.probe.with(|r| r.volume = volume);
        Ok(())
    }

    fn set_repeat_mode(&mut self, mode: RepeatMode) -> Result<(), EngineError> {
        self.call("set_repeat_mode".to_string())?;
        self.probe.with(|r| r.repeat_mode = mode);
        Ok(())
    }

    fn seek_to(&mut self, position_ms: u64) -> Result<(), EngineError> {
        self.call(format!("seek_to({})", position_ms))?;
        self.probe.with(|r| r.position_ms = position_ms as i64);
        Ok(())
    }

    fn duration_ms(&self) -> i64 {
        self.probe.with(|r| r.duration_ms)
    }

    fn position_ms(&self) -> i64 {
        self.probe.with(|r| r.position_ms)
    }

    fn buffered_position_ms(&self) -> i64 {
        self.probe.with(|r| r.buffered_ms)
    }

    fn play_when_ready(&self) -> bool {
        self.probe.with(|r| r.play_when_ready)
    }

    fn playback_phase(&self) -> PlaybackPhase {
        self.probe.with(|r| r.phase)
    }

    fn release(&mut self) -> Result<(), EngineError> {
        self.probe.with(|r| {
            r.release_count += 1;
            r.calls.push("release".to_string());
        });
        Ok(())
    }
}

pub struct FakeEngineFactory {
    behavior: OpenBehavior,
    duration_ms: i64,
    reject_sources: bool,
    probes: Mutex<Vec<EngineProbe>>,
}

impl FakeEngineFactory {
    pub fn new(behavior: OpenBehavior) -> Arc<Self> {
        Self::build(behavior, 10_000, false)
    }

    pub fn with_duration(behavior: OpenBehavior, duration_ms: i64) -> Arc<Self> {
        Self::build(behavior, duration_ms, false)
    }

    pub fn rejecting() -> Arc<Self> {
        Self::build(OpenBehavior::Ready, 10_000, true)
    }

    fn build(behavior: OpenBehavior, duration_ms: i64, reject_sources: bool) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            duration_ms,
            reject_sources,
            probes: Mutex::new(Vec::new()),
        })
    }

    pub fn engines_created(&self) -> usize {
        self.probes.lock().len()
    }

    pub fn probe(&self) -> EngineProbe {
        self.probes
            .lock()
            .last()
            .cloned()
            .expect("no engine was created")
    }
}

impl EngineFactory for FakeEngineFactory {
    fn implementation_name(&self) -> &str {
        IMPLEMENTATION
    }

    fn create_engine(&self, source: &MediaSource) -> Result<Box<dyn MediaEngine>, EngineError> {
        if self.reject_sources {
            return Err(EngineError::unsupported(format!(
                "no adapter for {}",
                source.uri()
            )));
        }
        let probe = EngineProbe::new(self.duration_ms);
        self.probes.lock().push(probe.clone());
        Ok(Box::new(FakeEngine {
            probe,
            behavior: self.behavior,
        }))
    }
}

/// Focus arbiter double with a switchable grant decision and ducking factor
pub struct FakeFocus {
    granted: AtomicBool,
    requests: AtomicUsize,
    requesters: Mutex<Vec<SessionId>>,
    abandons: Mutex<Vec<bool>>,
    claims: Mutex<Vec<(SessionId, bool)>>,
    duck: Mutex<f32>,
}

impl FakeFocus {
    pub fn granting() -> Arc<Self> {
        Arc::new(Self {
            granted: AtomicBool::new(true),
            requests: AtomicUsize::new(0),
            requesters: Mutex::new(Vec::new()),
            abandons: Mutex::new(Vec::new()),
            claims: Mutex::new(Vec::new()),
            duck: Mutex::new(1.0),
        })
    }

    pub fn set_granted(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }

    /// Scale every unmuted volume by `factor`
    pub fn set_duck(&self, factor: f32) {
        *self.duck.lock() = factor;
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn requesters(&self) -> Vec<SessionId> {
        self.requesters.lock().clone()
    }

    pub fn abandons(&self) -> Vec<bool> {
        self.abandons.lock().clone()
    }

    /// Last reported claim of `session`
    pub fn claim_of(&self, session: SessionId) -> Option<bool> {
        self.claims
            .lock()
            .iter()
            .rev()
            .find(|(id, _)| *id == session)
            .map(|(_, required)| *required)
    }
}

impl AudioFocus for FakeFocus {
    fn request_focus(&self, session: SessionId) -> bool {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.requesters.lock().push(session);
        self.granted.load(Ordering::SeqCst)
    }

    fn abandon_if_unused(&self, session: SessionId, still_required: bool) {
        self.abandons.lock().push(still_required);
        self.claims.lock().push((session, still_required));
    }

    fn volume_for(&self, _session: SessionId, is_muted: bool, volume: f32) -> f32 {
        if is_muted {
            0.0
        } else {
            volume * *self.duck.lock()
        }
    }
}

/// Records everything a session pushes
#[derive(Default)]
pub struct Recorder {
    statuses: Mutex<Vec<StatusSnapshot>>,
    errors: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn statuses(&self) -> Vec<StatusSnapshot> {
        self.statuses.lock().clone()
    }

    pub fn status_count(&self) -> usize {
        self.statuses.lock().len()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

impl StatusListener for Recorder {
    fn on_status_update(&self, status: &StatusSnapshot) {
        self.statuses.lock().push(status.clone());
    }
}

impl ErrorListener for Recorder {
    fn on_error(&self, error: &str) {
        self.errors.lock().push(error.to_string());
    }
}

pub fn spawn_session(factory: Arc<FakeEngineFactory>, focus: Arc<FakeFocus>) -> PlaybackSession {
    let config = SessionConfig {
        progress_update_interval_millis: PROGRESS_INTERVAL_MS,
        ..SessionConfig::default()
    };
    let context = SessionContext::new(factory, focus).with_config(config);
    let source = MediaSource::new("file:///music/track.mp3").unwrap();
    PlaybackSession::spawn(source, context).unwrap()
}

/// Poll `condition` until it holds or two seconds pass
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
}
