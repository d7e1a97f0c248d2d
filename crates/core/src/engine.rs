// Media engine capability interface
// The concrete decode/render pipeline lives outside this workspace; sessions only see this trait.

use crate::error::EngineError;
use crate::source::MediaSource;
use std::fmt;
use std::sync::Arc;

/// Playback phase as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// Nothing prepared, or the engine was stopped
    Idle,
    /// Waiting for enough data to continue
    Buffering,
    /// Able to render immediately
    Ready,
    /// Reached the end of the media
    Ended,
}

/// Engine repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatMode {
    Off,
    All,
}

impl RepeatMode {
    pub fn from_looping(is_looping: bool) -> Self {
        if is_looping {
            RepeatMode::All
        } else {
            RepeatMode::Off
        }
    }
}

/// Events an engine delivers asynchronously after `open`
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The engine moved to a new playback phase
    PhaseChanged(PlaybackPhase),
    /// The engine started or stopped loading data
    LoadingChanged(bool),
    /// The engine hit an I/O or decode failure
    Error(EngineError),
}

/// Delivery handle given to an engine when it is opened
///
/// Emitting never blocks and never calls back into the engine, so an engine may emit from
/// inside any of its own methods, on any thread.
#[derive(Clone)]
pub struct EngineEventSink {
    deliver: Arc<dyn Fn(EngineEvent) + Send + Sync>,
}

impl EngineEventSink {
    pub fn new<F>(deliver: F) -> Self
    where
        F: Fn(EngineEvent) + Send + Sync + 'static,
    {
        Self {
            deliver: Arc::new(deliver),
        }
    }

    pub fn emit(&self, event: EngineEvent) {
        (self.deliver)(event);
    }

    pub fn phase_changed(&self, phase: PlaybackPhase) {
        self.emit(EngineEvent::PhaseChanged(phase));
    }

    pub fn loading_changed(&self, is_loading: bool) {
        self.emit(EngineEvent::LoadingChanged(is_loading));
    }

    pub fn error(&self, error: EngineError) {
        self.emit(EngineEvent::Error(error));
    }
}

impl fmt::Debug for EngineEventSink {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EngineEventSink").finish_non_exhaustive()
    }
}

/// Media engine trait
/// A session owns exactly one engine and only calls it from its own worker thread.
pub trait MediaEngine: Send {
    /// Start preparing `source`. Readiness and failures arrive later through `events`.
    fn open(&mut self, source: &MediaSource, events: EngineEventSink) -> Result<(), EngineError>;

    /// Whether the engine should render as soon as it is ready
    fn set_play_when_ready(&mut self, play_when_ready: bool) -> Result<(), EngineError>;

    /// Set playback speed and pitch (1.0 = unchanged)
    fn set_playback_parameters(&mut self, rate: f32, pitch: f32) -> Result<(), EngineError>;

    /// Set output volume (0.0 - 1.0)
    fn set_volume(&mut self, volume: f32) -> Result<(), EngineError>;

    fn set_repeat_mode(&mut self, mode: RepeatMode) -> Result<(), EngineError>;

    /// Seek to a position in milliseconds
    fn seek_to(&mut self, position_ms: u64) -> Result<(), EngineError>;

    /// Raw duration in milliseconds; may be negative when unknown
    fn duration_ms(&self) -> i64;

    /// Raw position in milliseconds; not guaranteed to lie within the duration
    fn position_ms(&self) -> i64;

    /// Raw buffered position in milliseconds; not guaranteed to lie within the duration
    fn buffered_position_ms(&self) -> i64;

    fn play_when_ready(&self) -> bool;

    fn playback_phase(&self) -> PlaybackPhase;

    /// Release all resources; the engine is dropped right after
    fn release(&mut self) -> Result<(), EngineError>;
}

/// Engine factory trait
/// Selects and builds the engine adapter for a source, once per load.
pub trait EngineFactory: Send + Sync {
    /// Name reported in every status snapshot of sessions using this factory
    fn implementation_name(&self) -> &str;

    fn create_engine(&self, source: &MediaSource) -> Result<Box<dyn MediaEngine>, EngineError>;
}
