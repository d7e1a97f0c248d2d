// Core types and traits for avplay playback sessions

pub mod callback;
pub mod engine;
pub mod error;
pub mod focus;
pub mod source;
pub mod state;
pub mod status;

// Re-export commonly used types
pub use callback::{ErrorListener, ListenerRegistry, StatusListener};
pub use engine::{EngineEvent, EngineEventSink, EngineFactory, MediaEngine, PlaybackPhase, RepeatMode};
pub use error::{EngineError, EngineErrorKind, Result, SessionError};
pub use focus::{AudioFocus, AudioFocusListener, SessionId, UnarbitratedFocus};
pub use source::{MediaSource, SourceKind};
pub use state::SessionState;
pub use status::{
    clip_millis, ControlFields, PlaybackStatus, StatusSnapshot, StatusUpdate,
    DEFAULT_PROGRESS_UPDATE_INTERVAL_MS,
};
