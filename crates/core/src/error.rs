// Error taxonomy for playback sessions and the engines they drive

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Broad classification of engine-reported failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// The source could not be read (network, file system, resource lookup)
    Io,
    /// The source was read but could not be decoded or rendered
    Decode,
    /// The engine has no adapter for this kind of source
    UnsupportedSource,
    /// The engine was driven while in a state that does not accept the call
    IllegalState,
    /// Anything else the engine chose to report
    Other,
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            EngineErrorKind::Io => "I/O error",
            EngineErrorKind::Decode => "Decoding error",
            EngineErrorKind::UnsupportedSource => "Unsupported source",
            EngineErrorKind::IllegalState => "Illegal engine state",
            EngineErrorKind::Other => "Engine error",
        };
        f.write_str(name)
    }
}

/// Failure reported by a media engine, either from a direct call or asynchronously
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Io, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Decode, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::UnsupportedSource, message)
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::IllegalState, message)
    }
}

/// Session error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// Null or malformed status/source document; nothing was changed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not valid in the session's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The engine could not open or decode the source (fatal)
    #[error("Load error: {0}")]
    LoadFailure(String),

    /// Applying a status mutation failed part way (recoverable)
    #[error("Set status error: {0}")]
    SetStatus(String),

    /// Audio focus was denied (recoverable, never reported to the host)
    #[error("Audio focus could not be acquired")]
    FocusNotAcquired,

    /// The engine failed after a successful load (fatal)
    #[error("Player error: {0}")]
    EngineRuntime(String),

    /// Direct engine call failure, before it is classified by the session
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The pending operation was discarded before it could complete
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// The caller stopped waiting for a pending result
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The session worker could not be started or is gone
    #[error("Session worker unavailable: {0}")]
    WorkerUnavailable(String),
}

impl SessionError {
    /// Stable code for host bridges that reject promises with a code and a message
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::InvalidArgument(_) | SessionError::SetStatus(_) => "E_AV_SETSTATUS",
            SessionError::InvalidState(_) => "E_AV_STATE",
            SessionError::LoadFailure(_) => "E_AV_LOAD",
            SessionError::FocusNotAcquired => "E_AV_FOCUS",
            SessionError::EngineRuntime(_) | SessionError::Engine(_) => "E_AV_PLAYER",
            SessionError::Cancelled(_) => "E_AV_CANCELLED",
            SessionError::Timeout(_) => "E_AV_TIMEOUT",
            SessionError::WorkerUnavailable(_) => "E_AV_UNAVAILABLE",
        }
    }
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
