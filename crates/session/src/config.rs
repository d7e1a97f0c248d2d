// Session configuration and the host-owned collaborators every session is built with

use avplay_core::{
    AudioFocus, EngineFactory, Result, SessionError, UnarbitratedFocus,
    DEFAULT_PROGRESS_UPDATE_INTERVAL_MS,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default name for session worker threads
pub const DEFAULT_WORKER_THREAD_NAME: &str = "avplay-session";

/// Tunables shared by all sessions a host creates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Progress cadence until the host sets `progressUpdateIntervalMillis`
    pub progress_update_interval_millis: u64,
    pub worker_thread_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            progress_update_interval_millis: DEFAULT_PROGRESS_UPDATE_INTERVAL_MS,
            worker_thread_name: DEFAULT_WORKER_THREAD_NAME.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(json)
            .map_err(|e| SessionError::InvalidArgument(format!("Malformed session config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.progress_update_interval_millis == 0 {
            return Err(SessionError::InvalidArgument(
                "progressUpdateIntervalMillis must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn progress_update_interval(&self) -> Duration {
        Duration::from_millis(self.progress_update_interval_millis)
    }
}

/// Explicitly injected dependencies for a session
///
/// Built once by the host and cloned into each session, instead of process-wide factories.
#[derive(Clone)]
pub struct SessionContext {
    pub engines: Arc<dyn EngineFactory>,
    pub focus: Arc<dyn AudioFocus>,
    pub config: SessionConfig,
}

impl SessionContext {
    pub fn new(engines: Arc<dyn EngineFactory>, focus: Arc<dyn AudioFocus>) -> Self {
        Self {
            engines,
            focus,
            config: SessionConfig::default(),
        }
    }

    /// Context for hosts without audio focus arbitration
    pub fn unarbitrated(engines: Arc<dyn EngineFactory>) -> Self {
        Self::new(engines, Arc::new(UnarbitratedFocus))
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("engines", &self.engines.implementation_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
