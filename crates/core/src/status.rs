// Status model: host mutation requests, stored control fields and immutable snapshots

use crate::error::{Result, SessionError};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Default progress update cadence
pub const DEFAULT_PROGRESS_UPDATE_INTERVAL_MS: u64 = 500;

/// Sparse status mutation request
///
/// Only present fields are applied. Unknown document keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    #[serde(default, deserialize_with = "deserialize_millis")]
    pub progress_update_interval_millis: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_millis")]
    pub position_millis: Option<u64>,
    pub should_play: Option<bool>,
    pub rate: Option<f32>,
    pub should_correct_pitch: Option<bool>,
    pub volume: Option<f32>,
    pub is_muted: Option<bool>,
    pub is_looping: Option<bool>,
}

// Hosts may send milliseconds as floating point; fractions are dropped.
fn deserialize_millis<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer)?
        .map(|millis| {
            if millis.is_finite() && millis >= 0.0 {
                Ok(millis as u64)
            } else {
                Err(D::Error::custom(format!(
                    "expected a non-negative number of milliseconds, got {}",
                    millis
                )))
            }
        })
        .transpose()
}

impl StatusUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a host status document
    ///
    /// A null or non-object document, a mistyped field, or an out-of-range value is an
    /// `InvalidArgument` error.
    pub fn from_document(document: &Value) -> Result<Self> {
        match document {
            Value::Null => {
                return Err(SessionError::InvalidArgument(
                    "Cannot set null status.".to_string(),
                ))
            }
            Value::Object(_) => {}
            other => {
                return Err(SessionError::InvalidArgument(format!(
                    "Status must be an object, got {}",
                    other
                )))
            }
        }

        let update: StatusUpdate = serde_json::from_value(document.clone())
            .map_err(|e| SessionError::InvalidArgument(format!("Malformed status: {}", e)))?;
        update.validate()?;
        Ok(update)
    }

    pub fn validate(&self) -> Result<()> {
        if self.progress_update_interval_millis == Some(0) {
            return Err(SessionError::InvalidArgument(
                "progressUpdateIntervalMillis must be greater than zero".to_string(),
            ));
        }
        if let Some(rate) = self.rate {
            if !rate.is_finite() || rate < 0.0 {
                return Err(SessionError::InvalidArgument(format!(
                    "rate must be a non-negative number, got {}",
                    rate
                )));
            }
        }
        if let Some(volume) = self.volume {
            if !(0.0..=1.0).contains(&volume) {
                return Err(SessionError::InvalidArgument(format!(
                    "volume must be within [0, 1], got {}",
                    volume
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn with_progress_update_interval_millis(mut self, millis: u64) -> Self {
        self.progress_update_interval_millis = Some(millis);
        self
    }

    pub fn with_position_millis(mut self, millis: u64) -> Self {
        self.position_millis = Some(millis);
        self
    }

    pub fn with_should_play(mut self, should_play: bool) -> Self {
        self.should_play = Some(should_play);
        self
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_should_correct_pitch(mut self, should_correct_pitch: bool) -> Self {
        self.should_correct_pitch = Some(should_correct_pitch);
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_muted(mut self, is_muted: bool) -> Self {
        self.is_muted = Some(is_muted);
        self
    }

    pub fn with_looping(mut self, is_looping: bool) -> Self {
        self.is_looping = Some(is_looping);
        self
    }
}

/// Host-settable fields as stored by a session
#[derive(Debug, Clone, PartialEq)]
pub struct ControlFields {
    pub progress_update_interval_millis: u64,
    pub should_play: bool,
    pub rate: f32,
    pub should_correct_pitch: bool,
    pub volume: f32,
    pub is_muted: bool,
    pub is_looping: bool,
}

impl Default for ControlFields {
    fn default() -> Self {
        Self {
            progress_update_interval_millis: DEFAULT_PROGRESS_UPDATE_INTERVAL_MS,
            should_play: false,
            rate: 1.0,
            should_correct_pitch: false,
            volume: 1.0,
            is_muted: false,
            is_looping: false,
        }
    }
}

impl ControlFields {
    pub fn with_progress_interval(progress_update_interval_millis: u64) -> Self {
        Self {
            progress_update_interval_millis,
            ..Self::default()
        }
    }

    /// Effective "should be producing output" condition
    pub fn should_player_play(&self) -> bool {
        self.should_play && self.rate > 0.0
    }

    /// Store the playback intent fields present in `update`
    pub fn merge_playback_intent(&mut self, update: &StatusUpdate) {
        if let Some(should_play) = update.should_play {
            self.should_play = should_play;
        }
        if let Some(rate) = update.rate {
            self.rate = rate;
        }
        if let Some(should_correct_pitch) = update.should_correct_pitch {
            self.should_correct_pitch = should_correct_pitch;
        }
        if let Some(volume) = update.volume {
            self.volume = volume;
        }
        if let Some(is_muted) = update.is_muted {
            self.is_muted = is_muted;
        }
    }

    /// Pitch stays at 1.0 when correcting, otherwise it follows the rate
    pub fn pitch(&self) -> f32 {
        if self.should_correct_pitch {
            1.0
        } else {
            self.rate
        }
    }
}

/// Clip a raw engine value into `[0, duration]`; a negative duration clips to zero
pub fn clip_millis(value: i64, duration: i64) -> u64 {
    value.clamp(0, duration.max(0)) as u64
}

/// Fields only present while an engine is attached
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
    pub uri: String,
    pub progress_update_interval_millis: u64,
    pub duration_millis: u64,
    pub position_millis: u64,
    pub playable_duration_millis: u64,
    pub should_play: bool,
    pub is_playing: bool,
    pub is_buffering: bool,
    pub rate: f32,
    pub should_correct_pitch: bool,
    pub volume: f32,
    pub is_muted: bool,
    pub is_looping: bool,
    pub did_just_finish: bool,
}

/// Immutable point-in-time status document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub is_loaded: bool,
    pub implementation: String,
    #[serde(flatten)]
    pub playback: Option<PlaybackStatus>,
}

impl StatusSnapshot {
    pub fn unloaded(implementation: impl Into<String>) -> Self {
        Self {
            is_loaded: false,
            implementation: implementation.into(),
            playback: None,
        }
    }

    pub fn loaded(implementation: impl Into<String>, playback: PlaybackStatus) -> Self {
        Self {
            is_loaded: true,
            implementation: implementation.into(),
            playback: Some(playback),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| p.is_playing)
    }

    pub fn is_buffering(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| p.is_buffering)
    }

    pub fn did_just_finish(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| p.did_just_finish)
    }

    pub fn position_millis(&self) -> Option<u64> {
        self.playback.as_ref().map(|p| p.position_millis)
    }

    pub fn duration_millis(&self) -> Option<u64> {
        self.playback.as_ref().map(|p| p.duration_millis)
    }

    /// Mark this snapshot as the one accompanying an end-of-media transition
    pub fn with_did_just_finish(mut self) -> Self {
        if let Some(playback) = self.playback.as_mut() {
            playback.did_just_finish = true;
        }
        self
    }

    pub fn to_document(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
