// Session lifecycle states and the transitions between them

use crate::engine::PlaybackPhase;
use serde::Serialize;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// No engine attached yet
    #[default]
    Unloaded,
    /// Engine attached, waiting for its first ready phase
    Loading,
    /// Loaded and ready, playback not started yet
    Ready,
    /// Engine is producing output
    Playing,
    /// Loaded, playback was started before and is now held
    Paused,
    /// Engine is waiting for data
    Buffering,
    /// Engine reached the end of the media
    Ended,
    /// Engine torn down; terminal
    Released,
}

impl SessionState {
    fn is_loaded_phase(self) -> bool {
        matches!(
            self,
            SessionState::Ready
                | SessionState::Playing
                | SessionState::Paused
                | SessionState::Buffering
                | SessionState::Ended
        )
    }

    /// Validate a state transition
    pub fn can_transition_to(self, next: SessionState) -> bool {
        match (self, next) {
            (SessionState::Released, _) => false,
            (_, SessionState::Released) => true,

            (SessionState::Unloaded, SessionState::Loading) => true,

            (SessionState::Loading, next) => next.is_loaded_phase(),

            (from, to) => from.is_loaded_phase() && to.is_loaded_phase(),
        }
    }

    /// Derive the state of a loaded session from what its engine reports
    pub fn derive(
        phase: PlaybackPhase,
        play_when_ready: bool,
        load_pending: bool,
        has_started: bool,
    ) -> SessionState {
        if load_pending {
            return SessionState::Loading;
        }
        match phase {
            PlaybackPhase::Buffering => SessionState::Buffering,
            PlaybackPhase::Ended => SessionState::Ended,
            PlaybackPhase::Ready if play_when_ready => SessionState::Playing,
            PlaybackPhase::Ready | PlaybackPhase::Idle if has_started => SessionState::Paused,
            PlaybackPhase::Ready | PlaybackPhase::Idle => SessionState::Ready,
        }
    }
}
