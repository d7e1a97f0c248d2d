// Audio focus collaborator contract
// The arbitration policy is owned by the host; sessions only request, abandon and react.

use std::fmt;

/// Identity a session presents to the focus arbiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Process-wide audio focus arbiter shared by all sessions
pub trait AudioFocus: Send + Sync {
    /// Ask for exclusive audible output on behalf of `session`. `false` means denied.
    fn request_focus(&self, session: SessionId) -> bool;

    /// Called after every session state change. The arbiter drops `session`'s claim when
    /// `still_required` is false and gives focus up once no session holds a claim.
    fn abandon_if_unused(&self, session: SessionId, still_required: bool);

    /// Volume to hand the engine for the nominal `volume` and mute flag, after any
    /// ducking the arbiter applies
    fn volume_for(&self, _session: SessionId, is_muted: bool, volume: f32) -> f32 {
        if is_muted {
            0.0
        } else {
            volume
        }
    }
}

/// Inbound focus events, delivered by the arbiter to each registered session
///
/// None of these block on the session; an arbiter may call them from inside its own
/// `AudioFocus` methods.
pub trait AudioFocusListener: Send + Sync {
    fn on_focus_lost(&self);

    fn on_focus_gained(&self);

    /// The arbiter's ducking changed; the session re-applies `volume_for` to its engine
    fn on_volume_policy_changed(&self);

    /// Whether the session currently needs focus, as last published by the session
    fn requires_audio_focus(&self) -> bool;
}

/// Focus policy for hosts without arbitration: always granted, never ducked
#[derive(Debug, Clone, Copy, Default)]
pub struct UnarbitratedFocus;

impl AudioFocus for UnarbitratedFocus {
    fn request_focus(&self, _session: SessionId) -> bool {
        true
    }

    fn abandon_if_unused(&self, _session: SessionId, _still_required: bool) {}
}
