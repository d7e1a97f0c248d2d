// Playback session state machine over an external media engine
//
// A session owns one engine and serializes every engine access on its own worker thread.
// It pushes periodic status snapshots while playing and cooperates with a shared audio
// focus arbiter. Listeners are called from a separate thread.

pub mod config;
mod dispatch;
pub mod pending;
pub mod poller;
pub mod session;
mod worker;

// Re-exports
pub use avplay_core::*;
pub use config::{SessionConfig, SessionContext, DEFAULT_WORKER_THREAD_NAME};
pub use pending::Pending;
pub use poller::ProgressPoller;
pub use session::{PlaybackSession, WeakPlaybackSession};
