// Host-facing playback session handle

use crate::config::SessionContext;
use crate::dispatch::Dispatcher;
use crate::pending::Pending;
use crate::worker::{Command, SessionWorker, WorkerLinks};
use avplay_core::{
    AudioFocusListener, ErrorListener, ListenerRegistry, MediaSource, Result, SessionError,
    SessionId, SessionState, StatusListener, StatusSnapshot, StatusUpdate,
};
use crossbeam_channel::{bounded, unbounded, Sender};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to one playback session
///
/// Cheap to clone; all clones drive the same session. Requests from one caller are applied
/// in submission order. Dropping the last clone releases the engine and stops the worker.
///
/// Listeners run on a dedicated listener thread and may call back into the session. A
/// listener that keeps a strong handle keeps the session alive until it is released; use
/// [`PlaybackSession::downgrade`] to avoid that.
#[derive(Clone)]
pub struct PlaybackSession {
    shared: Arc<Shared>,
}

/// Non-owning handle, for listeners and focus arbiters that must not keep a session alive
#[derive(Clone)]
pub struct WeakPlaybackSession {
    shared: Weak<Shared>,
}

impl WeakPlaybackSession {
    pub fn upgrade(&self) -> Option<PlaybackSession> {
        self.shared.upgrade().map(|shared| PlaybackSession { shared })
    }
}

struct Shared {
    id: SessionId,
    source: MediaSource,
    implementation: String,
    commands: Sender<Command>,
    listeners: Arc<ListenerRegistry>,
    focus_required: Arc<AtomicBool>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

impl PlaybackSession {
    /// Create an unloaded session for `source` and start its worker thread
    pub fn spawn(source: MediaSource, context: SessionContext) -> Result<Self> {
        context.config.validate()?;

        let id = SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed));
        let (commands_tx, commands_rx) = unbounded();
        let listeners = Arc::new(ListenerRegistry::new());
        let focus_required = Arc::new(AtomicBool::new(false));
        let implementation = context.engines.implementation_name().to_string();
        let thread_name = context.config.worker_thread_name.clone();

        let dispatcher = Dispatcher::spawn(format!("{}-listeners", thread_name), listeners.clone())?;
        let worker = SessionWorker::new(
            source.clone(),
            WorkerLinks {
                id,
                engines: context.engines,
                focus: context.focus,
                listeners: listeners.clone(),
                dispatcher,
                commands: commands_tx.clone(),
                focus_required: focus_required.clone(),
            },
            context.config.progress_update_interval_millis,
        );

        thread::Builder::new()
            .name(thread_name)
            .spawn(move || worker.run(commands_rx))
            .map_err(|e| SessionError::WorkerUnavailable(format!("Failed to spawn worker: {}", e)))?;

        log::info!("Created {} for {}", id, source.uri());

        Ok(Self {
            shared: Arc::new(Shared {
                id,
                source,
                implementation,
                commands: commands_tx,
                listeners,
                focus_required,
            }),
        })
    }

    /// Identity this session presents to the audio focus arbiter
    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    pub fn downgrade(&self) -> WeakPlaybackSession {
        WeakPlaybackSession {
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn source(&self) -> &MediaSource {
        &self.shared.source
    }

    // Lifecycle

    /// Attach an engine and resolve with the first ready snapshot, or with a load failure
    ///
    /// `initial` is applied through the regular status path once the engine is ready.
    pub fn load(&self, initial: StatusUpdate) -> Pending<StatusSnapshot> {
        if let Err(error) = initial.validate() {
            return Pending::resolved(Err(error));
        }
        let (reply, pending) = Pending::channel();
        self.send(Command::Load { initial, reply });
        pending
    }

    /// `load` with a host status document
    pub fn load_document(&self, initial: &Value) -> Pending<StatusSnapshot> {
        match StatusUpdate::from_document(initial) {
            Ok(initial) => self.load(initial),
            Err(error) => Pending::resolved(Err(error)),
        }
    }

    /// Tear down the engine and stop progress updates; safe to call any number of times
    ///
    /// Returns once the engine is released. A load still pending resolves as cancelled.
    /// On a session that was never loaded this does nothing, and `load` stays available.
    pub fn release(&self) {
        let (reply, done) = bounded(1);
        if self.send(Command::Release { reply }) {
            let _ = done.recv();
        }
    }

    // Status

    /// Apply a sparse status update
    pub fn set_status(&self, update: StatusUpdate) -> Pending<StatusSnapshot> {
        if let Err(error) = update.validate() {
            return Pending::resolved(Err(error));
        }
        let (reply, pending) = Pending::channel();
        self.send(Command::SetStatus { update, reply });
        pending
    }

    /// `set_status` with a host status document; null or malformed documents are rejected
    /// before anything reaches the engine
    pub fn set_status_document(&self, update: &Value) -> Pending<StatusSnapshot> {
        match StatusUpdate::from_document(update) {
            Ok(update) => self.set_status(update),
            Err(error) => Pending::resolved(Err(error)),
        }
    }

    /// Consistent snapshot of the session, taken on the worker
    pub fn get_status(&self) -> StatusSnapshot {
        let (reply, rx) = bounded(1);
        if !self.send(Command::GetStatus { reply }) {
            return self.unloaded_status();
        }
        rx.recv().unwrap_or_else(|_| self.unloaded_status())
    }

    pub fn state(&self) -> SessionState {
        let (reply, rx) = bounded(1);
        if !self.send(Command::GetState { reply }) {
            return SessionState::Released;
        }
        rx.recv().unwrap_or(SessionState::Released)
    }

    // Listeners

    /// Install or remove the status listener; installing starts progress updates if playing
    pub fn set_status_update_listener(&self, listener: Option<Arc<dyn StatusListener>>) {
        let installed = listener.is_some();
        self.shared.listeners.set_status_listener(listener);
        if installed {
            self.send(Command::BeginProgressUpdates);
        }
    }

    pub fn set_error_listener(&self, listener: Option<Arc<dyn ErrorListener>>) {
        self.shared.listeners.set_error_listener(listener);
    }

    // Host lifecycle

    /// The host went to the background
    pub fn on_host_pause(&self) {
        self.send(Command::HostPaused);
    }

    /// The host came back; playback resumes if it is still intended and focus allows
    pub fn on_host_resume(&self) {
        self.send(Command::HostResumed);
    }

    fn unloaded_status(&self) -> StatusSnapshot {
        StatusSnapshot::unloaded(self.shared.implementation.as_str())
    }

    fn send(&self, command: Command) -> bool {
        if self.shared.commands.send(command).is_err() {
            log::warn!("Session worker for {} is gone", self.shared.source.uri());
            return false;
        }
        true
    }
}

impl AudioFocusListener for PlaybackSession {
    fn on_focus_lost(&self) {
        self.send(Command::FocusLost);
    }

    fn on_focus_gained(&self) {
        self.send(Command::FocusGained);
    }

    fn on_volume_policy_changed(&self) {
        self.send(Command::VolumePolicyChanged);
    }

    fn requires_audio_focus(&self) -> bool {
        self.shared.focus_required.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("id", &self.shared.id)
            .field("uri", &self.shared.source.uri())
            .field("implementation", &self.shared.implementation)
            .finish()
    }
}
