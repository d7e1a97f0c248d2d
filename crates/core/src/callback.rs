// Host-facing listeners for status pushes and fatal errors

use crate::status::StatusSnapshot;
use parking_lot::RwLock;
use std::sync::Arc;

/// Receives every status snapshot a session pushes (progress ticks, engine events, end of media)
/// Implementations should return quickly; they run on the session's worker thread.
pub trait StatusListener: Send + Sync {
    fn on_status_update(&self, status: &StatusSnapshot);
}

/// Receives fatal runtime errors after the session has released its engine
pub trait ErrorListener: Send + Sync {
    fn on_error(&self, error: &str);
}

impl<F> StatusListener for F
where
    F: Fn(&StatusSnapshot) + Send + Sync,
{
    fn on_status_update(&self, status: &StatusSnapshot) {
        self(status)
    }
}

impl<F> ErrorListener for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_error(&self, error: &str) {
        self(error)
    }
}

/// Listener slots shared between a session handle and its worker
///
/// Listeners are cloned out of the lock before being invoked, so a listener may replace
/// itself without deadlocking.
pub struct ListenerRegistry {
    status: RwLock<Option<Arc<dyn StatusListener>>>,
    error: RwLock<Option<Arc<dyn ErrorListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            status: RwLock::new(None),
            error: RwLock::new(None),
        }
    }

    pub fn set_status_listener(&self, listener: Option<Arc<dyn StatusListener>>) {
        *self.status.write() = listener;
    }

    pub fn set_error_listener(&self, listener: Option<Arc<dyn ErrorListener>>) {
        *self.error.write() = listener;
    }

    pub fn has_status_listener(&self) -> bool {
        self.status.read().is_some()
    }

    pub fn notify_status(&self, status: &StatusSnapshot) {
        let listener = self.status.read().clone();
        if let Some(listener) = listener {
            listener.on_status_update(status);
        }
    }

    /// Returns false when nobody was listening
    pub fn notify_error(&self, error: &str) -> bool {
        let listener = self.error.read().clone();
        match listener {
            Some(listener) => {
                listener.on_error(error);
                true
            }
            None => {
                log::warn!("Unhandled session error: {}", error);
                false
            }
        }
    }

    pub fn clear(&self) {
        self.set_status_listener(None);
        self.set_error_listener(None);
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Recording listener for tests
#[cfg(test)]
pub struct TestListener {
    statuses: parking_lot::Mutex<Vec<StatusSnapshot>>,
    errors: parking_lot::Mutex<Vec<String>>,
}

#[cfg(test)]
impl TestListener {
    pub fn new() -> Self {
        Self {
            statuses: parking_lot::Mutex::new(Vec::new()),
            errors: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn statuses(&self) -> Vec<StatusSnapshot> {
        self.statuses.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

#[cfg(test)]
impl StatusListener for TestListener {
    fn on_status_update(&self, status: &StatusSnapshot) {
        self.statuses.lock().push(status.clone());
    }
}

#[cfg(test)]
impl ErrorListener for TestListener {
    fn on_error(&self, error: &str) {
        self.errors.lock().push(error.to_string());
    }
}
