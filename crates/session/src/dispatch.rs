// Listener delivery thread
//
// Status and error listeners run here, never on the session worker, so a listener may call
// back into its own session (including blocking calls such as `release` or `get_status`).
// Notifications are delivered in the order the worker produced them.

use avplay_core::{ListenerRegistry, Result, SessionError, StatusSnapshot};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread;

pub(crate) enum Notification {
    Status(StatusSnapshot),
    Error(String),
    /// Drop both listeners once everything queued before has been delivered
    Detach,
}

#[derive(Clone)]
pub(crate) struct Dispatcher {
    notifications: Sender<Notification>,
}

impl Dispatcher {
    pub(crate) fn spawn(thread_name: String, listeners: Arc<ListenerRegistry>) -> Result<Self> {
        let (tx, rx) = unbounded();
        thread::Builder::new()
            .name(thread_name)
            .spawn(move || run(rx, listeners))
            .map_err(|e| {
                SessionError::WorkerUnavailable(format!("Failed to spawn listener thread: {}", e))
            })?;
        Ok(Self { notifications: tx })
    }

    pub(crate) fn status(&self, status: StatusSnapshot) {
        self.send(Notification::Status(status));
    }

    pub(crate) fn error(&self, error: String) {
        self.send(Notification::Error(error));
    }

    pub(crate) fn detach(&self) {
        self.send(Notification::Detach);
    }

    fn send(&self, notification: Notification) {
        if self.notifications.send(notification).is_err() {
            log::debug!("Listener thread is gone; notification dropped");
        }
    }
}

fn run(notifications: Receiver<Notification>, listeners: Arc<ListenerRegistry>) {
    for notification in notifications {
        match notification {
            Notification::Status(status) => listeners.notify_status(&status),
            Notification::Error(error) => {
                listeners.notify_error(&error);
            }
            Notification::Detach => listeners.clear(),
        }
    }
    // Every sender is gone: the worker has exited
    listeners.clear();
}
