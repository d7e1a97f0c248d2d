// One-shot results for host operations completed on the session worker

use avplay_core::{Result, SessionError};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Completion side held by the worker
pub(crate) type Resolver<T> = Sender<Result<T>>;

/// Result of an operation that resolves exactly once
///
/// If the worker discards the operation (e.g. `release` racing a `load`), waiting yields
/// `SessionError::Cancelled` instead of hanging.
#[must_use = "a pending result does nothing unless waited on"]
pub struct Pending<T> {
    rx: Receiver<Result<T>>,
}

impl<T> Pending<T> {
    pub(crate) fn channel() -> (Resolver<T>, Self) {
        let (tx, rx) = bounded(1);
        (tx, Self { rx })
    }

    /// Already-resolved result, for failures detected before reaching the worker
    pub(crate) fn resolved(result: Result<T>) -> Self {
        let (tx, pending) = Self::channel();
        let _ = tx.send(result);
        pending
    }

    /// Block until the operation resolves
    pub fn wait(self) -> Result<T> {
        self.rx.recv().unwrap_or_else(|_| Err(cancelled()))
    }

    pub fn wait_timeout(self, timeout: Duration) -> Result<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(SessionError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(cancelled()),
        }
    }

    /// Non-blocking poll; `None` while still pending
    pub fn try_wait(&self) -> Option<Result<T>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(cancelled())),
        }
    }
}

fn cancelled() -> SessionError {
    SessionError::Cancelled("the session discarded this operation".to_string())
}
