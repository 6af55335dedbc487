//! Pending build signal
//!
//! A single-assignment completion shared by every requester waiting on the
//! same build. The [`SignalCompleter`] is held by whoever finishes the build;
//! dropping it without completing settles the signal as superseded, which
//! tells waiters to fetch the session's newer signal and wait again.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{BridgeError, BridgeResult};

/// Outcome every waiter of one signal observes
pub type BuildOutcome = Result<(), Arc<BridgeError>>;

struct SignalInner {
    outcome: Mutex<Option<BuildOutcome>>,
    settled: Condvar,
}

impl SignalInner {
    fn lock(&self) -> MutexGuard<'_, Option<BuildOutcome>> {
        self.outcome.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// First assignment wins; later ones are ignored.
    fn settle(&self, outcome: BuildOutcome) -> bool {
        let mut slot = self.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        self.settled.notify_all();
        true
    }
}

/// Awaitable side of a build
#[derive(Clone)]
pub struct BuildSignal {
    inner: Arc<SignalInner>,
}

impl std::fmt::Debug for BuildSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildSignal")
            .field("settled", &self.is_settled())
            .finish()
    }
}

fn to_result(outcome: &BuildOutcome) -> BridgeResult<()> {
    match outcome {
        Ok(()) => Ok(()),
        Err(err) => Err(BridgeError::Shared(Arc::clone(err))),
    }
}

impl BuildSignal {
    /// A fresh, unsettled signal and the handle that settles it
    pub fn pending() -> (BuildSignal, SignalCompleter) {
        let inner = Arc::new(SignalInner {
            outcome: Mutex::new(None),
            settled: Condvar::new(),
        });
        (
            BuildSignal {
                inner: Arc::clone(&inner),
            },
            SignalCompleter {
                inner,
                completed: false,
            },
        )
    }

    /// An already-settled signal
    pub fn settled(outcome: BridgeResult<()>) -> BuildSignal {
        let (signal, completer) = Self::pending();
        completer.complete(outcome);
        signal
    }

    /// Block until the build settles.
    pub fn wait(&self) -> BridgeResult<()> {
        let mut slot = self.inner.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return to_result(outcome);
            }
            slot = self
                .inner
                .settled
                .wait(slot)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Wait at most `timeout`; `None` if still pending.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<BridgeResult<()>> {
        let slot = self.inner.lock();
        let (slot, _) = self
            .inner
            .settled
            .wait_timeout_while(slot, timeout, |s| s.is_none())
            .unwrap_or_else(|e| e.into_inner());
        slot.as_ref().map(to_result)
    }

    pub fn try_get(&self) -> Option<BridgeResult<()>> {
        self.inner.lock().as_ref().map(to_result)
    }

    pub fn is_settled(&self) -> bool {
        self.inner.lock().is_some()
    }

    /// Whether both handles observe the same build
    pub fn ptr_eq(&self, other: &BuildSignal) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Settling side of a [`BuildSignal`]
pub struct SignalCompleter {
    inner: Arc<SignalInner>,
    completed: bool,
}

impl std::fmt::Debug for SignalCompleter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalCompleter")
            .field("completed", &self.completed)
            .finish()
    }
}

impl SignalCompleter {
    pub fn signal(&self) -> BuildSignal {
        BuildSignal {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn complete(mut self, outcome: BridgeResult<()>) {
        self.completed = true;
        self.inner.settle(outcome.map_err(Arc::new));
    }
}

impl Drop for SignalCompleter {
    fn drop(&mut self) {
        if !self.completed {
            self.inner.settle(Err(Arc::new(BridgeError::Superseded)));
        }
    }
}
