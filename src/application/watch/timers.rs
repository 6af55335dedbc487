//! Tracked timers
//!
//! The timer host handed to the compiler's watch loop. Every scheduled
//! callback is tracked until it fires or is cleared, so stopping the watch
//! cancels everything still outstanding. One worker thread serves all timers
//! of a host; it sleeps until the earliest deadline and exits on stop.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crate::domain::ports::compiler::{TimerHost, TimerId};

type Callback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct TimerTable {
    pending: HashMap<TimerId, (Instant, Callback)>,
    /// Deadlines in firing order
    queue: BTreeSet<(Instant, TimerId)>,
    stopped: bool,
    worker_started: bool,
}

type Shared = Arc<(Mutex<TimerTable>, Condvar)>;

#[derive(Default)]
pub struct TrackedTimers {
    next_id: AtomicU64,
    shared: Shared,
}

fn lock(table: &Mutex<TimerTable>) -> MutexGuard<'_, TimerTable> {
    table.lock().unwrap_or_else(|e| e.into_inner())
}

fn run_worker(shared: Shared) {
    let (table, wake) = &*shared;
    let mut guard = lock(table);
    loop {
        if guard.stopped {
            return;
        }
        let Some(&(due, id)) = guard.queue.iter().next() else {
            guard = wake.wait(guard).unwrap_or_else(|e| e.into_inner());
            continue;
        };
        let now = Instant::now();
        if due > now {
            guard = wake
                .wait_timeout(guard, due - now)
                .map(|(g, _)| g)
                .unwrap_or_else(|e| e.into_inner().0);
            continue;
        }
        guard.queue.remove(&(due, id));
        if let Some((_, callback)) = guard.pending.remove(&id) {
            drop(guard);
            callback();
            guard = lock(table);
        }
    }
}

impl TrackedTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers scheduled but not yet fired or cleared
    pub fn pending(&self) -> usize {
        lock(&self.shared.0).pending.len()
    }

    pub fn is_stopped(&self) -> bool {
        lock(&self.shared.0).stopped
    }

    /// Cancel every outstanding timer and refuse new ones.
    pub fn stop(&self) {
        let (table, wake) = &*self.shared;
        let mut guard = lock(table);
        guard.stopped = true;
        guard.pending.clear();
        guard.queue.clear();
        wake.notify_all();
    }
}

impl Drop for TrackedTimers {
    fn drop(&mut self) {
        self.stop();
    }
}

impl TimerHost for TrackedTimers {
    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce() + Send>) -> TimerId {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let due = Instant::now() + delay;
        let (table, wake) = &*self.shared;
        let mut guard = lock(table);
        if guard.stopped {
            return id;
        }
        guard.pending.insert(id, (due, callback));
        guard.queue.insert((due, id));
        if !guard.worker_started {
            guard.worker_started = true;
            let shared = Arc::clone(&self.shared);
            thread::spawn(move || run_worker(shared));
        }
        wake.notify_all();
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        let (table, wake) = &*self.shared;
        let mut guard = lock(table);
        if let Some((due, _)) = guard.pending.remove(&id) {
            guard.queue.remove(&(due, id));
            wake.notify_all();
        }
    }
}
