//! Wake-up signal shared between attached sources and the waiting side.
//!
//! Sources only ever set the pending flag; the waiting side clears it and
//! re-evaluates the conditions of its attachments.  The flag is sticky, so a
//! notification that arrives while the waiter is busy evaluating is observed
//! by the next `wait`.

use std::time::Instant;

use parking_lot::{Condvar, Mutex};

/// Why [`ConditionSignal::wait`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wake {
    Notified,
    TimedOut,
    Shutdown,
}

#[derive(Debug, Default)]
struct SignalState {
    pending: bool,
    shutdown: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ConditionSignal {
    state: Mutex<SignalState>,
    wakeup: Condvar,
}

impl ConditionSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Mark the signal as pending and wake every waiter.
    pub(crate) fn notify(&self) {
        self.state.lock().pending = true;
        self.wakeup.notify_all();
    }

    /// Permanently wake all waiters; subsequent waits return immediately.
    pub(crate) fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.wakeup.notify_all();
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Drop a pending notification without waiting.
    pub(crate) fn clear(&self) {
        self.state.lock().pending = false;
    }

    /// Block until notified, shut down, or `deadline` passes.
    ///
    /// A pending notification is consumed by the call that observes it.
    pub(crate) fn wait(&self, deadline: Option<Instant>) -> Wake {
        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                return Wake::Shutdown;
            }
            if state.pending {
                state.pending = false;
                return Wake::Notified;
            }
            match deadline {
                None => self.wakeup.wait(&mut state),
                Some(deadline) => {
                    let timed_out = self.wakeup.wait_until(&mut state, deadline).timed_out();
                    if timed_out && !state.pending && !state.shutdown {
                        return Wake::TimedOut;
                    }
                }
            }
        }
    }
}
