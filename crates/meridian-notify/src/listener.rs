//! Push-style notification delivery on a dedicated thread.
//!
//! A [`Listener`] owns one background thread.  The thread sleeps until an
//! attached source signals, then walks the attachments in attachment order
//! and invokes the callback of every attachment whose condition currently
//! holds, before going back to sleep.
//!
//! # Detach semantics
//!
//! [`Listener::detach_event`] blocks until an in-flight invocation of that
//! attachment's callback has returned; after it returns the callback is never
//! invoked again.  A callback may detach its own attachment: in that case the
//! call does not block (the invocation is on the caller's own stack).
//!
//! # Fault isolation
//!
//! A panicking callback is caught and logged; the remaining fired
//! attachments are still dispatched.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use crate::attachment::NotifierCore;
use crate::callback::NotificationCallback;
use crate::error::{NotifyError, Result};
use crate::signal::Wake;
use crate::trigger::Attachable;

/// Default attachment capacity of a [`Listener`].
pub const MAX_NUMBER_OF_EVENTS_PER_LISTENER: usize = 128;

const THREAD_NAME: &str = "meridian-listener";

/// Bounded set of attached events serviced by a background thread.
pub struct Listener {
    core: Arc<NotifierCore>,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
}

impl Listener {
    /// Create a listener with [`MAX_NUMBER_OF_EVENTS_PER_LISTENER`] slots.
    pub fn new() -> Result<Self> {
        Self::with_capacity(MAX_NUMBER_OF_EVENTS_PER_LISTENER)
    }

    /// Create a listener holding at most `capacity` attachments and start
    /// its dispatch thread.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let core = NotifierCore::new(capacity);
        let worker_core = Arc::clone(&core);
        let worker = thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || {
                tracing::info!(capacity, "listener thread started");
                dispatch_loop(&worker_core);
                tracing::info!("listener thread stopped");
            })?;
        let worker_id = worker.thread().id();

        Ok(Self {
            core,
            worker: Some(worker),
            worker_id,
        })
    }

    /// Attach `event` of `source`; `callback` runs on the listener thread.
    ///
    /// # Errors
    ///
    /// - [`NotifyError::AlreadyAttached`] if (`source`, `event`) is already
    ///   attached to this listener.
    /// - [`NotifyError::CapacityExceeded`] if the listener is full.
    /// - [`NotifyError::InvalidState`] if the dispatch thread has stopped.
    pub fn attach_event<S: Attachable>(
        &self,
        source: &Arc<S>,
        event: S::Event,
        callback: NotificationCallback<S>,
    ) -> Result<()> {
        if self.core.signal().is_shutdown() {
            return Err(NotifyError::InvalidState {
                reason: "listener dispatch thread is not running".into(),
            });
        }
        self.core.attach(source, event, 0, callback).map(|_| ())
    }

    /// Detach `event` of `source`, waiting for an in-flight callback of that
    /// attachment to finish.  Detaching an unattached event is a no-op.
    pub fn detach_event<S: Attachable>(&self, source: &Arc<S>, event: S::Event) {
        let Some(attachment) = self.core.detach(source, event) else {
            return;
        };
        attachment.deactivate();
        if thread::current().id() != self.worker_id {
            attachment.wait_for_dispatch();
        }
        attachment.release_source();
        tracing::debug!(trigger_id = %attachment.trigger_id(), ?event, "event detached from listener");
    }

    /// Number of current attachments.
    pub fn size(&self) -> usize {
        self.core.len()
    }

    /// Maximum number of simultaneous attachments.
    pub fn capacity(&self) -> usize {
        self.core.capacity()
    }
}

fn dispatch_loop(core: &NotifierCore) {
    loop {
        if core.signal().wait(None) == Wake::Shutdown {
            return;
        }

        let attachments = core.snapshot();
        tracing::trace!(attachments = attachments.len(), "listener woke up");
        for attachment in attachments {
            if core.signal().is_shutdown() {
                return;
            }
            attachment.dispatch();
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.core.signal().shutdown();

        if let Some(worker) = self.worker.take() {
            // Dropped from inside a callback: the thread exits on its own
            // once the callback returns.
            if thread::current().id() != self.worker_id && worker.join().is_err() {
                tracing::error!("listener thread panicked");
            }
        }

        for attachment in self.core.drain() {
            attachment.deactivate();
            attachment.release_source();
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("size", &self.size())
            .field("capacity", &self.capacity())
            .field("running", &!self.core.signal().is_shutdown())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
