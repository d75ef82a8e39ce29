//! Cooperative, single-caller wait primitive.
//!
//! A [`WaitSet`] multiplexes the conditions of up to `capacity` attached
//! events.  [`WaitSet::wait`] and [`WaitSet::timed_wait`] block the calling
//! thread until at least one attached condition holds and return the fired
//! attachments in attachment order.  The wait-set never runs a callback
//! itself; the caller decides when to invoke [`NotificationInfo::call`].
//!
//! Conditions are evaluated once at wake time (level-triggered, best
//! effort): a condition that flips on and off again between the wake-up and
//! the evaluation is not reported.
//!
//! # Example
//!
//! ```rust
//! # use std::sync::Arc;
//! # use std::time::Duration;
//! # use meridian_notify::{create_notification_callback, UserTrigger, WaitSet};
//! fn on_trigger(_: &UserTrigger) {}
//!
//! let wait_set = WaitSet::new();
//! let trigger = Arc::new(UserTrigger::new());
//! wait_set
//!     .attach_event(&trigger, (), 7, create_notification_callback(on_trigger))
//!     .unwrap();
//!
//! trigger.trigger();
//! let fired = wait_set.timed_wait(Duration::from_secs(1));
//! assert_eq!(fired.len(), 1);
//! assert_eq!(fired[0].notification_id(), 7);
//! fired[0].call();
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::attachment::{Attachment, NotifierCore, origin_of};
use crate::callback::NotificationCallback;
use crate::error::Result;
use crate::signal::Wake;
use crate::trigger::{Attachable, TriggerId};

/// Default attachment capacity of a [`WaitSet`].
pub const MAX_NUMBER_OF_ATTACHMENTS_PER_WAITSET: usize = 128;

// ---------------------------------------------------------------------------
// NotificationInfo
// ---------------------------------------------------------------------------

/// One fired attachment returned by a wait.
#[derive(Debug, Clone)]
pub struct NotificationInfo {
    attachment: Arc<Attachment>,
}

impl NotificationInfo {
    /// The id the caller chose when attaching.
    pub fn notification_id(&self) -> u64 {
        self.attachment.notification_id()
    }

    /// Numeric id of the source event that fired.
    pub fn event_id(&self) -> u64 {
        self.attachment.event_id()
    }

    /// Id of the attachment, as held by the source's trigger handle.
    pub fn trigger_id(&self) -> TriggerId {
        self.attachment.trigger_id()
    }

    /// Whether this notification was raised by `source`.
    pub fn originates_from<S>(&self, source: &Arc<S>) -> bool {
        self.attachment.origin() == origin_of(source)
    }

    /// Invoke the bound callback with the originating source.
    ///
    /// Returns `false` if the attachment was detached or the source dropped
    /// in the meantime.
    pub fn call(&self) -> bool {
        self.attachment.call()
    }
}

// ---------------------------------------------------------------------------
// WaitSet
// ---------------------------------------------------------------------------

/// Bounded set of attached events serviced by the calling thread.
pub struct WaitSet {
    core: Arc<NotifierCore>,
}

impl WaitSet {
    /// Create a wait-set with [`MAX_NUMBER_OF_ATTACHMENTS_PER_WAITSET`] slots.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_NUMBER_OF_ATTACHMENTS_PER_WAITSET)
    }

    /// Create a wait-set holding at most `capacity` attachments.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            core: NotifierCore::new(capacity),
        }
    }

    /// Attach `event` of `source`.
    ///
    /// `notification_id` is echoed back in every [`NotificationInfo`] for this
    /// attachment.  If the event is currently attached to another waiter it
    /// is moved here.
    ///
    /// # Errors
    ///
    /// - [`NotifyError::AlreadyAttached`](crate::NotifyError::AlreadyAttached)
    ///   if (`source`, `event`) is already attached to this wait-set.
    /// - [`NotifyError::CapacityExceeded`](crate::NotifyError::CapacityExceeded)
    ///   if the wait-set is full.
    pub fn attach_event<S: Attachable>(
        &self,
        source: &Arc<S>,
        event: S::Event,
        notification_id: u64,
        callback: NotificationCallback<S>,
    ) -> Result<()> {
        self.core
            .attach(source, event, notification_id, callback)
            .map(|_| ())
    }

    /// Detach `event` of `source`.  Detaching an unattached event is a no-op.
    pub fn detach_event<S: Attachable>(&self, source: &Arc<S>, event: S::Event) {
        if let Some(attachment) = self.core.detach(source, event) {
            attachment.deactivate();
            attachment.release_source();
            tracing::debug!(trigger_id = %attachment.trigger_id(), ?event, "event detached");
        }
    }

    /// Block until at least one attached condition holds.
    pub fn wait(&self) -> Vec<NotificationInfo> {
        self.wait_until(None)
    }

    /// Block until at least one attached condition holds or `timeout`
    /// elapses.  Returns an empty vector on timeout.
    pub fn timed_wait(&self, timeout: Duration) -> Vec<NotificationInfo> {
        self.wait_until(Instant::now().checked_add(timeout))
    }

    /// Number of current attachments.
    pub fn size(&self) -> usize {
        self.core.len()
    }

    /// Maximum number of simultaneous attachments.
    pub fn capacity(&self) -> usize {
        self.core.capacity()
    }

    fn wait_until(&self, deadline: Option<Instant>) -> Vec<NotificationInfo> {
        loop {
            // Cleared before evaluating so that a notification racing with
            // the evaluation wakes the wait below.
            self.core.signal().clear();
            let fired = self.fired();
            if !fired.is_empty() {
                tracing::trace!(fired = fired.len(), "wait-set woke up");
                return fired;
            }

            match self.core.signal().wait(deadline) {
                Wake::Notified => continue,
                Wake::TimedOut => return self.fired(),
                Wake::Shutdown => return Vec::new(),
            }
        }
    }

    fn fired(&self) -> Vec<NotificationInfo> {
        self.core
            .snapshot()
            .into_iter()
            .filter(|attachment| attachment.has_fired())
            .map(|attachment| NotificationInfo { attachment })
            .collect()
    }
}

impl Default for WaitSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WaitSet {
    fn drop(&mut self) {
        self.core.signal().shutdown();
        for attachment in self.core.drain() {
            attachment.deactivate();
            attachment.release_source();
        }
    }
}

impl fmt::Debug for WaitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitSet")
            .field("size", &self.size())
            .field("capacity", &self.capacity())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
