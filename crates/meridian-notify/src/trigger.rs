//! Trigger plumbing between attachable sources and their waiter.
//!
//! A source never owns the [`WaitSet`](crate::WaitSet) or
//! [`Listener`](crate::Listener) it is attached to.  On attach the waiter hands
//! the source a [`TriggerHandle`]: a weak back-reference to the waiter plus the
//! id of the attachment it belongs to.  The source uses the handle to wake the
//! waiter, and dropping the handle removes the attachment again.  Because
//! sources keep their handles in a [`TriggerSlot`], dropping a source detaches
//! it automatically.
//!
//! ```text
//! source ──TriggerHandle (Weak)──▶ waiter core ──Weak<S>──▶ source
//! ```

use std::fmt;
use std::sync::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::attachment::NotifierCore;

// ---------------------------------------------------------------------------
// Source-facing traits
// ---------------------------------------------------------------------------

/// Identifier of one event a source can raise.
///
/// Sources usually expose a small `enum`; sources with a single condition use
/// `()`.
pub trait EventId: Copy + fmt::Debug + Send + Sync + 'static {
    /// Numeric form used for duplicate detection and diagnostics.
    fn as_u64(self) -> u64;
}

impl EventId for () {
    fn as_u64(self) -> u64 {
        0
    }
}

/// An object whose events can be attached to a waiter.
///
/// Implementations keep one [`TriggerSlot`] per event they support.
pub trait Attachable: Send + Sync + 'static {
    /// The events this source can raise.
    type Event: EventId;

    /// Store `handle` so that future occurrences of `event` wake the waiter.
    ///
    /// Any handle previously stored for `event` is dropped, which detaches
    /// the event from its previous waiter.
    fn enable_event(&self, event: Self::Event, handle: TriggerHandle);

    /// Forget the handle for `event` if it still belongs to `trigger_id`.
    fn disable_event(&self, event: Self::Event, trigger_id: TriggerId);

    /// Whether the condition behind `event` currently holds.
    ///
    /// Called by the waiting side at wake time.  Edge-like sources may
    /// consume the condition here.
    fn has_fired(&self, event: Self::Event) -> bool;
}

// ---------------------------------------------------------------------------
// Trigger ids
// ---------------------------------------------------------------------------

/// Process-wide unique id of one attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerId(u64);

impl TriggerId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trigger-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Cloneable wake-up token derived from a [`TriggerHandle`].
///
/// Unlike the handle it detaches nothing when dropped, so it can be moved
/// into observer closures freely.
#[derive(Clone)]
pub struct Notifier {
    core: Weak<NotifierCore>,
    trigger_id: TriggerId,
}

impl Notifier {
    /// Wake the waiter.  Returns `false` if the waiter no longer exists.
    pub fn notify(&self) -> bool {
        match self.core.upgrade() {
            Some(core) => {
                tracing::trace!(trigger_id = %self.trigger_id, "notifier fired");
                core.signal().notify();
                true
            }
            None => false,
        }
    }

    /// Whether the waiter still exists.
    pub fn is_valid(&self) -> bool {
        self.core.strong_count() > 0
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("trigger_id", &self.trigger_id)
            .field("valid", &self.is_valid())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TriggerHandle
// ---------------------------------------------------------------------------

/// A source's weak back-reference to the waiter it is attached to.
///
/// Dropping the handle detaches the attachment from the waiter.
pub struct TriggerHandle {
    core: Weak<NotifierCore>,
    trigger_id: TriggerId,
}

impl TriggerHandle {
    pub(crate) fn new(core: Weak<NotifierCore>, trigger_id: TriggerId) -> Self {
        Self { core, trigger_id }
    }

    /// Id of the attachment this handle belongs to.
    pub fn trigger_id(&self) -> TriggerId {
        self.trigger_id
    }

    /// Wake the waiter.  Returns `false` if the waiter no longer exists.
    pub fn trigger(&self) -> bool {
        self.notifier().notify()
    }

    /// A wake-up token that does not detach anything when dropped.
    pub fn notifier(&self) -> Notifier {
        Notifier {
            core: self.core.clone(),
            trigger_id: self.trigger_id,
        }
    }

    /// Whether the waiter exists and still holds this attachment.
    pub fn is_valid(&self) -> bool {
        self.core
            .upgrade()
            .is_some_and(|core| core.contains(self.trigger_id))
    }

    /// Sever the link without touching the waiter.
    pub fn invalidate(&mut self) {
        self.core = Weak::new();
    }

    /// Remove the attachment from the waiter and sever the link.
    pub fn reset(&mut self) {
        if let Some(core) = self.core.upgrade() {
            if let Some(attachment) = core.remove_by_trigger(self.trigger_id) {
                attachment.deactivate();
                tracing::debug!(trigger_id = %self.trigger_id, "attachment released by its source");
            }
        }
        self.invalidate();
    }
}

impl Drop for TriggerHandle {
    fn drop(&mut self) {
        self.reset();
    }
}

impl fmt::Debug for TriggerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerHandle")
            .field("trigger_id", &self.trigger_id)
            .field("valid", &self.is_valid())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TriggerSlot
// ---------------------------------------------------------------------------

/// Storage for the trigger handle of one source event.
///
/// Holds at most one handle; installing a new one releases the old one.
#[derive(Default)]
pub struct TriggerSlot {
    handle: Mutex<Option<TriggerHandle>>,
}

impl TriggerSlot {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handle`, detaching whatever handle was installed before.
    pub fn set(&self, handle: TriggerHandle) {
        let previous = self.handle.lock().replace(handle);
        // Released outside the lock: resetting touches the previous waiter.
        drop(previous);
    }

    /// Drop the installed handle if it belongs to `trigger_id`.
    ///
    /// Returns `true` if a handle was removed.
    pub fn clear(&self, trigger_id: TriggerId) -> bool {
        let taken = {
            let mut guard = self.handle.lock();
            if guard.as_ref().is_some_and(|h| h.trigger_id() == trigger_id) {
                guard.take()
            } else {
                None
            }
        };
        taken.is_some()
    }

    /// Wake the attached waiter, if any.
    pub fn trigger(&self) -> bool {
        self.handle.lock().as_ref().is_some_and(TriggerHandle::trigger)
    }

    /// Wake-up token for the attached waiter, if any.
    pub fn notifier(&self) -> Option<Notifier> {
        self.handle.lock().as_ref().map(TriggerHandle::notifier)
    }

    /// Whether a live attachment is installed.
    pub fn is_attached(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(TriggerHandle::is_valid)
    }
}

impl fmt::Debug for TriggerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerSlot")
            .field("attached", &self.is_attached())
            .finish()
    }
}
