//! Attachment table shared by [`WaitSet`](crate::WaitSet) and
//! [`Listener`](crate::Listener).
//!
//! The table is private to one waiter and keeps its entries in attachment
//! order.  Each entry refers to its source only weakly; the source keeps the
//! matching [`TriggerHandle`](crate::TriggerHandle).

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::callback::NotificationCallback;
use crate::error::{NotifyError, Result};
use crate::signal::ConditionSignal;
use crate::trigger::{Attachable, EventId, TriggerHandle, TriggerId};

/// Identity of a source: the address of its shared allocation.
pub(crate) fn origin_of<S>(source: &Arc<S>) -> usize {
    Arc::as_ptr(source).cast::<()>() as usize
}

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

type Condition = Box<dyn Fn() -> bool + Send + Sync>;
type Action = Box<dyn Fn() -> bool + Send + Sync>;
type Release = Box<dyn Fn() + Send + Sync>;

/// One (source, event, callback) binding.
pub(crate) struct Attachment {
    trigger_id: TriggerId,
    origin: usize,
    event_id: u64,
    notification_id: u64,
    /// `false` once the source is gone.
    has_fired: Condition,
    /// Returns `false` if the source is gone.
    invoke: Action,
    release_source: Release,
    active: AtomicBool,
    /// Held for the duration of every callback invocation.
    dispatch: Mutex<()>,
}

impl Attachment {
    fn new<S: Attachable>(
        source: &Arc<S>,
        event: S::Event,
        notification_id: u64,
        callback: NotificationCallback<S>,
    ) -> Self {
        let trigger_id = TriggerId::next();
        let weak: Weak<S> = Arc::downgrade(source);

        let has_fired = {
            let weak = weak.clone();
            Box::new(move || weak.upgrade().is_some_and(|s| s.has_fired(event))) as Condition
        };
        let invoke = {
            let weak = weak.clone();
            Box::new(move || match weak.upgrade() {
                Some(source) => {
                    callback.call(&source);
                    true
                }
                None => false,
            }) as Action
        };
        let release_source = Box::new(move || {
            if let Some(source) = weak.upgrade() {
                source.disable_event(event, trigger_id);
            }
        }) as Release;

        Self {
            trigger_id,
            origin: origin_of(source),
            event_id: event.as_u64(),
            notification_id,
            has_fired,
            invoke,
            release_source,
            active: AtomicBool::new(true),
            dispatch: Mutex::new(()),
        }
    }

    pub(crate) fn trigger_id(&self) -> TriggerId {
        self.trigger_id
    }

    pub(crate) fn origin(&self) -> usize {
        self.origin
    }

    pub(crate) fn event_id(&self) -> u64 {
        self.event_id
    }

    pub(crate) fn notification_id(&self) -> u64 {
        self.notification_id
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Evaluate the source's condition.
    pub(crate) fn has_fired(&self) -> bool {
        self.is_active() && (self.has_fired)()
    }

    /// Invoke the callback on the calling thread.
    pub(crate) fn call(&self) -> bool {
        let _guard = self.dispatch.lock();
        self.is_active() && (self.invoke)()
    }

    /// Evaluate and, if fired, invoke the callback.  A panicking callback is
    /// logged and swallowed so the caller can continue with other entries.
    pub(crate) fn dispatch(&self) {
        let _guard = self.dispatch.lock();
        if !self.has_fired() {
            return;
        }
        if catch_unwind(AssertUnwindSafe(|| (self.invoke)())).is_err() {
            tracing::error!(
                trigger_id = %self.trigger_id,
                event_id = self.event_id,
                "notification callback panicked"
            );
        }
    }

    /// Block until an in-flight invocation of this attachment has returned.
    pub(crate) fn wait_for_dispatch(&self) {
        drop(self.dispatch.lock());
    }

    /// Tell the source to forget its trigger handle.
    pub(crate) fn release_source(&self) {
        (self.release_source)();
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("trigger_id", &self.trigger_id)
            .field("event_id", &self.event_id)
            .field("notification_id", &self.notification_id)
            .field("active", &self.is_active())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// NotifierCore
// ---------------------------------------------------------------------------

/// Capacity-bounded attachment table plus the wake-up signal.
#[derive(Debug)]
pub(crate) struct NotifierCore {
    attachments: Mutex<Vec<Arc<Attachment>>>,
    capacity: usize,
    signal: ConditionSignal,
}

impl NotifierCore {
    pub(crate) fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            attachments: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            signal: ConditionSignal::new(),
        })
    }

    pub(crate) fn signal(&self) -> &ConditionSignal {
        &self.signal
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.attachments.lock().len()
    }

    pub(crate) fn contains(&self, trigger_id: TriggerId) -> bool {
        self.attachments
            .lock()
            .iter()
            .any(|a| a.trigger_id() == trigger_id)
    }

    /// Record a new attachment and hand the source its trigger handle.
    pub(crate) fn attach<S: Attachable>(
        self: &Arc<Self>,
        source: &Arc<S>,
        event: S::Event,
        notification_id: u64,
        callback: NotificationCallback<S>,
    ) -> Result<TriggerId> {
        let origin = origin_of(source);
        let event_id = event.as_u64();

        let attachment = {
            let mut attachments = self.attachments.lock();
            if attachments
                .iter()
                .any(|a| a.origin() == origin && a.event_id() == event_id)
            {
                return Err(NotifyError::AlreadyAttached { event_id });
            }
            if attachments.len() >= self.capacity {
                tracing::warn!(capacity = self.capacity, "attachment table is full");
                return Err(NotifyError::CapacityExceeded {
                    capacity: self.capacity,
                });
            }
            let attachment = Arc::new(Attachment::new(source, event, notification_id, callback));
            attachments.push(Arc::clone(&attachment));
            attachment
        };

        let trigger_id = attachment.trigger_id();
        tracing::debug!(%trigger_id, ?event, notification_id, "event attached");

        // Outside the table lock: the source may release a handle it held
        // for another waiter.
        source.enable_event(event, TriggerHandle::new(Arc::downgrade(self), trigger_id));
        Ok(trigger_id)
    }

    /// Remove the attachment for (`source`, `event`) from the table.
    pub(crate) fn detach<S: Attachable>(
        &self,
        source: &Arc<S>,
        event: S::Event,
    ) -> Option<Arc<Attachment>> {
        let origin = origin_of(source);
        let event_id = event.as_u64();
        let mut attachments = self.attachments.lock();
        let index = attachments
            .iter()
            .position(|a| a.origin() == origin && a.event_id() == event_id)?;
        Some(attachments.remove(index))
    }

    pub(crate) fn remove_by_trigger(&self, trigger_id: TriggerId) -> Option<Arc<Attachment>> {
        let mut attachments = self.attachments.lock();
        let index = attachments
            .iter()
            .position(|a| a.trigger_id() == trigger_id)?;
        Some(attachments.remove(index))
    }

    /// Attachments in attachment order.
    pub(crate) fn snapshot(&self) -> Vec<Arc<Attachment>> {
        self.attachments.lock().clone()
    }

    /// Remove every attachment, returning them in attachment order.
    pub(crate) fn drain(&self) -> Vec<Arc<Attachment>> {
        std::mem::take(&mut *self.attachments.lock())
    }
}
