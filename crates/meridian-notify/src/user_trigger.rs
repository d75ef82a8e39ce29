//! User-defined attachable condition.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::trigger::{Attachable, TriggerHandle, TriggerId, TriggerSlot};

/// A condition raised explicitly by user code.
///
/// [`UserTrigger::trigger`] sets the condition and wakes the attached waiter.
/// The waiter consumes the condition when it evaluates it, so each trigger is
/// reported at most once.
#[derive(Debug, Default)]
pub struct UserTrigger {
    triggered: AtomicBool,
    slot: TriggerSlot,
}

impl UserTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the condition and wake the attached waiter.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::Release);
        self.slot.trigger();
    }

    /// Whether the condition is raised and not yet consumed.
    pub fn has_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    pub fn reset_trigger(&self) {
        self.triggered.store(false, Ordering::Release);
    }

    /// Whether the trigger is attached to a live waiter.
    pub fn is_attached(&self) -> bool {
        self.slot.is_attached()
    }
}

impl Attachable for UserTrigger {
    type Event = ();

    fn enable_event(&self, _event: (), handle: TriggerHandle) {
        if self.has_triggered() {
            handle.trigger();
        }
        self.slot.set(handle);
    }

    fn disable_event(&self, _event: (), trigger_id: TriggerId) {
        self.slot.clear(trigger_id);
    }

    fn has_fired(&self, _event: ()) -> bool {
        self.triggered.swap(false, Ordering::AcqRel)
    }
}
