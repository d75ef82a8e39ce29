//! Bounded queue that raises an event while it holds data.
//!
//! [`NotifyingQueue`] stands in for the receive side of a transport: pushing
//! wakes the attached waiter, and [`QueueEvent::DataReceived`] stays fired for
//! as long as the queue is non-empty.

use std::fmt;

use crossbeam::queue::ArrayQueue;

use crate::trigger::{Attachable, EventId, TriggerHandle, TriggerId, TriggerSlot};

/// Events raised by a [`NotifyingQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueEvent {
    /// The queue holds at least one element.
    DataReceived,
}

impl EventId for QueueEvent {
    fn as_u64(self) -> u64 {
        match self {
            Self::DataReceived => 0,
        }
    }
}

/// Lock-free bounded queue backed by [`ArrayQueue`].
pub struct NotifyingQueue<T> {
    queue: ArrayQueue<T>,
    slot: TriggerSlot,
}

impl<T: Send + 'static> NotifyingQueue<T> {
    /// Create a queue holding at most `capacity` elements (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            slot: TriggerSlot::new(),
        }
    }

    /// Push `value`, handing it back if the queue is full.
    pub fn push(&self, value: T) -> Result<(), T> {
        self.queue.push(value)?;
        self.slot.trigger();
        Ok(())
    }

    /// Push `value`, evicting and returning the oldest element if full.
    pub fn force_push(&self, value: T) -> Option<T> {
        let evicted = self.queue.force_push(value);
        if evicted.is_some() {
            tracing::trace!(capacity = self.queue.capacity(), "queue overflow, oldest element evicted");
        }
        self.slot.trigger();
        evicted
    }

    pub fn pop(&self) -> Option<T> {
        self.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

impl<T: Send + 'static> Attachable for NotifyingQueue<T> {
    type Event = QueueEvent;

    fn enable_event(&self, _event: QueueEvent, handle: TriggerHandle) {
        if !self.queue.is_empty() {
            handle.trigger();
        }
        self.slot.set(handle);
    }

    fn disable_event(&self, _event: QueueEvent, trigger_id: TriggerId) {
        self.slot.clear(trigger_id);
    }

    fn has_fired(&self, _event: QueueEvent) -> bool {
        !self.queue.is_empty()
    }
}

impl<T> fmt::Debug for NotifyingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyingQueue")
            .field("len", &self.queue.len())
            .field("capacity", &self.queue.capacity())
            .field("slot", &self.slot)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_fifo() {
        let queue = NotifyingQueue::new(4);
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert!(queue.is_empty());
    }

    #[test]
    fn full_queue_rejects_push() {
        let queue = NotifyingQueue::new(1);
        queue.push("a").unwrap();
        assert_eq!(queue.push("b"), Err("b"));
    }

    #[test]
    fn force_push_evicts_oldest() {
        let queue = NotifyingQueue::new(2);
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        assert_eq!(queue.force_push(3), Some(1));
        assert_eq!(queue.pop(), Some(2));
    }

    #[test]
    fn zero_capacity_is_rounded_up() {
        let queue: NotifyingQueue<u8> = NotifyingQueue::new(0);
        assert_eq!(queue.capacity(), 1);
    }

    #[test]
    fn data_received_is_level_triggered() {
        let queue = NotifyingQueue::new(2);
        assert!(!queue.has_fired(QueueEvent::DataReceived));

        queue.push(10).unwrap();
        assert!(queue.has_fired(QueueEvent::DataReceived));
        assert!(queue.has_fired(QueueEvent::DataReceived));

        queue.pop();
        assert!(!queue.has_fired(QueueEvent::DataReceived));
    }
}
