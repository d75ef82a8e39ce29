//! Notification error types.
//!
//! Every fallible operation on a [`WaitSet`](crate::WaitSet) or
//! [`Listener`](crate::Listener) reports a [`NotifyError`].  A `timed_wait`
//! that runs out of time is not an error: it simply returns no notifications.

/// Unified error type for the notification subsystem.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The (source, event) pair is already attached to this waiter.
    #[error("event {event_id} of this source is already attached")]
    AlreadyAttached {
        /// Numeric id of the event that was attached twice.
        event_id: u64,
    },

    /// The attachment table is full.
    #[error("attachment capacity exceeded (capacity: {capacity})")]
    CapacityExceeded { capacity: usize },

    /// The waiter can no longer accept attachments (e.g. its dispatch thread
    /// has been shut down).
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    /// The listener's dispatch thread could not be started.
    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

/// Convenience alias used throughout the notification crate.
pub type Result<T> = std::result::Result<T, NotifyError>;
