//! Meridian event notification.
//!
//! This crate lets consumers react to conditions raised by other threads
//! without busy polling:
//!
//! - **[`wait_set`]** -- [`WaitSet`], a bounded, caller-driven wait primitive
//!   that returns the fired attachments for the caller to dispatch.
//! - **[`listener`]** -- [`Listener`], a bounded attachment table serviced by
//!   a dedicated thread that invokes callbacks itself.
//! - **[`trigger`]** -- the [`Attachable`] capability trait and the weak
//!   [`TriggerHandle`] a source holds back to its waiter.
//! - **[`callback`]** -- [`NotificationCallback`] and its constructors.
//! - **[`user_trigger`]** / **[`queue`]** -- ready-made attachable sources.
//! - **[`error`]** -- [`NotifyError`] via [`thiserror`].
//!
//! Attachments never keep their source alive: dropping a source detaches it,
//! and dropping a waiter releases every source attached to it.

mod attachment;
pub mod callback;
pub mod error;
pub mod listener;
pub mod queue;
mod signal;
pub mod trigger;
pub mod user_trigger;
pub mod wait_set;

pub use callback::{
    NotificationCallback, create_notification_callback, create_notification_callback_with_context,
};
pub use error::{NotifyError, Result};
pub use listener::{Listener, MAX_NUMBER_OF_EVENTS_PER_LISTENER};
pub use queue::{NotifyingQueue, QueueEvent};
pub use trigger::{Attachable, EventId, Notifier, TriggerHandle, TriggerId, TriggerSlot};
pub use user_trigger::UserTrigger;
pub use wait_set::{MAX_NUMBER_OF_ATTACHMENTS_PER_WAITSET, NotificationInfo, WaitSet};
