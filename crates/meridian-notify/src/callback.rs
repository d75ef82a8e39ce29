//! Notification callbacks bound at attach time.
//!
//! A [`NotificationCallback`] is invoked with the source that raised the
//! event.  It may carry a user context shared through an [`Arc`].

use std::fmt;
use std::sync::Arc;

/// A fired-event handler for sources of type `S`.
pub struct NotificationCallback<S: ?Sized> {
    func: Arc<dyn Fn(&S) + Send + Sync>,
}

impl<S: ?Sized + 'static> NotificationCallback<S> {
    /// Wrap an arbitrary closure.
    pub fn new(func: impl Fn(&S) + Send + Sync + 'static) -> Self {
        Self {
            func: Arc::new(func),
        }
    }

    /// Invoke the callback with the originating source.
    pub fn call(&self, origin: &S) {
        (self.func)(origin);
    }
}

impl<S: ?Sized> Clone for NotificationCallback<S> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
        }
    }
}

impl<S: ?Sized> fmt::Debug for NotificationCallback<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationCallback").finish_non_exhaustive()
    }
}

/// Build a callback from a plain function.
pub fn create_notification_callback<S: ?Sized + 'static>(
    callback: fn(&S),
) -> NotificationCallback<S> {
    NotificationCallback::new(callback)
}

/// Build a callback that also receives a shared user context.
pub fn create_notification_callback_with_context<S, C>(
    callback: fn(&S, &C),
    context: Arc<C>,
) -> NotificationCallback<S>
where
    S: ?Sized + 'static,
    C: Send + Sync + 'static,
{
    NotificationCallback::new(move |origin: &S| callback(origin, context.as_ref()))
}
