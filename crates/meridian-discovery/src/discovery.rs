//! Client-facing discovery facade.
//!
//! [`ServiceDiscovery`] searches a shared [`ServiceRegistry`] and reports the
//! built-in services for every publish-subscribe search.  It is also an
//! [`Attachable`] source: its
//! [`ServiceRegistryChanged`](ServiceDiscoveryEvent::ServiceRegistryChanged)
//! event fires whenever the registry's generation counter has advanced since
//! an attached waiter last checked it.
//!
//! # Example
//!
//! ```rust
//! # use std::sync::Arc;
//! # use std::time::Duration;
//! # use meridian_discovery::{Producer, ServiceDescription, ServiceDiscovery, ServiceDiscoveryEvent,
//! #     ServiceRegistry};
//! # use meridian_notify::{WaitSet, create_notification_callback};
//! fn on_change(_: &ServiceDiscovery) {}
//!
//! let registry = ServiceRegistry::default();
//! let discovery = Arc::new(ServiceDiscovery::new(registry.clone()));
//! let wait_set = WaitSet::new();
//! wait_set
//!     .attach_event(
//!         &discovery,
//!         ServiceDiscoveryEvent::ServiceRegistryChanged,
//!         0,
//!         create_notification_callback(on_change),
//!     )
//!     .unwrap();
//!
//! let description = ServiceDescription::new("Radar", "FrontLeft", "Objects").unwrap();
//! let _publisher = Producer::publisher(&registry, description).unwrap();
//!
//! assert_eq!(wait_set.timed_wait(Duration::from_secs(1)).len(), 1);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use meridian_notify::{Attachable, EventId, TriggerHandle, TriggerId, TriggerSlot};
use parking_lot::Mutex;

use crate::introspection::internal_services;
use crate::registry::{ServiceRegistry, WatchId};
use crate::service::{MessagingPattern, ServiceDescription, ServiceQuery};

/// Events a [`ServiceDiscovery`] can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceDiscoveryEvent {
    /// The registry changed since the condition was last checked.
    ServiceRegistryChanged,
}

impl EventId for ServiceDiscoveryEvent {
    fn as_u64(self) -> u64 {
        match self {
            Self::ServiceRegistryChanged => 0,
        }
    }
}

/// Search facade over a shared registry.
pub struct ServiceDiscovery {
    registry: ServiceRegistry,
    internal: Vec<ServiceDescription>,
    last_seen: AtomicU64,
    slot: TriggerSlot,
    watch: Mutex<Option<WatchId>>,
}

impl ServiceDiscovery {
    /// Create a discovery client for `registry`.
    ///
    /// The registry-changed condition starts out clear.
    pub fn new(registry: ServiceRegistry) -> Self {
        let last_seen = AtomicU64::new(registry.change_count());
        Self {
            registry,
            internal: internal_services(),
            last_seen,
            slot: TriggerSlot::new(),
            watch: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Invoke `callback` once per description offered under `pattern` that
    /// matches the (service, instance, event) query.  `None` query fields are
    /// wildcards.  A `None` callback makes the search a no-op.
    pub fn find_service(
        &self,
        service: Option<&str>,
        instance: Option<&str>,
        event: Option<&str>,
        callback: Option<&mut dyn FnMut(&ServiceDescription)>,
        pattern: MessagingPattern,
    ) {
        let Some(callback) = callback else {
            return;
        };
        let query = ServiceQuery::new(service, instance, event);
        for description in self.find(&query, pattern) {
            callback(&description);
        }
    }

    /// Every description offered under `pattern` that matches `query`,
    /// built-in services included.
    ///
    /// A user offer equal to a built-in service is reported once.  Truncated
    /// silently at the registry's `max_find_results`.
    pub fn find(&self, query: &ServiceQuery<'_>, pattern: MessagingPattern) -> Vec<ServiceDescription> {
        let internal: &[ServiceDescription] = match pattern {
            MessagingPattern::PublishSubscribe => self.internal.as_slice(),
            MessagingPattern::RequestResponse => &[],
        };

        let mut found: Vec<ServiceDescription> = internal
            .iter()
            .filter(|description| description.matches(query))
            .cloned()
            .collect();
        let built_in = found.len();
        for description in self.registry.find(query, pattern) {
            if !found[..built_in].contains(&description) {
                found.push(description);
            }
        }
        found.truncate(self.registry.config().max_find_results);

        tracing::trace!(?query, %pattern, results = found.len(), "service search");
        found
    }

    /// Whether the registry changed since an attached waiter last checked.
    ///
    /// Does not consume the condition.
    pub fn has_changed(&self) -> bool {
        self.registry.change_count() != self.last_seen.load(Ordering::Acquire)
    }

    fn replace_watch(&self, watch: Option<WatchId>) {
        let previous = std::mem::replace(&mut *self.watch.lock(), watch);
        if let Some(previous) = previous {
            self.registry.unwatch(previous);
        }
    }
}

impl Attachable for ServiceDiscovery {
    type Event = ServiceDiscoveryEvent;

    fn enable_event(&self, _event: ServiceDiscoveryEvent, handle: TriggerHandle) {
        // The watch must be registered before the generation check, or a
        // mutation in between is never signalled.
        let notifier = handle.notifier();
        let watch = self.registry.watch(move || {
            notifier.notify();
        });
        self.replace_watch(Some(watch));

        if self.has_changed() {
            handle.trigger();
        }
        self.slot.set(handle);
    }

    fn disable_event(&self, _event: ServiceDiscoveryEvent, trigger_id: TriggerId) {
        if self.slot.clear(trigger_id) {
            self.replace_watch(None);
        }
    }

    fn has_fired(&self, _event: ServiceDiscoveryEvent) -> bool {
        let current = self.registry.change_count();
        self.last_seen.swap(current, Ordering::AcqRel) != current
    }
}

impl Drop for ServiceDiscovery {
    fn drop(&mut self) {
        self.replace_watch(None);
    }
}

impl fmt::Debug for ServiceDiscovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDiscovery")
            .field("registry", &self.registry)
            .field("attached", &self.slot.is_attached())
            .finish()
    }
}
