//! Shared service registry.
//!
//! The registry maps every offered [`ServiceDescription`] to the producers
//! offering it, tracked separately per [`MessagingPattern`].  It is shared by
//! handle: producers mutate it on offer/stop-offer, discovery clients search
//! it concurrently.
//!
//! All mutations and searches run inside one registry-wide critical section,
//! so a search never observes a partially applied add or remove.  The
//! generation counter is bumped inside the same critical section as the
//! mutation that caused it.  Change watchers run after the critical section
//! has been left, so a watcher may search the registry again.
//!
//! # Example
//!
//! ```rust
//! # use meridian_discovery::config::RegistryConfig;
//! # use meridian_discovery::registry::{ProducerId, ServiceRegistry};
//! # use meridian_discovery::service::{MessagingPattern, ServiceDescription, ServiceQuery};
//! let registry = ServiceRegistry::new(RegistryConfig::default());
//! let radar = ServiceDescription::new("Radar", "FrontLeft", "Objects").unwrap();
//! let producer = ProducerId::new();
//!
//! registry.add(&radar, producer, MessagingPattern::PublishSubscribe).unwrap();
//! let found = registry.find(&ServiceQuery::wildcard().service("Radar"), MessagingPattern::PublishSubscribe);
//! assert_eq!(found, vec![radar.clone()]);
//!
//! assert!(registry.remove(&radar, producer, MessagingPattern::PublishSubscribe));
//! assert!(registry.find(&ServiceQuery::wildcard(), MessagingPattern::PublishSubscribe).is_empty());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RegistryConfig;
use crate::error::{DiscoveryError, Result};
use crate::service::{MessagingPattern, ServiceDescription, ServiceQuery};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identity of one producer (publisher or server).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProducerId(Uuid);

impl ProducerId {
    /// A fresh, time-ordered producer id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProducerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProducerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle returned by [`ServiceRegistry::watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

type Watcher = Arc<dyn Fn() + Send + Sync>;

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

/// Producers of one description, indexed by [`MessagingPattern::index`].
#[derive(Debug, Default)]
struct Producers([Vec<ProducerId>; 2]);

impl Producers {
    fn get(&self, pattern: MessagingPattern) -> &[ProducerId] {
        &self.0[pattern.index()]
    }

    fn get_mut(&mut self, pattern: MessagingPattern) -> &mut Vec<ProducerId> {
        &mut self.0[pattern.index()]
    }

    fn is_empty(&self) -> bool {
        self.0.iter().all(Vec::is_empty)
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: BTreeMap<ServiceDescription, Producers>,
    producer_counts: [usize; 2],
}

struct RegistryInner {
    config: RegistryConfig,
    state: Mutex<RegistryState>,
    generation: AtomicU64,
    watchers: Mutex<Vec<(WatchId, Watcher)>>,
    next_watch_id: AtomicU64,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Capacity-bounded table of offered services.
///
/// Cheaply cloneable; every clone refers to the same table.
#[derive(Clone)]
pub struct ServiceRegistry {
    inner: Arc<RegistryInner>,
}

impl ServiceRegistry {
    /// Create an empty registry with the given limits.
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                state: Mutex::new(RegistryState::default()),
                generation: AtomicU64::new(0),
                watchers: Mutex::new(Vec::new()),
                next_watch_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Register `producer` as offering `description` under `pattern`.
    ///
    /// Offering the same (description, producer, pattern) twice is a no-op
    /// and does not advance the generation counter.
    ///
    /// # Errors
    ///
    /// [`DiscoveryError::CapacityExceeded`] if `pattern` already has the
    /// configured maximum number of producers.  The registry is unchanged.
    pub fn add(
        &self,
        description: &ServiceDescription,
        producer: ProducerId,
        pattern: MessagingPattern,
    ) -> Result<()> {
        {
            let mut state = self.inner.state.lock();

            let already_offered = state
                .entries
                .get(description)
                .is_some_and(|p| p.get(pattern).contains(&producer));
            if already_offered {
                return Ok(());
            }

            let max = self.inner.config.max_producers(pattern);
            if state.producer_counts[pattern.index()] >= max {
                tracing::warn!(
                    service = %description,
                    %pattern,
                    max,
                    "registry full, offer rejected"
                );
                return Err(DiscoveryError::CapacityExceeded { pattern, max });
            }

            state
                .entries
                .entry(description.clone())
                .or_default()
                .get_mut(pattern)
                .push(producer);
            state.producer_counts[pattern.index()] += 1;
            let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;

            tracing::debug!(service = %description, %producer, %pattern, generation, "service added");
        }

        self.notify_watchers();
        Ok(())
    }

    /// Withdraw `producer`'s offer of `description` under `pattern`.
    ///
    /// Returns `true` if an association was removed.  Removing an
    /// association that does not exist is a no-op.
    pub fn remove(
        &self,
        description: &ServiceDescription,
        producer: ProducerId,
        pattern: MessagingPattern,
    ) -> bool {
        {
            let mut state = self.inner.state.lock();

            let Some(producers) = state.entries.get_mut(description) else {
                return false;
            };
            let list = producers.get_mut(pattern);
            let Some(position) = list.iter().position(|p| *p == producer) else {
                return false;
            };
            list.remove(position);
            if producers.is_empty() {
                state.entries.remove(description);
            }
            state.producer_counts[pattern.index()] -= 1;
            let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;

            tracing::debug!(service = %description, %producer, %pattern, generation, "service removed");
        }

        self.notify_watchers();
        true
    }

    /// Every description offered under `pattern` that matches `query`.
    ///
    /// The result is a snapshot in description order.  It is truncated
    /// silently at [`RegistryConfig::max_find_results`].
    pub fn find(&self, query: &ServiceQuery<'_>, pattern: MessagingPattern) -> Vec<ServiceDescription> {
        let state = self.inner.state.lock();
        state
            .entries
            .iter()
            .filter(|(description, producers)| {
                !producers.get(pattern).is_empty() && description.matches(query)
            })
            .map(|(description, _)| description.clone())
            .take(self.inner.config.max_find_results)
            .collect()
    }

    /// Generation counter; advances on every successful add or remove.
    pub fn change_count(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// Number of producer associations registered under `pattern`.
    pub fn producer_count(&self, pattern: MessagingPattern) -> usize {
        self.inner.state.lock().producer_counts[pattern.index()]
    }

    /// Number of distinct descriptions offered under any pattern.
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register `watcher` to run after every successful mutation.
    ///
    /// Watchers run on the mutating thread, after the registry lock has
    /// been released.
    pub fn watch(&self, watcher: impl Fn() + Send + Sync + 'static) -> WatchId {
        let id = WatchId(self.inner.next_watch_id.fetch_add(1, Ordering::Relaxed));
        self.inner.watchers.lock().push((id, Arc::new(watcher)));
        id
    }

    /// Remove a watcher.  Returns `false` if `id` was not registered.
    pub fn unwatch(&self, id: WatchId) -> bool {
        let mut watchers = self.inner.watchers.lock();
        let before = watchers.len();
        watchers.retain(|(watch_id, _)| *watch_id != id);
        watchers.len() != before
    }

    fn notify_watchers(&self) {
        let watchers: Vec<Watcher> = self
            .inner
            .watchers
            .lock()
            .iter()
            .map(|(_, watcher)| Arc::clone(watcher))
            .collect();
        for watcher in watchers {
            watcher();
        }
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("config", &self.inner.config)
            .field("services", &self.len())
            .field("generation", &self.change_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const PUB_SUB: MessagingPattern = MessagingPattern::PublishSubscribe;
    const REQ_RES: MessagingPattern = MessagingPattern::RequestResponse;

    fn sd(service: &str, instance: &str, event: &str) -> ServiceDescription {
        ServiceDescription::new(service, instance, event).expect("valid description")
    }

    fn all(registry: &ServiceRegistry, pattern: MessagingPattern) -> Vec<ServiceDescription> {
        registry.find(&ServiceQuery::wildcard(), pattern)
    }

    #[test]
    fn add_and_find() {
        let registry = ServiceRegistry::default();
        registry.add(&sd("a", "b", "c"), ProducerId::new(), PUB_SUB).expect("add");

        assert_eq!(all(&registry, PUB_SUB), vec![sd("a", "b", "c")]);
        assert!(all(&registry, REQ_RES).is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_offer_is_noop() {
        let registry = ServiceRegistry::default();
        let producer = ProducerId::new();
        let description = sd("a", "b", "c");

        registry.add(&description, producer, PUB_SUB).expect("first add");
        let generation = registry.change_count();
        registry.add(&description, producer, PUB_SUB).expect("second add");

        assert_eq!(registry.producer_count(PUB_SUB), 1);
        assert_eq!(registry.change_count(), generation);
        assert_eq!(all(&registry, PUB_SUB).len(), 1);
    }

    #[test]
    fn remove_leaves_other_producers() {
        let registry = ServiceRegistry::default();
        let description = sd("a", "b", "c");
        let first = ProducerId::new();
        let second = ProducerId::new();

        registry.add(&description, first, PUB_SUB).unwrap();
        registry.add(&description, second, PUB_SUB).unwrap();
        assert_eq!(all(&registry, PUB_SUB).len(), 1);

        assert!(registry.remove(&description, first, PUB_SUB));
        assert_eq!(all(&registry, PUB_SUB), vec![description.clone()]);

        assert!(registry.remove(&description, second, PUB_SUB));
        assert!(all(&registry, PUB_SUB).is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_absent_is_noop() {
        let registry = ServiceRegistry::default();
        let description = sd("a", "b", "c");
        let producer = ProducerId::new();

        assert!(!registry.remove(&description, producer, PUB_SUB));
        registry.add(&description, producer, PUB_SUB).unwrap();
        // Wrong pattern.
        assert!(!registry.remove(&description, producer, REQ_RES));
        assert!(registry.remove(&description, producer, PUB_SUB));
        assert!(!registry.remove(&description, producer, PUB_SUB));
        assert_eq!(registry.change_count(), 2);
    }

    #[test]
    fn patterns_are_tracked_independently() {
        let registry = ServiceRegistry::default();
        let description = sd("a", "b", "c");
        let producer = ProducerId::new();

        registry.add(&description, producer, PUB_SUB).unwrap();
        registry.add(&description, producer, REQ_RES).unwrap();
        assert_eq!(registry.len(), 1);

        registry.remove(&description, producer, PUB_SUB);
        assert!(all(&registry, PUB_SUB).is_empty());
        assert_eq!(all(&registry, REQ_RES), vec![description]);
    }

    #[test]
    fn capacity_exceeded_leaves_state_unchanged() {
        let registry = ServiceRegistry::new(RegistryConfig::new().with_max_servers(2));
        registry.add(&sd("s", "1", "e"), ProducerId::new(), REQ_RES).unwrap();
        registry.add(&sd("s", "2", "e"), ProducerId::new(), REQ_RES).unwrap();
        let generation = registry.change_count();

        let err = registry
            .add(&sd("s", "3", "e"), ProducerId::new(), REQ_RES)
            .unwrap_err();
        assert_eq!(
            err,
            DiscoveryError::CapacityExceeded {
                pattern: REQ_RES,
                max: 2
            }
        );
        assert_eq!(registry.producer_count(REQ_RES), 2);
        assert_eq!(registry.change_count(), generation);
        assert_eq!(all(&registry, REQ_RES).len(), 2);

        // The other pattern has its own budget.
        registry.add(&sd("s", "3", "e"), ProducerId::new(), PUB_SUB).unwrap();
    }

    #[test]
    fn find_truncates_at_max_results() {
        let registry = ServiceRegistry::new(RegistryConfig::new().with_max_find_results(3));
        for i in 0..5 {
            registry
                .add(&sd("s", &i.to_string(), "e"), ProducerId::new(), PUB_SUB)
                .unwrap();
        }
        assert_eq!(all(&registry, PUB_SUB).len(), 3);
        assert_eq!(registry.producer_count(PUB_SUB), 5);
    }

    #[test]
    fn watchers_run_after_mutation() {
        let registry = ServiceRegistry::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let observer = registry.clone();
        let seen = Arc::clone(&calls);
        let id = registry.watch(move || {
            // The registry lock is free again while watchers run.
            let _ = all(&observer, PUB_SUB);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let description = sd("a", "b", "c");
        let producer = ProducerId::new();
        registry.add(&description, producer, PUB_SUB).unwrap();
        registry.remove(&description, producer, PUB_SUB);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(registry.unwatch(id));
        assert!(!registry.unwatch(id));
        registry.add(&description, producer, PUB_SUB).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_offers_are_counted_exactly() {
        let registry = ServiceRegistry::default();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let description = sd("svc", &format!("{t}-{i}"), "e");
                        registry.add(&description, ProducerId::new(), PUB_SUB).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.producer_count(PUB_SUB), 100);
        assert_eq!(registry.change_count(), 100);
        assert_eq!(all(&registry, PUB_SUB).len(), 100);
    }
}
