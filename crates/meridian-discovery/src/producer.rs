//! Producers: the offer/stop-offer side of the registry.
//!
//! A [`Producer`] offers one [`ServiceDescription`] under one
//! [`MessagingPattern`].  It offers on construction and stops offering when
//! dropped.  [`Publisher`] and [`Server`] are the two flavours.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Result;
use crate::registry::{ProducerId, ServiceRegistry};
use crate::service::{MessagingPattern, ServiceDescription};

/// A producer offering one service under one pattern.
#[derive(Debug)]
pub struct Producer {
    registry: ServiceRegistry,
    description: ServiceDescription,
    pattern: MessagingPattern,
    id: ProducerId,
    offered: AtomicBool,
}

/// Publish-subscribe producer.
pub type Publisher = Producer;

/// Request-response producer.
pub type Server = Producer;

impl Producer {
    /// Create a producer and offer `description` under `pattern`.
    ///
    /// # Errors
    ///
    /// [`DiscoveryError::CapacityExceeded`](crate::DiscoveryError::CapacityExceeded)
    /// if the registry has no room left for `pattern`.
    pub fn new(
        registry: &ServiceRegistry,
        description: ServiceDescription,
        pattern: MessagingPattern,
    ) -> Result<Self> {
        let producer = Self {
            registry: registry.clone(),
            description,
            pattern,
            id: ProducerId::new(),
            offered: AtomicBool::new(false),
        };
        producer.offer()?;
        Ok(producer)
    }

    /// A publish-subscribe producer.
    pub fn publisher(registry: &ServiceRegistry, description: ServiceDescription) -> Result<Self> {
        Self::new(registry, description, MessagingPattern::PublishSubscribe)
    }

    /// A request-response producer.
    pub fn server(registry: &ServiceRegistry, description: ServiceDescription) -> Result<Self> {
        Self::new(registry, description, MessagingPattern::RequestResponse)
    }

    /// Make the service discoverable.  A no-op if already offered.
    pub fn offer(&self) -> Result<()> {
        if self.is_offered() {
            return Ok(());
        }
        self.registry.add(&self.description, self.id, self.pattern)?;
        self.offered.store(true, Ordering::Release);
        Ok(())
    }

    /// Withdraw the service.  A no-op if not offered.
    pub fn stop_offer(&self) {
        if self.offered.swap(false, Ordering::AcqRel) {
            self.registry.remove(&self.description, self.id, self.pattern);
        }
    }

    pub fn is_offered(&self) -> bool {
        self.offered.load(Ordering::Acquire)
    }

    pub fn description(&self) -> &ServiceDescription {
        &self.description
    }

    pub fn pattern(&self) -> MessagingPattern {
        self.pattern
    }

    pub fn id(&self) -> ProducerId {
        self.id
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        self.stop_offer();
    }
}
