//! Registry configuration.
//!
//! [`RegistryConfig`] fixes the capacity limits of a [`ServiceRegistry`]
//! (crate::registry::ServiceRegistry).  The limits are consumed, never
//! computed: the registry is sized once at construction and never grows past
//! them.  Defaults come from the compile-time constants below, and a
//! builder-style API allows callers to override individual fields.

use serde::{Deserialize, Serialize};

use crate::introspection::NUMBER_OF_INTERNAL_PUBLISHERS;
use crate::service::MessagingPattern;

/// Total publisher slots, internal publishers included.
pub const MAX_PUBLISHERS: usize = 512;

/// Total server slots.
pub const MAX_SERVERS: usize = 512;

/// Upper bound on the number of results a single search returns.
///
/// Searches that match more descriptions are truncated silently.
pub const MAX_FIND_SERVICE_RESULTS: usize = MAX_PUBLISHERS + MAX_SERVERS;

/// Capacity limits of a service registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Maximum number of publish-subscribe producers offered at once.
    ///
    /// Default: **506** ([`MAX_PUBLISHERS`] minus the internal publishers).
    pub max_publishers: usize,

    /// Maximum number of request-response producers offered at once.
    ///
    /// Default: **512** ([`MAX_SERVERS`]).
    pub max_servers: usize,

    /// Maximum number of descriptions one search returns.
    ///
    /// Default: **1024** ([`MAX_FIND_SERVICE_RESULTS`]).
    pub max_find_results: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_publishers: MAX_PUBLISHERS - NUMBER_OF_INTERNAL_PUBLISHERS,
            max_servers: MAX_SERVERS,
            max_find_results: MAX_FIND_SERVICE_RESULTS,
        }
    }
}

impl RegistryConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_publishers(mut self, max: usize) -> Self {
        self.max_publishers = max;
        self
    }

    pub fn with_max_servers(mut self, max: usize) -> Self {
        self.max_servers = max;
        self
    }

    pub fn with_max_find_results(mut self, max: usize) -> Self {
        self.max_find_results = max;
        self
    }

    /// Producer limit for `pattern`.
    pub fn max_producers(&self, pattern: MessagingPattern) -> usize {
        match pattern {
            MessagingPattern::PublishSubscribe => self.max_publishers,
            MessagingPattern::RequestResponse => self.max_servers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = RegistryConfig::default();
        assert_eq!(cfg.max_publishers, 506);
        assert_eq!(cfg.max_servers, 512);
        assert_eq!(cfg.max_find_results, 1024);
        assert_eq!(cfg, RegistryConfig::new());
    }

    #[test]
    fn builder_chaining() {
        let cfg = RegistryConfig::new()
            .with_max_publishers(3)
            .with_max_servers(2)
            .with_max_find_results(5);
        assert_eq!(cfg.max_producers(MessagingPattern::PublishSubscribe), 3);
        assert_eq!(cfg.max_producers(MessagingPattern::RequestResponse), 2);
        assert_eq!(cfg.max_find_results, 5);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: RegistryConfig = toml::from_str("max_servers = 8").expect("parse");
        assert_eq!(cfg.max_servers, 8);
        assert_eq!(cfg.max_publishers, RegistryConfig::default().max_publishers);
    }
}
