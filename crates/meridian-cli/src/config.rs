//! Configuration file loading.
//!
//! The `meridian` binary reads a single TOML file:
//!
//! ```toml
//! log_level = "debug"
//!
//! [registry]
//! max_publishers = 64
//!
//! [notify]
//! waitset_capacity = 16
//!
//! [[offers]]
//! service = "Radar"
//! instance = "FrontLeft"
//! event = "Objects"
//! pattern = "publish-subscribe"
//! ```
//!
//! Every section is optional.  A missing file yields the defaults.

use std::path::Path;

use anyhow::{Context, Result};
use meridian_discovery::{MessagingPattern, RegistryConfig, ServiceDescription};
use meridian_notify::{MAX_NUMBER_OF_ATTACHMENTS_PER_WAITSET, MAX_NUMBER_OF_EVENTS_PER_LISTENER};
use serde::{Deserialize, Serialize};

/// Top-level configuration of the `meridian` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeridianConfig {
    /// Default tracing filter; `MERIDIAN_LOG` overrides it.
    pub log_level: String,
    pub registry: RegistryConfig,
    pub notify: NotifyConfig,
    /// Services offered into the registry at start-up.
    pub offers: Vec<OfferConfig>,
}

impl Default for MeridianConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            registry: RegistryConfig::default(),
            notify: NotifyConfig::default(),
            offers: Vec::new(),
        }
    }
}

/// Capacities of the notification primitives used by `watch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub waitset_capacity: usize,
    pub listener_capacity: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            waitset_capacity: MAX_NUMBER_OF_ATTACHMENTS_PER_WAITSET,
            listener_capacity: MAX_NUMBER_OF_EVENTS_PER_LISTENER,
        }
    }
}

/// One service to offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferConfig {
    pub service: String,
    pub instance: String,
    pub event: String,
    #[serde(default = "default_pattern")]
    pub pattern: MessagingPattern,
}

fn default_pattern() -> MessagingPattern {
    MessagingPattern::PublishSubscribe
}

impl OfferConfig {
    /// Validated description of this offer.
    pub fn description(&self) -> Result<ServiceDescription> {
        ServiceDescription::new(&self.service, &self.instance, &self.event).with_context(|| {
            format!(
                "invalid offer {}/{}/{}",
                self.service, self.instance, self.event
            )
        })
    }
}

impl MeridianConfig {
    /// Load the configuration at `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize configuration")
    }
}
