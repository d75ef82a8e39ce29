//! Meridian service registry and discovery.
//!
//! This crate tracks which services are offered and lets clients find them:
//!
//! - **[`service`]** -- [`ServiceDescription`], bounded [`IdString`]s, and
//!   wildcard [`ServiceQuery`] matching.
//! - **[`registry`]** -- [`ServiceRegistry`], a capacity-bounded table of
//!   offered services guarded by one lock, with a generation counter.
//! - **[`discovery`]** -- [`ServiceDiscovery`], the search facade.  It is an
//!   attachable source for `meridian-notify` waiters.
//! - **[`producer`]** -- [`Publisher`] / [`Server`], which offer on
//!   construction and stop offering on drop.
//! - **[`introspection`]** -- the built-in services that are always
//!   discoverable.
//! - **[`config`]** -- [`RegistryConfig`] capacity limits.
//! - **[`error`]** -- [`DiscoveryError`] via [`thiserror`].
//!
//! The registry is passed around by handle; it is never a global.

pub mod config;
pub mod discovery;
pub mod error;
pub mod introspection;
pub mod producer;
pub mod registry;
pub mod service;

pub use config::{MAX_FIND_SERVICE_RESULTS, MAX_PUBLISHERS, MAX_SERVERS, RegistryConfig};
pub use discovery::{ServiceDiscovery, ServiceDiscoveryEvent};
pub use error::{DiscoveryError, Result};
pub use introspection::{BROKER_INSTANCE, NUMBER_OF_INTERNAL_PUBLISHERS, internal_services};
pub use producer::{Producer, Publisher, Server};
pub use registry::{ProducerId, ServiceRegistry, WatchId};
pub use service::{ID_STRING_CAPACITY, IdString, MessagingPattern, ServiceDescription, ServiceQuery};
