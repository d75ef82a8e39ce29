//! Discovery error types.
//!
//! The registry and its producers surface errors through [`DiscoveryError`].
//! Removing something that is not registered is not an error; it is a no-op.

use crate::service::MessagingPattern;

/// Unified error type for the registry and discovery layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    /// The registry already holds the maximum number of producers for
    /// `pattern`.  Registry state is left unchanged.
    #[error("{pattern} producer capacity exceeded (max: {max})")]
    CapacityExceeded {
        pattern: MessagingPattern,
        max: usize,
    },

    /// A service, instance, or event id is longer than
    /// [`ID_STRING_CAPACITY`](crate::service::ID_STRING_CAPACITY).
    #[error("id string of {len} bytes exceeds capacity of {max} bytes")]
    IdStringTooLong { len: usize, max: usize },
}

/// Convenience alias used throughout the discovery crate.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
