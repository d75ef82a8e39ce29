//! Service identity and wildcard matching.
//!
//! A [`ServiceDescription`] names a service by a (service, instance, event)
//! triple of bounded [`IdString`]s.  Equality and ordering are plain
//! lexicographic comparisons over the three fields.  Wildcards exist only in
//! queries: a [`ServiceQuery`] field that is `None` matches any value, a field
//! that is `Some` must be equal byte for byte.  There is no prefix or
//! substring matching.
//!
//! # Example
//!
//! ```rust
//! # use meridian_discovery::service::{ServiceDescription, ServiceQuery};
//! let radar = ServiceDescription::new("Radar", "FrontLeft", "Objects").unwrap();
//!
//! assert!(radar.matches(&ServiceQuery::wildcard()));
//! assert!(radar.matches(&ServiceQuery::wildcard().service("Radar").event("Objects")));
//! assert!(!radar.matches(&ServiceQuery::wildcard().instance("Front")));
//! ```

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::error::{DiscoveryError, Result};

/// Maximum length, in bytes, of a service, instance, or event id.
pub const ID_STRING_CAPACITY: usize = 100;

// ---------------------------------------------------------------------------
// MessagingPattern
// ---------------------------------------------------------------------------

/// Messaging pattern a producer offers a service under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessagingPattern {
    /// Publishers and subscribers.
    PublishSubscribe,
    /// Servers and clients.
    RequestResponse,
}

impl MessagingPattern {
    /// Every pattern, in index order.
    pub const ALL: [Self; 2] = [Self::PublishSubscribe, Self::RequestResponse];

    pub(crate) fn index(self) -> usize {
        match self {
            Self::PublishSubscribe => 0,
            Self::RequestResponse => 1,
        }
    }
}

impl fmt::Display for MessagingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PublishSubscribe => f.write_str("publish-subscribe"),
            Self::RequestResponse => f.write_str("request-response"),
        }
    }
}

// ---------------------------------------------------------------------------
// IdString
// ---------------------------------------------------------------------------

/// A string of at most [`ID_STRING_CAPACITY`] bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdString(String);

impl IdString {
    /// Validate `value` against the capacity.
    ///
    /// # Errors
    ///
    /// [`DiscoveryError::IdStringTooLong`] if `value` is longer than
    /// [`ID_STRING_CAPACITY`] bytes.  Oversized input is never truncated
    /// silently; use [`IdString::truncated`] for that.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.len() > ID_STRING_CAPACITY {
            return Err(DiscoveryError::IdStringTooLong {
                len: value.len(),
                max: ID_STRING_CAPACITY,
            });
        }
        Ok(Self(value))
    }

    /// Truncate `value` to the capacity, backing off to a char boundary.
    pub fn truncated(value: &str) -> Self {
        let mut end = value.len().min(ID_STRING_CAPACITY);
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        Self(value[..end].to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for IdString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for IdString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for IdString {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for IdString {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl TryFrom<String> for IdString {
    type Error = DiscoveryError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for IdString {
    type Error = DiscoveryError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<IdString> for String {
    fn from(value: IdString) -> Self {
        value.0
    }
}

impl fmt::Display for IdString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ServiceDescription
// ---------------------------------------------------------------------------

/// Immutable (service, instance, event) identity of a service.
///
/// Ordering is lexicographic over service, then instance, then event.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServiceDescription {
    service: IdString,
    instance: IdString,
    event: IdString,
}

impl ServiceDescription {
    /// Build a description, rejecting oversized ids.
    pub fn new(service: &str, instance: &str, event: &str) -> Result<Self> {
        Ok(Self {
            service: IdString::new(service)?,
            instance: IdString::new(instance)?,
            event: IdString::new(event)?,
        })
    }

    /// Build a description, truncating oversized ids to the capacity.
    pub fn truncated(service: &str, instance: &str, event: &str) -> Self {
        Self {
            service: IdString::truncated(service),
            instance: IdString::truncated(instance),
            event: IdString::truncated(event),
        }
    }

    /// Build a description from already validated ids.
    pub fn from_ids(service: IdString, instance: IdString, event: IdString) -> Self {
        Self {
            service,
            instance,
            event,
        }
    }

    pub fn service(&self) -> &IdString {
        &self.service
    }

    pub fn instance(&self) -> &IdString {
        &self.instance
    }

    pub fn event(&self) -> &IdString {
        &self.event
    }

    /// Whether every concrete field of `query` equals the matching field.
    pub fn matches(&self, query: &ServiceQuery<'_>) -> bool {
        query.service.is_none_or(|s| self.service == s)
            && query.instance.is_none_or(|i| self.instance == i)
            && query.event.is_none_or(|e| self.event == e)
    }
}

impl fmt::Display for ServiceDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.service, self.instance, self.event)
    }
}

// ---------------------------------------------------------------------------
// ServiceQuery
// ---------------------------------------------------------------------------

/// Search pattern over service descriptions.  `None` fields are wildcards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceQuery<'a> {
    pub service: Option<&'a str>,
    pub instance: Option<&'a str>,
    pub event: Option<&'a str>,
}

impl<'a> ServiceQuery<'a> {
    pub fn new(service: Option<&'a str>, instance: Option<&'a str>, event: Option<&'a str>) -> Self {
        Self {
            service,
            instance,
            event,
        }
    }

    /// A query matching every description.
    pub fn wildcard() -> Self {
        Self::default()
    }

    /// A query matching exactly `description`.
    pub fn exact(description: &'a ServiceDescription) -> Self {
        Self {
            service: Some(description.service().as_str()),
            instance: Some(description.instance().as_str()),
            event: Some(description.event().as_str()),
        }
    }

    #[must_use]
    pub fn service(mut self, service: &'a str) -> Self {
        self.service = Some(service);
        self
    }

    #[must_use]
    pub fn instance(mut self, instance: &'a str) -> Self {
        self.instance = Some(instance);
        self
    }

    #[must_use]
    pub fn event(mut self, event: &'a str) -> Self {
        self.event = Some(event);
        self
    }

    /// Whether all three fields are wildcards.
    pub fn is_wildcard(&self) -> bool {
        self.service.is_none() && self.instance.is_none() && self.event.is_none()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
