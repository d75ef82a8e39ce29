//! Built-in services that are always discoverable.
//!
//! The broker publishes its own introspection topics and the service
//! registry itself.  They are not stored in the user registry; discovery
//! synthesizes them for every publish-subscribe search.

use crate::service::ServiceDescription;

/// Instance id shared by every built-in service.
pub const BROKER_INSTANCE: &str = "Broker_ID";

pub const INTROSPECTION_SERVICE: &str = "Introspection";
pub const SERVICE_DISCOVERY_SERVICE: &str = "ServiceDiscovery";

const BUILT_IN: [(&str, &str); 6] = [
    (INTROSPECTION_SERVICE, "MemPool"),
    (INTROSPECTION_SERVICE, "Port"),
    (INTROSPECTION_SERVICE, "PortThroughput"),
    (INTROSPECTION_SERVICE, "SubscriberPortsData"),
    (INTROSPECTION_SERVICE, "Process"),
    (SERVICE_DISCOVERY_SERVICE, "ServiceRegistry"),
];

/// Number of built-in publish-subscribe services.
pub const NUMBER_OF_INTERNAL_PUBLISHERS: usize = BUILT_IN.len();

/// Descriptions of the built-in services, in a fixed order.
pub fn internal_services() -> Vec<ServiceDescription> {
    BUILT_IN
        .iter()
        .map(|(service, event)| ServiceDescription::truncated(service, BROKER_INSTANCE, event))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_set_is_fixed() {
        let services = internal_services();
        assert_eq!(services.len(), NUMBER_OF_INTERNAL_PUBLISHERS);
        assert_eq!(services.len(), 6);
        assert!(services.iter().all(|s| s.instance() == BROKER_INSTANCE));
        assert!(services.contains(
            &ServiceDescription::new("ServiceDiscovery", "Broker_ID", "ServiceRegistry").unwrap()
        ));
    }
}
