//! Shared helpers for the `meridian` binary.

use anyhow::Result;
use meridian_discovery::{Producer, ServiceDescription, ServiceRegistry};
use tracing_subscriber::EnvFilter;

use crate::config::MeridianConfig;

/// Environment variable that overrides the configured log filter.
pub const LOG_ENV: &str = "MERIDIAN_LOG";

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the global tracing subscriber.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Registry setup
// ---------------------------------------------------------------------------

/// Offer every configured service into `registry`.
///
/// The returned producers keep their offers alive; dropping them withdraws
/// the services again.
pub fn offer_configured(registry: &ServiceRegistry, config: &MeridianConfig) -> Result<Vec<Producer>> {
    config
        .offers
        .iter()
        .map(|offer| -> Result<Producer> {
            let producer = Producer::new(registry, offer.description()?, offer.pattern)?;
            tracing::info!(service = %producer.description(), pattern = %offer.pattern, "service offered");
            Ok(producer)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Print search results, one `service/instance/event` per line or as JSON.
pub fn print_descriptions(descriptions: &[ServiceDescription], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(descriptions)?);
        return Ok(());
    }
    for description in descriptions {
        println!("{description}");
    }
    Ok(())
}
