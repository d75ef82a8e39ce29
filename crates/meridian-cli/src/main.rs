//! CLI entry point for Meridian.
//!
//! This binary provides the `meridian` command with subcommands for
//! searching an in-process service registry, watching it for changes, and
//! inspecting the effective configuration.

mod cli;
mod config;
mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use meridian_discovery::{
    MessagingPattern, Producer, ServiceDescription, ServiceDiscovery, ServiceDiscoveryEvent,
    ServiceQuery, ServiceRegistry,
};
use meridian_notify::{Listener, WaitSet, create_notification_callback_with_context};
use tracing::{info, warn};

use crate::cli::{Cli, Commands, PatternArg};
use crate::config::{MeridianConfig, OfferConfig};
use crate::helpers::{init_tracing, offer_configured, print_descriptions};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = MeridianConfig::load(&cli.config)?;
    init_tracing(&config.log_level);

    match cli.command {
        Commands::Find {
            service,
            instance,
            event,
            pattern,
            json,
        } => {
            let query = ServiceQuery::new(service.as_deref(), instance.as_deref(), event.as_deref());
            cmd_find(&config, &query, pattern, json)
        }
        Commands::Watch {
            listener,
            interval_ms,
        } => cmd_watch(&config, listener, Duration::from_millis(interval_ms)),
        Commands::Config => cmd_config(&config),
    }
}

// ---------------------------------------------------------------------------
// Subcommand: find
// ---------------------------------------------------------------------------

fn cmd_find(config: &MeridianConfig, query: &ServiceQuery<'_>, pattern: PatternArg, json: bool) -> Result<()> {
    let registry = ServiceRegistry::new(config.registry.clone());
    let _producers = offer_configured(&registry, config)?;
    let discovery = ServiceDiscovery::new(registry);

    let mut results = Vec::new();
    let mut collect = |description: &ServiceDescription| {
        results.push(description.clone());
    };
    discovery.find_service(
        query.service,
        query.instance,
        query.event,
        Some(&mut collect),
        pattern.into(),
    );

    info!(results = results.len(), "search finished");
    print_descriptions(&results, json)
}

// ---------------------------------------------------------------------------
// Subcommand: watch
// ---------------------------------------------------------------------------

struct WatchReport {
    changes: AtomicUsize,
}

fn report_change(discovery: &ServiceDiscovery, report: &WatchReport) {
    let change = report.changes.fetch_add(1, Ordering::SeqCst) + 1;
    let publishers = discovery
        .find(&ServiceQuery::wildcard(), MessagingPattern::PublishSubscribe)
        .len();
    let servers = discovery
        .find(&ServiceQuery::wildcard(), MessagingPattern::RequestResponse)
        .len();
    println!(
        "change #{change} (generation {}): {publishers} publish-subscribe, {servers} request-response services",
        discovery.registry().change_count()
    );
}

/// Offer every configured service, then withdraw them in reverse order.
fn run_offers(registry: &ServiceRegistry, offers: &[OfferConfig], interval: Duration) -> Result<()> {
    let mut producers = Vec::with_capacity(offers.len());
    for offer in offers {
        thread::sleep(interval);
        producers.push(Producer::new(
            registry,
            offer.description()?,
            offer.pattern,
        )?);
    }
    while let Some(producer) = producers.pop() {
        thread::sleep(interval);
        producer.stop_offer();
    }
    Ok(())
}

fn cmd_watch(config: &MeridianConfig, use_listener: bool, interval: Duration) -> Result<()> {
    if config.offers.is_empty() {
        warn!("no offers configured, nothing to watch");
        return Ok(());
    }

    let registry = ServiceRegistry::new(config.registry.clone());
    let discovery = Arc::new(ServiceDiscovery::new(registry.clone()));
    let report = Arc::new(WatchReport {
        changes: AtomicUsize::new(0),
    });
    let callback = create_notification_callback_with_context(report_change, Arc::clone(&report));

    let offers = config.offers.clone();
    let worker = thread::Builder::new()
        .name("meridian-offers".into())
        .spawn(move || run_offers(&registry, &offers, interval))
        .context("failed to spawn offer thread")?;

    if use_listener {
        let listener = Listener::with_capacity(config.notify.listener_capacity)?;
        listener.attach_event(&discovery, ServiceDiscoveryEvent::ServiceRegistryChanged, callback)?;
        info!("watching registry through a listener");

        worker
            .join()
            .map_err(|_| anyhow!("offer thread panicked"))??;
        // Give the listener a chance to deliver the final change.
        thread::sleep(interval);
        listener.detach_event(&discovery, ServiceDiscoveryEvent::ServiceRegistryChanged);
    } else {
        let wait_set = WaitSet::with_capacity(config.notify.waitset_capacity);
        wait_set.attach_event(&discovery, ServiceDiscoveryEvent::ServiceRegistryChanged, 0, callback)?;
        info!("watching registry through a wait-set");

        loop {
            let fired = wait_set.timed_wait(interval * 2);
            for notification in &fired {
                notification.call();
            }
            if fired.is_empty() && worker.is_finished() {
                break;
            }
        }
        worker
            .join()
            .map_err(|_| anyhow!("offer thread panicked"))??;
    }

    info!(changes = report.changes.load(Ordering::SeqCst), "watch finished");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: config
// ---------------------------------------------------------------------------

fn cmd_config(config: &MeridianConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
