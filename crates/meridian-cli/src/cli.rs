//! CLI argument definitions for Meridian.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use meridian_discovery::MessagingPattern;

/// Meridian -- service registry and discovery.
#[derive(Parser)]
#[command(
    name = "meridian",
    version,
    about = "Meridian -- service registry and discovery",
    long_about = "Offers the services listed in the configuration file into an in-process \
                  registry, then searches it or watches it for changes."
)]
pub struct Cli {
    /// Path to the TOML configuration file.  Defaults apply if it is missing.
    #[arg(long, short, global = true, default_value = "config/meridian.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search the registry.  Omitted fields are wildcards.
    Find {
        #[arg(long, short)]
        service: Option<String>,

        #[arg(long, short)]
        instance: Option<String>,

        #[arg(long, short)]
        event: Option<String>,

        /// Messaging pattern to search under.
        #[arg(long, short, value_enum, default_value_t = PatternArg::PublishSubscribe)]
        pattern: PatternArg,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Offer the configured services one by one and report every registry
    /// change as it is observed.
    Watch {
        /// Deliver changes through a listener thread instead of a wait-set.
        #[arg(long)]
        listener: bool,

        /// Delay between two offers, in milliseconds.
        #[arg(long, default_value_t = 200)]
        interval_ms: u64,
    },

    /// Print the effective configuration.
    Config,
}

/// Command-line spelling of [`MessagingPattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PatternArg {
    PublishSubscribe,
    RequestResponse,
}

impl From<PatternArg> for MessagingPattern {
    fn from(value: PatternArg) -> Self {
        match value {
            PatternArg::PublishSubscribe => MessagingPattern::PublishSubscribe,
            PatternArg::RequestResponse => MessagingPattern::RequestResponse,
        }
    }
}
