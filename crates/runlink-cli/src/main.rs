//! Runlink CLI - Scenario runner and request tooling for the Runlink broker
//!
//! # Quick Start
//!
//! ```bash
//! # Run every adversarial consumer scenario against an in-memory broker
//! runlink simulate --scenario all
//!
//! # Show the effective configuration (RUNLINK_* variables or a JSON file)
//! runlink config
//!
//! # Derive the internal id of a request
//! runlink request-id --requester alice --external-id XID
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod display;
mod scenarios;

use commands::{inspect, simulate};
use runlink_types::Amount;

/// Runlink CLI - payment-escrowed request/callback broker
#[derive(Parser)]
#[command(name = "runlink")]
#[command(author = "Runlink Contributors")]
#[command(version)]
#[command(about = "Run and inspect the Runlink request broker", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Broker configuration file (JSON); defaults to RUNLINK_* variables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fulfill a paid request against a chosen consumer behaviour
    Simulate {
        /// Consumer behaviour to run
        #[arg(short, long, value_enum, default_value = "all")]
        scenario: simulate::Scenario,

        /// Payment in token base units
        #[arg(short, long, default_value = "1000000000000000000")]
        payment: u128,
    },

    /// Show the effective broker configuration
    Config,

    /// Derive the internal id of a request
    RequestId {
        /// Requester address (0x-prefixed hex) or label
        #[arg(long)]
        requester: String,

        /// Requester-chosen external id
        #[arg(long)]
        external_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    print_banner();

    match cli.command {
        Commands::Simulate { scenario, payment } => {
            let config = inspect::load_config(cli.config.as_deref())?;
            simulate::run(scenario, Amount::new(payment), config).await?;
        }
        Commands::Config => {
            let config = inspect::load_config(cli.config.as_deref())?;
            inspect::show_config(&config)?;
        }
        Commands::RequestId {
            requester,
            external_id,
        } => {
            inspect::show_request_id(&requester, &external_id);
        }
    }

    Ok(())
}

fn print_banner() {
    println!();
    println!(
        "  {} {}",
        "runlink".bright_cyan().bold(),
        env!("CARGO_PKG_VERSION").bright_black()
    );
    println!("  {}", "payment-escrowed requests, isolated callbacks".bright_black());
}
