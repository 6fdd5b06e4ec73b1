//! Operator CLI for the duplicate ticket resolver
//!
//! - `reconcile` walks every open ticket of the support pipeline and links
//!   duplicates to their oldest original.
//! - `inspect` prints the properties the resolver reads from one ticket.
//!
//! Results are printed to stdout as JSON; progress goes to the log.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use server_core::config::Config;
use server_core::domains::tickets::models::{properties, Ticket};
use server_core::domains::tickets::{reconcile_backlog, BacklogOptions};
use server_core::kernel::ServerDeps;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dedup_cli")]
#[command(about = "Duplicate ticket resolver operations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-check every open ticket and link duplicates to the oldest original
    Reconcile {
        /// Resume from a cursor printed by an earlier, interrupted run
        #[arg(long)]
        start_after: Option<String>,
        /// Search only, do not write to tickets
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the matching properties of one ticket
    Inspect { ticket_id: String },
}

#[derive(Serialize)]
struct InspectOutput {
    id: String,
    properties: Value,
    eligible_for_matching: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing: Vec<&'static str>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let deps = ServerDeps::from_config(&config);

    match cli.command {
        Commands::Reconcile {
            start_after,
            dry_run,
        } => {
            let report = reconcile_backlog(
                BacklogOptions {
                    start_after,
                    dry_run,
                },
                &deps,
            )
            .await
            .context("Backlog reconciliation aborted")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Inspect { ticket_id } => {
            let object = deps
                .tickets
                .get(&ticket_id, properties::INSPECT_PROPERTIES)
                .await
                .with_context(|| format!("Failed to fetch ticket {}", ticket_id))?;

            let ticket = Ticket::from_crm(&object);
            let missing = ticket.fields.missing(&deps.policy);
            let output = InspectOutput {
                id: object.id.clone(),
                properties: serde_json::to_value(&object.properties)?,
                eligible_for_matching: missing.is_empty() && !ticket.is_resolved(&deps.policy),
                missing,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
