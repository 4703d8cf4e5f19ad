//! DealDesk CLI, the main entry point.
//!
//! Commands:
//! - `availability`  Free meeting slots for a calendar export
//! - `quota`         Inspect and administer tenant credit quotas
//! - `intent`        Check whether a message needs the calendar
//! - `embed`         Embed text with the configured provider
//! - `config`        Show, locate, initialize or validate configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "dealdesk",
    about = "DealDesk: context engine for a sales assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show free meeting slots computed from a JSON events file
    Availability {
        /// JSON array of calendar events
        #[arg(short, long)]
        events: PathBuf,

        /// Reference time (RFC 3339, e.g. 2026-03-02T09:07:00+01:00); defaults to now
        #[arg(long)]
        now: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Tenant credit quota
    Quota {
        #[command(subcommand)]
        action: QuotaAction,
    },

    /// Check whether a message would trigger a calendar lookup
    Intent {
        /// The current message
        message: String,

        /// Earlier messages, oldest first (repeatable)
        #[arg(short, long)]
        recent: Vec<String>,
    },

    /// Embed text with the configured embedding provider
    Embed {
        /// Text to embed
        text: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum QuotaAction {
    /// Show one tenant's record, or all tenants
    Show {
        /// Tenant id; omit to list every tenant
        tenant: Option<String>,
    },

    /// Evaluate the admission gate for a tenant
    Check { tenant: String },

    /// Record usage for a tenant
    Commit {
        tenant: String,

        /// Credits to charge; defaults to quota.credits_per_reply
        #[arg(long)]
        credits: Option<f64>,
    },

    /// Change a tenant's monthly allowance
    SetLimit {
        tenant: String,

        /// New monthly limit
        #[arg(long, conflicts_with = "unlimited", required_unless_present = "unlimited")]
        limit: Option<f64>,

        /// Remove the limit entirely
        #[arg(long)]
        unlimited: bool,
    },

    /// Grant extra credits for the current month
    AddExtra { tenant: String, credits: f64 },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Validate the config file
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Availability { events, now, json } => {
            commands::availability::run(&events, now.as_deref(), json).await?
        }
        Commands::Quota { action } => match action {
            QuotaAction::Show { tenant } => commands::quota::show(tenant.as_deref()).await?,
            QuotaAction::Check { tenant } => commands::quota::check(&tenant).await?,
            QuotaAction::Commit { tenant, credits } => {
                commands::quota::commit(&tenant, credits).await?
            }
            QuotaAction::SetLimit {
                tenant,
                limit,
                unlimited,
            } => {
                let limit = if unlimited { None } else { limit };
                commands::quota::set_limit(&tenant, limit).await?
            }
            QuotaAction::AddExtra { tenant, credits } => {
                commands::quota::add_extra(&tenant, credits).await?
            }
        },
        Commands::Intent { message, recent } => commands::intent::run(&message, &recent)?,
        Commands::Embed { text } => commands::embed::run(&text).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Init { force } => commands::config_cmd::init(force).await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
    }

    Ok(())
}
