//! Command-line front end for the URL shortener core.
//!
//! Runs one operation against the configured storage backend and exits.
//!
//! # Usage
//!
//! ```bash
//! # Shorten a URL
//! shortener shorten https://example.com --user alice
//!
//! # Shorten several URLs, pairing each with a correlation id
//! shortener batch --user alice 1=https://a.example 2=https://b.example
//!
//! # Look up the original URL
//! shortener resolve c984d06a
//!
//! # List active URLs of a user
//! shortener list --user alice
//!
//! # Soft-delete by identifier or full short URL
//! shortener delete --user alice c984d06a http://localhost:8080/0cc175b9
//!
//! # Check the backend
//! shortener ping
//! ```
//!
//! # Environment Variables
//!
//! See [`url_shortener_core::config`]. Global flags override the matching
//! variables.

use url_shortener_core::AppError;
use url_shortener_core::application::services::{DeletionState, UrlService};
use url_shortener_core::bootstrap::{build_service, open_storage};
use url_shortener_core::config::{Config, StorageKind};
use url_shortener_core::domain::entities::BatchItem;
use url_shortener_core::domain::repositories::UrlStorage;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

type Service = UrlService<dyn UrlStorage>;

/// Shorten, resolve and delete URLs.
#[derive(Parser)]
#[command(name = "shortener")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Storage backend: memory, file or postgres
    #[arg(long, global = true)]
    storage: Option<String>,

    /// Journal file path (file backend)
    #[arg(long, global = true)]
    file_storage_path: Option<String>,

    /// PostgreSQL connection string (postgres backend)
    #[arg(long, global = true)]
    database_dsn: Option<String>,

    /// Prefix for generated short URLs
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shorten a single URL
    Shorten {
        url: String,

        /// Owner of the new short URL
        #[arg(short, long)]
        user: String,
    },

    /// Shorten several URLs given as CORRELATION_ID=URL pairs
    Batch {
        #[arg(short, long)]
        user: String,

        #[arg(required = true, value_parser = parse_batch_item)]
        items: Vec<BatchItem>,
    },

    /// Print the original URL for a short identifier
    Resolve { id: String },

    /// List active short URLs of a user
    List {
        #[arg(short, long)]
        user: String,
    },

    /// Soft-delete short URLs by identifier or full short URL
    Delete {
        #[arg(short, long)]
        user: String,

        #[arg(required = true)]
        tokens: Vec<String>,

        /// Run as a background job and report its final status
        #[arg(long)]
        background: bool,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Check that the storage backend is reachable
    Ping,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    apply_overrides(&mut config, &cli)?;
    config.validate()?;

    init_tracing(&config);
    config.print_summary();

    let storage = open_storage(&config).await?;
    let service = build_service(&config, storage);

    match cli.command {
        Commands::Shorten { url, user } => shorten(&service, &url, &user).await?,
        Commands::Batch { user, items } => shorten_batch(&service, items, &user).await?,
        Commands::Resolve { id } => resolve(&service, &id).await?,
        Commands::List { user } => list(&service, &user).await?,
        Commands::Delete {
            user,
            tokens,
            background,
            yes,
        } => delete(&service, &config, &user, tokens, background, yes).await?,
        Commands::Ping => ping(&service).await?,
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<()> {
    if let Some(ref path) = cli.file_storage_path {
        config.file_storage_path = Some(path.clone());
        config.storage = StorageKind::File;
    }
    if let Some(ref dsn) = cli.database_dsn {
        config.database_url = Some(dsn.clone());
        config.storage = StorageKind::Postgres;
    }
    if let Some(ref kind) = cli.storage {
        config.storage = kind.parse()?;
    }
    if let Some(ref base_url) = cli.base_url {
        config.base_url = base_url.clone();
    }

    Ok(())
}

/// Installs the global tracing subscriber. Logs go to stderr so command
/// output on stdout stays clean.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn parse_batch_item(raw: &str) -> Result<BatchItem, String> {
    let (correlation_id, url) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CORRELATION_ID=URL, got '{}'", raw))?;

    Ok(BatchItem::new(correlation_id, url))
}

async fn shorten(service: &Service, url: &str, user: &str) -> Result<()> {
    let shortened = service
        .shorten(url, user)
        .await
        .context("Failed to shorten URL")?;

    if shortened.existed {
        println!(
            "{} {}",
            shortened.short_url.bright_yellow().bold(),
            "(already exists)".yellow()
        );
    } else {
        println!("{}", shortened.short_url.bright_green().bold());
    }

    Ok(())
}

async fn shorten_batch(service: &Service, items: Vec<BatchItem>, user: &str) -> Result<()> {
    let result = service
        .shorten_batch(items, user)
        .await
        .context("Failed to shorten batch")?;

    for item in &result.items {
        println!(
            "  {:<12} {}",
            item.correlation_id.bright_black(),
            item.short_url.cyan()
        );
    }

    if result.has_conflicts() {
        println!();
        println!(
            "{} {}",
            "Already existing:".yellow(),
            result.conflicts.join(", ").bright_white()
        );
    }

    Ok(())
}

async fn resolve(service: &Service, id: &str) -> Result<()> {
    match service.resolve(id).await {
        Ok(Some(url)) => {
            println!("{}", url);
            Ok(())
        }
        Ok(None) => anyhow::bail!("Short URL '{}' not found", id),
        Err(e @ AppError::Deleted { .. }) => {
            println!("{}", "Gone: this short URL was deleted".red());
            Err(e.into())
        }
        Err(e) => Err(anyhow::Error::new(e).context("Failed to resolve short URL")),
    }
}

async fn list(service: &Service, user: &str) -> Result<()> {
    let records = service
        .list_for_user(user)
        .await
        .context("Failed to list URLs")?;

    if records.is_empty() {
        println!("{}", "  No URLs found".yellow());
        return Ok(());
    }

    println!(
        "  {:<40} {}",
        "Short URL".bright_white().bold(),
        "Original URL".bright_white().bold()
    );
    println!("  {}", "-".repeat(75).bright_black());

    for record in &records {
        println!(
            "  {:<40} {}",
            service.short_url(&record.id).cyan(),
            record.original_url
        );
    }

    println!();
    println!(
        "  Total: {}",
        records.len().to_string().bright_white().bold()
    );

    Ok(())
}

async fn delete(
    service: &Service,
    config: &Config,
    user: &str,
    tokens: Vec<String>,
    background: bool,
    skip_confirm: bool,
) -> Result<()> {
    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete {} short URL(s) of '{}'?", tokens.len(), user))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled".red());
            return Ok(());
        }
    }

    if background {
        let ticket = service.submit_deletion(user, tokens).await;
        println!("Deletion {} accepted", ticket.to_string().bright_white());

        let status = service
            .wait_for_deletion(user, ticket)
            .await
            .context("Deletion job disappeared")?;

        match status.state {
            DeletionState::Completed { submitted, groups } => println!(
                "{}",
                format!("Deleted {} id(s) in {} group(s)", submitted, groups)
                    .green()
                    .bold()
            ),
            DeletionState::Failed { message, .. } => anyhow::bail!("Deletion failed: {}", message),
            DeletionState::Pending => anyhow::bail!("Deletion did not finish"),
        }

        return Ok(());
    }

    let deadline = Instant::now() + config.delete_timeout();
    let report = service
        .delete_batch(user, tokens, deadline)
        .await
        .context("Failed to delete URLs")?;

    println!(
        "{}",
        format!(
            "Deleted {} id(s) in {} group(s)",
            report.submitted, report.groups
        )
        .green()
        .bold()
    );

    Ok(())
}

async fn ping(service: &Service) -> Result<()> {
    service.ping().await.context("Storage is not reachable")?;
    println!("{}", "Storage connection OK".green().bold());
    Ok(())
}
