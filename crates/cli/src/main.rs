//! Storebridge CLI - migrate commerce entities into a Shopify store.
//!
//! # Usage
//!
//! ```bash
//! # Companies, read from the source store
//! storebridge companies 123 456
//! storebridge companies --manifest companies.txt --skip-existing
//!
//! # Sheet imports
//! storebridge customers --sheet customers.csv --update-existing
//! storebridge collections --sheet collections.csv
//! storebridge discounts --sheet discounts.csv
//! storebridge products --sheet products.csv --skip-existing
//! storebridge files --sheet files.csv --concurrency 4
//!
//! # Any command can write a per-record report
//! storebridge --report run.csv products --sheet products.csv
//! ```
//!
//! The process exits with status 1 when any record or child step failed,
//! and 2 when the run could not start.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use storebridge_admin::{ExistsPolicy, MigrateConfig, RunContext};
use storebridge_core::RunSummary;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod manifest;
mod report;
mod sheet;

use commands::sheets::SheetEntity;
use error::CliError;
use report::Report;
use sheet::Sheet;

#[derive(Parser)]
#[command(name = "storebridge")]
#[command(
    author,
    version,
    about = "Migrate companies, customers, catalog and discounts into a Shopify store"
)]
struct Cli {
    /// Write a CSV line per record to this file
    #[arg(long, global = true, value_name = "PATH")]
    report: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate B2B companies from the source store
    Companies {
        /// Company ids, numeric or `gid://shopify/Company/...`
        ids: Vec<String>,

        /// File with one company id per line
        #[arg(long, value_name = "FILE")]
        manifest: Option<PathBuf>,

        /// Leave companies that already exist untouched
        #[arg(long)]
        skip_existing: bool,
    },
    /// Import customers from a sheet
    Customers {
        #[arg(long, value_name = "FILE")]
        sheet: PathBuf,

        /// Update customers that already exist
        #[arg(long)]
        update_existing: bool,
    },
    /// Import collections from a sheet
    Collections {
        #[arg(long, value_name = "FILE")]
        sheet: PathBuf,

        /// Update collections that already exist
        #[arg(long)]
        update_existing: bool,
    },
    /// Import discounts from a sheet
    Discounts {
        #[arg(long, value_name = "FILE")]
        sheet: PathBuf,

        /// Update discounts that already exist
        #[arg(long)]
        update_existing: bool,
    },
    /// Import products from a sheet
    Products {
        #[arg(long, value_name = "FILE")]
        sheet: PathBuf,

        /// Leave products that already exist untouched
        #[arg(long)]
        skip_existing: bool,
    },
    /// Upload files listed in a sheet
    Files {
        #[arg(long, value_name = "FILE")]
        sheet: PathBuf,

        /// Uploads in flight at once (default from `MIGRATE_FILE_CONCURRENCY`)
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
        concurrency: Option<u16>,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &MigrateConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            // Records carry customer emails and addresses
            send_default_pii: false,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storebridge_cli=info,storebridge_admin=info".into());

    // JSON for log shippers, text for a terminal
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Sentry must be initialized before the tracing subscriber
    let config = MigrateConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing();

    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(CliError::from(e)),
    };

    match result {
        Ok(summary) if summary.has_failures() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run aborted");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli, config: &MigrateConfig) -> Result<RunSummary, CliError> {
    let mut ctx = RunContext::from_config(config);
    let mut report = Report::open(cli.report.as_deref())?;

    let summary = match cli.command {
        Commands::Companies {
            ids,
            manifest,
            skip_existing,
        } => {
            let policy = ExistsPolicy::update_if(!skip_existing);
            commands::companies::run(&mut ctx, &ids, manifest.as_deref(), policy, &mut report)
                .await?
        }
        Commands::Customers {
            sheet,
            update_existing,
        } => {
            run_sheet(&mut ctx, SheetEntity::Customers, &sheet, update_existing, &mut report).await?
        }
        Commands::Collections {
            sheet,
            update_existing,
        } => {
            run_sheet(&mut ctx, SheetEntity::Collections, &sheet, update_existing, &mut report)
                .await?
        }
        Commands::Discounts {
            sheet,
            update_existing,
        } => {
            run_sheet(&mut ctx, SheetEntity::Discounts, &sheet, update_existing, &mut report).await?
        }
        Commands::Products {
            sheet,
            skip_existing,
        } => {
            run_sheet(&mut ctx, SheetEntity::Products, &sheet, !skip_existing, &mut report).await?
        }
        Commands::Files { sheet, concurrency } => {
            if let Some(concurrency) = concurrency {
                ctx.files.concurrency = usize::from(concurrency);
            }
            commands::files::run(&ctx, Sheet::open(&sheet)?, &mut report).await?
        }
    };

    tracing::info!(
        resolved_ids = ctx.resolver.map().len(),
        summary = %summary,
        "run complete"
    );
    Ok(summary)
}

async fn run_sheet(
    ctx: &mut RunContext,
    entity: SheetEntity,
    path: &std::path::Path,
    update: bool,
    report: &mut Report,
) -> Result<RunSummary, CliError> {
    let sheet = Sheet::open(path)?;
    commands::sheets::run(ctx, entity, &sheet, ExistsPolicy::update_if(update), report).await
}
