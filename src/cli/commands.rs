//! Command implementations for the field visit processor CLI.
//!
//! Dispatches parsed arguments to the hot-folder processor or the
//! connectivity check, sets up logging, and reports a final summary.

use colored::Colorize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::app::models::ProcessingStats;
use crate::app::services::plugins::PluginRegistry;
use crate::cli::args::{Args, CheckArgs, Commands, ProcessArgs};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::processor::HotFolderProcessor;
use crate::remote;
use crate::remote::resilience::connect_with_retry;

/// Dispatch the parsed command line to its implementation
pub async fn run(args: Args, cancellation: CancellationToken) -> Result<Option<ProcessingStats>> {
    match args.command {
        Some(Commands::Process(process_args)) => {
            let stats = run_process(process_args, cancellation).await?;
            Ok(Some(stats))
        }
        Some(Commands::Check(check_args)) => {
            run_check(check_args).await?;
            Ok(None)
        }
        None => Ok(None),
    }
}

/// Watch the hot folder and process files until cancellation or a
/// voluntary exit condition
pub async fn run_process(
    args: ProcessArgs,
    cancellation: CancellationToken,
) -> Result<ProcessingStats> {
    setup_logging(args.verbose)?;

    let config = args.into_config()?;
    config.validate()?;
    debug!("Effective configuration: {:?}", config);

    let registry = Arc::new(PluginRegistry::from_names(&config.plugins)?);
    info!(
        "Loaded {} parser plugin(s): {:?}",
        registry.len(),
        config.plugins
    );

    let client = remote::client_for(&config)?;
    let processor = HotFolderProcessor::new(config.clone(), registry, client, cancellation);
    let stats = processor.run().await?;

    report_summary(&config, &stats);
    Ok(stats)
}

/// Validate configuration and remote connectivity, then exit
pub async fn run_check(args: CheckArgs) -> Result<()> {
    setup_logging(args.verbose)?;

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(server) = args.server {
        config.server_address = server;
    }
    if let Some(username) = args.username {
        config.username = username;
    }
    if let Some(password) = args.password {
        config.password = password;
    }
    if args.dry_run {
        config.dry_run = true;
    }
    if config.server_address.is_empty() && !config.dry_run {
        return Err(Error::configuration("server address must be set"));
    }

    let client = remote::client_for(&config)?;
    connect_with_retry(
        client.as_ref(),
        &config.server_address,
        config.max_connection_attempts,
        config.connection_retry_delay(),
    )
    .await?;
    let version = client.server_version().await.map_err(Error::Remote)?;

    let target = if config.dry_run {
        "built-in store".to_string()
    } else {
        config.server_address.clone()
    };
    println!(
        "{} {} ({})",
        "Connected to".bright_green(),
        target.bright_cyan(),
        format!("server version {}", version).bright_black()
    );
    Ok(())
}

/// Set up structured logging to stderr
fn setup_logging(verbose: bool) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fieldvisit_processor={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|e| Error::configuration(format!("could not initialize logging: {}", e)))?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Print the end-of-run summary
fn report_summary(config: &Config, stats: &ProcessingStats) {
    println!();
    println!("{}", "Processing complete".bright_green().bold());
    println!("{}", "===================".bright_green());
    println!();
    if config.dry_run {
        println!("{}", "Dry run - nothing was uploaded".bright_yellow());
        println!();
    }
    println!(
        "  Files uploaded:   {}",
        stats.files_uploaded.to_string().bright_cyan()
    );
    println!(
        "  Partial uploads:  {}",
        stats.files_partial.to_string().bright_cyan()
    );
    println!(
        "  Files failed:     {}",
        stats.files_failed.to_string().bright_cyan()
    );
    if stats.files_vanished > 0 {
        println!(
            "  Files vanished:   {}",
            stats.files_vanished.to_string().bright_black()
        );
    }
    println!(
        "  Visits uploaded:  {}",
        stats.visits_uploaded.to_string().bright_cyan()
    );
    if stats.visits_skipped > 0 {
        println!(
            "  Visits withheld:  {}",
            stats.visits_skipped.to_string().bright_yellow()
        );
    }
    println!(
        "  Elapsed:          {:.1}s",
        stats.processing_time_ms as f64 / 1000.0
    );
}
