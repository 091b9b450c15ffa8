//! Beian-Exporter main entry point
//!
//! This is the command-line interface for the ICP registration exporter.

use beian_exporter::config::{load_config_with_hash, Config};
use beian_exporter::Exporter;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Beian-Exporter: ICP registration status as Prometheus metrics
///
/// Periodically looks up each configured domain on a public ICP registration
/// search site and exports registration status, details and check errors
/// on /metrics.
#[derive(Parser, Debug)]
#[command(name = "beian-exporter")]
#[command(version)]
#[command(about = "ICP registration status exporter", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the configured listen address
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,

    /// Validate config and show what would be checked without checking
    #[arg(long, conflicts_with = "check")]
    dry_run: bool,

    /// Check a single domain, print the result as JSON and exit
    #[arg(long, value_name = "DOMAIN", conflicts_with = "dry_run")]
    check: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if let Some(domain) = cli.check {
        handle_check(config, &domain).await?;
    } else {
        handle_serve(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("beian_exporter=info,warn"),
            1 => EnvFilter::new("beian_exporter=debug,info"),
            2 => EnvFilter::new("beian_exporter=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Beian-Exporter Dry Run ===\n");

    println!("Schedule:");
    println!("  Check interval: {}s", config.check_interval);
    println!("  Request timeout: {}s", config.request_timeout);
    println!("  Request delay: {}s", config.request_delay);
    println!("  Max retries: {}", config.max_retries);

    println!("\nRate Limit:");
    println!(
        "  Max requests per minute: {}",
        config.rate_limit.max_requests_per_minute
    );
    println!("  Burst size: {}", config.rate_limit.burst_size);

    println!("\nLookup:");
    println!("  Base URL: {}", config.lookup.base_url);
    println!(
        "  Pre-fetch jitter: {}-{}ms",
        config.lookup.min_jitter_ms, config.lookup.max_jitter_ms
    );

    println!("\nServer:");
    println!("  Listen: {}", config.server.listen);

    println!("\nDomains ({}):", config.domains.len());
    for domain in &config.domains {
        println!("  - {}", domain);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --check mode: one on-demand check, printed as JSON
async fn handle_check(config: Config, domain: &str) -> anyhow::Result<()> {
    beian_exporter::config::validate_domain(domain)?;

    let exporter = Exporter::new(config)?;
    let result = exporter.scheduler().check_domain(domain).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Handles the main mode: periodic sweeps plus the HTTP server
async fn handle_serve(config: Config) -> anyhow::Result<()> {
    let exporter = Exporter::new(config)?;
    let listener = exporter.bind().await?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received shutdown signal, stopping...");
    };

    match exporter.run(listener, shutdown).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!("Exporter failed: {}", e);
            Err(e.into())
        }
    }
}
