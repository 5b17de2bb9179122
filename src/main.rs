use anyhow::{Context, Result};
use clap::Parser;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use bucketdiff::config::Config;
use bucketdiff::report::{render, ReportFormat};
use bucketdiff::storage::S3Listing;
use bucketdiff::{RunSettings, ScanBoundary, SyncRunner};

/// List files to upload to or delete from object storage so it mirrors local directories
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "BUCKETDIFF_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// Only reconcile the named mapping (repeatable)
    #[arg(short, long = "mapping", value_name = "NAME")]
    mappings: Vec<String>,

    /// Stop the merge scan when either side runs out, leaving the other side's tail unexamined
    #[arg(long)]
    stop_at_exhaustion: bool,

    /// Stop after the first mapping that fails
    #[arg(long)]
    fail_fast: bool,

    /// Number of mappings to process at the same time
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<bool> {
    let path = Config::resolve_path(args.config.as_deref())?;
    let mut config = Config::load(&path)?;

    if args.stop_at_exhaustion {
        config.scan_boundary = bucketdiff::config::BoundarySetting::StopAtExhaustion;
    }
    if args.fail_fast {
        config.fail_fast = true;
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }

    let mappings = config.select_mappings(&args.mappings)?;
    let settings = RunSettings::from_config(&config)?;
    if settings.boundary == ScanBoundary::StopAtExhaustion {
        tracing::info!("Merge scan stops when either side is exhausted");
    }

    let listing = S3Listing::new(&config.storage, mappings.iter().map(|m| m.bucket.as_str()))?;
    listing.check().await?;

    let runner = SyncRunner::new(Arc::new(listing), settings);
    let outcomes = runner.run(&mappings).await;

    let styled = !args.no_color && std::io::stdout().is_terminal();
    let rendered = render(&outcomes, args.format, styled).context("Failed to render report")?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    stdout.flush()?;

    let all_ok = outcomes.len() == mappings.len() && outcomes.iter().all(|o| o.is_ok());
    Ok(all_ok)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Credentials in .env reach OpenDAL through the environment
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!(error = %err, "bucketdiff failed");
            eprintln!("Error: {:?}", err);
            ExitCode::FAILURE
        }
    }
}
