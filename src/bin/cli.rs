//! Collector CLI
//!
//! Fetches a source on a jittered interval (or once) and commits each payload
//! to the storage directory.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use collector::{
    config::{self, Overrides},
    error::Result,
    models::Config,
    pipeline::{self, ArtifactNamer, Scheduler},
    services::SourceFetcher,
    storage::DurableStore,
};
use tokio_util::sync::CancellationToken;

/// Collector - scheduled source ingestion
#[derive(Parser, Debug)]
#[command(name = "collector", version, about = "Scheduled source ingestion daemon")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "collector.toml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and commit on a schedule (or once)
    Run(RunArgs),

    /// Validate the effective configuration
    Validate(RunArgs),

    /// Print the effective configuration
    Info(RunArgs),
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Fetch once, commit, and exit
    #[arg(long)]
    once: bool,

    /// Refresh interval in seconds
    #[arg(long)]
    interval: Option<u64>,

    /// Jitter bound in seconds applied either side of the interval
    #[arg(long)]
    jitter: Option<u64>,

    /// Source to fetch, prefixed with http://, https:// or file://
    #[arg(long)]
    source: Option<String>,

    /// Storage directory; a temporary directory is created when absent
    #[arg(long)]
    storage: Option<PathBuf>,

    /// Application name used in the user agent and request-id header
    #[arg(long)]
    appname: Option<String>,

    /// Artifact name template ({timestamp}, {id})
    #[arg(long)]
    artifact: Option<String>,
}

impl From<RunArgs> for Overrides {
    fn from(args: RunArgs) -> Self {
        Overrides {
            once: args.once,
            interval_secs: args.interval,
            jitter_secs: args.jitter,
            source: args.source,
            storage_dir: args.storage,
            app_name: args.appname,
            artifact_name: args.artifact,
        }
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => {
            let config = config::resolve(&cli.config, args.into())?;
            run(config).await
        }

        Command::Validate(args) => {
            log::info!("Validating configuration...");
            config::resolve(&cli.config, args.into())?;
            log::info!("✓ Config OK");
            Ok(())
        }

        Command::Info(args) => {
            let config = config::load_config(&cli.config)?;
            let config = Overrides::from(args).apply(config);
            println!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

async fn run(config: Config) -> Result<()> {
    log::info!(
        "{} collector starting, source {}",
        config.collector.app_name,
        config.collector.source
    );

    let store = DurableStore::prepare(config.collector.storage_dir.as_deref(), Utc::now())?;
    log::info!("Storing artifacts in {}", store.root_dir().display());

    let fetcher = SourceFetcher::new(&config.fetch, &config.collector.app_name)?;
    let shutdown = CancellationToken::new();
    let watcher = pipeline::spawn_watcher(shutdown.clone());

    let mut scheduler = Scheduler::new(
        config.schedule.clone(),
        config.collector.source.clone(),
        ArtifactNamer::new(config.collector.artifact_name.clone()),
        fetcher,
        store,
    );
    let result = scheduler.run(&shutdown).await;

    // Stop the watcher if we finished on our own (run-once).
    shutdown.cancel();
    let _ = watcher.await;

    result.map(|summary| {
        log::info!(
            "Done: {} cycle(s), {} succeeded, {} failed",
            summary.cycles,
            summary.succeeded,
            summary.failed
        );
    })
}
