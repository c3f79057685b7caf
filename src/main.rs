use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use problem_collector::collector::{create_collector, CollectorContext, CollectorMetrics};
use problem_collector::config::{self, StatusStoreEngine};
use problem_collector::problem_store::{ProblemStore, SqliteProblemStore};
use problem_collector::server::{run_server, RequestsLoggingLevel, ServerState};
use problem_collector::sources::{DetailCrawler, MetadataClient};
use problem_collector::status_store::{
    InMemoryJobStatusStore, JobStatusStore, SqliteJobStatusStore,
};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory containing database files (problems.db, job_status.db).
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3002)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Base URL of the problem metadata JSON API.
    #[clap(long)]
    pub metadata_api_url: Option<String>,

    /// Base URL of the site serving problem statement pages.
    #[clap(long)]
    pub problem_site_url: Option<String>,

    /// Timeout in seconds for outbound HTTP requests.
    #[clap(long, default_value_t = 30)]
    pub http_timeout_sec: u64,

    /// Interval in minutes between purges of expired job status records.
    /// Set to 0 to disable purging.
    #[clap(long, default_value_t = 60)]
    pub prune_interval_minutes: u64,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            logging_level: args.logging_level.clone(),
            metadata_api_url: args.metadata_api_url.clone(),
            problem_site_url: args.problem_site_url.clone(),
            http_timeout_sec: args.http_timeout_sec,
            prune_interval_minutes: args.prune_interval_minutes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  port: {}", app_config.port);
    info!("  metadata_api_url: {}", app_config.metadata_api_url);
    info!("  problem_site_url: {}", app_config.problem_site_url);
    info!("  status_store: {:?}", app_config.status_store);
    info!(
        "  max_concurrent_jobs: {}",
        app_config.collector.max_concurrent_jobs
    );

    info!(
        "Opening SQLite problem database at {:?}...",
        app_config.problem_db_path()
    );
    let problem_store = Arc::new(SqliteProblemStore::new(app_config.problem_db_path())?);
    info!("{} problems stored", problem_store.count()?);

    let status_store: Arc<dyn JobStatusStore> = match app_config.status_store {
        StatusStoreEngine::Sqlite => {
            info!(
                "Opening SQLite job status database at {:?}...",
                app_config.status_db_path()
            );
            Arc::new(SqliteJobStatusStore::new(app_config.status_db_path())?)
        }
        StatusStoreEngine::Memory => {
            info!("Keeping job status in memory, jobs will not survive a restart");
            Arc::new(InMemoryJobStatusStore::new())
        }
    };

    let metadata_source = Arc::new(MetadataClient::new(
        &app_config.metadata_api_url,
        app_config.http_timeout(),
    )?);
    let detail_source = Arc::new(DetailCrawler::new(
        &app_config.problem_site_url,
        &app_config.crawler_user_agent,
        app_config.http_timeout(),
    )?);

    let metrics = Arc::new(CollectorMetrics::new()?);
    let ctx = CollectorContext::new(
        status_store.clone(),
        problem_store as Arc<dyn ProblemStore>,
        metadata_source,
        detail_source,
        metrics.clone(),
        app_config.collector.clone(),
    );

    let shutdown_token = CancellationToken::new();
    let (mut executor, collector_handle) = create_collector(ctx, shutdown_token.child_token());
    let executor_task = tokio::spawn(async move { executor.run().await });

    // Spawn background task for status record purging if enabled
    if app_config.prune_interval_minutes > 0 {
        let interval_minutes = app_config.prune_interval_minutes;
        let pruning_status_store = status_store.clone();
        let pruning_shutdown = shutdown_token.child_token();

        info!(
            "Status purging enabled: purging every {} minutes",
            interval_minutes
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_minutes * 60));

            // Skip the first immediate tick, wait for the first interval
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = pruning_shutdown.cancelled() => break,
                }

                match pruning_status_store.purge_expired() {
                    Ok(count) => {
                        if count > 0 {
                            info!("Purged {} expired job status records", count);
                        }
                    }
                    Err(e) => {
                        error!("Failed to purge job status records: {}", e);
                    }
                }
            }
        });
    }

    let state = ServerState::new(
        app_config.logging_level.clone(),
        collector_handle,
        metrics,
    );

    info!("Ready to serve at port {}!", app_config.port);

    let result = tokio::select! {
        result = run_server(state, app_config.port, shutdown_token.child_token()) => {
            info!("HTTP server stopped: {:?}", result);
            result
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating graceful shutdown");
            Ok(())
        }
    };

    // Running jobs are cancelled and marked FAILED before we exit
    shutdown_token.cancel();
    if let Err(e) = executor_task.await {
        error!("Job executor task failed: {}", e);
    }

    result
}
