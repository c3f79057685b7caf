mod file_config;

pub use file_config::{CollectorConfig, CrawlerConfig, FileConfig, StatusStoreConfig};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub metadata_api_url: Option<String>,
    pub problem_site_url: Option<String>,
    pub http_timeout_sec: u64,
    pub prune_interval_minutes: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub metadata_api_url: String,
    pub problem_site_url: String,
    pub http_timeout_sec: u64,
    pub prune_interval_minutes: u64,
    pub crawler_user_agent: String,
    pub status_store: StatusStoreEngine,

    // Feature configs (with defaults)
    pub collector: CollectorSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusStoreEngine {
    Sqlite,
    Memory,
}

impl StatusStoreEngine {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Some(StatusStoreEngine::Sqlite),
            "memory" => Some(StatusStoreEngine::Memory),
            _ => None,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let metadata_api_url = file
            .metadata_api_url
            .or_else(|| cli.metadata_api_url.clone())
            .ok_or_else(|| anyhow::anyhow!("metadata_api_url must be specified"))?;
        let problem_site_url = file
            .problem_site_url
            .or_else(|| cli.problem_site_url.clone())
            .ok_or_else(|| anyhow::anyhow!("problem_site_url must be specified"))?;

        let http_timeout_sec = file.http_timeout_sec.unwrap_or(cli.http_timeout_sec);
        if http_timeout_sec == 0 {
            bail!("http_timeout_sec must be greater than 0");
        }
        let prune_interval_minutes = file
            .prune_interval_minutes
            .unwrap_or(cli.prune_interval_minutes);

        let crawler_user_agent = file
            .crawler
            .and_then(|c| c.user_agent)
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let status_store = match file.status_store.and_then(|s| s.engine) {
            None => StatusStoreEngine::Sqlite,
            Some(engine) => match StatusStoreEngine::parse(&engine) {
                Some(engine) => engine,
                None => bail!("Unknown status store engine: {}", engine),
            },
        };

        let defaults = CollectorSettings::default();
        let c = file.collector.unwrap_or_default();
        let collector = CollectorSettings {
            max_concurrent_jobs: c
                .max_concurrent_jobs
                .unwrap_or(defaults.max_concurrent_jobs),
            max_import_range: c.max_import_range.unwrap_or(defaults.max_import_range),
            status_ttl: c
                .status_ttl_hours
                .map(|h| Duration::from_secs(h * 60 * 60))
                .unwrap_or(defaults.status_ttl),
            metadata_pacing: c
                .metadata_pacing_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.metadata_pacing),
            crawl_pacing_min: c
                .crawl_pacing_min_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.crawl_pacing_min),
            crawl_pacing_max: c
                .crawl_pacing_max_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.crawl_pacing_max),
            import_checkpoint_interval: c
                .import_checkpoint_interval
                .unwrap_or(defaults.import_checkpoint_interval),
            crawl_checkpoint_interval: c
                .crawl_checkpoint_interval
                .unwrap_or(defaults.crawl_checkpoint_interval),
        };
        collector.validate()?;

        Ok(Self {
            db_dir,
            port,
            logging_level,
            metadata_api_url,
            problem_site_url,
            http_timeout_sec,
            prune_interval_minutes,
            crawler_user_agent,
            status_store,
            collector,
        })
    }

    pub fn problem_db_path(&self) -> PathBuf {
        self.db_dir.join("problems.db")
    }

    pub fn status_db_path(&self) -> PathBuf {
        self.db_dir.join("job_status.db")
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_sec)
    }
}

/// Tunables for the collection jobs.
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    /// Jobs allowed to run at once; further launches stay PENDING until a slot frees up.
    pub max_concurrent_jobs: usize,
    /// Largest id range a single metadata import may cover.
    pub max_import_range: u32,
    pub status_ttl: Duration,
    pub metadata_pacing: Duration,
    pub crawl_pacing_min: Duration,
    pub crawl_pacing_max: Duration,
    pub import_checkpoint_interval: u64,
    pub crawl_checkpoint_interval: u64,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            max_import_range: 10_000,
            status_ttl: Duration::from_secs(24 * 60 * 60),
            metadata_pacing: Duration::from_millis(500),
            crawl_pacing_min: Duration::from_millis(2000),
            crawl_pacing_max: Duration::from_millis(4000),
            import_checkpoint_interval: 10,
            crawl_checkpoint_interval: 1,
        }
    }
}

impl CollectorSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_jobs == 0 {
            bail!("max_concurrent_jobs must be greater than 0");
        }
        if self.max_import_range == 0 {
            bail!("max_import_range must be greater than 0");
        }
        if self.crawl_pacing_min > self.crawl_pacing_max {
            bail!(
                "crawl pacing band is inverted: min {:?} > max {:?}",
                self.crawl_pacing_min,
                self.crawl_pacing_max
            );
        }
        if self.import_checkpoint_interval == 0 || self.crawl_checkpoint_interval == 0 {
            bail!("checkpoint intervals must be greater than 0");
        }
        Ok(())
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
