use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,
    pub metadata_api_url: Option<String>,
    pub problem_site_url: Option<String>,
    pub http_timeout_sec: Option<u64>,
    pub prune_interval_minutes: Option<u64>,

    // Feature configs
    pub collector: Option<CollectorConfig>,
    pub crawler: Option<CrawlerConfig>,
    pub status_store: Option<StatusStoreConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CollectorConfig {
    pub max_concurrent_jobs: Option<usize>,
    pub max_import_range: Option<u32>,
    pub status_ttl_hours: Option<u64>,
    // Pacing
    pub metadata_pacing_ms: Option<u64>,
    pub crawl_pacing_min_ms: Option<u64>,
    pub crawl_pacing_max_ms: Option<u64>,
    // Status snapshot is persisted every N processed items
    pub import_checkpoint_interval: Option<u64>,
    pub crawl_checkpoint_interval: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CrawlerConfig {
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct StatusStoreConfig {
    /// Status store engine to use: "sqlite", "memory"
    pub engine: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
