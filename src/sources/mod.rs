//! External sources the collector jobs pull from.
//!
//! - The metadata API returns one problem's metadata per call, by numeric id.
//! - The problem site is crawled per problem for its statement and tag list.
//!
//! Both are consumed through the traits below; the reqwest clients are the
//! production implementations.

mod detail_crawler;
mod metadata_client;

#[cfg(test)]
mod test_upstream;

pub use detail_crawler::{parse_detail_page, DetailCrawler};
pub use metadata_client::MetadataClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Why a single fetch produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("item not found")]
    NotFound,
    #[error("rate limited by source")]
    RateLimited,
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("transient failure: {0}")]
    Transient(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transient(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemMetadata {
    pub problem_id: u32,
    pub title: String,
    pub level: u32,
    pub accepted_user_count: u64,
    pub average_tries: f64,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemDetail {
    pub problem_id: u32,
    pub description: String,
    pub input_description: String,
    pub output_description: String,
    pub tags: Vec<String>,
}

#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self, problem_id: u32) -> Result<ProblemMetadata, FetchError>;
}

#[async_trait]
pub trait DetailSource: Send + Sync {
    async fn fetch(&self, problem_id: u32) -> Result<ProblemDetail, FetchError>;
}
