//! HTTP client for the problem metadata API.
//!
//! Request pacing is the caller's job; this client only honours short
//! `Retry-After` hints on 429 responses, once per call.

use super::{FetchError, MetadataSource, ProblemMetadata};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Longest `Retry-After` we are willing to sit through inside a single fetch.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(10);

pub struct MetadataClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProblemResponse {
    problem_id: u32,
    title_ko: Option<String>,
    title: Option<String>,
    #[serde(default)]
    level: u32,
    #[serde(default)]
    accepted_user_count: u64,
    #[serde(default)]
    average_tries: f64,
    #[serde(default)]
    tags: Vec<TagResponse>,
}

#[derive(Deserialize)]
struct TagResponse {
    key: String,
}

impl MetadataClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create metadata HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn retry_after(response: &reqwest::Response) -> Option<Duration> {
        response
            .headers()
            .get(RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    }

    async fn request(&self, problem_id: u32) -> Result<reqwest::Response, FetchError> {
        let url = format!("{}/problem/show?problemId={}", self.base_url, problem_id);
        Ok(self.client.get(&url).send().await?)
    }
}

#[async_trait]
impl MetadataSource for MetadataClient {
    async fn fetch(&self, problem_id: u32) -> Result<ProblemMetadata, FetchError> {
        let mut response = self.request(problem_id).await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            match Self::retry_after(&response) {
                Some(wait) if wait <= MAX_RETRY_AFTER => {
                    debug!(
                        "Metadata API asked to retry problem {} after {:?}",
                        problem_id, wait
                    );
                    tokio::time::sleep(wait).await;
                    response = self.request(problem_id).await?;
                }
                _ => return Err(FetchError::RateLimited),
            }
        }

        match response.status() {
            StatusCode::NOT_FOUND => return Err(FetchError::NotFound),
            StatusCode::TOO_MANY_REQUESTS => return Err(FetchError::RateLimited),
            status if !status.is_success() => {
                return Err(FetchError::Transient(format!(
                    "metadata API returned status {}",
                    status
                )))
            }
            _ => {}
        }

        let body: ProblemResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        if body.problem_id != problem_id {
            return Err(FetchError::Malformed(format!(
                "asked for problem {}, got {}",
                problem_id, body.problem_id
            )));
        }

        let title = body
            .title_ko
            .or(body.title)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| FetchError::Malformed("missing title".to_string()))?;

        Ok(ProblemMetadata {
            problem_id,
            title,
            level: body.level,
            accepted_user_count: body.accepted_user_count,
            average_tries: body.average_tries,
            tags: body.tags.into_iter().map(|t| t.key).collect(),
        })
    }
}
