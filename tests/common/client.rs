//! HTTP client for end-to-end tests
//!
//! This module wraps reqwest and provides methods for all collector
//! endpoints. When API routes change, update only this file.

use super::constants::*;
use reqwest::{Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/collector{}", self.base_url, path)
    }

    async fn post(&self, path: &str) -> Response {
        self.client
            .post(self.url(path))
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn collect_metadata(&self, start: u32, end: u32) -> Response {
        self.post(&format!("/collect/metadata?start={}&end={}", start, end))
            .await
    }

    pub async fn collect_details(&self, limit: Option<usize>) -> Response {
        match limit {
            Some(limit) => self.post(&format!("/collect/details?limit={}", limit)).await,
            None => self.post("/collect/details").await,
        }
    }

    pub async fn collect_reclassify(&self) -> Response {
        self.post("/collect/reclassify").await
    }

    pub async fn get_status(&self, job_id: &str) -> Response {
        self.client
            .get(self.url(&format!("/status/{}", job_id)))
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn cancel_job(&self, job_id: &str) -> Response {
        self.post(&format!("/jobs/{}/cancel", job_id)).await
    }

    pub async fn resume_job(&self, job_id: &str) -> Response {
        self.post(&format!("/jobs/{}/resume", job_id)).await
    }

    pub async fn get_metrics(&self) -> Response {
        self.client
            .get(format!("{}/metrics", self.base_url))
            .send()
            .await
            .expect("Request failed")
    }

    /// Reads the job id out of a 202 launch response.
    pub async fn accepted_job_id(response: Response) -> String {
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body: Value = response.json().await.expect("Invalid JSON");
        body["job_id"]
            .as_str()
            .expect("Missing job_id")
            .to_string()
    }

    /// Polls the status endpoint until the job is COMPLETED or FAILED.
    pub async fn wait_for_terminal(&self, job_id: &str) -> Value {
        let start = std::time::Instant::now();
        loop {
            let response = self.get_status(job_id).await;
            if response.status() == StatusCode::OK {
                let status: Value = response.json().await.expect("Invalid JSON");
                if status["state"] == "completed" || status["state"] == "failed" {
                    return status;
                }
            }
            if start.elapsed() > Duration::from_millis(JOB_FINISH_TIMEOUT_MS) {
                panic!("Job {} did not finish within {}ms", job_id, JOB_FINISH_TIMEOUT_MS);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}
