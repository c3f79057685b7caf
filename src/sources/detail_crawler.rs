//! Crawler for problem statement pages.
//!
//! Each page carries the statement split in three sections
//! (`problem_description`, `problem_input`, `problem_output`) and the
//! algorithm tags as `spoiler-link` anchors.

use super::{DetailSource, FetchError, ProblemDetail};
use anyhow::{Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

lazy_static! {
    static ref DESCRIPTION_SELECTOR: Selector = Selector::parse("#problem_description").unwrap();
    static ref INPUT_SELECTOR: Selector = Selector::parse("#problem_input").unwrap();
    static ref OUTPUT_SELECTOR: Selector = Selector::parse("#problem_output").unwrap();
    static ref TAG_SELECTOR: Selector = Selector::parse("a.spoiler-link").unwrap();
}

/// Every text node under `element`, whitespace collapsed to single spaces.
fn to_plain_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_section(
    document: &Html,
    selector: &Selector,
    name: &str,
) -> Result<String, FetchError> {
    document
        .select(selector)
        .next()
        .map(to_plain_text)
        .ok_or_else(|| FetchError::Malformed(format!("missing {} section", name)))
}

/// Extracts the statement sections and tag list from a problem page.
pub fn parse_detail_page(problem_id: u32, html: &str) -> Result<ProblemDetail, FetchError> {
    let document = Html::parse_document(html);

    let tags = document
        .select(&TAG_SELECTOR)
        .map(to_plain_text)
        .filter(|t| !t.is_empty())
        .collect();

    Ok(ProblemDetail {
        problem_id,
        description: extract_section(&document, &DESCRIPTION_SELECTOR, "description")?,
        input_description: extract_section(&document, &INPUT_SELECTOR, "input")?,
        output_description: extract_section(&document, &OUTPUT_SELECTOR, "output")?,
        tags,
    })
}

pub struct DetailCrawler {
    client: Client,
    base_url: String,
}

impl DetailCrawler {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to create crawler HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DetailSource for DetailCrawler {
    async fn fetch(&self, problem_id: u32) -> Result<ProblemDetail, FetchError> {
        let url = format!("{}/problem/{}", self.base_url, problem_id);
        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(FetchError::NotFound),
            StatusCode::TOO_MANY_REQUESTS | StatusCode::FORBIDDEN => {
                return Err(FetchError::RateLimited)
            }
            status if !status.is_success() => {
                return Err(FetchError::Transient(format!(
                    "problem page returned status {}",
                    status
                )))
            }
            _ => {}
        }

        let html = response.text().await?;
        parse_detail_page(problem_id, &html)
    }
}
