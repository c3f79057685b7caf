//! Fake upstream sources served to the test server

use super::constants::*;
use async_trait::async_trait;
use problem_collector::sources::{
    DetailSource, FetchError, MetadataSource, ProblemDetail, ProblemMetadata,
};
use std::collections::HashMap;

pub struct FakeMetadataApi {
    problems: HashMap<u32, ProblemMetadata>,
}

pub struct FakeProblemSite {
    pages: HashMap<u32, ProblemDetail>,
}

fn metadata(problem_id: u32, title: &str, tags: &[&str]) -> ProblemMetadata {
    ProblemMetadata {
        problem_id,
        title: title.to_string(),
        level: 7,
        accepted_user_count: 1200,
        average_tries: 2.4,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

fn detail(problem_id: u32, tags: &[&str]) -> ProblemDetail {
    ProblemDetail {
        problem_id,
        description: format!("Statement of problem {}", problem_id),
        input_description: "The first line contains N.".to_string(),
        output_description: "Print the answer.".to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

impl FakeMetadataApi {
    pub fn new() -> Self {
        let problems = [
            metadata(PROBLEM_GRAPH_ID, PROBLEM_GRAPH_TITLE, &["dijkstra", "graphs"]),
            metadata(PROBLEM_DP_ID, PROBLEM_DP_TITLE, &["dp"]),
            metadata(UNTAGGED_PROBLEM_ID, "Untagged", &[]),
        ];
        Self {
            problems: problems.into_iter().map(|p| (p.problem_id, p)).collect(),
        }
    }
}

impl FakeProblemSite {
    pub fn new() -> Self {
        let pages = [
            detail(PROBLEM_GRAPH_ID, &["dijkstra"]),
            detail(PROBLEM_DP_ID, &["dp"]),
            detail(UNTAGGED_PROBLEM_ID, &["greedy"]),
        ];
        Self {
            pages: pages.into_iter().map(|d| (d.problem_id, d)).collect(),
        }
    }
}

#[async_trait]
impl MetadataSource for FakeMetadataApi {
    async fn fetch(&self, problem_id: u32) -> Result<ProblemMetadata, FetchError> {
        self.problems
            .get(&problem_id)
            .cloned()
            .ok_or(FetchError::NotFound)
    }
}

#[async_trait]
impl DetailSource for FakeProblemSite {
    async fn fetch(&self, problem_id: u32) -> Result<ProblemDetail, FetchError> {
        self.pages
            .get(&problem_id)
            .cloned()
            .ok_or(FetchError::NotFound)
    }
}
