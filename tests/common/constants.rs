//! Shared constants for end-to-end tests

#![allow(dead_code)]

pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
pub const JOB_FINISH_TIMEOUT_MS: u64 = 5000;

/// Problems known to the fake metadata API.
pub const PROBLEM_GRAPH_ID: u32 = 1000;
pub const PROBLEM_GRAPH_TITLE: &str = "Shortest Route";
pub const PROBLEM_DP_ID: u32 = 1002;
pub const PROBLEM_DP_TITLE: &str = "Stair Climbing";

/// Present in no source: the metadata API answers 404 for it.
pub const MISSING_PROBLEM_ID: u32 = 1001;

/// Known to the metadata API but without tags, so only the statement page can classify it.
pub const UNTAGGED_PROBLEM_ID: u32 = 1003;
