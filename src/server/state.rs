use axum::extract::FromRef;

use crate::collector::{CollectorHandle, CollectorMetrics};
use std::sync::Arc;
use std::time::Instant;

use super::RequestsLoggingLevel;

pub type GuardedCollectorMetrics = Arc<CollectorMetrics>;

#[derive(Clone)]
pub struct ServerState {
    pub requests_logging_level: RequestsLoggingLevel,
    pub start_time: Instant,
    pub collector: CollectorHandle,
    pub metrics: GuardedCollectorMetrics,
}

impl ServerState {
    pub fn new(
        requests_logging_level: RequestsLoggingLevel,
        collector: CollectorHandle,
        metrics: GuardedCollectorMetrics,
    ) -> Self {
        Self {
            requests_logging_level,
            start_time: Instant::now(),
            collector,
            metrics,
        }
    }
}

impl FromRef<ServerState> for CollectorHandle {
    fn from_ref(input: &ServerState) -> Self {
        input.collector.clone()
    }
}

impl FromRef<ServerState> for GuardedCollectorMetrics {
    fn from_ref(input: &ServerState) -> Self {
        input.metrics.clone()
    }
}
