use super::job::{ItemOutcome, JobKind};
use anyhow::Result;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all collector metrics
const PREFIX: &str = "problem_collector";

/// Prometheus metrics of the collector, owned by the process and handed to
/// whoever records events. Each instance has its own registry.
pub struct CollectorMetrics {
    registry: Registry,
    jobs_launched_total: CounterVec,
    jobs_finished_total: CounterVec,
    jobs_running: GaugeVec,
    job_duration_seconds: HistogramVec,
    items_processed_total: CounterVec,
    http_requests_total: CounterVec,
    http_request_duration_seconds: HistogramVec,
}

impl CollectorMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let jobs_launched_total = CounterVec::new(
            Opts::new(
                format!("{PREFIX}_jobs_launched_total"),
                "Total collection jobs accepted",
            ),
            &["kind"],
        )?;
        let jobs_finished_total = CounterVec::new(
            Opts::new(
                format!("{PREFIX}_jobs_finished_total"),
                "Total collection jobs that reached a terminal state",
            ),
            &["kind", "result"],
        )?;
        let jobs_running = GaugeVec::new(
            Opts::new(
                format!("{PREFIX}_jobs_running"),
                "Collection jobs currently running",
            ),
            &["kind"],
        )?;
        let job_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                format!("{PREFIX}_job_duration_seconds"),
                "Wall time of collection jobs in seconds",
            )
            .buckets(vec![1.0, 10.0, 60.0, 300.0, 900.0, 3600.0, 14400.0, 43200.0]),
            &["kind"],
        )?;
        let items_processed_total = CounterVec::new(
            Opts::new(
                format!("{PREFIX}_items_processed_total"),
                "Total work items processed by collection jobs",
            ),
            &["kind", "outcome"],
        )?;
        let http_requests_total = CounterVec::new(
            Opts::new(
                format!("{PREFIX}_http_requests_total"),
                "Total number of HTTP requests",
            ),
            &["method", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                format!("{PREFIX}_http_request_duration_seconds"),
                "HTTP request duration in seconds",
            )
            .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
            &["method"],
        )?;

        registry.register(Box::new(jobs_launched_total.clone()))?;
        registry.register(Box::new(jobs_finished_total.clone()))?;
        registry.register(Box::new(jobs_running.clone()))?;
        registry.register(Box::new(job_duration_seconds.clone()))?;
        registry.register(Box::new(items_processed_total.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            jobs_launched_total,
            jobs_finished_total,
            jobs_running,
            job_duration_seconds,
            items_processed_total,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    pub fn record_job_launched(&self, kind: JobKind) {
        self.jobs_launched_total
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    pub fn record_job_started(&self, kind: JobKind) {
        self.jobs_running.with_label_values(&[kind.as_str()]).inc();
    }

    /// `result` is one of "completed", "failed", "cancelled".
    pub fn record_job_finished(&self, kind: JobKind, result: &str, elapsed: Duration) {
        self.jobs_running.with_label_values(&[kind.as_str()]).dec();
        self.jobs_finished_total
            .with_label_values(&[kind.as_str(), result])
            .inc();
        self.job_duration_seconds
            .with_label_values(&[kind.as_str()])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_item(&self, kind: JobKind, outcome: &ItemOutcome) {
        self.items_processed_total
            .with_label_values(&[kind.as_str(), outcome.label()])
            .inc();
    }

    pub fn record_http_request(&self, method: &str, status: u16, duration: Duration) {
        self.http_requests_total
            .with_label_values(&[method, &status.to_string()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method])
            .observe(duration.as_secs_f64());
    }

    /// Renders every metric in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = vec![];
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
