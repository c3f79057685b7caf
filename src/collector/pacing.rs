//! Delays between consecutive external calls of a job.
//!
//! The metadata API gets a fixed interval matching its documented rate limit.
//! Crawled pages get a random delay drawn uniformly from a band, so the
//! request stream has no fixed-interval signature. Retries and backoff are
//! not handled here.

use super::job::JobKind;
use crate::config::CollectorSettings;
use rand_distr::{Distribution, Uniform};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingPolicy {
    Fixed(Duration),
    Jitter { min: Duration, max: Duration },
}

impl PacingPolicy {
    pub fn jitter(a: Duration, b: Duration) -> Self {
        PacingPolicy::Jitter {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn sample(&self) -> Duration {
        match *self {
            PacingPolicy::Fixed(delay) => delay,
            PacingPolicy::Jitter { min, max } => {
                let lo = min.as_millis() as u64;
                let hi = max.as_millis() as u64;
                match Uniform::new_inclusive(lo, hi) {
                    Ok(band) => Duration::from_millis(band.sample(&mut rand::rng())),
                    Err(_) => min,
                }
            }
        }
    }
}

pub struct PacingController {
    metadata: PacingPolicy,
    crawl: PacingPolicy,
}

impl PacingController {
    pub fn new(metadata: PacingPolicy, crawl: PacingPolicy) -> Self {
        Self { metadata, crawl }
    }

    pub fn from_settings(settings: &CollectorSettings) -> Self {
        Self::new(
            PacingPolicy::Fixed(settings.metadata_pacing),
            PacingPolicy::jitter(settings.crawl_pacing_min, settings.crawl_pacing_max),
        )
    }

    /// No delay at all. Only meant for tests and local fakes.
    pub fn disabled() -> Self {
        Self::new(
            PacingPolicy::Fixed(Duration::ZERO),
            PacingPolicy::Fixed(Duration::ZERO),
        )
    }

    pub fn policy(&self, kind: JobKind) -> PacingPolicy {
        match kind {
            JobKind::MetadataImport => self.metadata,
            JobKind::DetailBackfill | JobKind::Reclassification => self.crawl,
        }
    }

    /// Sleeps for one delay of `kind`'s policy. Returns `false` if `cancel`
    /// fired before the delay elapsed.
    pub async fn wait(&self, kind: JobKind, cancel: &CancellationToken) -> bool {
        let delay = self.policy(kind).sample();
        if delay.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = cancel.cancelled() => false,
        }
    }
}
