use super::metrics::CollectorMetrics;
use super::pacing::PacingController;
use crate::config::CollectorSettings;
use crate::problem_store::ProblemStore;
use crate::sources::{DetailSource, MetadataSource};
use crate::status_store::JobStatusStore;
use std::sync::Arc;

/// Collaborators shared by every collection job.
#[derive(Clone)]
pub struct CollectorContext {
    /// Where status snapshots and checkpoints are written.
    pub status_store: Arc<dyn JobStatusStore>,

    /// Where collected problems are upserted and work sets are resolved from.
    pub problem_store: Arc<dyn ProblemStore>,

    pub metadata_source: Arc<dyn MetadataSource>,
    pub detail_source: Arc<dyn DetailSource>,

    pub pacing: Arc<PacingController>,
    pub metrics: Arc<CollectorMetrics>,
    pub settings: CollectorSettings,
}

impl CollectorContext {
    pub fn new(
        status_store: Arc<dyn JobStatusStore>,
        problem_store: Arc<dyn ProblemStore>,
        metadata_source: Arc<dyn MetadataSource>,
        detail_source: Arc<dyn DetailSource>,
        metrics: Arc<CollectorMetrics>,
        settings: CollectorSettings,
    ) -> Self {
        let pacing = Arc::new(PacingController::from_settings(&settings));
        Self {
            status_store,
            problem_store,
            metadata_source,
            detail_source,
            pacing,
            metrics,
            settings,
        }
    }

    /// Replaces the pacing derived from the settings.
    pub fn with_pacing(mut self, pacing: PacingController) -> Self {
        self.pacing = Arc::new(pacing);
        self
    }
}
