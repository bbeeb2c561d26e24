use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    models::BookRecord,
    services::{AnalysisReport, BookAnalysisOrchestrator, RecommendationEngine},
};

/// Where a submitted analysis batch stands
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Finished {
        report: AnalysisReport,
        books: Vec<BookRecord>,
    },
    Failed {
        error: String,
    },
}

/// An analysis batch tracked by the server
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisJob {
    pub job_id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub status: JobStatus,
}

impl AnalysisJob {
    pub fn pending(job_id: Uuid) -> Self {
        Self {
            job_id,
            submitted_at: Utc::now(),
            finished_at: None,
            status: JobStatus::Pending,
        }
    }

    pub fn finish(&mut self, status: JobStatus) {
        self.finished_at = Some(Utc::now());
        self.status = status;
    }

    /// Finished jobs expire `ttl` after finishing. Pending jobs never do.
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        self.finished_at
            .is_some_and(|finished_at| now.signed_duration_since(finished_at) >= ttl)
    }
}

/// How long a finished job stays visible when nothing else is configured
pub const DEFAULT_JOB_TTL: Duration = Duration::from_secs(500);

/// In-memory analysis jobs. Expired jobs are hidden on lookup and dropped on
/// the next submission.
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, AnalysisJob>>,
    ttl: Duration,
}

impl JobStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn insert(&self, job: AnalysisJob) {
        let now = Utc::now();
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, existing| !existing.is_expired(self.ttl, now));
        if jobs.len() < before {
            tracing::debug!(removed = before - jobs.len(), "Dropped expired analysis jobs");
        }
        jobs.insert(job.job_id, job);
    }

    pub async fn finish(&self, job_id: Uuid, status: JobStatus) {
        if let Some(job) = self.jobs.write().await.get_mut(&job_id) {
            job.finish(status);
        }
    }

    pub async fn get(&self, job_id: Uuid) -> Option<AnalysisJob> {
        let now = Utc::now();
        self.jobs
            .read()
            .await
            .get(&job_id)
            .filter(|job| !job.is_expired(self.ttl, now))
            .cloned()
    }

    /// Jobs held in memory, expired or not
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<BookAnalysisOrchestrator>,
    pub engine: Arc<RecommendationEngine>,
    pub jobs: Arc<JobStore>,
    /// Used when a recommendation request does not say how many it wants
    pub default_top_n: usize,
}

impl AppState {
    pub fn new(
        orchestrator: BookAnalysisOrchestrator,
        engine: RecommendationEngine,
        default_top_n: usize,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            engine: Arc::new(engine),
            jobs: Arc::new(JobStore::new(DEFAULT_JOB_TTL)),
            default_top_n,
        }
    }

    /// Replaces the job store with an empty one keeping finished jobs for `ttl`
    pub fn with_job_ttl(mut self, ttl: Duration) -> Self {
        self.jobs = Arc::new(JobStore::new(ttl));
        self
    }
}
