//! Job status storage behind a pluggable trait
//!
//! Jobs are created at submission, updated exclusively by the orchestrator's
//! progress and completion callbacks, and read by status queries. The trait
//! keeps the storage backend swappable (in-memory map, database, distributed
//! store) without touching the download pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

use crate::types::ProgressEvent;

/// Lifecycle status of a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Submitted but not yet picked up
    Queued,
    /// The download pipeline is running
    Processing,
    /// Finished normally; generated files are recorded
    Completed,
    /// Stopped by cancellation; files generated so far are recorded
    Cancelled,
    /// Aborted with an error (expired authentication or transport failure)
    Failed,
}

/// Snapshot of one job's state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobRecord {
    /// Caller-assigned job identifier
    pub id: String,
    /// Module code the job downloads
    pub module_code: String,
    /// Current lifecycle status
    pub status: JobStatus,
    /// Most recent progress event, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressEvent>,
    /// PDFs generated by the job
    pub files: Vec<PathBuf>,
    /// Error message for failed jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// When the job was last updated
    pub updated_at: DateTime<Utc>,
}

/// Pluggable job status store
///
/// Implementations must tolerate updates for unknown job ids (they are
/// ignored), so a store restart does not crash a running job.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a job record in the `Queued` state
    async fn create(&self, id: &str, module_code: &str);

    /// Fetch one job record
    async fn get(&self, id: &str) -> Option<JobRecord>;

    /// List all job records
    async fn list(&self) -> Vec<JobRecord>;

    /// Set a job's status, optionally recording an error message
    async fn set_status(&self, id: &str, status: JobStatus, error: Option<String>);

    /// Record the latest progress event.
    ///
    /// Promotes a `Queued` job to `Processing`; completed or failed jobs keep
    /// their terminal status.
    async fn update_progress(&self, id: &str, event: ProgressEvent);

    /// Record the files generated by a job
    async fn set_files(&self, id: &str, files: Vec<PathBuf>);
}

/// In-memory job store backed by an `RwLock`-guarded map
///
/// Suitable for a single-process deployment; records live as long as the
/// store does.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, JobRecord>>,
}

impl InMemoryJobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, id: &str, module_code: &str) {
        let now = Utc::now();
        let record = JobRecord {
            id: id.to_string(),
            module_code: module_code.to_string(),
            status: JobStatus::Queued,
            progress: None,
            files: Vec::new(),
            error: None,
            created_at: now,
            updated_at: now,
        };
        self.jobs.write().await.insert(id.to_string(), record);
    }

    async fn get(&self, id: &str) -> Option<JobRecord> {
        self.jobs.read().await.get(id).cloned()
    }

    async fn list(&self) -> Vec<JobRecord> {
        self.jobs.read().await.values().cloned().collect()
    }

    async fn set_status(&self, id: &str, status: JobStatus, error: Option<String>) {
        if let Some(record) = self.jobs.write().await.get_mut(id) {
            record.status = status;
            if error.is_some() {
                record.error = error;
            }
            record.updated_at = Utc::now();
        }
    }

    async fn update_progress(&self, id: &str, event: ProgressEvent) {
        if let Some(record) = self.jobs.write().await.get_mut(id) {
            record.progress = Some(event);
            if record.status == JobStatus::Queued {
                record.status = JobStatus::Processing;
            }
            record.updated_at = Utc::now();
        }
    }

    async fn set_files(&self, id: &str, files: Vec<PathBuf>) {
        if let Some(record) = self.jobs.write().await.get_mut(id) {
            record.files = files;
            record.updated_at = Utc::now();
        }
    }
}
