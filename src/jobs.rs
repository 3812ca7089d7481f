// src/jobs.rs
//! Background page generation with pollable job handles.

use crate::models::GeneratePageResponse;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

const JOB_TTL: Duration = Duration::from_secs(60 * 60);
/// Past this many live jobs the cache evicts entries, finished or not. A job
/// evicted while running is written back on its next status change.
const MAX_JOBS: u64 = 10_000;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed { result: GeneratePageResponse },
    Failed { error: String },
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Job {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct JobRegistry {
    jobs: Cache<Uuid, Job>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: Cache::builder()
                .max_capacity(MAX_JOBS)
                .time_to_live(JOB_TTL)
                .build(),
        }
    }

    pub async fn submit(&self, user_id: Uuid) -> Job {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            user_id,
            status: JobStatus::Queued,
            created_at: now,
            updated_at: now,
        };
        self.jobs.insert(job.id, job.clone()).await;
        job
    }

    /// Applies `status` to the caller's copy and writes it back, so a job
    /// evicted from the cache mid-run is restored with its latest status.
    pub async fn update(&self, job: &mut Job, status: JobStatus) {
        if !self.jobs.contains_key(&job.id) {
            tracing::warn!("Job {} was evicted before status update, restoring", job.id);
        }
        job.status = status;
        job.updated_at = Utc::now();
        self.jobs.insert(job.id, job.clone()).await;
    }

    /// Jobs are only visible to the user that submitted them.
    pub async fn get_for_user(&self, job_id: Uuid, user_id: Uuid) -> Option<Job> {
        self.jobs
            .get(&job_id)
            .await
            .filter(|job| job.user_id == user_id)
    }
}
