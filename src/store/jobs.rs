use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::Store;
use crate::model::{ExecutionStatus, Job, JobType};
use serde_json::Value as Json;

/// Fields accepted by `UpsertJob`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpsertJobFields {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub job_type: Option<JobType>,
    pub server_name: Option<String>,
    pub executable_path: Option<String>,
    pub schedule: Option<String>,
    pub is_active: Option<bool>,
    pub is_critical: Option<bool>,
    pub allow_concurrent: Option<bool>,
    pub expected_duration_ms: Option<i64>,
    pub max_duration_ms: Option<i64>,
    pub configuration: Option<Json>,
}

impl Store {
    /// Creates the Job if unknown (autovivify), else applies `fields` and
    /// returns the result. Idempotent: applying the same `fields` twice
    /// produces the same row ("Idempotence").
    pub async fn upsert_job(
        &self,
        job_id: &str,
        fields: UpsertJobFields,
        actor: Option<&str>,
    ) -> Job {
        let now = self.now();
        let mut data = self.data.write().await;
        let job = data
        .jobs
        .entry(job_id.to_string())
        .or_insert_with(|| Job::stub(job_id, now));

        if job.created_by.is_none() {
            job.created_by = actor.map(|s| s.to_string());
        }

        if let Some(v) = fields.display_name {
            job.display_name = v;
        }
        if let Some(v) = fields.description {
            job.description = Some(v);
        }
        if let Some(v) = fields.category {
            job.category = Some(v);
        }
        if let Some(v) = fields.tags {
            job.tags = v;
        }
        if let Some(v) = fields.job_type {
            job.job_type = v;
        }
        if let Some(v) = fields.server_name {
            job.server_name = Some(v);
        }
        if let Some(v) = fields.executable_path {
            job.executable_path = Some(v);
        }
        if let Some(v) = fields.schedule {
            job.schedule = Some(v);
        }
        if let Some(v) = fields.is_active {
            job.is_active = v;
        }
        if let Some(v) = fields.is_critical {
            job.is_critical = v;
        }
        if let Some(v) = fields.allow_concurrent {
            job.allow_concurrent = v;
        }
        if let Some(v) = fields.expected_duration_ms {
            job.expected_duration_ms = Some(v);
        }
        if let Some(v) = fields.max_duration_ms {
            job.max_duration_ms = Some(v);
        }
        if let Some(v) = fields.configuration {
            job.configuration = Some(v);
        }
        job.updated_at = now;
        job.updated_by = actor.map(|s| s.to_string());

        let snapshot = job.clone();
        self.record_audit(&mut data, actor.unwrap_or("system"), "upsert_job", "Job", job_id, None)
        .await;
        snapshot
    }

    /// Autovivifies a stub Job if `job_id` is unknown, without touching an
    /// existing row.
    pub(crate) fn ensure_job_locked(data: &mut super::StoreData, job_id: &str, now: DateTime<Utc>) {
        data.jobs
        .entry(job_id.to_string())
        .or_insert_with(|| Job::stub(job_id, now));
    }

    pub async fn get_job(&self, job_id: &str) -> Option<Job> {
        self.data.read().await.jobs.get(job_id).cloned()
    }

    pub async fn list_jobs(&self, active_only: bool) -> Vec<Job> {
        self.data
        .read()
        .await
        .jobs
        .values()
        .filter(|j| !active_only || j.is_active)
        .cloned()
        .collect()
    }

    /// Applies the parent-job side of a `CompleteExecution` call
    pub(crate) fn apply_completion_to_job(
        job: &mut Job,
        status: ExecutionStatus,
        duration_ms: i64,
    ) {
        job.last_status = Some(status);
        job.last_duration_ms = Some(duration_ms);
        if status.counts_as_success() {
            job.success_count += 1;
        }
        if status.counts_as_failure() {
            job.failure_count += 1;
        }
        if status.counts_toward_average() {
            let prior_total = job.avg_duration_ms * job.completed_executions as i64;
            job.completed_executions += 1;
            job.avg_duration_ms = (prior_total + duration_ms) / job.completed_executions as i64;
        }
    }
}
