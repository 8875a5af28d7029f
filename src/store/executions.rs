use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::ids::generate_correlation_id;
use crate::model::{ExecutionStatus, Job, JobExecution, LogLevelCounters, Server};
use serde_json::Value as Json;

use super::Store;

#[derive(Debug, Clone, Deserialize)]
pub struct StartExecutionRequest {
    pub job_id: String,
    pub server_name: String,
    pub trigger_type: String,
    pub triggered_by: Option<String>,
    pub correlation_id: Option<String>,
    pub parameters: Option<Json>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartedExecution {
    pub execution_id: u64,
    pub correlation_id: String,
    pub job_id: String,
    pub server_name: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompleteExecutionRequest {
    pub execution_id: u64,
    pub status: ExecutionStatus,
    pub result_summary: Option<Json>,
    pub result_code: Option<i32>,
    pub error_message: Option<String>,
    pub error_category: Option<String>,
}

impl Store {
    pub async fn start_execution(&self, req: StartExecutionRequest) -> Result<StartedExecution> {
        let now = self.now();
        let mut data = self.data.write().await;

        Self::ensure_job_locked(&mut data, &req.job_id, now);
        if !data.servers.contains_key(&req.server_name) {
            data.servers
            .insert(req.server_name.clone(), Server::stub(&req.server_name, now));
        }

        let job = data.jobs.get(&req.job_id).expect("just ensured");
        if !job.allow_concurrent {
            let already_running = data
            .executions_by_job
            .get(&req.job_id)
            .into_iter()
            .flatten()
            .filter_map(|id| data.executions.get(id))
            .any(|e| !e.status.is_terminal());
            if already_running {
                return Err(StoreError::Conflict(format!(
                            "job '{}' does not allow concurrent executions and already has one running",
                            req.job_id
                )));
            }
        }

        let execution_id = self.execution_ids.next_id();
        let correlation_id = req
        .correlation_id
        .unwrap_or_else(generate_correlation_id);

        let execution = JobExecution {
            id: execution_id,
            job_id: req.job_id.clone(),
            started_at: now,
            completed_at: None,
            duration_ms: None,
            status: ExecutionStatus::Running,
            server_name: req.server_name.clone(),
            trigger_type: req.trigger_type,
            triggered_by: req.triggered_by,
            correlation_id: correlation_id.clone(),
            parameters: req.parameters,
            result_summary: None,
            result_code: None,
            error_message: None,
            error_category: None,
            log_counters: LogLevelCounters::default(),
        };

        data.executions.insert(execution_id, execution);
        data.executions_by_job
        .entry(req.job_id.clone())
        .or_default()
        .insert(execution_id);

        let job = data.jobs.get_mut(&req.job_id).expect("just ensured");
        job.last_execution_id = Some(execution_id);
        job.last_execution_at = Some(now);
        job.last_status = Some(ExecutionStatus::Running);
        job.total_executions += 1;

        Ok(StartedExecution {
            execution_id,
            correlation_id,
            job_id: req.job_id,
            server_name: req.server_name,
            started_at: now,
        })
    }

    /// Requires the execution to exist and be non-terminal.
    pub async fn complete_execution(&self, req: CompleteExecutionRequest) -> Result<JobExecution> {
        let now = self.now();
        let mut data = self.data.write().await;

        let execution = data
        .executions
        .get(&req.execution_id)
        .ok_or_else(|| StoreError::NotFound("JobExecution", req.execution_id.to_string()))?;
        if execution.status.is_terminal() {
            return Err(StoreError::IllegalTransition(format!(
                        "execution {} is already terminal ({:?})",
                        req.execution_id, execution.status
            )));
        }
        let job_id = execution.job_id.clone();
        let started_at = execution.started_at;

        let duration_ms = (now - started_at).num_milliseconds().max(0);

        let execution = data.executions.get_mut(&req.execution_id).expect("checked above");
        execution.status = req.status;
        execution.completed_at = Some(now);
        execution.duration_ms = Some(duration_ms);
        execution.result_summary = req.result_summary;
        execution.result_code = req.result_code;
        execution.error_message = req.error_message;
        execution.error_category = req.error_category;
        let snapshot = execution.clone();

        if let Some(job) = data.jobs.get_mut(&job_id) {
            Store::apply_completion_to_job(job, req.status, duration_ms);
        }

        Ok(snapshot)
    }

    /// Equivalent to `CompleteExecution(Cancelled, errorMessage=reason)`.
    pub async fn cancel_execution(&self, execution_id: u64, reason: Option<String>) -> Result<JobExecution> {
        self.complete_execution(CompleteExecutionRequest {
            execution_id,
            status: ExecutionStatus::Cancelled,
            result_summary: None,
            result_code: None,
            error_message: reason,
            error_category: None,
        })
        .await
    }

    pub async fn get_execution(&self, execution_id: u64) -> Option<JobExecution> {
        self.data.read().await.executions.get(&execution_id).cloned()
    }

    /// Executions for one job, most recently started first. Used by the
    /// alert engine's `JobFailure` (consecutive-failure count) and
    /// `PerformanceWarning` (latest execution) conditions.
    pub async fn list_executions_for_job(&self, job_id: &str) -> Vec<JobExecution> {
        let data = self.data.read().await;
        let mut executions: Vec<JobExecution> = data
        .executions_by_job
        .get(job_id)
        .into_iter()
        .flatten()
        .filter_map(|id| data.executions.get(id).cloned())
        .collect();
        executions.sort_by_key(|e| std::cmp::Reverse(e.started_at));
        executions
    }

    pub async fn running_executions(&self) -> Vec<JobExecution> {
        self.data
        .read()
        .await
        .executions
        .values()
        .filter(|e| !e.status.is_terminal())
        .cloned()
        .collect()
    }

    /// Increments per-level counters as logs with a `jobExecutionId` commit.
    pub(crate) fn record_log_on_execution(
        data: &mut super::StoreData,
        execution_id: u64,
        level: crate::model::LogLevel,
    ) {
        if let Some(execution) = data.executions.get_mut(&execution_id) {
            execution.log_counters.increment(level);
        }
    }

    /// Timeout sweep: executions whose runtime exceeds the parent job's
    /// `maxDurationMs`.
    pub async fn executions_exceeding_max_duration(&self) -> Vec<(u64, Job)> {
        let now = self.now();
        let data = self.data.read().await;
        data.executions
        .values()
        .filter(|e| !e.status.is_terminal())
        .filter_map(|e| {
                let job = data.jobs.get(&e.job_id)?;
                let max = job.max_duration_ms?;
                let runtime = (now - e.started_at).num_milliseconds();
                (runtime > max).then(|| (e.id, job.clone()))
        })
        .collect()
    }
}
