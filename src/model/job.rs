use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::execution::ExecutionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobType {
    Unknown,
    Executable,
    PowerShell,
    VbScript,
    DotNetAssembly,
    SqlJob,
    WindowsService,
    Other,
}

impl Default for JobType {
    fn default() -> Self {
        Self::Unknown
    }
}

/// "Job". Identity: agent-chosen `jobId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub display_name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub job_type: JobType,
    pub server_name: Option<String>,
    pub executable_path: Option<String>,
    pub schedule: Option<String>,
    pub is_active: bool,
    pub is_critical: bool,
    /// Overlap policy; default allow (Open Question 1).
    pub allow_concurrent: bool,

    pub last_execution_id: Option<u64>,
    pub last_execution_at: Option<DateTime<Utc>>,
    pub last_status: Option<ExecutionStatus>,
    pub last_duration_ms: Option<i64>,

    pub total_executions: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// Denominator for `avg_duration_ms`, excludes cancellations.
    pub completed_executions: u64,
    pub avg_duration_ms: i64,

    pub expected_duration_ms: Option<i64>,
    pub max_duration_ms: Option<i64>,
    pub configuration: Option<Json>,

    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl Job {
    pub fn stub(job_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        let job_id = job_id.into();
        Self {
            display_name: job_id.clone(),
            job_id,
            description: None,
            category: None,
            tags: Vec::new(),
            job_type: JobType::Unknown,
            server_name: None,
            executable_path: None,
            schedule: None,
            is_active: true,
            is_critical: false,
            allow_concurrent: true,
            last_execution_id: None,
            last_execution_at: None,
            last_status: None,
            last_duration_ms: None,
            total_executions: 0,
            success_count: 0,
            failure_count: 0,
            completed_executions: 0,
            avg_duration_ms: 0,
            expected_duration_ms: None,
            max_duration_ms: None,
            configuration: None,
            created_at: now,
            created_by: None,
            updated_at: now,
            updated_by: None,
        }
    }

    /// Invariant : `successCount + failureCount ≤ totalExecutions`.
    pub fn invariant_holds(&self) -> bool {
        self.success_count + self.failure_count <= self.total_executions
    }
}
