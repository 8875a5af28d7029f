use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::log_entry::LogLevel;

/// Lifecycle state of a `JobExecution`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ExecutionStatus {
    Pending = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
    Cancelled = 4,
    Timeout = 5,
    Warning = 6,
}

impl ExecutionStatus {
    /// `status∈{0,1} ⇔ completedAt = null` (invariant).
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    pub fn counts_as_success(self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn counts_as_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Timeout)
    }

    /// : denominator for the running average excludes Cancelled.
    pub fn counts_toward_average(self) -> bool {
        self.is_terminal() && !matches!(self, Self::Cancelled)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogLevelCounters {
    pub trace: u64,
    pub debug: u64,
    pub info: u64,
    pub warning: u64,
    pub error: u64,
    pub critical: u64,
}

impl LogLevelCounters {
    pub fn increment(&mut self, level: LogLevel) {
        match level {
            LogLevel::Trace => self.trace += 1,
            LogLevel::Debug => self.debug += 1,
            LogLevel::Info => self.info += 1,
            LogLevel::Warning => self.warning += 1,
            LogLevel::Error => self.error += 1,
            LogLevel::Critical => self.critical += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.trace + self.debug + self.info + self.warning + self.error + self.critical
    }
}

/// "JobExecution".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobExecution {
    pub id: u64,
    pub job_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub status: ExecutionStatus,
    pub server_name: String,
    pub trigger_type: String,
    pub triggered_by: Option<String>,
    pub correlation_id: String,
    pub parameters: Option<Json>,
    pub result_summary: Option<Json>,
    pub result_code: Option<i32>,
    pub error_message: Option<String>,
    pub error_category: Option<String>,
    pub log_counters: LogLevelCounters,
}

impl JobExecution {
    pub fn log_count(&self) -> u64 {
        self.log_counters.total()
    }
}
