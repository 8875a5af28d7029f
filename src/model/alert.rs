use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::log_entry::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// The six alert condition shapes, modeled as a typed sum dispatched by an
/// exhaustive match rather than an untyped JSON blob plus a string tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "alertType", content = "condition")]
pub enum AlertCondition {
    ErrorThreshold {
        threshold: u64,
        window_minutes: i64,
        level: LogLevel,
    },
    JobFailure {
        consecutive: Option<u32>,
        window_minutes: Option<i64>,
    },
    ServerOffline {},
    PerformanceWarning {
        duration_ms: Option<i64>,
        percent_of_avg: Option<f64>,
    },
    CustomQuery {
        query: String,
    },
    PatternMatch {
        regex: String,
        window_minutes: i64,
        level: Option<LogLevel>,
    },
}

impl AlertCondition {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ErrorThreshold {.. } => "ErrorThreshold",
            Self::JobFailure {.. } => "JobFailure",
            Self::ServerOffline {} => "ServerOffline",
            Self::PerformanceWarning {.. } => "PerformanceWarning",
            Self::CustomQuery {.. } => "CustomQuery",
            Self::PatternMatch {.. } => "PatternMatch",
        }
    }
}

/// "Alert" (the rule definition; firings are `AlertInstance`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub condition: AlertCondition,
    pub severity: AlertSeverity,
    pub is_active: bool,
    pub throttle_minutes: i64,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub trigger_count: u64,
    pub notification_channels: Option<Json>,
    pub job_id: Option<String>,
    pub server_name: Option<String>,
}

impl Alert {
    /// : eligible when `lastTriggeredAt` is null or older than
    /// `throttleMinutes`.
    pub fn is_throttle_elapsed(&self, now: DateTime<Utc>) -> bool {
        match self.last_triggered_at {
            None => true,
            Some(last) => now - last >= chrono::Duration::minutes(self.throttle_minutes.max(0)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertInstanceStatus {
    New = 0,
    Acknowledged = 1,
    Resolved = 2,
    Suppressed = 3,
}

/// "AlertInstance".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertInstance {
    pub id: u64,
    pub alert_id: u64,
    pub triggered_at: DateTime<Utc>,
    pub message: String,
    pub context: Option<Json>,
    pub job_id: Option<String>,
    pub job_execution_id: Option<u64>,
    pub server_name: Option<String>,
    pub severity: AlertSeverity,
    pub status: AlertInstanceStatus,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub acknowledged_note: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub resolved_note: Option<String>,
    pub notifications_sent: Option<Json>,
}

impl AlertInstance {
    /// lifecycle: `New→Acknowledged→Resolved` and `New→Resolved`.
    pub fn can_acknowledge(&self) -> bool {
        matches!(self.status, AlertInstanceStatus::New)
    }

    pub fn can_resolve(&self) -> bool {
        matches!(
            self.status,
            AlertInstanceStatus::New | AlertInstanceStatus::Acknowledged
        )
    }
}
