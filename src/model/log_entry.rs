use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// `level ∈ {0..5} = {Trace, Debug, Info, Warning, Error, Critical}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warning = 3,
    Error = 4,
    Critical = 5,
}

impl LogLevel {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Trace),
            1 => Some(Self::Debug),
            2 => Some(Self::Info),
            3 => Some(Self::Warning),
            4 => Some(Self::Error),
            5 => Some(Self::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExceptionInfo {
    #[serde(rename = "type")]
    pub exception_type: String,
    pub message: String,
    pub stack_trace: Option<String>,
    pub source: Option<String>,
}

/// A single structured log record. Immutable once inserted; only the
/// retention sweep deletes rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub job_id: Option<String>,
    pub job_execution_id: Option<u64>,
    pub server_name: String,
    pub category: Option<String>,
    pub source_context: Option<String>,
    pub correlation_id: Option<String>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub parent_span_id: Option<String>,
    pub exception: Option<ExceptionInfo>,
    pub properties: Option<Json>,
    pub tags: Vec<String>,
    pub environment: Option<String>,
    pub application_version: Option<String>,
    pub received_at: DateTime<Utc>,
    pub client_ip: Option<String>,
}

impl LogEntry {
    /// Derived: `hasException`
    pub fn has_exception(&self) -> bool {
        self.exception.is_some()
    }
}

/// Width limits enforced at ingestion (step 1).
pub const MAX_MESSAGE_LEN: usize = 4000;
pub const MAX_SHORT_FIELD_LEN: usize = 512;
