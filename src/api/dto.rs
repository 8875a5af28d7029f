//! Wire DTOs not already carried directly by Store request/response types.
//!
//! Query-string structs (axum's `Query` extractor needs flat, all-optional
//! fields) and small request bodies for endpoints that don't map onto an
//! existing `store::*Fields` type one-for-one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::LogLevel;
use crate::store::{LogSearchFilter, SortColumn, SortDirection};

/// `GET /api/logs/search` query parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSearchQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub job_id: Option<String>,
    pub job_execution_id: Option<u64>,
    pub server_name: Option<String>,
    pub min_level: Option<u8>,
    pub max_level: Option<u8>,
    pub search_text: Option<String>,
    pub exception_type: Option<String>,
    pub correlation_id: Option<String>,
    pub has_exception: Option<bool>,
    pub tag: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl Default for LogSearchQuery {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            job_id: None,
            job_execution_id: None,
            server_name: None,
            min_level: None,
            max_level: None,
            search_text: None,
            exception_type: None,
            correlation_id: None,
            has_exception: None,
            tag: None,
            page: None,
            page_size: None,
            sort: None,
            order: None,
        }
    }
}

impl From<LogSearchQuery> for LogSearchFilter {
    fn from(q: LogSearchQuery) -> Self {
        let defaults = LogSearchFilter::default();
        Self {
            start: q.start,
            end: q.end,
            job_id: q.job_id,
            job_execution_id: q.job_execution_id,
            server_name: q.server_name,
            min_level: q.min_level.and_then(LogLevel::from_u8),
            max_level: q.max_level.and_then(LogLevel::from_u8),
            search_text: q.search_text,
            exception_type: q.exception_type,
            correlation_id: q.correlation_id,
            has_exception: q.has_exception,
            tag: q.tag,
            page: q.page.unwrap_or(defaults.page),
            page_size: q.page_size.unwrap_or(defaults.page_size),
            sort_column: match q.sort.as_deref() {
                Some("level") => SortColumn::Level,
                _ => SortColumn::Timestamp,
            },
            sort_direction: match q.order.as_deref() {
                Some("asc") => SortDirection::Asc,
                _ => SortDirection::Desc,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogSearchResponse {
    pub items: Vec<crate::model::LogEntry>,
    pub total_count: usize,
    pub page: u32,
    pub page_size: u32,
}

/// `GET /api/servers` and `/api/jobs` both take `activeOnly`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActiveOnlyQuery {
    pub active_only: bool,
}

impl Default for ActiveOnlyQuery {
    fn default() -> Self {
        Self { active_only: false }
    }
}

/// `GET /api/alert-instances?alertId=`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertInstanceQuery {
    pub alert_id: Option<u64>,
}

impl Default for AlertInstanceQuery {
    fn default() -> Self {
        Self { alert_id: None }
    }
}

/// Body shared by acknowledge/resolve, single or bulk ("bulk
/// variants are allowed").
#[derive(Debug, Clone, Deserialize)]
pub struct AlertInstanceActionRequest {
    #[serde(default)]
    pub instance_ids: Vec<u64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertInstanceActionResult {
    pub succeeded: Vec<crate::model::AlertInstance>,
    pub failed: Vec<AlertInstanceActionFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertInstanceActionFailure {
    pub instance_id: u64,
    pub error: String,
}

/// `POST /api/maintenance/retention` body ("RunRetention").
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunRetentionRequest {
    pub dry_run: bool,
    pub batch_size: Option<usize>,
}

impl Default for RunRetentionRequest {
    fn default() -> Self {
        Self {
            dry_run: false,
            batch_size: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub time: DateTime<Utc>,
}
