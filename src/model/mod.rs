//! Entity types, one module per aggregate. Typed structs rather than
//! generic rows/columns, since the store has a fixed schema.

mod alert;
mod execution;
mod job;
mod log_entry;
mod server;
mod support;

pub use alert::{Alert, AlertCondition, AlertInstance, AlertInstanceStatus, AlertSeverity, AlertType};
pub use execution::{ExecutionStatus, JobExecution};
pub use job::{Job, JobType};
pub use log_entry::{ExceptionInfo, LogEntry, LogLevel};
pub use server::{Server, ServerStatus};
pub use support::{AuditLogEntry, DashboardCacheEntry, RefreshToken};
