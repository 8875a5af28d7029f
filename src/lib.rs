//! Log Nexus: ingestion, job-execution tracking, and real-time monitoring
//! for fleets of batch-job agents.

pub mod alerting;
pub mod api;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod execution;
pub mod heartbeat;
pub mod ids;
pub mod ingestion;
pub mod model;
pub mod notify;
pub mod realtime;
pub mod retention;
pub mod store;
pub mod task;

pub use alerting::AlertEngine;
pub use clock::{Clock, SystemClock, VirtualClock};
pub use config::{AppConfig, ConfigHandle};
pub use dashboard::DashboardAggregator;
pub use error::{Result, StoreError};
pub use execution::ExecutionTimeoutSweeper;
pub use heartbeat::HeartbeatSweeper;
pub use ingestion::IngestionPipeline;
pub use realtime::FanOut;
pub use retention::RetentionRunner;
pub use store::Store;
