//! Process-scoped configuration snapshot.
//!
//! Loaded once at startup from the environment via `dotenvy`; reloadable on
//! demand through `ConfigHandle::refresh` rather than a process-wide
//! singleton.

use std::env;
use std::sync::{Arc, RwLock};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetentionConfig {
    pub trace_debug_days: i64,
    pub default_days: i64,
    pub error_days: i64,
    pub critical_days: i64,
    pub cleanup_time_utc: (u32, u32),
    pub batch_size: usize,
    pub inter_batch_sleep: Duration,
    pub alert_instance_retention_days: i64,
    pub audit_log_retention_days: i64,
    pub revoked_token_retention_days: i64,
}

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub max_batch_size: usize,
    pub absolute_batch_cap: usize,
    pub max_queue_size: usize,
    pub processing_interval: Duration,
    pub enqueue_deadline: Duration,
    pub flush_worker_count: usize,
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub stats_cache_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub evaluation_interval: Duration,
    pub default_throttle_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub heartbeat_timeout: Duration,
    pub status_sweep_interval: Duration,
    pub default_heartbeat_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    pub timeout_check_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub retention: RetentionConfig,
    pub ingestion: IngestionConfig,
    pub dashboard: DashboardConfig,
    pub alert: AlertConfig,
    pub server: ServerConfig,
    pub execution: ExecutionConfig,
    pub maintenance_mode: bool,
    pub store_deadline: Duration,
    pub maintenance_deadline: Duration,
    pub handler_timeout: Duration,
    pub ingest_deadline: Duration,
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            retention: RetentionConfig {
                trace_debug_days: 7,
                default_days: env_i64("Retention.DefaultDays", 90),
                error_days: env_i64("Retention.ErrorDays", 180),
                critical_days: env_i64("Retention.CriticalDays", 365),
                cleanup_time_utc: (2, 0),
                batch_size: 10_000,
                inter_batch_sleep: Duration::from_millis(100),
                alert_instance_retention_days: 90,
                audit_log_retention_days: 180,
                revoked_token_retention_days: 30,
            },
            ingestion: IngestionConfig {
                max_batch_size: env_usize("Ingestion.MaxBatchSize", 1000),
                absolute_batch_cap: 10_000,
                max_queue_size: env_usize("Ingestion.MaxQueueSize", 50_000),
                processing_interval: Duration::from_millis(env_u64(
                        "Ingestion.ProcessingIntervalMs",
                        100,
                )),
                enqueue_deadline: Duration::from_millis(100),
                flush_worker_count: 1,
            },
            dashboard: DashboardConfig {
                stats_cache_ttl: Duration::from_secs(env_u64(
                        "Dashboard.StatsCacheTtlSeconds",
                        30,
                )),
            },
            alert: AlertConfig {
                evaluation_interval: Duration::from_secs(env_u64(
                        "Alert.EvaluationIntervalSeconds",
                        30,
                )),
                default_throttle_minutes: env_i64("Alert.DefaultThrottleMinutes", 15),
            },
            server: ServerConfig {
                heartbeat_timeout: Duration::from_secs(env_u64(
                        "Server.HeartbeatTimeoutSeconds",
                        180,
                )),
                status_sweep_interval: Duration::from_secs(30),
                default_heartbeat_interval: Duration::from_secs(60),
            },
            execution: ExecutionConfig {
                timeout_check_interval: Duration::from_secs(60),
            },
            maintenance_mode: env_bool("System.MaintenanceMode", false),
            store_deadline: Duration::from_secs(30),
            maintenance_deadline: Duration::from_secs(300),
            handler_timeout: Duration::from_secs(30),
            ingest_deadline: Duration::from_secs(5),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::default()
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Reloadable handle around the process-scoped snapshot. `refresh` reloads
/// the configuration from the environment without restarting the process.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<AppConfig>>>,
}

impl ConfigHandle {
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    pub fn current(&self) -> Arc<AppConfig> {
        self.inner.read().expect("config lock poisoned").clone()
    }

    pub fn refresh(&self) {
        let reloaded = AppConfig::from_env();
        *self.inner.write().expect("config lock poisoned") = Arc::new(reloaded);
    }
}
