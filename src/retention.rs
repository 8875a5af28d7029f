//! Daily maintenance orchestrator : log retention, stale
//! alert-instance/audit-log/refresh-token cleanup, dashboard cache refresh,
//! and a server status sweep, all behind one `RunRetention` entry point.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ConfigHandle;
use crate::dashboard::DashboardAggregator;
use crate::heartbeat::HeartbeatSweeper;
use crate::model::AlertInstanceStatus;
use crate::store::{LogRetentionCounts, LogRetentionCutoffs, Store};
use crate::task::SupervisedTask;

#[derive(Debug, Clone, Default, Serialize)]
pub struct RetentionReport {
    pub log_counts: LogCountsReport,
    pub alert_instances_deleted: u64,
    pub audit_log_deleted: u64,
    pub refresh_tokens_deleted: u64,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LogCountsReport {
    pub trace_debug: u64,
    pub information: u64,
    pub warning_error: u64,
    pub critical: u64,
}

impl From<LogRetentionCounts> for LogCountsReport {
    fn from(counts: LogRetentionCounts) -> Self {
        Self {
            trace_debug: counts.trace_debug,
            information: counts.information,
            warning_error: counts.warning_error,
            critical: counts.critical,
        }
    }
}

pub struct RetentionRunner {
    store: Arc<Store>,
    dashboard: Arc<DashboardAggregator>,
    heartbeat: Arc<HeartbeatSweeper>,
}

impl RetentionRunner {
    pub fn new(
        store: Arc<Store>,
        dashboard: Arc<DashboardAggregator>,
        heartbeat: Arc<HeartbeatSweeper>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            dashboard,
            heartbeat,
        })
    }

    /// 's `RunRetention` entry point. `dry_run` counts matching
    /// rows without mutating anything.
    pub async fn run(
        &self,
        config: &ConfigHandle,
        dry_run: bool,
        batch_size: Option<usize>,
    ) -> RetentionReport {
        let cfg = config.current();
        let now: DateTime<Utc> = self.store.now();
        let cutoffs = LogRetentionCutoffs {
            trace_debug_days: cfg.retention.trace_debug_days,
            default_days: cfg.retention.default_days,
            error_days: cfg.retention.error_days,
            critical_days: cfg.retention.critical_days,
        };
        let batch_size = batch_size.unwrap_or(cfg.retention.batch_size);

        let log_counts = self
        .store
        .retain_logs_with_pacing(now, &cutoffs, batch_size, dry_run, cfg.retention.inter_batch_sleep)
        .await;

        let alert_instances_deleted = if dry_run {
            self.count_resolved_instances_older_than(now - chrono::Duration::days(cfg.retention.alert_instance_retention_days)).await
        } else {
            self.delete_resolved_instances_older_than(now - chrono::Duration::days(cfg.retention.alert_instance_retention_days)).await
        };

        let audit_cutoff = now - chrono::Duration::days(cfg.retention.audit_log_retention_days);
        let audit_log_deleted = if dry_run {
            0
        } else {
            self.store.delete_audit_log_older_than(audit_cutoff).await
        };

        let refresh_tokens_deleted = if dry_run {
            0
        } else {
            self.store.delete_expired_refresh_tokens(now).await
        };

        if !dry_run {
            self.dashboard.invalidate_all().await;
            self.heartbeat.sweep_once().await;
        }

        RetentionReport {
            log_counts: log_counts.into(),
            alert_instances_deleted,
            audit_log_deleted,
            refresh_tokens_deleted,
            dry_run,
        }
    }

    async fn count_resolved_instances_older_than(&self, cutoff: DateTime<Utc>) -> u64 {
        self.store
        .list_alert_instances(None)
        .await
        .into_iter()
        .filter(|i| i.status == AlertInstanceStatus::Resolved)
        .filter(|i| i.resolved_at.map_or(false, |at| at < cutoff))
        .count() as u64
    }

    async fn delete_resolved_instances_older_than(&self, cutoff: DateTime<Utc>) -> u64 {
        self.store.delete_resolved_alert_instances_older_than(cutoff).await
    }

    /// Runs daily, first firing at the configured `cleanupTimeUtc` (default
    /// 02:00 UTC) rather than 24h after process start.
    pub fn spawn(self: &Arc<Self>, config: ConfigHandle) -> SupervisedTask {
        let runner = Arc::clone(self);
        let (hour, minute) = config.current().retention.cleanup_time_utc;
        let now = self.store.now();
        SupervisedTask::spawn_daily_at(
            "retention-runner",
            hour,
            minute,
            now,
            Duration::from_secs(24 * 60 * 60),
            move || {
                let runner = Arc::clone(&runner);
                let config = config.clone();
                async move {
                    let report = runner.run(&config, false, None).await;
                    tracing::info!(?report, "retention run complete");
                }
            },
        )
    }
}
