//! Dashboard aggregator
//!
//! Computes a summary snapshot plus three derived views (hourly trend,
//! top exceptions, server status list), cached in the Store's
//! `DashboardCache` with a TTL. A cache miss triggers a recompute guarded by
//! a per-key single-flight lock: at most one concurrent recompute per key,
//! other readers await the result.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::ConfigHandle;
use crate::model::{ExecutionStatus, ServerStatus};
use crate::realtime::{topics, FanOut};
use crate::store::Store;
use crate::task::SupervisedTask;

const SUMMARY_KEY: &str = "summary";

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub computed_at: DateTime<Utc>,
    pub total_jobs: u64,
    pub active_jobs: u64,
    pub total_executions_today: u64,
    pub running_executions: u64,
    pub failed_executions_today: u64,
    pub servers_online: u64,
    pub servers_degraded: u64,
    pub servers_offline: u64,
    pub open_alert_instances: u64,
    pub logs_last_24h: u64,
    pub hourly_trend: Vec<HourlyBucket>,
    pub top_exceptions: Vec<ExceptionCount>,
    pub server_statuses: Vec<ServerStatusEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HourlyBucket {
    pub hour: DateTime<Utc>,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExceptionCount {
    pub exception_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerStatusEntry {
    pub server_name: String,
    pub status: ServerStatus,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

/// Single-flight guard: one `Mutex` per cache key, held only while the
/// owning caller recomputes; everyone else blocks on it and then re-checks
/// the cache the winner just populated.
#[derive(Default)]
struct SingleFlight {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SingleFlight {
    async fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(key.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }
}

pub struct DashboardAggregator {
    store: Arc<Store>,
    config: ConfigHandle,
    fan_out: Arc<FanOut>,
    single_flight: SingleFlight,
}

impl DashboardAggregator {
    pub fn new(store: Arc<Store>, config: ConfigHandle, fan_out: Arc<FanOut>) -> Arc<Self> {
        Arc::new(Self {
            store,
            config,
            fan_out,
            single_flight: SingleFlight::default(),
        })
    }

    /// Returns the cached summary if fresh, else recomputes under the
    /// single-flight guard
    pub async fn get_summary(&self) -> DashboardSummary {
        if let Some(cached) = self.store.get_cached(SUMMARY_KEY).await {
            if let Ok(summary) = serde_json::from_value(cached.payload) {
                return summary;
            }
        }

        let guard = self.single_flight.lock_for(SUMMARY_KEY).await;
        let _permit = guard.lock().await;

        // Another caller may have populated the cache while we waited.
        if let Some(cached) = self.store.get_cached(SUMMARY_KEY).await {
            if let Ok(summary) = serde_json::from_value(cached.payload) {
                return summary;
            }
        }

        self.recompute_and_cache().await
    }

    async fn recompute_and_cache(&self) -> DashboardSummary {
        let now = self.store.now();
        let summary = self.compute(now).await;

        let payload = serde_json::to_value(&summary).unwrap_or(serde_json::Value::Null);
        let ttl = chrono::Duration::from_std(self.config.current().dashboard.stats_cache_ttl)
        .unwrap_or_else(|_| chrono::Duration::seconds(30));
        self.store.put_cached(SUMMARY_KEY, payload.clone(), ttl).await;
        self.fan_out.publish(topics::DASHBOARD_SUMMARY, payload);
        summary
    }

    async fn compute(&self, now: DateTime<Utc>) -> DashboardSummary {
        let jobs = self.store.list_jobs(false).await;
        let total_jobs = jobs.len() as u64;
        let active_jobs = jobs.iter().filter(|j| j.is_active).count() as u64;

        let today_start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("valid midnight")
        .and_utc();

        let running = self.store.running_executions().await;
        let mut total_executions_today = 0u64;
        let mut failed_executions_today = 0u64;
        for job in &jobs {
            if job.last_execution_at.map_or(false, |at| at >= today_start) {
                total_executions_today += 1;
                if matches!(job.last_status, Some(ExecutionStatus::Failed) | Some(ExecutionStatus::Timeout)) {
                    failed_executions_today += 1;
                }
            }
        }

        let servers = self.store.list_servers(true).await;
        let servers_online = servers.iter().filter(|s| s.status == ServerStatus::Online).count() as u64;
        let servers_degraded = servers.iter().filter(|s| s.status == ServerStatus::Degraded).count() as u64;
        let servers_offline = servers.iter().filter(|s| s.status == ServerStatus::Offline).count() as u64;

        let open_alert_instances = self
        .store
        .list_alert_instances(None)
        .await
        .into_iter()
        .filter(|i| {
                !matches!(
                    i.status,
                    crate::model::AlertInstanceStatus::Resolved | crate::model::AlertInstanceStatus::Suppressed
                )
        })
        .count() as u64;

        let since_24h = now - chrono::Duration::hours(24);
        let logs_last_24h = self
        .store
        .count_logs_since(since_24h, crate::model::LogLevel::Trace, None, None)
        .await;

        let hourly_trend = self
        .store
        .hourly_trend_since(since_24h)
        .await
        .into_iter()
        .map(|(hour, count)| HourlyBucket { hour, count })
        .collect();

        let top_exceptions = self
        .store
        .top_exceptions_since(since_24h, 10)
        .await
        .into_iter()
        .map(|(exception_type, count)| ExceptionCount { exception_type, count })
        .collect();

        let server_statuses = servers
        .into_iter()
        .map(|s| ServerStatusEntry {
                server_name: s.server_name,
                status: s.status,
                last_heartbeat: s.last_heartbeat,
        })
        .collect();

        DashboardSummary {
            computed_at: now,
            total_jobs,
            active_jobs,
            total_executions_today,
            running_executions: running.len() as u64,
            failed_executions_today,
            servers_online,
            servers_degraded,
            servers_offline,
            open_alert_instances,
            logs_last_24h,
            hourly_trend,
            top_exceptions,
            server_statuses,
        }
    }

    /// Invalidates the cache, forcing the next reader to recompute. Called
    /// after each maintenance pass so stale aggregates don't linger.
    pub async fn invalidate_all(&self) {
        self.store.invalidate_cached(SUMMARY_KEY).await;
    }

    pub fn spawn(self: &Arc<Self>) -> SupervisedTask {
        let aggregator = Arc::clone(self);
        let ttl = self.config.current().dashboard.stats_cache_ttl;
        SupervisedTask::spawn("dashboard-cache-refresher", ttl, move || {
                let aggregator = Arc::clone(&aggregator);
                async move {
                    aggregator.recompute_and_cache().await;
                }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::store::HeartbeatFields;

    #[tokio::test]
    async fn summary_reflects_server_and_job_counts() {
        let store = Store::new(Arc::new(SystemClock));
        store
        .process_heartbeat(HeartbeatFields {
            server_name: "S1".into(),
            ip_address: None,
            agent_version: None,
            agent_type: None,
            metadata: None,
        })
        .await;
        let config = ConfigHandle::new(crate::config::AppConfig::default());
        let aggregator = DashboardAggregator::new(store, config, Arc::new(FanOut::default()));
        let summary = aggregator.get_summary().await;
        assert_eq!(summary.servers_online, 1);
    }

    #[tokio::test]
    async fn summary_is_cached_between_calls() {
        let store = Store::new(Arc::new(SystemClock));
        let config = ConfigHandle::new(crate::config::AppConfig::default());
        let aggregator = DashboardAggregator::new(store.clone(), config, Arc::new(FanOut::default()));
        let first = aggregator.get_summary().await;
        store
        .process_heartbeat(HeartbeatFields {
            server_name: "S2".into(),
            ip_address: None,
            agent_version: None,
            agent_type: None,
            metadata: None,
        })
        .await;
        let second = aggregator.get_summary().await;
        assert_eq!(first.computed_at, second.computed_at);
    }
}
