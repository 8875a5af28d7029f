//! Alert evaluation engine
//!
//! Periodic worker: for each active, non-throttled `Alert`, evaluate its
//! `condition` against the Store, fire an `AlertInstance` on match, and hand
//! the firing off to a `NotificationDispatcher`. Condition dispatch is a
//! `match` over the typed `AlertCondition` sum rather than reflection over
//! an untyped payload.

use std::sync::Arc;

use crate::config::ConfigHandle;
use crate::model::{Alert, AlertCondition, ExecutionStatus, LogLevel, ServerStatus};
use crate::notify::NotificationDispatcher;
use crate::realtime::{topics, FanOut};
use crate::store::{NewAlertInstance, Store};
use crate::task::SupervisedTask;

pub struct AlertEngine {
    store: Arc<Store>,
    fan_out: Arc<FanOut>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

/// One condition's evaluation outcome: whether it fired, and if so the
/// message/context to attach to the `AlertInstance`.
struct Evaluation {
    fired: bool,
    message: String,
    context: serde_json::Value,
}

impl AlertEngine {
    pub fn new(
        store: Arc<Store>,
        fan_out: Arc<FanOut>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            fan_out,
            dispatcher,
        })
    }

    /// Runs one evaluation pass over every alert that is active and past its
    /// throttle window (lastTriggeredAt null or older than throttleMinutes).
    pub async fn evaluate_once(&self) {
        for alert in self.store.due_alerts().await {
            match self.evaluate_condition(&alert).await {
                Some(eval) if eval.fired => self.fire(&alert, eval).await,
                _ => {}
            }
        }
    }

    async fn evaluate_condition(&self, alert: &Alert) -> Option<Evaluation> {
        match &alert.condition {
            AlertCondition::ErrorThreshold {
                threshold,
                window_minutes,
                level,
            } => self.evaluate_error_threshold(alert, *threshold, *window_minutes, *level).await,
            AlertCondition::JobFailure {
                consecutive,
                window_minutes,
            } => self.evaluate_job_failure(alert, *consecutive, *window_minutes).await,
            AlertCondition::ServerOffline {} => self.evaluate_server_offline(alert).await,
            AlertCondition::PerformanceWarning {
                duration_ms,
                percent_of_avg,
            } => self.evaluate_performance_warning(alert, *duration_ms, *percent_of_avg).await,
            AlertCondition::CustomQuery { query } => self.evaluate_custom_query(alert, query).await,
            AlertCondition::PatternMatch {
                regex,
                window_minutes,
                level,
            } => self.evaluate_pattern_match(alert, regex, *window_minutes, *level).await,
        }
    }

    /// `COUNT(logs with level ≥ X in last windowMinutes, scoped) ≥ threshold`.
    async fn evaluate_error_threshold(
        &self,
        alert: &Alert,
        threshold: u64,
        window_minutes: i64,
        level: LogLevel,
    ) -> Option<Evaluation> {
        let since = self.store.now() - chrono::Duration::minutes(window_minutes.max(0));
        let count = self
        .store
        .count_logs_since(since, level, alert.job_id.as_deref(), alert.server_name.as_deref())
        .await;
        Some(Evaluation {
            fired: count >= threshold,
            message: format!(
                "{count} log(s) at level >= {level:?} in the last {window_minutes} minute(s), threshold {threshold}"
            ),
            context: serde_json::json!({ "count": count, "threshold": threshold, "windowMinutes": window_minutes }),
        })
    }

    /// `Latest execution of scoped job is Failed, or N consecutive failures`.
    async fn evaluate_job_failure(
        &self,
        alert: &Alert,
        consecutive: Option<u32>,
        _window_minutes: Option<i64>,
    ) -> Option<Evaluation> {
        let job_id = alert.job_id.as_deref()?;
        let executions = self.store.list_executions_for_job(job_id).await;

        let fired = match consecutive {
            Some(n) if n > 1 => {
                let n = n as usize;
                executions.len() >= n
                && executions[..n].iter().all(|e| e.status == ExecutionStatus::Failed)
            }
            _ => executions.first().is_some_and(|e| e.status == ExecutionStatus::Failed),
        };

        Some(Evaluation {
            fired,
            message: format!("job '{job_id}' failure condition met ({consecutive:?} consecutive)"),
            context: serde_json::json!({
                "jobId": job_id,
                "consecutive": consecutive,
                "latestStatus": executions.first().map(|e| format!("{:?}", e.status)),
            }),
        })
    }

    /// Fires when the scoped server's status is Offline.
    async fn evaluate_server_offline(&self, alert: &Alert) -> Option<Evaluation> {
        let server_name = alert.server_name.as_deref()?;
        let server = self.store.get_server(server_name).await?;
        Some(Evaluation {
            fired: server.status == ServerStatus::Offline,
            message: format!("server '{server_name}' is Offline"),
            context: serde_json::json!({ "serverName": server_name, "status": format!("{:?}", server.status) }),
        })
    }

    /// `Latest execution's durationMs exceeds bound`.
    async fn evaluate_performance_warning(
        &self,
        alert: &Alert,
        duration_ms: Option<i64>,
        percent_of_avg: Option<f64>,
    ) -> Option<Evaluation> {
        let job_id = alert.job_id.as_deref()?;
        let latest = self.store.list_executions_for_job(job_id).await.into_iter().next()?;
        let actual = latest.duration_ms?;

        let bound = if let Some(ms) = duration_ms {
            ms
        } else if let Some(pct) = percent_of_avg {
            let job = self.store.get_job(job_id).await?;
            ((job.avg_duration_ms as f64) * pct / 100.0) as i64
        } else {
            return None;
        };

        Some(Evaluation {
            fired: actual > bound,
            message: format!(
                "job '{job_id}' execution {} took {actual}ms, exceeding bound {bound}ms",
                latest.id
            ),
            context: serde_json::json!({
                "jobId": job_id,
                "executionId": latest.id,
                "durationMs": actual,
                "boundMs": bound,
            }),
        })
    }

    /// `Store-side query returns ≥1 row (caller-scoped)`.
    ///
    /// The Store here is a fixed, typed schema rather than a general SQL
    /// engine (see `store/mod.rs`), so an arbitrary caller-supplied query
    /// string has nothing to execute against; the only query this condition
    /// can express without a SQL surface is "at least one log matches this
    /// message substring", which is what the `query` field is treated as.
    async fn evaluate_custom_query(&self, alert: &Alert, query: &str) -> Option<Evaluation> {
        let since = self.store.now() - chrono::Duration::hours(1);
        let filter = crate::store::LogSearchFilter {
            search_text: Some(query.to_string()),
            job_id: alert.job_id.clone(),
            server_name: alert.server_name.clone(),
            start: Some(since),
            page_size: 1,
            ..Default::default()
        };
        let page = self.store.search_logs(&filter).await;
        Some(Evaluation {
            fired: page.total_count > 0,
            message: format!("custom query '{query}' matched {} row(s)", page.total_count),
            context: serde_json::json!({ "query": query, "matches": page.total_count }),
        })
    }

    /// `≥1 matching log in window`.
    async fn evaluate_pattern_match(
        &self,
        alert: &Alert,
        regex: &str,
        window_minutes: i64,
        level: Option<LogLevel>,
    ) -> Option<Evaluation> {
        let compiled = regex::Regex::new(regex).ok()?;
        let since = self.store.now() - chrono::Duration::minutes(window_minutes.max(0));
        let matched = self.store.any_log_matches_since(since, &compiled, level).await;
        Some(Evaluation {
            fired: matched,
            message: format!("pattern '{regex}' matched in the last {window_minutes} minute(s)"),
            context: serde_json::json!({ "regex": regex, "windowMinutes": window_minutes }),
        })
    }

    /// "On fire": insert the instance + bump throttle state
    /// atomically, publish `NewAlert`, then hand off to notifications.
    async fn fire(&self, alert: &Alert, eval: Evaluation) {
        let instance = self
        .store
        .fire_alert(NewAlertInstance {
            alert_id: alert.id,
            message: eval.message,
            context: Some(eval.context),
            job_id: alert.job_id.clone(),
            job_execution_id: None,
            server_name: alert.server_name.clone(),
            severity: alert.severity,
        })
        .await;

        tracing::info!(alert_id = alert.id, instance_id = instance.id, "alert fired");
        let payload = serde_json::to_value(&instance).unwrap_or(serde_json::Value::Null);
        self.fan_out.publish(topics::ALERTS_NEW, payload);

        let outcome = self.dispatcher.dispatch(alert, &instance).await;
        self.store.record_notifications_sent(instance.id, outcome).await;
    }

    pub fn spawn(self: &Arc<Self>, config: &ConfigHandle) -> SupervisedTask {
        let engine = Arc::clone(self);
        let interval = config.current().alert.evaluation_interval;
        SupervisedTask::spawn("alert-engine", interval, move || {
                let engine = Arc::clone(&engine);
                async move { engine.evaluate_once().await }
        })
    }
}

/// `Acknowledge`/`Resolve` pass straight through to the Store's lifecycle
/// methods ("Instance lifecycle") — kept here as the capability
/// surface the API layer calls, alongside bulk variants (spec: "Bulk
/// variants are allowed; each instance is transitioned independently and
/// atomically").
pub async fn acknowledge_instances(
    store: &Store,
    ids: &[u64],
    by: &str,
    note: Option<String>,
) -> Vec<crate::error::Result<crate::model::AlertInstance>> {
    let mut results = Vec::with_capacity(ids.len());
    for &id in ids {
        results.push(store.acknowledge_instance(id, by, note.clone()).await);
    }
    results
}

pub async fn resolve_instances(
    store: &Store,
    ids: &[u64],
    by: &str,
    note: Option<String>,
) -> Vec<crate::error::Result<crate::model::AlertInstance>> {
    let mut results = Vec::with_capacity(ids.len());
    for &id in ids {
        results.push(store.resolve_instance(id, by, note.clone()).await);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;
    use crate::model::AlertSeverity;
    use crate::store::{CreateAlertFields, StartExecutionRequest};
    use chrono::{TimeZone, Utc};

    fn engine(store: Arc<Store>) -> Arc<AlertEngine> {
        AlertEngine::new(
            store,
            Arc::new(FanOut::default()),
            Arc::new(crate::notify::LoggingNotificationDispatcher),
        )
    }

    #[tokio::test]
    async fn job_failure_alert_throttles_after_first_fire() {
        let clock = VirtualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let store = Store::new(clock.clone());

        let started = store
        .start_execution(StartExecutionRequest {
            job_id: "J1".into(),
            server_name: "S1".into(),
            trigger_type: "Manual".into(),
            triggered_by: None,
            correlation_id: None,
            parameters: None,
        })
        .await
        .unwrap();
        store
        .complete_execution(crate::store::CompleteExecutionRequest {
            execution_id: started.execution_id,
            status: ExecutionStatus::Failed,
            result_summary: None,
            result_code: None,
            error_message: Some("boom".into()),
            error_category: None,
        })
        .await
        .unwrap();

        store
        .create_alert(CreateAlertFields {
            name: "job failure".into(),
            description: None,
            condition: AlertCondition::JobFailure {
                consecutive: None,
                window_minutes: None,
            },
            severity: AlertSeverity::High,
            is_active: true,
            throttle_minutes: 15,
            notification_channels: None,
            job_id: Some("J1".into()),
            server_name: None,
        })
        .await;

        let engine = engine(store.clone());
        engine.evaluate_once().await;
        engine.evaluate_once().await;

        let instances = store.list_alert_instances(None).await;
        assert_eq!(instances.len(), 1);
        let alert = store.get_alert(1).await.unwrap();
        assert_eq!(alert.trigger_count, 1);
    }

    #[tokio::test]
    async fn server_offline_condition_fires_once_classified_offline() {
        let clock = VirtualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let store = Store::new(clock.clone());
        store
        .process_heartbeat(crate::store::HeartbeatFields {
            server_name: "H1".into(),
            ip_address: None,
            agent_version: None,
            agent_type: None,
            metadata: None,
        })
        .await;
        clock.advance(chrono::Duration::seconds(61 * 3 + 1));
        store.sweep_server_statuses().await;

        store
        .create_alert(CreateAlertFields {
            name: "server offline".into(),
            description: None,
            condition: AlertCondition::ServerOffline {},
            severity: AlertSeverity::Critical,
            is_active: true,
            throttle_minutes: 15,
            notification_channels: None,
            job_id: None,
            server_name: Some("H1".into()),
        })
        .await;

        let engine = engine(store.clone());
        engine.evaluate_once().await;

        let instances = store.list_alert_instances(None).await;
        assert_eq!(instances.len(), 1);
    }
}
