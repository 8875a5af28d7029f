//! Notification channel dispatcher: firing an alert hands the delivery off
//! asynchronously to this trait instead of blocking the evaluation loop.
//!
//! The channel dispatcher itself (email/Slack/PagerDuty/...) is an external
//! collaborator — out of scope here. This module defines the
//! capability boundary the alert engine calls through, plus a best-effort
//! logging implementation so the engine has something real to drive without
//! inventing a notification provider.

use async_trait::async_trait;
use serde_json::{json, Value as Json};

use crate::model::{Alert, AlertInstance};

/// One outbound notification attempt against a channel named in
/// `Alert.notificationChannels`.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Dispatches `instance` to every channel named on `alert`. Never
    /// returns an `Err` that should block the firing transaction — the
    /// engine records whatever this returns onto `notificationsSent` and
    /// moves on.
    async fn dispatch(&self, alert: &Alert, instance: &AlertInstance) -> Json;
}

/// Logs each notification instead of calling a real channel. A minimal
/// stand-in for the external dispatcher so the engine has something real
/// to drive end to end without inventing a notification provider.
#[derive(Debug, Default)]
pub struct LoggingNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingNotificationDispatcher {
    async fn dispatch(&self, alert: &Alert, instance: &AlertInstance) -> Json {
        let channels: Vec<String> = alert
        .notification_channels
        .as_ref()
        .and_then(|v| v.as_array())
        .map(|arr| {
                arr.iter()
                .filter_map(|c| c.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

        if channels.is_empty() {
            tracing::debug!(alert_id = alert.id, "no notification channels configured");
            return json!({ "channels": [], "delivered": 0 });
        }

        for channel in &channels {
            tracing::info!(
                alert_id = alert.id,
                instance_id = instance.id,
                channel = %channel,
                message = %instance.message,
                "alert notification dispatched"
            );
        }

        json!({
            "channels": channels,
            "delivered": channels.len(),
            "dispatchedAt": instance.triggered_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlertCondition, AlertInstanceStatus, AlertSeverity};
    use chrono::Utc;

    fn sample_alert() -> Alert {
        Alert {
            id: 1,
            name: "n".into(),
            description: None,
            condition: AlertCondition::ServerOffline {},
            severity: AlertSeverity::High,
            is_active: true,
            throttle_minutes: 15,
            last_triggered_at: None,
            trigger_count: 0,
            notification_channels: Some(json!(["slack", "email"])),
            job_id: None,
            server_name: None,
        }
    }

    fn sample_instance() -> AlertInstance {
        AlertInstance {
            id: 1,
            alert_id: 1,
            triggered_at: Utc::now(),
            message: "m".into(),
            context: None,
            job_id: None,
            job_execution_id: None,
            server_name: None,
            severity: AlertSeverity::High,
            status: AlertInstanceStatus::New,
            acknowledged_at: None,
            acknowledged_by: None,
            acknowledged_note: None,
            resolved_at: None,
            resolved_by: None,
            resolved_note: None,
            notifications_sent: None,
        }
    }

    #[tokio::test]
    async fn dispatches_to_every_configured_channel() {
        let dispatcher = LoggingNotificationDispatcher;
        let outcome = dispatcher.dispatch(&sample_alert(), &sample_instance()).await;
        assert_eq!(outcome["delivered"], 2);
    }
}
