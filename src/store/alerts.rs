use chrono::Utc;
use serde::Deserialize;
use serde_json::Value as Json;

use super::Store;
use crate::error::{Result, StoreError};
use crate::model::{Alert, AlertCondition, AlertInstance, AlertInstanceStatus, AlertSeverity};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAlertFields {
    pub name: String,
    pub description: Option<String>,
    pub condition: AlertCondition,
    pub severity: AlertSeverity,
    pub is_active: bool,
    pub throttle_minutes: i64,
    pub notification_channels: Option<Json>,
    pub job_id: Option<String>,
    pub server_name: Option<String>,
}

pub struct NewAlertInstance {
    pub alert_id: u64,
    pub message: String,
    pub context: Option<Json>,
    pub job_id: Option<String>,
    pub job_execution_id: Option<u64>,
    pub server_name: Option<String>,
    pub severity: AlertSeverity,
}

impl Store {
    pub async fn create_alert(&self, fields: CreateAlertFields) -> Alert {
        let mut data = self.data.write().await;
        let id = self.alert_ids.next_id();
        let alert = Alert {
            id,
            name: fields.name,
            description: fields.description,
            condition: fields.condition,
            severity: fields.severity,
            is_active: fields.is_active,
            throttle_minutes: fields.throttle_minutes,
            last_triggered_at: None,
            trigger_count: 0,
            notification_channels: fields.notification_channels,
            job_id: fields.job_id,
            server_name: fields.server_name,
        };
        data.alerts.insert(id, alert.clone());
        alert
    }

    pub async fn get_alert(&self, id: u64) -> Option<Alert> {
        self.data.read().await.alerts.get(&id).cloned()
    }

    /// `GET /api/alerts`: every configured alert regardless of activity or
    /// throttle state (contrast with [`Store::due_alerts`], which is scoped
    /// to the evaluation loop).
    pub async fn list_alerts(&self) -> Vec<Alert> {
        self.data.read().await.alerts.values().cloned().collect()
    }

    /// Alerts eligible for evaluation this tick: active and past throttle
    ///
    pub async fn due_alerts(&self) -> Vec<Alert> {
        let now = self.now();
        self.data
        .read()
        .await
        .alerts
        .values()
        .filter(|a| a.is_active && a.is_throttle_elapsed(now))
        .cloned()
        .collect()
    }

    /// Fires an alert: inserts an `AlertInstance` and updates
    /// `lastTriggeredAt`/`triggerCount` atomically ("On fire").
    pub async fn fire_alert(&self, new_instance: NewAlertInstance) -> AlertInstance {
        let now = self.now();
        let mut data = self.data.write().await;
        let instance_id = self.instance_ids.next_id();
        let instance = AlertInstance {
            id: instance_id,
            alert_id: new_instance.alert_id,
            triggered_at: now,
            message: new_instance.message,
            context: new_instance.context,
            job_id: new_instance.job_id,
            job_execution_id: new_instance.job_execution_id,
            server_name: new_instance.server_name,
            severity: new_instance.severity,
            status: AlertInstanceStatus::New,
            acknowledged_at: None,
            acknowledged_by: None,
            acknowledged_note: None,
            resolved_at: None,
            resolved_by: None,
            resolved_note: None,
            notifications_sent: None,
        };
        data.alert_instances.insert(instance_id, instance.clone());
        data.instances_by_alert
        .entry(new_instance.alert_id)
        .or_default()
        .insert(instance_id);

        if let Some(alert) = data.alerts.get_mut(&new_instance.alert_id) {
            alert.last_triggered_at = Some(now);
            alert.trigger_count += 1;
        }

        instance
    }

    pub async fn record_notifications_sent(&self, instance_id: u64, outcome: Json) {
        let mut data = self.data.write().await;
        if let Some(instance) = data.alert_instances.get_mut(&instance_id) {
            instance.notifications_sent = Some(outcome);
        }
    }

    pub async fn get_alert_instance(&self, id: u64) -> Option<AlertInstance> {
        self.data.read().await.alert_instances.get(&id).cloned()
    }

    /// lifecycle: `New → Acknowledged`. Already-acknowledged is a
    /// no-op success ("Idempotence").
    pub async fn acknowledge_instance(
        &self,
        id: u64,
        by: &str,
        note: Option<String>,
    ) -> Result<AlertInstance> {
        let now = self.now();
        let mut data = self.data.write().await;
        let instance = data
        .alert_instances
        .get_mut(&id)
        .ok_or_else(|| StoreError::NotFound("AlertInstance", id.to_string()))?;

        if instance.status == AlertInstanceStatus::Acknowledged {
            return Ok(instance.clone());
        }
        if !instance.can_acknowledge() {
            return Err(StoreError::IllegalTransition(format!(
                        "alert instance {id} cannot be acknowledged from {:?}",
                        instance.status
            )));
        }
        instance.status = AlertInstanceStatus::Acknowledged;
        instance.acknowledged_at = Some(now);
        instance.acknowledged_by = Some(by.to_string());
        instance.acknowledged_note = note;
        Ok(instance.clone())
    }

    /// lifecycle: `New|Acknowledged → Resolved`.
    pub async fn resolve_instance(
        &self,
        id: u64,
        by: &str,
        note: Option<String>,
    ) -> Result<AlertInstance> {
        let now = self.now();
        let mut data = self.data.write().await;
        let instance = data
        .alert_instances
        .get_mut(&id)
        .ok_or_else(|| StoreError::NotFound("AlertInstance", id.to_string()))?;

        if instance.status == AlertInstanceStatus::Resolved {
            return Ok(instance.clone());
        }
        if !instance.can_resolve() {
            return Err(StoreError::IllegalTransition(format!(
                        "alert instance {id} cannot be resolved from {:?}",
                        instance.status
            )));
        }
        instance.status = AlertInstanceStatus::Resolved;
        instance.resolved_at = Some(now);
        instance.resolved_by = Some(by.to_string());
        instance.resolved_note = note;
        Ok(instance.clone())
    }

    /// : "AlertInstance with status=Resolved and resolvedAt older
    /// than 90 days → delete".
    pub async fn delete_resolved_alert_instances_older_than(&self, cutoff: chrono::DateTime<Utc>) -> u64 {
        let mut data = self.data.write().await;
        let stale: Vec<u64> = data
        .alert_instances
        .iter()
        .filter(|(_, i)| {
                i.status == AlertInstanceStatus::Resolved
                && i.resolved_at.map_or(false, |at| at < cutoff)
        })
        .map(|(id, _)| *id)
        .collect();
        for id in &stale {
            if let Some(instance) = data.alert_instances.remove(id) {
                if let Some(set) = data.instances_by_alert.get_mut(&instance.alert_id) {
                    set.remove(id);
                }
            }
        }
        stale.len() as u64
    }

    pub async fn list_alert_instances(&self, alert_id: Option<u64>) -> Vec<AlertInstance> {
        let data = self.data.read().await;
        match alert_id {
            Some(id) => data
            .instances_by_alert
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|iid| data.alert_instances.get(iid).cloned())
            .collect(),
            None => data.alert_instances.values().cloned().collect(),
        }
    }
}
