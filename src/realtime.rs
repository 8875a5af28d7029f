//! Real-time fan-out
//!
//! One `tokio::sync::broadcast` channel per topic, created lazily. Broadcast
//! channels already implement exactly the semantics asks for —
//! fixed-capacity ring buffer, oldest events dropped once a lagging
//! subscriber falls behind, `RecvError::Lagged(n)` surfaced to that
//! subscriber instead of blocking the publisher — so topic fan-out needs no
//! custom buffer-management code of its own.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as Json;
use tokio::sync::broadcast;

pub mod topics {
    pub const DASHBOARD_SUMMARY: &str = "dashboard-summary";
    pub const LOGS_ALL: &str = "logs.all";
    pub const LOGS_ERRORS: &str = "logs.errors";
    pub const EXECUTIONS_RUNNING: &str = "executions.running";
    pub const ALERTS_NEW: &str = "alerts.new";
    pub const ALERTS_UPDATES: &str = "alerts.updates";
    pub const SERVERS_STATUS: &str = "servers.status";

    pub fn logs_job(job_id: &str) -> String {
        format!("logs.job.{job_id}")
    }

    pub fn logs_execution(execution_id: u64) -> String {
        format!("logs.execution.{execution_id}")
    }
}

/// A `Lag` marker, sent to a subscriber in place of the events it missed.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LagMarker {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub skipped: u64,
}

impl LagMarker {
    pub fn skipped(n: u64) -> Self {
        Self { kind: "Lag", skipped: n }
    }
}

pub struct FanOut {
    capacity: usize,
    channels: RwLock<HashMap<String, broadcast::Sender<Json>>>,
}

impl FanOut {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            channels: RwLock::new(HashMap::new()),
        }
    }

    fn sender_for(&self, topic: &str) -> broadcast::Sender<Json> {
        if let Some(tx) = self.channels.read().expect("fan-out lock poisoned").get(topic) {
            return tx.clone();
        }
        let mut guard = self.channels.write().expect("fan-out lock poisoned");
        guard
        .entry(topic.to_string())
        .or_insert_with(|| broadcast::channel(self.capacity).0)
        .clone()
    }

    /// Publishes `payload` to `topic`. Never blocks: a topic with no
    /// subscribers simply drops the event.
    pub fn publish(&self, topic: &str, payload: Json) {
        let tx = self.sender_for(topic);
        let _ = tx.send(payload);
    }

    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<Json> {
        self.sender_for(topic).subscribe()
    }
}

impl Default for FanOut {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let bus = FanOut::new(4);
        bus.publish(topics::LOGS_ALL, serde_json::json!({"n": 1}));
        let mut rx = bus.subscribe(topics::LOGS_ALL);
        bus.publish(topics::LOGS_ALL, serde_json::json!({"n": 2}));
        let received = rx.recv().await.unwrap();
        assert_eq!(received["n"], 2);
    }

    #[tokio::test]
    async fn lagging_subscriber_sees_lagged_error_not_a_block() {
        let bus = FanOut::new(2);
        let mut rx = bus.subscribe(topics::LOGS_ALL);
        for n in 0..5 {
            bus.publish(topics::LOGS_ALL, serde_json::json!({"n": n}));
        }
        let err = rx.recv().await.unwrap_err();
        assert!(matches!(err, broadcast::error::RecvError::Lagged(_)));
    }
}
