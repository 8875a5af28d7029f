//! Heartbeat status sweep : a periodic worker over
//! `Store::sweep_server_statuses`, emitting `ServerStatusChange` events for
//! every transition.

use std::sync::Arc;

use serde::Serialize;

use crate::config::ConfigHandle;
use crate::model::ServerStatus;
use crate::realtime::{topics, FanOut};
use crate::store::Store;
use crate::task::SupervisedTask;

#[derive(Debug, Clone, Serialize)]
pub struct ServerStatusChange {
    pub server_name: String,
    pub old_status: ServerStatus,
    pub new_status: ServerStatus,
}

pub struct HeartbeatSweeper {
    store: Arc<Store>,
    fan_out: Arc<FanOut>,
}

impl HeartbeatSweeper {
    pub fn new(store: Arc<Store>, fan_out: Arc<FanOut>) -> Arc<Self> {
        Arc::new(Self { store, fan_out })
    }

    pub async fn sweep_once(&self) {
        for (server_name, old_status, new_status) in self.store.sweep_server_statuses().await {
            tracing::info!(server_name = %server_name, ?old_status, ?new_status, "server status changed");
            let change = ServerStatusChange {
                server_name,
                old_status,
                new_status,
            };
            let payload = serde_json::to_value(&change).unwrap_or(serde_json::Value::Null);
            self.fan_out.publish(topics::SERVERS_STATUS, payload);
        }
    }

    pub fn spawn(self: &Arc<Self>, config: &ConfigHandle) -> SupervisedTask {
        let sweeper = Arc::clone(self);
        let interval = config.current().server.status_sweep_interval;
        SupervisedTask::spawn("heartbeat-status-sweeper", interval, move || {
                let sweeper = Arc::clone(&sweeper);
                async move { sweeper.sweep_once().await }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;
    use crate::store::HeartbeatFields;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn sweep_reclassifies_stale_server_as_offline() {
        let clock = VirtualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let store = Store::new(clock.clone());
        store
        .process_heartbeat(HeartbeatFields {
            server_name: "H1".into(),
            ip_address: None,
            agent_version: None,
            agent_type: None,
            metadata: None,
        })
        .await;
        assert_eq!(store.get_server("H1").await.unwrap().status, ServerStatus::Online);

        clock.advance(chrono::Duration::seconds(61 * 3 + 1));
        let sweeper = HeartbeatSweeper::new(store.clone(), Arc::new(FanOut::default()));
        sweeper.sweep_once().await;

        assert_eq!(store.get_server("H1").await.unwrap().status, ServerStatus::Offline);
    }
}
