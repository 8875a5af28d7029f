use serde::Deserialize;
use serde_json::Value as Json;

use super::Store;
use crate::model::{Server, ServerStatus};

#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatFields {
    pub server_name: String,
    pub ip_address: Option<String>,
    pub agent_version: Option<String>,
    pub agent_type: Option<String>,
    pub metadata: Option<Json>,
}

impl Store {
    /// : upsert, null-coalescing unset fields into their
    /// existing values.
    pub async fn process_heartbeat(&self, fields: HeartbeatFields) -> Server {
        let now = self.now();
        let mut data = self.data.write().await;
        let server = data
        .servers
        .entry(fields.server_name.clone())
        .or_insert_with(|| Server::stub(&fields.server_name, now));

        server.last_heartbeat = Some(now);
        server.status = ServerStatus::Online;
        if let Some(v) = fields.ip_address {
            server.ip_address = Some(v);
        }
        if let Some(v) = fields.agent_version {
            server.agent_version = Some(v);
        }
        if let Some(v) = fields.agent_type {
            server.agent_type = Some(v);
        }
        if let Some(v) = fields.metadata {
            server.metadata = Some(v);
        }
        server.updated_at = now;
        server.clone()
    }

    pub async fn get_server(&self, server_name: &str) -> Option<Server> {
        self.data.read().await.servers.get(server_name).cloned()
    }

    pub async fn list_servers(&self, active_only: bool) -> Vec<Server> {
        self.data
        .read()
        .await
        .servers
        .values()
        .filter(|s| !active_only || s.is_active)
        .cloned()
        .collect()
    }

    /// status sweep. Returns `(serverName, old, new)` for every
    /// server whose classification changed, so the caller can emit
    /// `ServerStatusChange` events without re-reading the store.
    pub async fn sweep_server_statuses(&self) -> Vec<(String, ServerStatus, ServerStatus)> {
        let now = self.now();
        let mut data = self.data.write().await;
        let mut changes = Vec::new();
        for server in data.servers.values_mut().filter(|s| s.is_active) {
            let new_status = server.classify(now);
            if new_status != server.status {
                changes.push((server.server_name.clone(), server.status, new_status));
                server.status = new_status;
            }
        }
        changes
    }
}
