use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Classification derived from heartbeat recency. `Unknown` covers servers
/// that have never heartbeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    Unknown,
    Online,
    Offline,
    Degraded,
}

/// "Server".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub server_name: String,
    pub display_name: Option<String>,
    pub ip_address: Option<String>,
    pub status: ServerStatus,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub heartbeat_interval_seconds: i64,
    pub agent_version: Option<String>,
    pub agent_type: Option<String>,
    pub metadata: Option<Json>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Server {
    pub fn stub(server_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            server_name: server_name.into(),
            display_name: None,
            ip_address: None,
            status: ServerStatus::Online,
            last_heartbeat: Some(now),
            heartbeat_interval_seconds: 60,
            agent_version: None,
            agent_type: None,
            metadata: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// status-sweep classification, a deterministic function of
    /// `(lastHeartbeat, heartbeatIntervalSeconds, now)` (invariant).
    pub fn classify(&self, now: DateTime<Utc>) -> ServerStatus {
        let Some(last) = self.last_heartbeat else {
            return ServerStatus::Unknown;
        };
        let delta = now - last;
        let interval = chrono::Duration::seconds(self.heartbeat_interval_seconds.max(1));
        if delta > interval * 3 {
            ServerStatus::Offline
        } else if delta > interval * 2 {
            ServerStatus::Degraded
        } else {
            ServerStatus::Online
        }
    }
}
