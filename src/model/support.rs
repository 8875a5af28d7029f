use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// : dashboard recompute cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardCacheEntry {
    pub key: String,
    pub payload: Json,
    pub computed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// : append-only audit trail for capability-gated mutations,
/// referenced (but not otherwise defined) by 's "AuditLog older than
/// 180 days" retention rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: u64,
    pub at: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub detail: Option<Json>,
}

/// : minimal stand-in for the identity provider's session store,
/// giving 's "expired refresh tokens" retention rule something real
/// to act on without building out session management (out of scope).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub token_hash: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}
