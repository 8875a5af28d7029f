use chrono::{DateTime, Duration, Utc};
use serde_json::Value as Json;

use super::Store;
use crate::model::{AuditLogEntry, DashboardCacheEntry, RefreshToken};

impl Store {
    /// single-flight dashboard cache. Returns `None` on a miss,
    /// including an expired entry — the caller recomputes and calls
    /// `put_cached` to repopulate it.
    pub async fn get_cached(&self, key: &str) -> Option<DashboardCacheEntry> {
        let now = self.now();
        let data = self.data.read().await;
        data.dashboard_cache
        .get(key)
        .filter(|entry| entry.expires_at > now)
        .cloned()
    }

    pub async fn put_cached(&self, key: &str, payload: Json, ttl: Duration) {
        let now = self.now();
        let mut data = self.data.write().await;
        data.dashboard_cache.insert(
            key.to_string(),
            DashboardCacheEntry {
                key: key.to_string(),
                payload,
                computed_at: now,
                expires_at: now + ttl,
            },
        );
    }

    pub async fn invalidate_cached(&self, key: &str) {
        self.data.write().await.dashboard_cache.remove(key);
    }

    /// : `AuditLog` rows older than `Retention.AuditLogDays`.
    pub async fn delete_audit_log_older_than(&self, cutoff: DateTime<Utc>) -> u64 {
        let mut data = self.data.write().await;
        let stale: Vec<u64> = data
        .audit_log
        .iter()
        .filter(|(_, entry)| entry.at < cutoff)
        .map(|(id, _)| *id)
        .collect();
        for id in &stale {
            data.audit_log.remove(id);
        }
        stale.len() as u64
    }

    pub async fn list_audit_log(&self, limit: usize) -> Vec<AuditLogEntry> {
        self.data
        .read()
        .await
        .audit_log
        .values()
        .rev()
        .take(limit)
        .cloned()
        .collect()
    }

    pub async fn insert_refresh_token(&self, token: RefreshToken) {
        self.data.write().await.refresh_tokens.push(token);
    }

    pub async fn find_refresh_token(&self, token_hash: &str) -> Option<RefreshToken> {
        self.data
        .read()
        .await
        .refresh_tokens
        .iter()
        .find(|t| t.token_hash == token_hash)
        .cloned()
    }

    pub async fn revoke_refresh_token(&self, token_hash: &str) {
        let now = self.now();
        let mut data = self.data.write().await;
        if let Some(t) = data.refresh_tokens.iter_mut().find(|t| t.token_hash == token_hash) {
            t.revoked_at = Some(now);
        }
    }

    /// : expired tokens, and tokens revoked more than 30 days ago.
    pub async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> u64 {
        let mut data = self.data.write().await;
        let revoked_cutoff = now - Duration::days(30);
        let before = data.refresh_tokens.len();
        data.refresh_tokens.retain(|t| {
                let expired = t.expires_at <= now;
                let long_revoked = t.revoked_at.map_or(false, |r| r < revoked_cutoff);
                !(expired || long_revoked)
        });
        (before - data.refresh_tokens.len()) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use std::sync::Arc;

    #[tokio::test]
    async fn cached_entry_expires() {
        let store = Store::new(Arc::new(SystemClock));
        store
        .put_cached("summary", serde_json::json!({"a": 1}), Duration::seconds(-1))
        .await;
        assert!(store.get_cached("summary").await.is_none());
    }

    #[tokio::test]
    async fn cached_entry_hits_within_ttl() {
        let store = Store::new(Arc::new(SystemClock));
        store
        .put_cached("summary", serde_json::json!({"a": 1}), Duration::minutes(5))
        .await;
        assert!(store.get_cached("summary").await.is_some());
    }
}
