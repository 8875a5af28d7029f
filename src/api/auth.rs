//! Identity and capability mapping
//!
//! Password hashing and token minting live upstream of this service; this
//! module covers only what the service itself needs: verifying a bearer
//! access token or an API key presented on a request and mapping the result
//! onto the role→capability table. Tokens are a compact HMAC-signed
//! `payload.signature` pair.

use std::collections::HashMap;
use std::sync::RwLock;

use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::ApiError;
use super::AppState;

type HmacSha256 = Hmac<Sha256>;

/// "Role→capability": Viewer/Operator/Administrator/Service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Role {
    Viewer,
    Operator,
    Administrator,
    Service,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ReadOnly,
    AcknowledgeAlert,
    ResolveAlert,
    StartExecution,
    CancelExecution,
    IngestLog,
    Heartbeat,
    RegisterJob,
    RunRetention,
    Admin,
}

impl Role {
    pub fn allows(self, capability: Capability) -> bool {
        match self {
            Role::Administrator => true,
            Role::Operator => matches!(
                capability,
                Capability::ReadOnly
                | Capability::AcknowledgeAlert
                | Capability::ResolveAlert
                | Capability::StartExecution
                | Capability::CancelExecution
            ),
            Role::Viewer => matches!(capability, Capability::ReadOnly),
            Role::Service => matches!(
                capability,
                Capability::IngestLog
                | Capability::Heartbeat
                | Capability::RegisterJob
                | Capability::StartExecution
                | Capability::CancelExecution
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    pub security_stamp: String,
    pub expires_at: DateTime<Utc>,
}

/// The authenticated principal for one request, passed explicitly into
/// services rather than read off ambient thread-local state.
#[derive(Debug, Clone)]
pub enum AuthContext {
    User {
        user_id: String,
        username: String,
        role: Role,
    },
    Agent {
        key_name: String,
        scopes: Vec<String>,
    },
}

impl AuthContext {
    pub fn actor_label(&self) -> String {
        match self {
            Self::User { username,.. } => username.clone(),
            Self::Agent { key_name,.. } => format!("agent:{key_name}"),
        }
    }

    pub fn require(&self, capability: Capability) -> Result<(), ApiError> {
        let allowed = match self {
            Self::User { role,.. } => role.allows(capability),
            Self::Agent { scopes,.. } => match capability {
                Capability::IngestLog => scopes.iter().any(|s| s == "logs:write"),
                Capability::Heartbeat => scopes.iter().any(|s| s == "heartbeat:write"),
                Capability::RegisterJob | Capability::StartExecution | Capability::CancelExecution => {
                    scopes.iter().any(|s| s == "jobs:write")
                }
                _ => false,
            },
        };
        if allowed {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!("{capability:?} requires a different role/scope")))
        }
    }
}

#[derive(Debug, Clone)]
struct ApiKeyRecord {
    name: String,
    scopes: Vec<String>,
}

/// Owns token signing/verification and the API-key table. A single
/// instance owned by the composition root; no runtime service location.
pub struct AuthManager {
    hmac_secret: Vec<u8>,
    api_keys: RwLock<HashMap<String, ApiKeyRecord>>,
}

impl AuthManager {
    pub fn new(hmac_secret: Vec<u8>) -> Self {
        Self {
            hmac_secret,
            api_keys: RwLock::new(HashMap::new()),
        }
    }

    pub fn hash_key(raw_key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(raw_key.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Registers an agent API key under `name` with the given scopes (e.g.
    /// `logs:write`). Stores only the SHA-256 hash (: "matched by
    /// SHA-256 hash").
    pub fn register_api_key(&self, raw_key: &str, name: &str, scopes: Vec<String>) {
        let hash = Self::hash_key(raw_key);
        self.api_keys.write().expect("api key lock poisoned").insert(
            hash,
            ApiKeyRecord {
                name: name.to_string(),
                scopes,
            },
        );
    }

    fn verify_api_key(&self, raw_key: &str) -> Option<AuthContext> {
        let hash = Self::hash_key(raw_key);
        let keys = self.api_keys.read().expect("api key lock poisoned");
        keys.get(&hash).map(|record| AuthContext::Agent {
                key_name: record.name.clone(),
                scopes: record.scopes.clone(),
        })
    }

    /// Mints a compact `base64(payload).base64(hmac)` bearer token. Issuance
    /// belongs to the identity provider in production; this exists so tests
    /// and local tooling can drive the same verification path end to end.
    pub fn issue_token(&self, claims: &TokenClaims) -> String {
        let payload = serde_json::to_vec(claims).expect("claims serialize");
        let payload_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&payload);
        let signature = self.sign(payload_b64.as_bytes());
        format!("{payload_b64}.{signature}")
    }

    fn sign(&self, data: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.hmac_secret).expect("hmac accepts any key length");
        mac.update(data);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    fn verify_token(&self, token: &str, now: DateTime<Utc>) -> Option<AuthContext> {
        let (payload_b64, signature) = token.split_once('.')?;
        let expected = self.sign(payload_b64.as_bytes());
        if expected != signature {
            return None;
        }
        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
        let claims: TokenClaims = serde_json::from_slice(&payload).ok()?;
        if claims.expires_at < now {
            return None;
        }
        Some(AuthContext::User {
            user_id: claims.user_id,
            username: claims.username,
            role: claims.role,
        })
    }

    pub fn authenticate(
        &self,
        bearer: Option<&str>,
        api_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<AuthContext> {
        if let Some(key) = api_key {
            return self.verify_api_key(key);
        }
        bearer.and_then(|token| self.verify_token(token, now))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let bearer = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
        let api_key = parts
        .headers
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok());

        let State(state) = State::<AppState>::from_request_parts(parts, state)
        .await
        .map_err(|_: std::convert::Infallible| ApiError::Internal("state extraction failed".into()))?;

        state
        .auth
        .authenticate(bearer, api_key, state.store.now())
        .ok_or_else(|| ApiError::Unauthorized("missing or invalid credentials".into()))
    }
}

/// Minimal hex encoding so the crate doesn't need an extra dependency just
/// for `Sha256` digest formatting.
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_through_sign_and_verify() {
        let manager = AuthManager::new(b"test-secret".to_vec());
        let now = Utc::now();
        let claims = TokenClaims {
            user_id: "u1".into(),
            username: "alice".into(),
            role: Role::Operator,
            security_stamp: "stamp".into(),
            expires_at: now + chrono::Duration::minutes(15),
        };
        let token = manager.issue_token(&claims);
        let ctx = manager.authenticate(Some(&token), None, now).expect("valid token");
        match ctx {
            AuthContext::User { username, role,.. } => {
                assert_eq!(username, "alice");
                assert_eq!(role, Role::Operator);
            }
            _ => panic!("expected a user context"),
        }
    }

    #[test]
    fn expired_token_is_rejected() {
        let manager = AuthManager::new(b"test-secret".to_vec());
        let now = Utc::now();
        let claims = TokenClaims {
            user_id: "u1".into(),
            username: "alice".into(),
            role: Role::Viewer,
            security_stamp: "stamp".into(),
            expires_at: now - chrono::Duration::minutes(1),
        };
        let token = manager.issue_token(&claims);
        assert!(manager.authenticate(Some(&token), None, now).is_none());
    }

    #[test]
    fn api_key_maps_to_scoped_agent_context() {
        let manager = AuthManager::new(b"test-secret".to_vec());
        manager.register_api_key("raw-key", "agent-1", vec!["logs:write".into()]);
        let ctx = manager.authenticate(None, Some("raw-key"), Utc::now()).expect("known key");
        match ctx {
            AuthContext::Agent { key_name, scopes } => {
                assert_eq!(key_name, "agent-1");
                assert!(scopes.iter().any(|s| s == "logs:write"));
            }
            _ => panic!("expected an agent context"),
        }
    }

    #[test]
    fn operator_role_cannot_run_retention() {
        let ctx = AuthContext::User {
            user_id: "u1".into(),
            username: "op".into(),
            role: Role::Operator,
        };
        assert!(ctx.require(Capability::RunRetention).is_err());
        assert!(ctx.require(Capability::AcknowledgeAlert).is_ok());
    }
}
