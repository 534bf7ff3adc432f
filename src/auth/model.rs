//! Domain objects shared across the engine.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::credential::TokenKind;
use crate::types::{ClusterId, TokenId, UserId};

/// Principal the token was issued for, as recorded at issuance time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPrincipal {
    /// Principal ID, e.g. `github_user://12345` or `local://u-abcdef`.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub login_name: String,
    #[serde(default)]
    pub display_name: String,
}

/// Normalized token record shared by the legacy and extension kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Token ID; the public half of the bearer credential.
    pub name: TokenId,
    pub user_id: UserId,
    /// Salted hash of the secret half. Never the secret itself.
    pub hash: String,
    /// Provider that vouched for the principal, if any.
    #[serde(default)]
    pub auth_provider: Option<String>,
    #[serde(default)]
    pub user_principal: TokenPrincipal,
    /// Cluster the token is scoped to; `None` means any.
    #[serde(default)]
    pub cluster_name: Option<ClusterId>,
    /// Lifetime in milliseconds from `created_at`; 0 means no expiry.
    #[serde(default)]
    pub ttl_millis: i64,
    /// `None` counts as enabled.
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub kind: TokenKind,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl TokenRecord {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// Whether the token has outlived its TTL at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if self.ttl_millis <= 0 {
            return false;
        }
        now.signed_duration_since(self.created_at).num_milliseconds() > self.ttl_millis
    }
}

/// A user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub name: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    /// `None` counts as enabled.
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub principal_ids: Vec<String>,
}

impl User {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// A group principal as recorded in a user's attribute snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPrincipal {
    pub name: String,
    #[serde(default)]
    pub login_name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub member_of: bool,
}

/// Cached per-provider attributes for a user, refreshed out of band.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeSnapshot {
    pub name: UserId,
    /// Group principals per provider.
    #[serde(default)]
    pub group_principals: HashMap<String, Vec<GroupPrincipal>>,
    /// Extra attributes per provider.
    #[serde(default)]
    pub extras_by_provider: HashMap<String, HashMap<String, Vec<String>>>,
    #[serde(default)]
    pub last_refresh: Option<DateTime<Utc>>,
}

impl AttributeSnapshot {
    /// Empty snapshot used when none is cached yet.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            name: user_id,
            ..Self::default()
        }
    }
}

/// The verified identity produced by a successful authentication.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResult {
    pub is_authed: bool,
    pub user: UserId,
    pub user_principal: TokenPrincipal,
    pub groups: Vec<String>,
    pub extras: HashMap<String, Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(ttl_millis: i64, created_at: DateTime<Utc>) -> TokenRecord {
        TokenRecord {
            name: TokenId::new("token-v2rcx"),
            user_id: UserId::new("u-abcdef"),
            hash: String::new(),
            auth_provider: None,
            user_principal: TokenPrincipal::default(),
            cluster_name: None,
            ttl_millis,
            enabled: None,
            kind: TokenKind::Legacy,
            created_at,
            last_used_at: None,
        }
    }

    #[test]
    fn test_enabled_defaults_to_true() {
        let mut token = record(0, Utc::now());
        assert!(token.is_enabled());
        token.enabled = Some(false);
        assert!(!token.is_enabled());
        token.enabled = Some(true);
        assert!(token.is_enabled());
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let token = record(0, Utc::now() - Duration::days(3650));
        assert!(!token.is_expired(Utc::now()));
    }

    #[test]
    fn test_expiry_boundary() {
        let created = Utc::now();
        let token = record(57_600_000, created);
        assert!(!token.is_expired(created + Duration::milliseconds(57_600_000)));
        assert!(token.is_expired(created + Duration::milliseconds(57_600_001)));
    }

    #[test]
    fn test_user_enabled_defaults_to_true() {
        let user = User {
            name: UserId::new("u-abcdef"),
            username: "admin".into(),
            display_name: String::new(),
            enabled: None,
            principal_ids: vec![],
        };
        assert!(user.is_enabled());
    }

    #[test]
    fn test_token_record_deserializes_with_defaults() {
        let json = serde_json::json!({
            "name": "token-v2rcx",
            "user_id": "u-abcdef",
            "hash": "$2:a:b",
            "created_at": "2026-08-27T00:00:00Z",
        });
        let token: TokenRecord = serde_json::from_value(json).unwrap();
        assert!(token.is_enabled());
        assert_eq!(token.ttl_millis, 0);
        assert_eq!(token.kind, TokenKind::Legacy);
        assert!(token.cluster_name.is_none());
        assert!(token.last_used_at.is_none());
    }

    #[test]
    fn test_snapshot_empty() {
        let snapshot = AttributeSnapshot::empty(UserId::new("u-abcdef"));
        assert!(snapshot.group_principals.is_empty());
        assert!(snapshot.extras_by_provider.is_empty());
    }
}
