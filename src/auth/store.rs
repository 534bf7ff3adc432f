//! Token retrieval for the two storage kinds.
//!
//! Legacy tokens live as full records in the primary store, fronted by an
//! eventually consistent in-memory index. Extension tokens keep their
//! sensitive fields encoded into a companion secret record fetched by a
//! name derived from the token ID.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::RwLock;
use tracing::warn;

use crate::auth::credential::TokenKind;
use crate::auth::error::MustAuthenticate;
use crate::auth::model::{TokenPrincipal, TokenRecord};
use crate::types::TokenId;

/// Field names inside an extension token's companion secret.
pub mod secret_fields {
    pub const ENABLED: &str = "enabled";
    pub const HASH: &str = "hash";
    pub const KIND: &str = "kind";
    pub const LAST_UPDATE_TIME: &str = "last-update-time";
    pub const PRINCIPAL: &str = "principal";
    pub const TTL: &str = "ttl";
    pub const USER_ID: &str = "user-id";
    pub const LAST_USED_AT: &str = "last-used-at";
}

/// Companion secret record holding an extension token's sensitive fields.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TokenSecret {
    pub name: String,
    pub fields: HashMap<String, String>,
}

impl TokenSecret {
    fn field(&self, name: &str) -> Result<&str, MustAuthenticate> {
        match self.fields.get(name) {
            Some(value) => Ok(value),
            None => {
                warn!(field = name, secret = %self.name, "token secret is missing a field");
                Err(MustAuthenticate)
            }
        }
    }
}

/// Point reads and patches against the authoritative token store.
#[async_trait]
pub trait TokenClient: Send + Sync {
    /// Fetch a token record; `Ok(None)` means not found.
    async fn get_token(&self, id: &TokenId) -> anyhow::Result<Option<TokenRecord>>;

    /// Patch only the `last_used_at` field of a token record.
    async fn patch_last_used(&self, id: &TokenId, at: DateTime<Utc>) -> anyhow::Result<()>;
}

/// Reads and field patches against the companion secret store.
#[async_trait]
pub trait SecretClient: Send + Sync {
    /// Fetch a secret by name; `Ok(None)` means not found.
    async fn get_secret(&self, name: &str) -> anyhow::Result<Option<TokenSecret>>;

    /// Patch a single field of a secret.
    async fn patch_field(&self, name: &str, field: &str, value: &str) -> anyhow::Result<()>;
}

/// Eventually consistent in-memory index of legacy token records.
///
/// Maintained externally (by whatever watches the authoritative store); the
/// legacy store only reads it. A miss here is not an error, just a fallback
/// to a point read.
#[derive(Clone, Default)]
pub struct TokenIndex {
    inner: Arc<RwLock<HashMap<TokenId, TokenRecord>>>,
}

impl TokenIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &TokenId) -> Option<TokenRecord> {
        self.inner.read().get(id).cloned()
    }

    pub fn insert(&self, token: TokenRecord) {
        self.inner.write().insert(token.name.clone(), token);
    }

    pub fn remove(&self, id: &TokenId) {
        self.inner.write().remove(id);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// Kind-specific token retrieval and usage write-back.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Resolve a token ID to its normalized record.
    ///
    /// Not-found and any retrieval or decode error all collapse to
    /// [`MustAuthenticate`]; causes are logged where they occur.
    async fn resolve(&self, id: &TokenId) -> Result<TokenRecord, MustAuthenticate>;

    /// Persist a new `last_used_at` through the kind-appropriate path.
    async fn record_last_used(&self, id: &TokenId, at: DateTime<Utc>) -> anyhow::Result<()>;
}

/// Store for legacy tokens: index first, authoritative point read on miss.
pub struct LegacyTokenStore {
    index: TokenIndex,
    client: Arc<dyn TokenClient>,
}

impl LegacyTokenStore {
    pub fn new(index: TokenIndex, client: Arc<dyn TokenClient>) -> Self {
        Self { index, client }
    }
}

#[async_trait]
impl TokenStore for LegacyTokenStore {
    async fn resolve(&self, id: &TokenId) -> Result<TokenRecord, MustAuthenticate> {
        if let Some(token) = self.index.get(id) {
            return Ok(token);
        }
        match self.client.get_token(id).await {
            Ok(Some(token)) => Ok(token),
            Ok(None) => {
                warn!(token = %id, "token not found");
                Err(MustAuthenticate)
            }
            Err(error) => {
                warn!(token = %id, %error, "token retrieval failed");
                Err(MustAuthenticate)
            }
        }
    }

    async fn record_last_used(&self, id: &TokenId, at: DateTime<Utc>) -> anyhow::Result<()> {
        self.client.patch_last_used(id, at).await
    }
}

/// Name of the companion secret for an extension token.
pub fn secret_name(id: &TokenId) -> String {
    format!("{id}-secret")
}

/// Store for extension tokens: decode the companion secret into a record.
pub struct ExtensionTokenStore {
    secrets: Arc<dyn SecretClient>,
}

impl ExtensionTokenStore {
    pub fn new(secrets: Arc<dyn SecretClient>) -> Self {
        Self { secrets }
    }

    fn decode(&self, id: &TokenId, secret: &TokenSecret) -> Result<TokenRecord, MustAuthenticate> {
        let enabled = parse_field(secret, secret_fields::ENABLED, str::parse::<bool>)?;
        let hash = secret.field(secret_fields::HASH)?.to_string();
        // The kind tag is stored for forward compatibility; any value other
        // than the extension tag is a corrupt secret.
        let kind = secret.field(secret_fields::KIND)?;
        if kind != "extension" {
            warn!(token = %id, kind, "token secret carries an unexpected kind");
            return Err(MustAuthenticate);
        }
        let created_at = parse_field(secret, secret_fields::LAST_UPDATE_TIME, parse_rfc3339)?;
        let user_principal: TokenPrincipal =
            parse_field(secret, secret_fields::PRINCIPAL, |raw| {
                serde_json::from_str(raw)
            })?;
        let ttl_millis = parse_field(secret, secret_fields::TTL, str::parse::<i64>)?;
        let user_id = secret.field(secret_fields::USER_ID)?.to_string();

        let last_used_at = match secret.fields.get(secret_fields::LAST_USED_AT) {
            Some(raw) => Some(parse_rfc3339(raw).map_err(|error| {
                warn!(token = %id, %error, "token secret has an unparseable last-used-at");
                MustAuthenticate
            })?),
            None => None,
        };

        let auth_provider = if user_principal.provider.is_empty() {
            None
        } else {
            Some(user_principal.provider.clone())
        };

        Ok(TokenRecord {
            name: id.clone(),
            user_id: user_id.into(),
            hash,
            auth_provider,
            user_principal,
            cluster_name: None,
            ttl_millis,
            enabled: Some(enabled),
            kind: TokenKind::Extension,
            created_at,
            last_used_at,
        })
    }
}

fn parse_rfc3339(raw: &str) -> chrono::ParseResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).map(|t| t.with_timezone(&Utc))
}

fn parse_field<T, E: std::fmt::Display>(
    secret: &TokenSecret,
    name: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, MustAuthenticate> {
    let raw = secret.field(name)?;
    parse(raw).map_err(|error| {
        warn!(field = name, secret = %secret.name, %error, "token secret field failed to parse");
        MustAuthenticate
    })
}

#[async_trait]
impl TokenStore for ExtensionTokenStore {
    async fn resolve(&self, id: &TokenId) -> Result<TokenRecord, MustAuthenticate> {
        let name = secret_name(id);
        match self.secrets.get_secret(&name).await {
            Ok(Some(secret)) => self.decode(id, &secret),
            Ok(None) => {
                warn!(token = %id, "token secret not found");
                Err(MustAuthenticate)
            }
            Err(error) => {
                warn!(token = %id, %error, "token secret retrieval failed");
                Err(MustAuthenticate)
            }
        }
    }

    async fn record_last_used(&self, id: &TokenId, at: DateTime<Utc>) -> anyhow::Result<()> {
        let value = at.to_rfc3339_opts(SecondsFormat::Secs, true);
        self.secrets
            .patch_field(&secret_name(id), secret_fields::LAST_USED_AT, &value)
            .await
    }
}
