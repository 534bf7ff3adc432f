//! Identity resolution: user, provider, groups and extras.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::auth::error::MustAuthenticate;
use crate::auth::model::{AttributeSnapshot, TokenPrincipal, TokenRecord, User};
use crate::auth::{EXTRA_PRINCIPAL_ID, EXTRA_USERNAME, GROUP_AUTHENTICATED};
use crate::types::UserId;

/// An external authentication provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Whether the provider is administratively disabled.
    async fn is_disabled(&self) -> anyhow::Result<bool>;

    /// Live lookup of a principal's extra attributes at the provider.
    async fn get_user_extra_attributes(
        &self,
        principal: &TokenPrincipal,
    ) -> anyhow::Result<HashMap<String, Vec<String>>>;
}

/// Explicit registry of the providers known at construction time.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn AuthProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn AuthProvider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn AuthProvider>> {
        self.providers.get(name)
    }
}

/// Read access to user accounts.
#[async_trait]
pub trait UserLister: Send + Sync {
    /// Fetch a user; `Ok(None)` means not found.
    async fn get_user(&self, id: &UserId) -> anyhow::Result<Option<User>>;
}

/// Read access to cached per-user attribute snapshots.
#[async_trait]
pub trait UserAttributeLister: Send + Sync {
    /// Fetch a user's snapshot; `Ok(None)` means none cached yet.
    async fn get_attributes(&self, id: &UserId) -> anyhow::Result<Option<AttributeSnapshot>>;
}

/// The identity a token resolves to, before request-scoped extras.
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub user: User,
    pub groups: Vec<String>,
    pub extras: HashMap<String, Vec<String>>,
}

/// Resolves a verified token to its user, groups and extras.
pub struct IdentityResolver {
    users: Arc<dyn UserLister>,
    attributes: Arc<dyn UserAttributeLister>,
    providers: ProviderRegistry,
}

impl IdentityResolver {
    pub fn new(
        users: Arc<dyn UserLister>,
        attributes: Arc<dyn UserAttributeLister>,
        providers: ProviderRegistry,
    ) -> Self {
        Self {
            users,
            attributes,
            providers,
        }
    }

    pub async fn resolve(&self, token: &TokenRecord) -> Result<ResolvedIdentity, MustAuthenticate> {
        let user = match self.users.get_user(&token.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(user = %token.user_id, "token user not found");
                return Err(MustAuthenticate);
            }
            Err(error) => {
                warn!(user = %token.user_id, %error, "user lookup failed");
                return Err(MustAuthenticate);
            }
        };
        if !user.is_enabled() {
            warn!(user = %user.name, "user is disabled");
            return Err(MustAuthenticate);
        }

        if let Some(provider_name) = token.auth_provider.as_deref() {
            let Some(provider) = self.providers.get(provider_name) else {
                warn!(provider = provider_name, "token names an unknown provider");
                return Err(MustAuthenticate);
            };
            match provider.is_disabled().await {
                Ok(false) => {}
                Ok(true) => {
                    warn!(provider = provider_name, "token provider is disabled");
                    return Err(MustAuthenticate);
                }
                Err(error) => {
                    warn!(provider = provider_name, %error, "provider state check failed");
                    return Err(MustAuthenticate);
                }
            }
        }

        let snapshot = match self.attributes.get_attributes(&user.name).await {
            Ok(Some(snapshot)) => snapshot,
            // No snapshot yet is normal for a user that never logged in
            // since the refresher last ran.
            Ok(None) => AttributeSnapshot::empty(user.name.clone()),
            Err(error) => {
                warn!(user = %user.name, %error, "attribute snapshot lookup failed");
                return Err(MustAuthenticate);
            }
        };

        let groups = collect_groups(&snapshot);
        let extras = self.collect_extras(token, &user, &snapshot).await;

        Ok(ResolvedIdentity {
            user,
            groups,
            extras,
        })
    }

    /// Extras precedence: cached snapshot map, then the provider's live
    /// answer, then attributes synthesized from the user record.
    async fn collect_extras(
        &self,
        token: &TokenRecord,
        user: &User,
        snapshot: &AttributeSnapshot,
    ) -> HashMap<String, Vec<String>> {
        if let Some(provider_name) = token.auth_provider.as_deref() {
            if let Some(extras) = snapshot.extras_by_provider.get(provider_name) {
                if !extras.is_empty() {
                    return extras.clone();
                }
            }

            if let Some(provider) = self.providers.get(provider_name) {
                match provider.get_user_extra_attributes(&token.user_principal).await {
                    Ok(extras) if !extras.is_empty() => return extras,
                    Ok(_) => {}
                    Err(error) => {
                        debug!(provider = provider_name, %error, "live extras lookup failed");
                    }
                }
            }
        }

        HashMap::from([
            (EXTRA_PRINCIPAL_ID.to_string(), user.principal_ids.clone()),
            (EXTRA_USERNAME.to_string(), vec![user.username.clone()]),
        ])
    }
}

/// Union of member groups across every provider, plus the sentinel group.
fn collect_groups(snapshot: &AttributeSnapshot) -> Vec<String> {
    let mut groups: BTreeSet<String> = snapshot
        .group_principals
        .values()
        .flatten()
        .filter(|g| g.member_of)
        .map(|g| g.name.clone())
        .collect();
    groups.insert(GROUP_AUTHENTICATED.to_string());
    groups.into_iter().collect()
}
