// Core modules
pub mod api;
pub mod auth;
pub mod db;
pub mod types;

// Re-export key types and functions
pub use auth::{
    AuthResult, MustAuthenticate, ProviderRegistry, RefreshQueue, TokenAuthenticator, UserRefresher,
};
pub use db::{DatabaseConfig, QueryBuilder, SurrealStore, create_connection, ensure_schema};
pub use types::{ClusterId, TokenId, UserId};

use anyhow::Result;
use auth::{ExtensionTokenStore, LegacyTokenStore, TokenIndex};
use std::sync::Arc;
use tracing::info;

/// Build a database-backed authenticator.
///
/// Warms the in-memory token index from the token table, then wires both
/// stores, the identity lookups and the refresh dispatch around a shared
/// [`SurrealStore`] handle.
pub async fn create_authenticator(
    db: db::Db,
    providers: ProviderRegistry,
    refresher: Arc<dyn UserRefresher>,
) -> Result<TokenAuthenticator> {
    let store = Arc::new(SurrealStore::new(db.clone()));

    let index = TokenIndex::new();
    for token in QueryBuilder::list_tokens(&db).await? {
        index.insert(token);
    }
    info!(tokens = index.len(), "token index warmed");

    let legacy = Arc::new(LegacyTokenStore::new(index, store.clone()));
    let extension = Arc::new(ExtensionTokenStore::new(store.clone()));

    Ok(TokenAuthenticator::new(
        legacy,
        extension,
        store.clone(),
        store,
        providers,
        refresher,
    ))
}
