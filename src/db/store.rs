//! Database-backed implementations of the engine's client traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::{
    AttributeSnapshot, SecretClient, TokenClient, TokenRecord, TokenSecret, User,
    UserAttributeLister, UserLister,
};
use crate::db::connection::Db;
use crate::db::queries::QueryBuilder;
use crate::types::{TokenId, UserId};

/// One handle implementing every read and patch the engine needs.
#[derive(Clone)]
pub struct SurrealStore {
    db: Db,
}

impl SurrealStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }
}

#[async_trait]
impl TokenClient for SurrealStore {
    async fn get_token(&self, id: &TokenId) -> anyhow::Result<Option<TokenRecord>> {
        QueryBuilder::get_token(&self.db, id).await
    }

    async fn patch_last_used(&self, id: &TokenId, at: DateTime<Utc>) -> anyhow::Result<()> {
        QueryBuilder::patch_token_last_used(&self.db, id, at).await
    }
}

#[async_trait]
impl SecretClient for SurrealStore {
    async fn get_secret(&self, name: &str) -> anyhow::Result<Option<TokenSecret>> {
        QueryBuilder::get_secret(&self.db, name).await
    }

    async fn patch_field(&self, name: &str, field: &str, value: &str) -> anyhow::Result<()> {
        QueryBuilder::patch_secret_field(&self.db, name, field, value).await
    }
}

#[async_trait]
impl UserLister for SurrealStore {
    async fn get_user(&self, id: &UserId) -> anyhow::Result<Option<User>> {
        QueryBuilder::get_user(&self.db, id).await
    }
}

#[async_trait]
impl UserAttributeLister for SurrealStore {
    async fn get_attributes(&self, id: &UserId) -> anyhow::Result<Option<AttributeSnapshot>> {
        QueryBuilder::get_user_attribute(&self.db, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hashers;
    use crate::auth::{TokenKind, TokenPrincipal};
    use crate::db::connection::setup_test_db;

    #[tokio::test]
    async fn test_store_round_trip() {
        let db = setup_test_db().await;
        let store = SurrealStore::new(db.clone());

        let token = TokenRecord {
            name: TokenId::new("token-v2rcx"),
            user_id: UserId::new("u-abcdef"),
            hash: hashers::hash_secret("s3cret"),
            auth_provider: None,
            user_principal: TokenPrincipal::default(),
            cluster_name: None,
            ttl_millis: 0,
            enabled: None,
            kind: TokenKind::Legacy,
            created_at: Utc::now(),
            last_used_at: None,
        };
        QueryBuilder::create_token(&db, &token).await.unwrap();

        let fetched = store.get_token(&TokenId::new("token-v2rcx")).await.unwrap();
        assert!(fetched.is_some());

        let missing_user = store.get_user(&UserId::new("u-nope")).await.unwrap();
        assert!(missing_user.is_none());

        let no_snapshot = store
            .get_attributes(&UserId::new("u-abcdef"))
            .await
            .unwrap();
        assert!(no_snapshot.is_none());
    }
}
