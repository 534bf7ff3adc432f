// Query helpers for the auth tables.
//
// All records are addressed by their `name` field. Timestamps are stored as
// RFC 3339 strings, matching how the record structs serialize, so reads and
// field patches agree on the representation.

use anyhow::{Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::auth::{AttributeSnapshot, TokenRecord, TokenSecret, User};
use crate::db::connection::Db;
use crate::types::{TokenId, UserId};

pub struct QueryBuilder;

impl QueryBuilder {
    pub async fn create_token(db: &Db, token: &TokenRecord) -> Result<TokenRecord> {
        let mut res = db
            .query("CREATE token CONTENT $data")
            .bind(("data", token.clone()))
            .await?;
        let created: Option<TokenRecord> = res.take(0)?;
        created.ok_or_else(|| anyhow!("failed to create token record"))
    }

    pub async fn get_token(db: &Db, id: &TokenId) -> Result<Option<TokenRecord>> {
        let mut res = db
            .query("SELECT * FROM token WHERE name = $name LIMIT 1")
            .bind(("name", id.clone()))
            .await?;
        let token: Option<TokenRecord> = res.take(0)?;
        Ok(token)
    }

    /// All token records, for warming the in-memory index at startup.
    pub async fn list_tokens(db: &Db) -> Result<Vec<TokenRecord>> {
        let mut res = db.query("SELECT * FROM token").await?;
        let tokens: Vec<TokenRecord> = res.take(0)?;
        Ok(tokens)
    }

    pub async fn patch_token_last_used(db: &Db, id: &TokenId, at: DateTime<Utc>) -> Result<()> {
        db.query("UPDATE token SET last_used_at = $at WHERE name = $name")
            .bind(("at", at.to_rfc3339_opts(SecondsFormat::Secs, true)))
            .bind(("name", id.clone()))
            .await?;
        Ok(())
    }

    pub async fn create_secret(db: &Db, secret: &TokenSecret) -> Result<TokenSecret> {
        let mut res = db
            .query("CREATE token_secret CONTENT $data")
            .bind(("data", secret.clone()))
            .await?;
        let created: Option<TokenSecret> = res.take(0)?;
        created.ok_or_else(|| anyhow!("failed to create token secret"))
    }

    pub async fn get_secret(db: &Db, name: &str) -> Result<Option<TokenSecret>> {
        let mut res = db
            .query("SELECT * FROM token_secret WHERE name = $name LIMIT 1")
            .bind(("name", name.to_string()))
            .await?;
        let secret: Option<TokenSecret> = res.take(0)?;
        Ok(secret)
    }

    /// Patch a single entry of a secret's field map.
    ///
    /// Field names come from the fixed `secret_fields` set, never from
    /// request input, so interpolating them into the query is safe.
    pub async fn patch_secret_field(db: &Db, name: &str, field: &str, value: &str) -> Result<()> {
        let query = format!("UPDATE token_secret SET fields.`{field}` = $value WHERE name = $name");
        db.query(query)
            .bind(("value", value.to_string()))
            .bind(("name", name.to_string()))
            .await?;
        Ok(())
    }

    pub async fn create_user(db: &Db, user: &User) -> Result<User> {
        let mut res = db
            .query("CREATE user CONTENT $data")
            .bind(("data", user.clone()))
            .await?;
        let created: Option<User> = res.take(0)?;
        created.ok_or_else(|| anyhow!("failed to create user record"))
    }

    pub async fn get_user(db: &Db, id: &UserId) -> Result<Option<User>> {
        let mut res = db
            .query("SELECT * FROM user WHERE name = $name LIMIT 1")
            .bind(("name", id.clone()))
            .await?;
        let user: Option<User> = res.take(0)?;
        Ok(user)
    }

    pub async fn get_user_attribute(db: &Db, id: &UserId) -> Result<Option<AttributeSnapshot>> {
        let mut res = db
            .query("SELECT * FROM user_attribute WHERE name = $name LIMIT 1")
            .bind(("name", id.clone()))
            .await?;
        let snapshot: Option<AttributeSnapshot> = res.take(0)?;
        Ok(snapshot)
    }

    pub async fn upsert_user_attribute(db: &Db, snapshot: &AttributeSnapshot) -> Result<()> {
        db.query(
            "DELETE user_attribute WHERE name = $name;
             CREATE user_attribute CONTENT $data",
        )
        .bind(("name", snapshot.name.clone()))
        .bind(("data", snapshot.clone()))
        .await?;
        Ok(())
    }

    /// Mark a snapshot as refreshed at `at`. A missing snapshot is a no-op;
    /// the next provider sync will create it.
    pub async fn touch_user_attribute(db: &Db, id: &UserId, at: DateTime<Utc>) -> Result<()> {
        db.query("UPDATE user_attribute SET last_refresh = $at WHERE name = $name")
            .bind(("at", at.to_rfc3339_opts(SecondsFormat::Secs, true)))
            .bind(("name", id.clone()))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hashers;
    use crate::auth::{TokenKind, TokenPrincipal, secret_name, secret_fields};
    use crate::db::connection::setup_test_db;
    use std::collections::HashMap;

    fn token(id: &str) -> TokenRecord {
        TokenRecord {
            name: TokenId::new(id),
            user_id: UserId::new("u-abcdef"),
            hash: hashers::hash_secret("s3cret"),
            auth_provider: None,
            user_principal: TokenPrincipal {
                name: "local://u-abcdef".into(),
                provider: "local".into(),
                login_name: "admin".into(),
                display_name: "Admin".into(),
            },
            cluster_name: None,
            ttl_millis: 0,
            enabled: None,
            kind: TokenKind::Legacy,
            created_at: "2026-08-27T00:00:00Z".parse().unwrap(),
            last_used_at: None,
        }
    }

    #[tokio::test]
    async fn test_token_create_and_get() {
        let db = setup_test_db().await;
        QueryBuilder::create_token(&db, &token("token-v2rcx"))
            .await
            .unwrap();

        let fetched = QueryBuilder::get_token(&db, &TokenId::new("token-v2rcx"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.name.as_str(), "token-v2rcx");
        assert_eq!(fetched.user_id.as_str(), "u-abcdef");
        assert!(fetched.last_used_at.is_none());
    }

    #[tokio::test]
    async fn test_token_get_missing() {
        let db = setup_test_db().await;
        let fetched = QueryBuilder::get_token(&db, &TokenId::new("token-nope"))
            .await
            .unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_token_patch_last_used() {
        let db = setup_test_db().await;
        QueryBuilder::create_token(&db, &token("token-v2rcx"))
            .await
            .unwrap();

        let at = "2026-08-27T10:00:05Z".parse().unwrap();
        QueryBuilder::patch_token_last_used(&db, &TokenId::new("token-v2rcx"), at)
            .await
            .unwrap();

        let fetched = QueryBuilder::get_token(&db, &TokenId::new("token-v2rcx"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.last_used_at, Some(at));
    }

    #[tokio::test]
    async fn test_list_tokens() {
        let db = setup_test_db().await;
        QueryBuilder::create_token(&db, &token("token-a1")).await.unwrap();
        QueryBuilder::create_token(&db, &token("token-b2")).await.unwrap();

        let tokens = QueryBuilder::list_tokens(&db).await.unwrap();
        assert_eq!(tokens.len(), 2);
    }

    #[tokio::test]
    async fn test_secret_patch_field() {
        let db = setup_test_db().await;
        let name = secret_name(&TokenId::new("token-ext1"));
        let secret = TokenSecret {
            name: name.clone(),
            fields: HashMap::from([(secret_fields::HASH.to_string(), "$2:a:b".to_string())]),
        };
        QueryBuilder::create_secret(&db, &secret).await.unwrap();

        QueryBuilder::patch_secret_field(
            &db,
            &name,
            secret_fields::LAST_USED_AT,
            "2026-08-27T10:00:05Z",
        )
        .await
        .unwrap();

        let fetched = QueryBuilder::get_secret(&db, &name).await.unwrap().unwrap();
        assert_eq!(
            fetched.fields.get(secret_fields::LAST_USED_AT).map(String::as_str),
            Some("2026-08-27T10:00:05Z")
        );
        assert_eq!(
            fetched.fields.get(secret_fields::HASH).map(String::as_str),
            Some("$2:a:b")
        );
    }

    #[tokio::test]
    async fn test_user_create_and_get() {
        let db = setup_test_db().await;
        let user = User {
            name: UserId::new("u-abcdef"),
            username: "admin".into(),
            display_name: "Admin".into(),
            enabled: None,
            principal_ids: vec!["local://u-abcdef".into()],
        };
        QueryBuilder::create_user(&db, &user).await.unwrap();

        let fetched = QueryBuilder::get_user(&db, &UserId::new("u-abcdef"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.username, "admin");
        assert!(fetched.is_enabled());
    }

    #[tokio::test]
    async fn test_attribute_upsert_and_touch() {
        let db = setup_test_db().await;
        let snapshot = AttributeSnapshot::empty(UserId::new("u-abcdef"));
        QueryBuilder::upsert_user_attribute(&db, &snapshot).await.unwrap();

        let at = "2026-08-27T10:00:05Z".parse().unwrap();
        QueryBuilder::touch_user_attribute(&db, &UserId::new("u-abcdef"), at)
            .await
            .unwrap();

        let fetched = QueryBuilder::get_user_attribute(&db, &UserId::new("u-abcdef"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.last_refresh, Some(at));
    }

    #[tokio::test]
    async fn test_attribute_touch_missing_is_noop() {
        let db = setup_test_db().await;
        let at = "2026-08-27T10:00:05Z".parse().unwrap();
        QueryBuilder::touch_user_attribute(&db, &UserId::new("u-nope"), at)
            .await
            .unwrap();
        assert!(
            QueryBuilder::get_user_attribute(&db, &UserId::new("u-nope"))
                .await
                .unwrap()
                .is_none()
        );
    }
}
