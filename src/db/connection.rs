use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;

pub type Db = Surreal<Any>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("SURREALDB_URL").unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("SURREALDB_NAMESPACE").unwrap_or_else(|_| "fleetgate".to_string()),
            database: env::var("SURREALDB_DATABASE").unwrap_or_else(|_| "auth".to_string()),
            username: env::var("SURREALDB_USERNAME").ok(),
            password: env::var("SURREALDB_PASSWORD").ok(),
        }
    }
}

pub async fn create_connection(config: DatabaseConfig) -> Result<Db> {
    let db = surrealdb::engine::any::connect(config.url).await?;

    // Sign in if credentials are provided
    if let (Some(username), Some(password)) = (config.username, config.password) {
        db.signin(Root {
            username: &username,
            password: &password,
        })
        .await?;
    }

    db.use_ns(config.namespace).use_db(config.database).await?;

    Ok(db)
}

pub async fn ensure_schema(db: &Db) -> Result<()> {
    // Records are addressed by their `name` field, never by record id, so
    // every table gets a unique index on it. The tables stay schemaless;
    // the Rust structs are the source of truth for their shape.
    let schema_queries = vec![
        "DEFINE TABLE IF NOT EXISTS token SCHEMALESS;
         DEFINE INDEX IF NOT EXISTS token_name ON TABLE token COLUMNS name UNIQUE;",
        "DEFINE TABLE IF NOT EXISTS token_secret SCHEMALESS;
         DEFINE INDEX IF NOT EXISTS token_secret_name ON TABLE token_secret COLUMNS name UNIQUE;",
        "DEFINE TABLE IF NOT EXISTS user SCHEMALESS;
         DEFINE INDEX IF NOT EXISTS user_name ON TABLE user COLUMNS name UNIQUE;",
        "DEFINE TABLE IF NOT EXISTS user_attribute SCHEMALESS;
         DEFINE INDEX IF NOT EXISTS user_attribute_name ON TABLE user_attribute COLUMNS name UNIQUE;",
    ];

    for query in schema_queries {
        db.query(query).await?;
    }

    Ok(())
}

#[cfg(test)]
pub async fn setup_test_db() -> Db {
    let config = DatabaseConfig {
        url: "memory".to_string(),
        namespace: "fleetgate".to_string(),
        database: "test".to_string(),
        username: None,
        password: None,
    };
    let db = create_connection(config).await.unwrap();
    ensure_schema(&db).await.unwrap();
    db
}
