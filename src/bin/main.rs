use anyhow::Result;
use clap::{Parser, Subcommand};
use fleetgate::auth::{RefreshQueue, TokenKind, TokenPrincipal, TokenRecord, User, hashers};
use fleetgate::db::QueryBuilder;
use fleetgate::{ClusterId, DatabaseConfig, ProviderRegistry, TokenId, UserId};
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "fleetgate")]
#[command(about = "Bearer-token authentication engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(short, long, default_value = "8080")]
        port: u16,
        #[arg(long, default_value = "memory")]
        db_url: String,
        /// Capacity of the attribute refresh queue
        #[arg(long, default_value = "256")]
        refresh_queue: usize,
    },
    /// Initialize the database
    Init {
        #[arg(long, default_value = "memory")]
        db_url: String,
    },
    /// Create a user account
    CreateUser {
        /// Login name
        username: String,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long, default_value = "memory")]
        db_url: String,
    },
    /// Create a bearer token for a user
    CreateToken {
        /// ID of the user the token authenticates as
        user: String,
        /// Days until the token expires (omit for no expiration)
        #[arg(long)]
        expires_days: Option<u32>,
        /// Scope the token to a single cluster
        #[arg(long)]
        cluster: Option<String>,
        #[arg(long, default_value = "memory")]
        db_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("fleetgate=info".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            db_url,
            refresh_queue,
        } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url: {}", db_config.url);

            let db = fleetgate::create_connection(db_config).await?;
            fleetgate::ensure_schema(&db).await?;

            // The worker only marks snapshots; provider syncs hook in by
            // replacing this handler when providers are registered.
            let worker_db = db.clone();
            let refresher = RefreshQueue::spawn(refresh_queue, move |request| {
                let db = worker_db.clone();
                async move {
                    QueryBuilder::touch_user_attribute(&db, &request.user_id, chrono::Utc::now())
                        .await
                }
            });

            let authenticator =
                fleetgate::create_authenticator(db, ProviderRegistry::new(), Arc::new(refresher))
                    .await?;

            let app = fleetgate::api::create_router(Arc::new(authenticator));
            let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
            info!("Server listening on http://0.0.0.0:{}", port);
            axum::serve(listener, app).await?;
        }
        Commands::Init { db_url } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url: {}", db_config.url);

            info!("Initializing database...");
            let db = fleetgate::create_connection(db_config).await?;
            fleetgate::ensure_schema(&db).await?;
            info!("Database initialized successfully");
        }
        Commands::CreateUser {
            username,
            display_name,
            db_url,
        } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            let db = fleetgate::create_connection(db_config).await?;
            fleetgate::ensure_schema(&db).await?;

            let user_id = format!("u-{}", short_id());
            let user = User {
                name: UserId::new(&user_id),
                username: username.clone(),
                display_name: display_name.unwrap_or_else(|| username.clone()),
                enabled: None,
                principal_ids: vec![format!("local://{user_id}")],
            };
            QueryBuilder::create_user(&db, &user).await?;

            println!("User created.");
            println!();
            println!("  ID:       {}", user_id);
            println!("  Username: {}", username);
        }
        Commands::CreateToken {
            user,
            expires_days,
            cluster,
            db_url,
        } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            let db = fleetgate::create_connection(db_config).await?;
            fleetgate::ensure_schema(&db).await?;

            let user_id = UserId::new(&user);
            let Some(account) = QueryBuilder::get_user(&db, &user_id).await? else {
                anyhow::bail!("no user with ID '{user}'");
            };

            let token_id = format!("token-{}", short_id());
            let secret = Uuid::new_v4().simple().to_string();
            let ttl_millis = expires_days
                .map(|days| i64::from(days) * 24 * 60 * 60 * 1000)
                .unwrap_or(0);

            let token = TokenRecord {
                name: TokenId::new(&token_id),
                user_id: user_id.clone(),
                hash: hashers::hash_secret(&secret),
                auth_provider: None,
                user_principal: TokenPrincipal {
                    name: format!("local://{user}"),
                    provider: "local".into(),
                    login_name: account.username.clone(),
                    display_name: account.display_name.clone(),
                },
                cluster_name: cluster.map(ClusterId::new),
                ttl_millis,
                enabled: None,
                kind: TokenKind::Legacy,
                created_at: chrono::Utc::now(),
                last_used_at: None,
            };
            QueryBuilder::create_token(&db, &token).await?;

            println!("Token created.");
            println!();
            println!("  ID:      {}", token_id);
            if let Some(days) = expires_days {
                println!("  Expires: in {} days", days);
            } else {
                println!("  Expires: Never");
            }
            println!();
            println!("IMPORTANT: Save this credential now. It cannot be retrieved later.");
            println!("Use with: -H 'Authorization: Bearer {}:{}'", token_id, secret);
        }
    }

    Ok(())
}

/// Short random identifier suffix for user and token names.
fn short_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}
