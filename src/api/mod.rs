// HTTP surface for the authentication engine.

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::TokenAuthenticator;

pub type AppState = Arc<TokenAuthenticator>;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/v1/whoami", get(whoami))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Authenticated echo of the resolved identity.
///
/// Any authentication failure is a plain 401 with no detail, mirroring the
/// engine's uniform rejection.
async fn whoami(State(state): State<AppState>, request: Request) -> Result<Json<Value>, StatusCode> {
    // `authenticate` only reads headers and the URI; dropping the `!Sync`
    // body keeps the handler future `Send`.
    let (parts, _) = request.into_parts();
    let request = http::Request::from_parts(parts, ());
    let result = state
        .authenticate(&request)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    Ok(Json(serde_json::json!({
        "user": result.user,
        "principal": result.user_principal,
        "groups": result.groups,
        "extras": result.extras,
    })))
}
