//! Token verification checks.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::auth::error::MustAuthenticate;
use crate::auth::hashers;
use crate::auth::model::TokenRecord;
use crate::types::ClusterId;

/// Run the ordered verification checks for a resolved token.
///
/// Short-circuits on the first failure; every failure maps to
/// [`MustAuthenticate`] with the cause logged here.
pub fn verify_token(
    token: &TokenRecord,
    secret: &str,
    request_cluster: Option<&ClusterId>,
    now: DateTime<Utc>,
) -> Result<(), MustAuthenticate> {
    if !token.is_enabled() {
        warn!(token = %token.name, "token is disabled");
        return Err(MustAuthenticate);
    }

    if token.is_expired(now) {
        warn!(token = %token.name, ttl_millis = token.ttl_millis, "token is expired");
        return Err(MustAuthenticate);
    }

    // Cluster scoping only applies when both sides name a cluster.
    if let (Some(scoped), Some(requested)) = (token.cluster_name.as_ref(), request_cluster) {
        if scoped != requested {
            warn!(
                token = %token.name,
                scoped = %scoped,
                requested = %requested,
                "token is scoped to a different cluster"
            );
            return Err(MustAuthenticate);
        }
    }

    if !hashers::verify_secret(secret, &token.hash) {
        warn!(token = %token.name, "token secret mismatch");
        return Err(MustAuthenticate);
    }

    Ok(())
}
