//! The authentication pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::Request;
use http::header::{AUTHORIZATION, HOST};
use tracing::debug;

use crate::auth::cluster::{ClusterRoute, cluster_from_uri};
use crate::auth::credential::{TokenKind, parse_authorization};
use crate::auth::error::MustAuthenticate;
use crate::auth::identity::{
    IdentityResolver, ProviderRegistry, UserAttributeLister, UserLister,
};
use crate::auth::model::AuthResult;
use crate::auth::refresh::{UserRefresher, wants_refresh};
use crate::auth::store::TokenStore;
use crate::auth::usage;
use crate::auth::verify::verify_token;
use crate::auth::{EXTRA_REQUEST_HOST, EXTRA_REQUEST_TOKEN_ID};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Turns a request's bearer credential into a verified identity.
///
/// Composes the credential parser, the two token stores, the verifier, the
/// identity resolver, the usage recorder and the refresh dispatcher. The
/// only failure it ever returns is [`MustAuthenticate`].
pub struct TokenAuthenticator {
    legacy: Arc<dyn TokenStore>,
    extension: Arc<dyn TokenStore>,
    resolver: IdentityResolver,
    refresher: Arc<dyn UserRefresher>,
    cluster_route: ClusterRoute,
    clock: Clock,
}

impl TokenAuthenticator {
    pub fn new(
        legacy: Arc<dyn TokenStore>,
        extension: Arc<dyn TokenStore>,
        users: Arc<dyn UserLister>,
        attributes: Arc<dyn UserAttributeLister>,
        providers: ProviderRegistry,
        refresher: Arc<dyn UserRefresher>,
    ) -> Self {
        Self {
            legacy,
            extension,
            resolver: IdentityResolver::new(users, attributes, providers),
            refresher,
            cluster_route: cluster_from_uri,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock, for tests.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replace how the target cluster is read off the request URI.
    pub fn with_cluster_route(mut self, route: ClusterRoute) -> Self {
        self.cluster_route = route;
        self
    }

    fn store_for(&self, kind: TokenKind) -> &dyn TokenStore {
        match kind {
            TokenKind::Legacy => self.legacy.as_ref(),
            TokenKind::Extension => self.extension.as_ref(),
        }
    }

    /// Authenticate one request.
    pub async fn authenticate<B>(&self, request: &Request<B>) -> Result<AuthResult, MustAuthenticate> {
        let header = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let credential = parse_authorization(header)?;
        let store = self.store_for(credential.kind);

        let token = store.resolve(&credential.token_id).await?;

        let now = (self.clock)();
        let request_cluster = (self.cluster_route)(request.uri());
        verify_token(&token, &credential.secret, request_cluster.as_ref(), now)?;

        let identity = self.resolver.resolve(&token).await?;

        // Side effects past this point are best effort; the result is
        // already decided.
        usage::record_usage(store, &token, now).await;

        if wants_refresh(&token.user_id, &identity.user.principal_ids) {
            self.refresher.refresh_user(&token.user_id, false);
        } else {
            debug!(user = %token.user_id, "skipping refresh for system principal");
        }

        let mut extras = identity.extras;
        extras.insert(
            EXTRA_REQUEST_TOKEN_ID.to_string(),
            vec![token.name.to_string()],
        );
        if let Some(host) = request_host(request) {
            extras.insert(EXTRA_REQUEST_HOST.to_string(), vec![host]);
        }

        debug!(user = %identity.user.name, token = %token.name, "request authenticated");

        Ok(AuthResult {
            is_authed: true,
            user: identity.user.name.clone(),
            user_principal: token.user_principal,
            groups: identity.groups,
            extras,
        })
    }
}

fn request_host<B>(request: &Request<B>) -> Option<String> {
    if let Some(host) = request.headers().get(HOST).and_then(|v| v.to_str().ok()) {
        return Some(host.to_string());
    }
    request.uri().host().map(str::to_string)
}
