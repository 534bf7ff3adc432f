//! Request-token authentication engine.
//!
//! This module turns an inbound HTTP request's bearer credential into a
//! verified identity (user, principal, groups, extras) or a uniform
//! authentication failure. It supports two token storage kinds:
//!
//! - **Legacy**: the full token record (including the secret hash) lives in
//!   the primary resource store and is indexed in memory by token ID
//! - **Extension**: the sensitive fields are encoded into a companion
//!   secret record fetched by a name derived from the token ID
//!
//! ## Security Model
//!
//! - Every rejection path returns the same [`MustAuthenticate`] value, so a
//!   caller cannot distinguish "no such token" from "wrong secret" from
//!   "expired"; causes are preserved in logs only
//! - Secret hashes are compared all-or-nothing in constant time
//! - The usage write-back and the attribute refresh dispatch are best
//!   effort and can never turn a successful authentication into a failure
//!
//! ## Usage
//!
//! ```ignore
//! let authenticator = TokenAuthenticator::new(
//!     legacy_store, extension_store, users, attributes, providers, refresher,
//! );
//!
//! let identity = authenticator.authenticate(&request).await?;
//! assert!(identity.is_authed);
//! ```

mod authenticator;
pub mod cluster;
mod credential;
mod error;
pub mod hashers;
mod identity;
mod model;
mod refresh;
mod store;
mod usage;
mod verify;

pub use authenticator::TokenAuthenticator;
pub use credential::{Credential, TokenKind, parse_authorization};
pub use error::MustAuthenticate;
pub use identity::{
    AuthProvider, IdentityResolver, ProviderRegistry, ResolvedIdentity, UserAttributeLister,
    UserLister,
};
pub use model::{AttributeSnapshot, AuthResult, GroupPrincipal, TokenPrincipal, TokenRecord, User};
pub use refresh::{RefreshQueue, RefreshRequest, UserRefresher};
pub use store::{
    ExtensionTokenStore, LegacyTokenStore, SecretClient, TokenClient, TokenIndex, TokenSecret,
    TokenStore, secret_fields, secret_name,
};

/// Sentinel group granted to every authenticated identity.
pub const GROUP_AUTHENTICATED: &str = "system:fleetgate:authenticated";

/// Reserved prefix marking system-internal user and principal IDs.
pub const SYSTEM_ID_PREFIX: &str = "system://";

/// Extras attribute holding the user's principal IDs.
pub const EXTRA_PRINCIPAL_ID: &str = "principalid";

/// Extras attribute holding the user's login name.
pub const EXTRA_USERNAME: &str = "username";

/// Request-scoped extras attribute holding the authenticating token's ID.
pub const EXTRA_REQUEST_TOKEN_ID: &str = "requesttokenid";

/// Request-scoped extras attribute holding the request's Host.
pub const EXTRA_REQUEST_HOST: &str = "requesthost";
