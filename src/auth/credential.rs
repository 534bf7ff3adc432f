//! Bearer credential parsing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auth::error::MustAuthenticate;
use crate::types::TokenId;

/// Prefix on the token ID selecting the extension token kind.
pub const EXTENSION_PREFIX: &str = "ext/";

/// Storage kind of a token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Full record in the primary store, indexed in memory by token ID.
    #[default]
    Legacy,
    /// Sensitive fields encoded into a companion secret record.
    Extension,
}

/// A parsed bearer credential. Parsed once per request; immutable.
#[derive(Clone)]
pub struct Credential {
    pub kind: TokenKind,
    pub token_id: TokenId,
    pub secret: String,
}

impl fmt::Debug for Credential {
    // The secret must never reach logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("token_id", &self.token_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Parse an `Authorization` header value into a [`Credential`].
///
/// The value must match `Bearer <tokenID>:<secret>` or
/// `Bearer ext/<tokenID>:<secret>`. Any other shape, a missing header, or
/// an empty token ID or secret fails with [`MustAuthenticate`].
pub fn parse_authorization(header: Option<&str>) -> Result<Credential, MustAuthenticate> {
    let value = header.ok_or(MustAuthenticate)?;
    let rest = value.strip_prefix("Bearer ").ok_or(MustAuthenticate)?;

    let (kind, rest) = match rest.strip_prefix(EXTENSION_PREFIX) {
        Some(stripped) => (TokenKind::Extension, stripped),
        None => (TokenKind::Legacy, rest),
    };

    let (token_id, secret) = rest.split_once(':').ok_or(MustAuthenticate)?;
    if token_id.is_empty() || secret.is_empty() {
        return Err(MustAuthenticate);
    }

    Ok(Credential {
        kind,
        token_id: TokenId::new(token_id),
        secret: secret.to_string(),
    })
}
