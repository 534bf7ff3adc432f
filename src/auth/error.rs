//! The uniform authentication failure.

use std::fmt;

/// The single error value returned for every authentication rejection.
///
/// Malformed credential, unknown token, disabled token, expired token,
/// cluster mismatch, secret mismatch, unknown or disabled user, unknown or
/// disabled provider: all of them surface as this value. The underlying
/// cause is logged where it occurs and never reaches the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MustAuthenticate;

impl fmt::Display for MustAuthenticate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "must authenticate")
    }
}

impl std::error::Error for MustAuthenticate {}
