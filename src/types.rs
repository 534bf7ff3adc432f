//! NewType wrappers for strong typing throughout the engine.
//!
//! These types prevent accidental mixing of semantically different strings
//! (e.g., passing a user ID where a token ID is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Identifier of a token resource (e.g., "token-v2rcx").
    ///
    /// This is the public half of a bearer credential; it is safe to log
    /// and is what the secondary index and the stores are keyed by. The
    /// secret half is never stored and never appears in a `TokenId`.
    TokenId
);

newtype_string!(
    /// Identifier of a user resource (e.g., "u-abcdef").
    ///
    /// User IDs carrying the reserved `system://` prefix denote internal
    /// principals and are exempt from attribute refresh dispatch.
    UserId
);

newtype_string!(
    /// Identifier of a downstream cluster (e.g., "c-955nj").
    ///
    /// Tokens may be scoped to a single cluster; requests routed through
    /// `/k8s/clusters/<id>/...` carry the target cluster in their path.
    ClusterId
);
