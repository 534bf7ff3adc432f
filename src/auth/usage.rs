//! Last-used write-back with sub-second throttling.

use chrono::{DateTime, Timelike, Utc};
use tracing::warn;

use crate::auth::model::TokenRecord;
use crate::auth::store::TokenStore;

fn truncate_to_second(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_nanosecond(0).unwrap_or(t)
}

/// Whether the usage timestamp is worth persisting.
///
/// Both sides are truncated to whole seconds; only an equal result skips
/// the write. A stored timestamp ahead of `now` still gets overwritten
/// with the observed value.
pub fn should_record(last_used_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_used_at {
        Some(last) => truncate_to_second(last) != truncate_to_second(now),
        None => true,
    }
}

/// Persist the token's usage timestamp, throttled and best effort.
///
/// A failed patch is logged and swallowed; usage recording can never turn
/// a successful authentication into a failure.
pub async fn record_usage(store: &dyn TokenStore, token: &TokenRecord, now: DateTime<Utc>) {
    if !should_record(token.last_used_at, now) {
        return;
    }
    let at = truncate_to_second(now);
    if let Err(error) = store.record_last_used(&token.name, at).await {
        warn!(token = %token.name, %error, "failed to record token usage");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credential::TokenKind;
    use crate::auth::error::MustAuthenticate;
    use crate::auth::model::TokenPrincipal;
    use crate::types::{TokenId, UserId};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_first_use_records() {
        assert!(should_record(None, at("2026-08-27T10:00:05.400Z")));
    }

    #[test]
    fn test_same_second_skips() {
        assert!(!should_record(
            Some(at("2026-08-27T10:00:05.100Z")),
            at("2026-08-27T10:00:05.900Z"),
        ));
    }

    #[test]
    fn test_next_second_records() {
        assert!(should_record(
            Some(at("2026-08-27T10:00:05.900Z")),
            at("2026-08-27T10:00:06.000Z"),
        ));
    }

    #[test]
    fn test_backward_timestamp_records() {
        assert!(should_record(
            Some(at("2026-08-27T10:00:07Z")),
            at("2026-08-27T10:00:05Z"),
        ));
    }

    struct FakeStore {
        fail: bool,
        recorded: Mutex<Vec<DateTime<Utc>>>,
    }

    #[async_trait]
    impl TokenStore for FakeStore {
        async fn resolve(&self, _id: &TokenId) -> Result<TokenRecord, MustAuthenticate> {
            Err(MustAuthenticate)
        }

        async fn record_last_used(&self, _id: &TokenId, at: DateTime<Utc>) -> anyhow::Result<()> {
            if self.fail {
                return Err(anyhow::anyhow!("store unavailable"));
            }
            self.recorded.lock().push(at);
            Ok(())
        }
    }

    fn token(last_used_at: Option<DateTime<Utc>>) -> TokenRecord {
        TokenRecord {
            name: TokenId::new("token-v2rcx"),
            user_id: UserId::new("u-abcdef"),
            hash: String::new(),
            auth_provider: None,
            user_principal: TokenPrincipal::default(),
            cluster_name: None,
            ttl_millis: 0,
            enabled: None,
            kind: TokenKind::Legacy,
            created_at: Utc::now(),
            last_used_at,
        }
    }

    #[tokio::test]
    async fn test_record_truncates_to_second() {
        let store = FakeStore {
            fail: false,
            recorded: Mutex::new(vec![]),
        };
        record_usage(&store, &token(None), at("2026-08-27T10:00:05.654Z")).await;

        let recorded = store.recorded.lock();
        assert_eq!(recorded.as_slice(), &[at("2026-08-27T10:00:05Z")]);
    }

    #[tokio::test]
    async fn test_record_skips_within_same_second() {
        let store = FakeStore {
            fail: false,
            recorded: Mutex::new(vec![]),
        };
        let token = token(Some(at("2026-08-27T10:00:05.100Z")));
        record_usage(&store, &token, at("2026-08-27T10:00:05.900Z")).await;
        assert!(store.recorded.lock().is_empty());
    }

    #[tokio::test]
    async fn test_record_failure_is_swallowed() {
        let store = FakeStore {
            fail: true,
            recorded: Mutex::new(vec![]),
        };
        // No panic, no error surfaced.
        record_usage(&store, &token(None), Utc::now()).await;
    }
}
