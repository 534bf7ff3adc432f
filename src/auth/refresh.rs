//! Attribute refresh dispatch.
//!
//! Authentication only requests a refresh; the actual snapshot update runs
//! elsewhere. The dispatch is a synchronous, non-blocking handoff so the
//! request path never waits on refresh work.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};

use crate::auth::SYSTEM_ID_PREFIX;
use crate::types::UserId;

/// A queued request to refresh one user's attribute snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub user_id: UserId,
    pub force: bool,
}

/// Non-blocking handoff into whatever performs attribute refreshes.
pub trait UserRefresher: Send + Sync {
    fn refresh_user(&self, user_id: &UserId, force: bool);
}

/// Whether a refresh should be dispatched for this identity at all.
///
/// System-internal principals are static; refreshing them is pointless
/// churn against the providers.
pub fn wants_refresh(user_id: &UserId, principal_ids: &[String]) -> bool {
    if user_id.as_str().starts_with(SYSTEM_ID_PREFIX) {
        return false;
    }
    !principal_ids
        .iter()
        .any(|p| p.starts_with(SYSTEM_ID_PREFIX))
}

/// Bounded queue feeding a spawned refresh worker.
///
/// A full queue drops the request with a log line; refresh is best effort
/// and the next authentication will queue another one.
#[derive(Clone)]
pub struct RefreshQueue {
    tx: mpsc::Sender<RefreshRequest>,
}

impl RefreshQueue {
    /// Spawn the worker task and return the queue handle.
    pub fn spawn<F, Fut>(capacity: usize, handler: F) -> Self
    where
        F: Fn(RefreshRequest) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<RefreshRequest>(capacity);
        tokio::spawn(async move {
            info!("refresh worker started");
            while let Some(request) = rx.recv().await {
                let user_id = request.user_id.clone();
                if let Err(error) = handler(request).await {
                    warn!(user = %user_id, %error, "attribute refresh failed");
                }
            }
            info!("refresh worker stopped");
        });
        Self { tx }
    }
}

impl UserRefresher for RefreshQueue {
    fn refresh_user(&self, user_id: &UserId, force: bool) {
        let request = RefreshRequest {
            user_id: user_id.clone(),
            force,
        };
        match self.tx.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(request)) => {
                warn!(user = %request.user_id, "refresh queue is full, dropping request");
            }
            Err(TrySendError::Closed(request)) => {
                warn!(user = %request.user_id, "refresh worker is gone, dropping request");
            }
        }
    }
}
