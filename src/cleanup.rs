//! Background janitor for expired sessions.
//!
//! Expiry is already enforced lazily whenever a token is presented. This job
//! only keeps the map and the record directory from filling up with sessions
//! nobody comes back for.

use crate::storage::SessionStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Run the cleanup loop.
///
/// Purges expired sessions every `interval`. Never returns.
pub async fn run_cleanup_loop(store: Arc<SessionStore>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        purge_once(&store).await;
    }
}

/// One janitor pass. Failures are logged, not propagated.
pub async fn purge_once(store: &SessionStore) -> usize {
    match store.purge_expired(Utc::now()).await {
        Ok(purged) => {
            if purged > 0 {
                tracing::info!(purged, "Cleanup job completed");
            }
            purged
        }
        Err(e) => {
            tracing::error!(error = %e, "Cleanup job failed");
            0
        }
    }
}
