//! Background removal of expired state entries.

use super::store::StateStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawn a task purging expired entries every `every`.
///
/// The task runs until the returned handle is aborted or the runtime stops.
pub fn spawn_sweeper(store: Arc<dyn StateStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Purged expired state entries"),
                Err(e) => tracing::warn!(error = %e, "State sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryStateStore;
    use ac_protocol::AuthContext;

    #[tokio::test]
    async fn test_sweeper_purges() {
        let store = Arc::new(MemoryStateStore::default());
        let ctx = AuthContext::new("idp-sso".parse().unwrap());
        store.save(&ctx, Duration::ZERO).await.unwrap();
        assert_eq!(store.len().await, 1);

        let handle = spawn_sweeper(store.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert!(store.is_empty().await);
    }
}
