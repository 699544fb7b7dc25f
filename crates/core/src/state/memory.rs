//! Process-local state store.
//!
//! Suitable for a single process and for tests. Entries and leases live
//! behind one mutex so checking and taking a lease is atomic.

use super::error::{StateError, StateResult};
use super::lease::LeaseTable;
use super::store::{StateEntry, StateStore};
use ac_protocol::{AuthContext, ChainId, StateId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug)]
struct Inner {
    entries: HashMap<StateId, StateEntry>,
    leases: LeaseTable,
}

impl Inner {
    /// The live entry for `id`, dropping it if expired.
    fn live_entry(&mut self, id: &StateId) -> StateResult<&StateEntry> {
        let expired = match self.entries.get(id) {
            None => return Err(StateError::NotFound(id.clone())),
            Some(entry) => entry.is_expired(),
        };
        if expired {
            self.entries.remove(id);
            self.leases.clear(id);
            return Err(StateError::NotFound(id.clone()));
        }
        self.entries
            .get(id)
            .ok_or_else(|| StateError::NotFound(id.clone()))
    }
}

/// In-memory [`StateStore`].
#[derive(Debug)]
pub struct MemoryStateStore {
    inner: Mutex<Inner>,
}

impl MemoryStateStore {
    pub fn new(lease_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                leases: LeaseTable::new(lease_ttl),
            }),
        }
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn save(&self, context: &AuthContext, ttl: Duration) -> StateResult<()> {
        let entry = StateEntry::new(context, ttl)?;
        let mut inner = self.inner.lock().await;
        inner.leases.clear(&entry.identifier);
        inner.entries.insert(entry.identifier.clone(), entry);
        Ok(())
    }

    async fn load(&self, id: &StateId, expected: &ChainId) -> StateResult<AuthContext> {
        let mut inner = self.inner.lock().await;
        let entry = inner.live_entry(id)?;
        entry.check_chain(expected)?;
        let context = entry.decode()?;
        inner.leases.acquire(id)?;
        Ok(context)
    }

    async fn peek(&self, id: &StateId, expected: &ChainId) -> StateResult<AuthContext> {
        let mut inner = self.inner.lock().await;
        let entry = inner.live_entry(id)?;
        entry.check_chain(expected)?;
        entry.decode()
    }

    async fn release(&self, id: &StateId) -> StateResult<()> {
        self.inner.lock().await.leases.clear(id);
        Ok(())
    }

    async fn delete(&self, id: &StateId) -> StateResult<()> {
        let mut inner = self.inner.lock().await;
        inner.entries.remove(id);
        inner.leases.clear(id);
        Ok(())
    }

    async fn purge_expired(&self) -> StateResult<usize> {
        let mut inner = self.inner.lock().await;
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired());
        inner.leases.prune();
        Ok(before - inner.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> ChainId {
        "idp-sso".parse().unwrap()
    }

    #[tokio::test]
    async fn test_save_then_peek() {
        let store = MemoryStateStore::default();
        let ctx = AuthContext::new(chain());
        store.save(&ctx, Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.peek(&ctx.identifier, &chain()).await.unwrap(), ctx);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_peek_does_not_lease() {
        let store = MemoryStateStore::default();
        let ctx = AuthContext::new(chain());
        store.save(&ctx, Duration::from_secs(60)).await.unwrap();
        store.peek(&ctx.identifier, &chain()).await.unwrap();
        assert!(store.load(&ctx.identifier, &chain()).await.is_ok());
    }

    #[tokio::test]
    async fn test_release_allows_second_load() {
        let store = MemoryStateStore::default();
        let ctx = AuthContext::new(chain());
        store.save(&ctx, Duration::from_secs(60)).await.unwrap();
        store.load(&ctx.identifier, &chain()).await.unwrap();
        assert!(matches!(
            store.load(&ctx.identifier, &chain()).await,
            Err(StateError::ConcurrentResumption(_))
        ));
        store.release(&ctx.identifier).await.unwrap();
        assert!(store.load(&ctx.identifier, &chain()).await.is_ok());
    }

    #[tokio::test]
    async fn test_mismatch_does_not_take_lease() {
        let store = MemoryStateStore::default();
        let ctx = AuthContext::new(chain());
        store.save(&ctx, Duration::from_secs(60)).await.unwrap();
        let other: ChainId = "other".parse().unwrap();
        assert!(matches!(
            store.load(&ctx.identifier, &other).await,
            Err(StateError::ChainMismatch { .. })
        ));
        assert!(store.load(&ctx.identifier, &chain()).await.is_ok());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryStateStore::default();
        let live = AuthContext::new(chain());
        let dead = AuthContext::new(chain());
        store.save(&live, Duration::from_secs(60)).await.unwrap();
        store.save(&dead, Duration::ZERO).await.unwrap();
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStateStore::default();
        let id = StateId::generate();
        assert!(store.delete(&id).await.is_ok());
        assert!(store.delete(&id).await.is_ok());
    }
}
