//! Resume leases.
//!
//! A lease marks an identifier as mid-resumption. While a lease is live, a
//! second resumption of the same identifier fails fast instead of advancing
//! from the same snapshot. Leases expire so a crashed request cannot wedge
//! an entry forever.

use super::error::{StateError, StateResult};
use ac_protocol::StateId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct LeaseTable {
    ttl: Duration,
    leases: HashMap<StateId, Instant>,
}

impl LeaseTable {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            leases: HashMap::new(),
        }
    }

    /// Take the lease for `id`, or fail if a live lease exists.
    pub fn acquire(&mut self, id: &StateId) -> StateResult<()> {
        let now = Instant::now();
        if let Some(deadline) = self.leases.get(id) {
            if *deadline > now {
                return Err(StateError::ConcurrentResumption(id.clone()));
            }
            tracing::warn!(state_id = %id, "Taking over expired resume lease");
        }
        self.leases.insert(id.clone(), now + self.ttl);
        Ok(())
    }

    pub fn is_held(&self, id: &StateId) -> bool {
        self.leases
            .get(id)
            .is_some_and(|deadline| *deadline > Instant::now())
    }

    pub fn clear(&mut self, id: &StateId) {
        self.leases.remove(id);
    }

    /// Forget leases whose deadline has passed.
    pub fn prune(&mut self) {
        let now = Instant::now();
        self.leases.retain(|_, deadline| *deadline > now);
    }
}
