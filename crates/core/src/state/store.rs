//! The state store contract and its stored record.

use super::error::{StateError, StateResult};
use ac_protocol::{AuthContext, ChainId, StateId};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Versioned envelope written into [`StateEntry::serialized_context`].
#[derive(Serialize)]
#[serde(tag = "schema")]
enum SnapshotRef<'a> {
    #[serde(rename = "v1")]
    V1 {
        chain_id: &'a ChainId,
        context: &'a AuthContext,
    },
}

#[derive(Deserialize)]
#[serde(tag = "schema", deny_unknown_fields)]
enum Snapshot {
    #[serde(rename = "v1")]
    V1 {
        chain_id: ChainId,
        context: AuthContext,
    },
}

/// One persisted snapshot of a suspended chain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StateEntry {
    pub identifier: StateId,
    pub chain_id: ChainId,
    pub serialized_context: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StateEntry {
    /// Snapshot `context`, expiring `ttl` from now.
    pub fn new(context: &AuthContext, ttl: Duration) -> StateResult<Self> {
        let serialized_context = serde_json::to_string(&SnapshotRef::V1 {
            chain_id: &context.chain_id,
            context,
        })
        .map_err(|source| StateError::Serialization {
            id: context.identifier.clone(),
            source,
        })?;

        let created_at = Utc::now();
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|delta| created_at.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Ok(Self {
            identifier: context.identifier.clone(),
            chain_id: context.chain_id.clone(),
            serialized_context,
            created_at,
            expires_at,
        })
    }

    /// An entry is expired from `expires_at` onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check the entry against `expected` without decoding it.
    pub fn check_chain(&self, expected: &ChainId) -> StateResult<()> {
        if &self.chain_id == expected {
            Ok(())
        } else {
            Err(StateError::ChainMismatch {
                id: self.identifier.clone(),
                expected: expected.clone(),
                found: self.chain_id.clone(),
            })
        }
    }

    /// Decode a fresh, independent copy of the stored context.
    pub fn decode(&self) -> StateResult<AuthContext> {
        let Snapshot::V1 { chain_id, context } = serde_json::from_str(&self.serialized_context)
            .map_err(|source| StateError::Serialization {
                id: self.identifier.clone(),
                source,
            })?;

        if chain_id != self.chain_id || context.chain_id != self.chain_id {
            return Err(StateError::Corrupt {
                id: self.identifier.clone(),
                reason: "snapshot chain does not match entry".to_string(),
            });
        }
        if context.identifier != self.identifier {
            return Err(StateError::Corrupt {
                id: self.identifier.clone(),
                reason: "snapshot identifier does not match entry".to_string(),
            });
        }
        Ok(context)
    }
}

/// Durable, expiring storage for suspended chain contexts.
///
/// The identifier and chain id of a snapshot are taken from the context
/// itself. Expired entries are treated as absent by every read.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Persist a snapshot, replacing any entry with the same identifier.
    ///
    /// Clears a resume lease held on the identifier.
    async fn save(&self, context: &AuthContext, ttl: Duration) -> StateResult<()>;

    /// Load a snapshot for resumption and take the resume lease.
    ///
    /// # Errors
    ///
    /// - `NotFound` if absent or expired
    /// - `ChainMismatch` if stored under another chain
    /// - `ConcurrentResumption` if another live lease exists
    async fn load(&self, id: &StateId, expected: &ChainId) -> StateResult<AuthContext>;

    /// Like [`load`](Self::load) but without taking a lease.
    async fn peek(&self, id: &StateId, expected: &ChainId) -> StateResult<AuthContext>;

    /// Drop the resume lease, leaving the entry in place.
    async fn release(&self, id: &StateId) -> StateResult<()>;

    /// Remove an entry. Removing an absent entry is not an error.
    async fn delete(&self, id: &StateId) -> StateResult<()>;

    /// Physically remove expired entries, returning how many were removed.
    async fn purge_expired(&self) -> StateResult<usize>;
}
