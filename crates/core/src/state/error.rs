//! Error types for state persistence.

use ac_protocol::{ChainId, ChainStatus, StateId};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a [`StateStore`](super::StateStore) or by lifecycle transitions.
#[derive(Error, Debug)]
pub enum StateError {
    /// The identifier is unknown or its entry has expired.
    #[error("State {0} not found or expired")]
    NotFound(StateId),

    /// The entry was saved by another chain definition.
    #[error("State {id} belongs to chain {found}, expected {expected}")]
    ChainMismatch {
        id: StateId,
        expected: ChainId,
        found: ChainId,
    },

    /// Another request holds the resume lease for this identifier.
    #[error("State {0} is already being resumed")]
    ConcurrentResumption(StateId),

    /// The stored snapshot could not be encoded or decoded.
    #[error("Failed to serialize state {id}: {source}")]
    Serialization {
        id: StateId,
        source: serde_json::Error,
    },

    /// The stored snapshot decoded but does not match its entry.
    #[error("Corrupt state {id}: {reason}")]
    Corrupt { id: StateId, reason: String },

    /// The backing storage failed.
    #[error("State store I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A lifecycle transition that the state machine does not allow.
    #[error("Invalid chain transition from {from:?} to {to:?}")]
    InvalidTransition { from: ChainStatus, to: ChainStatus },
}

/// Type alias for Result with StateError.
pub type StateResult<T> = Result<T, StateError>;
