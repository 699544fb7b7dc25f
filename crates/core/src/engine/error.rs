//! Error types for chain execution.
//!
//! Every error maps onto one of the caller-facing [`ErrorClass`]es, which
//! decides how the failure is rendered and whether a retry makes sense.

use crate::state::StateError;
use crate::steps::StepError;
use ac_protocol::{ChainId, StateId};
use thiserror::Error;

/// How a failure is presented to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed or missing request input. Never retried.
    BadRequest,
    /// Unknown or expired state. The user should start over.
    Expired,
    /// Deployment or configuration fault. Rendered without detail.
    Configuration,
    /// Lost a race for the same state. May be retried once.
    Transient,
    /// Anything else.
    Internal,
}

impl ErrorClass {
    /// HTTP status code the class is rendered with.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorClass::BadRequest => 400,
            ErrorClass::Expired => 410,
            ErrorClass::Transient => 409,
            ErrorClass::Configuration | ErrorClass::Internal => 500,
        }
    }
}

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("State {0} not found or expired")]
    NotFound(StateId),

    #[error("State belongs to chain {found}, expected {expected}")]
    ChainMismatch { expected: ChainId, found: ChainId },

    /// The persisted step offset is past the end of the configured chain.
    #[error("State {state_id} resumes at step {step_index} but chain has {steps} steps")]
    PipelineCorruption {
        state_id: StateId,
        step_index: usize,
        steps: usize,
    },

    #[error("State {0} is already being resumed")]
    ConcurrentResumption(StateId),

    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    #[error("State is at stage {found:?}, expected {expected}")]
    StageMismatch {
        expected: String,
        found: Option<String>,
    },

    #[error("Step {index} ({kind}) failed: {source}")]
    Step {
        index: usize,
        kind: &'static str,
        source: StepError,
    },

    #[error(transparent)]
    State(StateError),
}

impl From<StateError> for ChainError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NotFound(id) => ChainError::NotFound(id),
            StateError::ChainMismatch {
                expected, found, ..
            } => ChainError::ChainMismatch { expected, found },
            StateError::ConcurrentResumption(id) => ChainError::ConcurrentResumption(id),
            other => ChainError::State(other),
        }
    }
}

impl ChainError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ChainError::BadRequest(_)
            | ChainError::UnknownChain(_)
            | ChainError::StageMismatch { .. } => ErrorClass::BadRequest,
            ChainError::NotFound(_) => ErrorClass::Expired,
            ChainError::ChainMismatch { .. } | ChainError::PipelineCorruption { .. } => {
                ErrorClass::Configuration
            }
            ChainError::ConcurrentResumption(_) => ErrorClass::Transient,
            ChainError::State(StateError::Corrupt { .. } | StateError::Serialization { .. }) => {
                ErrorClass::Configuration
            }
            ChainError::Step { .. } | ChainError::State(_) => ErrorClass::Internal,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.class().status_code()
    }
}

pub type ChainResult<T> = Result<T, ChainError>;

/// Parse the state identifier of an incoming request.
pub fn parse_state_id(raw: Option<&str>) -> ChainResult<StateId> {
    let raw = raw.ok_or_else(|| {
        ChainError::BadRequest("Missing required StateId query parameter.".to_string())
    })?;
    raw.parse()
        .map_err(|e: ac_protocol::IdError| ChainError::BadRequest(e.to_string()))
}
