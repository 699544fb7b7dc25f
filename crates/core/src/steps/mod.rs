//! Pipeline steps.
//!
//! This module provides the [`base::PipelineStep`] trait, the built-in step
//! kinds, and a factory turning [`StepSpec`](ac_protocol::StepSpec) entries
//! from a chain definition into step objects.

pub mod attributes;
pub mod base;
pub mod cardinality;
pub mod factory;
pub mod finish;
pub mod short_interval;

pub use base::{PipelineStep, StepEnv, StepError, StepOutcome, StepResult};
