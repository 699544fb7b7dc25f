//! Builds step objects from chain definitions.

use super::attributes::{AttributeLimit, AttributeRequire};
use super::base::PipelineStep;
use super::cardinality::CardinalityCheck;
use super::finish::Finish;
use super::short_interval::ShortSsoInterval;
use ac_protocol::{ChainDefinition, StepSpec};
use std::time::Duration;

/// Instantiate the step described by `spec`.
pub fn build_step(spec: &StepSpec) -> Box<dyn PipelineStep> {
    match spec {
        StepSpec::Cardinality { attributes } => Box::new(CardinalityCheck::new(attributes.clone())),
        StepSpec::ShortSsoInterval { min_interval_secs } => Box::new(ShortSsoInterval::new(
            Duration::from_secs(*min_interval_secs),
        )),
        StepSpec::AttributeLimit { allowed } => Box::new(AttributeLimit::new(allowed.clone())),
        StepSpec::AttributeRequire { required } => {
            Box::new(AttributeRequire::new(required.clone()))
        }
        StepSpec::Finish => Box::new(Finish),
    }
}

/// Instantiate every step of `definition` in declaration order.
pub fn build_steps(definition: &ChainDefinition) -> Vec<Box<dyn PipelineStep>> {
    definition.steps.iter().map(build_step).collect()
}
