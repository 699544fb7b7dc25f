//! Attribute release steps.

use super::base::{PipelineStep, StepEnv, StepOutcome, StepResult};
use ac_protocol::{AuthContext, RejectReason};
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Drops every attribute not on the allow-list.
pub struct AttributeLimit {
    allowed: BTreeSet<String>,
}

impl AttributeLimit {
    pub fn new(allowed: impl IntoIterator<Item = String>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }
}

#[async_trait]
impl PipelineStep for AttributeLimit {
    fn kind(&self) -> &'static str {
        "attribute-limit"
    }

    async fn process(
        &self,
        context: &mut AuthContext,
        _env: &StepEnv<'_>,
    ) -> StepResult<StepOutcome> {
        context
            .attributes
            .retain(|name, _| self.allowed.contains(name));
        Ok(StepOutcome::Continue)
    }
}

/// Rejects the chain unless every listed attribute has a value.
pub struct AttributeRequire {
    required: Vec<String>,
}

impl AttributeRequire {
    pub fn new(required: Vec<String>) -> Self {
        Self { required }
    }
}

#[async_trait]
impl PipelineStep for AttributeRequire {
    fn kind(&self) -> &'static str {
        "attribute-require"
    }

    async fn process(
        &self,
        context: &mut AuthContext,
        _env: &StepEnv<'_>,
    ) -> StepResult<StepOutcome> {
        let names: Vec<String> = self
            .required
            .iter()
            .filter(|name| context.value_count(name) == 0)
            .cloned()
            .collect();
        if names.is_empty() {
            Ok(StepOutcome::Continue)
        } else {
            Ok(StepOutcome::Reject(RejectReason::MissingAttributes { names }))
        }
    }
}
