//! Attribute cardinality check.
//!
//! Rejects the chain when an attribute carries fewer or more values than its
//! configured bounds allow. Absent attributes count as having no values.

use super::base::{PipelineStep, StepEnv, StepOutcome, StepResult};
use ac_protocol::{AuthContext, CardinalityBound, Event, RejectReason};
use async_trait::async_trait;
use std::collections::BTreeMap;

pub const KIND: &str = "cardinality";

/// Context key under which the conflicting attributes are recorded.
pub const ERROR_ATTRIBUTES_KEY: &str = "core:cardinality:errorAttributes";

pub struct CardinalityCheck {
    bounds: BTreeMap<String, CardinalityBound>,
}

impl CardinalityCheck {
    pub fn new(bounds: BTreeMap<String, CardinalityBound>) -> Self {
        Self { bounds }
    }

    /// Attributes violating their bounds, with the values seen.
    pub fn conflicts(&self, context: &AuthContext) -> BTreeMap<String, Vec<String>> {
        self.bounds
            .iter()
            .filter(|(name, bound)| !bound.allows(context.value_count(name)))
            .map(|(name, _)| {
                let values = context
                    .attributes
                    .get(name)
                    .map(|values| values.iter().cloned().collect())
                    .unwrap_or_default();
                (name.clone(), values)
            })
            .collect()
    }
}

#[async_trait]
impl PipelineStep for CardinalityCheck {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn process(
        &self,
        context: &mut AuthContext,
        env: &StepEnv<'_>,
    ) -> StepResult<StepOutcome> {
        let conflicts = self.conflicts(context);
        if conflicts.is_empty() {
            return Ok(StepOutcome::Continue);
        }

        tracing::debug!(
            state_id = %context.identifier,
            attributes = ?conflicts.keys().collect::<Vec<_>>(),
            "Cardinality conflict"
        );

        let value = serde_json::to_value(&conflicts)
            .map_err(|e| super::StepError::Failed(e.to_string()))?;
        context
            .metadata
            .extra
            .insert(ERROR_ATTRIBUTES_KEY.to_string(), value);

        let destination = context
            .metadata
            .destination
            .as_ref()
            .map(|entity| entity.entity_id.clone());
        env.sink.emit(
            Event::new("core:cardinality:error")
                .with_field("destination", destination)
                .with_field("idp", context.metadata.idp.clone())
                .with_field(
                    "attributes",
                    conflicts.keys().cloned().collect::<Vec<_>>(),
                ),
        );

        Ok(StepOutcome::Reject(RejectReason::Cardinality {
            attributes: conflicts,
        }))
    }
}
