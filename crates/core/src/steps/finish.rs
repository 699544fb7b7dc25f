//! Final step handing the attributes back to the initiator.

use super::base::{PipelineStep, StepEnv, StepOutcome, StepResult};
use ac_protocol::{AuthContext, AuthResult};
use async_trait::async_trait;

pub struct Finish;

/// The result a finished chain returns for `context`.
pub fn auth_result(context: &AuthContext) -> AuthResult {
    AuthResult {
        state_id: context.identifier.clone(),
        chain_id: context.chain_id.clone(),
        destination: context.metadata.destination.clone(),
        attributes: context.attributes.clone(),
    }
}

#[async_trait]
impl PipelineStep for Finish {
    fn kind(&self) -> &'static str {
        "finish"
    }

    async fn process(
        &self,
        context: &mut AuthContext,
        _env: &StepEnv<'_>,
    ) -> StepResult<StepOutcome> {
        Ok(StepOutcome::Terminate(auth_result(context)))
    }
}
