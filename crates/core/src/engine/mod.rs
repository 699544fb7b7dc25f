//! Processing chain execution.
//!
//! A [`ProcessingChain`] runs its steps strictly in declaration order over an
//! [`AuthContext`]. When a step suspends, the context is saved to the state
//! store and a continuation is handed back to the caller; a later request
//! calls [`ProcessingChain::resume`] with the identifier and execution
//! continues at the step after the one that suspended.

pub mod error;
pub mod registry;

pub use error::{parse_state_id, ChainError, ChainResult, ErrorClass};
pub use registry::ChainRegistry;

use crate::sink::EventSink;
use crate::state::lifecycle::{
    reject_chain, resume_chain, start_chain, suspend_chain, terminate_chain,
};
use crate::state::StateStore;
use crate::steps::factory::build_steps;
use crate::steps::finish::auth_result;
use crate::steps::{PipelineStep, StepEnv, StepOutcome};
use ac_protocol::{
    AuthContext, AuthResult, ChainDefinition, ChainId, Continuation, EntityRef, RejectReason,
    ResumePolicy, StateId,
};
use std::sync::Arc;
use std::time::Duration;

/// How a chain invocation ended for the current request.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    /// Waiting for the user; send them to the continuation.
    Suspended(Continuation),

    /// Finished successfully.
    Terminated(AuthResult),

    /// Finished in failure.
    Rejected {
        state_id: StateId,
        reason: RejectReason,
        /// Authenticating side, used to offer a retry login.
        source: Option<EntityRef>,
    },
}

pub struct ProcessingChain {
    id: ChainId,
    policy: ResumePolicy,
    ttl: Duration,
    steps: Vec<Box<dyn PipelineStep>>,
    store: Arc<dyn StateStore>,
    sink: Arc<dyn EventSink>,
    base_url: String,
}

impl ProcessingChain {
    /// Build a chain from its definition.
    ///
    /// `default_ttl` applies when the definition has no own state TTL.
    pub fn from_definition(
        definition: &ChainDefinition,
        default_ttl: Duration,
        store: Arc<dyn StateStore>,
        sink: Arc<dyn EventSink>,
        base_url: impl Into<String>,
    ) -> Self {
        let ttl = definition
            .state_ttl_secs
            .map_or(default_ttl, Duration::from_secs);
        Self::new(definition.id.clone(), build_steps(definition), store, sink, base_url)
            .with_policy(definition.resume_policy)
            .with_ttl(ttl)
    }

    /// Build a chain over already constructed steps with single-use resumption
    /// and a one hour state TTL.
    pub fn new(
        id: ChainId,
        steps: Vec<Box<dyn PipelineStep>>,
        store: Arc<dyn StateStore>,
        sink: Arc<dyn EventSink>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            id,
            policy: ResumePolicy::default(),
            ttl: Duration::from_secs(3600),
            steps,
            store,
            sink,
            base_url: base_url.into(),
        }
    }

    pub fn with_policy(mut self, policy: ResumePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn id(&self) -> &ChainId {
        &self.id
    }

    pub fn policy(&self) -> ResumePolicy {
        self.policy
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Step kinds in execution order.
    pub fn step_kinds(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.kind()).collect()
    }

    /// Run a fresh context from the first step.
    pub async fn start(&self, mut context: AuthContext) -> ChainResult<ChainOutcome> {
        if context.chain_id != self.id {
            return Err(ChainError::ChainMismatch {
                expected: self.id.clone(),
                found: context.chain_id,
            });
        }
        context.step_index = 0;
        start_chain(&mut context, self.sink.as_ref())?;
        self.advance(context, false).await
    }

    /// Continue a suspended chain.
    ///
    /// Holds the store lease for the duration of the call. On failure the
    /// lease is released so the user can retry.
    pub async fn resume(&self, id: &StateId) -> ChainResult<ChainOutcome> {
        let context = self.store.load(id, &self.id).await?;
        let result = self.resume_loaded(context).await;
        if result.is_err() {
            if let Err(e) = self.store.release(id).await {
                tracing::warn!(state_id = %id, error = %e, "Failed to release resume lease");
            }
        }
        result
    }

    async fn resume_loaded(&self, mut context: AuthContext) -> ChainResult<ChainOutcome> {
        if context.step_index > self.steps.len() {
            tracing::error!(
                state_id = %context.identifier,
                chain_id = %self.id,
                step_index = context.step_index,
                steps = self.steps.len(),
                "Persisted step offset exceeds chain length"
            );
            self.store.delete(&context.identifier).await?;
            return Err(ChainError::PipelineCorruption {
                state_id: context.identifier,
                step_index: context.step_index,
                steps: self.steps.len(),
            });
        }
        resume_chain(&mut context, self.sink.as_ref())?;
        self.advance(context, true).await
    }

    /// Administratively end a suspended chain and drop its state.
    pub async fn abort(&self, id: &StateId) -> ChainResult<()> {
        let mut context = self.store.load(id, &self.id).await?;
        if let Err(e) = reject_chain(&mut context, &RejectReason::Aborted, self.sink.as_ref()) {
            if let Err(release) = self.store.release(id).await {
                tracing::warn!(state_id = %id, error = %release, "Failed to release resume lease");
            }
            return Err(e.into());
        }
        self.store.delete(id).await?;
        Ok(())
    }

    /// Read a suspended context without resuming it.
    pub async fn inspect(&self, id: &StateId) -> ChainResult<AuthContext> {
        Ok(self.store.peek(id, &self.id).await?)
    }

    async fn advance(&self, mut context: AuthContext, resumed: bool) -> ChainResult<ChainOutcome> {
        let sink = self.sink.as_ref();

        while let Some(step) = self.steps.get(context.step_index) {
            let index = context.step_index;
            let env = StepEnv {
                index,
                chain_id: &self.id,
                base_url: &self.base_url,
                sink,
            };
            tracing::debug!(
                state_id = %context.identifier,
                index,
                kind = step.kind(),
                "Running step"
            );

            let outcome = step
                .process(&mut context, &env)
                .await
                .map_err(|source| ChainError::Step {
                    index,
                    kind: step.kind(),
                    source,
                })?;
            context.step_index = index + 1;

            match outcome {
                StepOutcome::Continue => {}
                StepOutcome::Suspend(continuation) => {
                    suspend_chain(&mut context, step.kind(), sink)?;
                    self.store.save(&context, self.ttl).await?;
                    return Ok(ChainOutcome::Suspended(continuation));
                }
                StepOutcome::Terminate(result) => {
                    terminate_chain(&mut context, sink)?;
                    self.settle(&context, resumed).await?;
                    return Ok(ChainOutcome::Terminated(result));
                }
                StepOutcome::Reject(reason) => {
                    reject_chain(&mut context, &reason, sink)?;
                    self.settle(&context, resumed).await?;
                    return Ok(ChainOutcome::Rejected {
                        state_id: context.identifier,
                        reason,
                        source: context.metadata.source,
                    });
                }
            }
        }

        let result = auth_result(&context);
        terminate_chain(&mut context, sink)?;
        self.settle(&context, resumed).await?;
        Ok(ChainOutcome::Terminated(result))
    }

    /// Dispose of the stored entry once the chain reached a final state.
    async fn settle(&self, context: &AuthContext, resumed: bool) -> ChainResult<()> {
        if !resumed {
            return Ok(());
        }
        match self.policy {
            ResumePolicy::SingleUse => self.store.delete(&context.identifier).await?,
            ResumePolicy::Reusable => self.store.release(&context.identifier).await?,
        }
        Ok(())
    }
}

impl std::fmt::Debug for ProcessingChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingChain")
            .field("id", &self.id)
            .field("policy", &self.policy)
            .field("ttl", &self.ttl)
            .field("steps", &self.step_kinds())
            .finish()
    }
}
