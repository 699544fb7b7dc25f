//! Base step trait and supporting types.

use crate::sink::EventSink;
use crate::urls;
use ac_protocol::{AuthResult, ChainId, Continuation, RejectReason, StateId};
use async_trait::async_trait;
use thiserror::Error;

/// What the chain should do after a step ran.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Run the next step within the same request.
    Continue,

    /// Persist the context and hand the continuation to the caller.
    Suspend(Continuation),

    /// End the chain successfully with this result.
    Terminate(AuthResult),

    /// End the chain in failure. No further steps run.
    Reject(RejectReason),
}

#[derive(Error, Debug)]
pub enum StepError {
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("Step failed: {0}")]
    Failed(String),
}

pub type StepResult<T> = Result<T, StepError>;

/// Per-invocation environment handed to a step.
pub struct StepEnv<'a> {
    /// Position of the running step in its chain.
    pub index: usize,
    pub chain_id: &'a ChainId,
    pub base_url: &'a str,
    pub sink: &'a dyn EventSink,
}

impl StepEnv<'_> {
    /// Continuation pointing at `route` of this chain for `id`.
    pub fn continuation(&self, route: &str, id: &StateId) -> StepResult<Continuation> {
        let url = urls::continuation_url(self.base_url, self.chain_id, route, id)?;
        Ok(Continuation {
            state_id: id.clone(),
            url,
        })
    }
}

/// A unit of work over an authentication context.
///
/// Steps mutate the context in place and report how the chain proceeds.
/// A step must tolerate being entered again on the same persisted context
/// without repeating irreversible effects; [`AuthContext::mark_entered`]
/// exists for that.
///
/// [`AuthContext::mark_entered`]: ac_protocol::AuthContext::mark_entered
#[async_trait]
pub trait PipelineStep: Send + Sync {
    /// Stable kind name, recorded as the stage when the step suspends.
    fn kind(&self) -> &'static str;

    async fn process(
        &self,
        context: &mut ac_protocol::AuthContext,
        env: &StepEnv<'_>,
    ) -> StepResult<StepOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemoryEventSink;
    use ac_protocol::AuthContext;

    struct Passthrough;

    #[async_trait]
    impl PipelineStep for Passthrough {
        fn kind(&self) -> &'static str {
            "passthrough"
        }

        async fn process(
            &self,
            context: &mut AuthContext,
            _env: &StepEnv<'_>,
        ) -> StepResult<StepOutcome> {
            context.add_attribute_value("seen", "yes");
            Ok(StepOutcome::Continue)
        }
    }

    #[tokio::test]
    async fn test_custom_step() {
        let sink = MemoryEventSink::new();
        let chain: ChainId = "idp-sso".parse().unwrap();
        let env = StepEnv {
            index: 0,
            chain_id: &chain,
            base_url: "https://idp.example.org",
            sink: &sink,
        };
        let mut ctx = AuthContext::new(chain.clone());
        let outcome = Passthrough.process(&mut ctx, &env).await.unwrap();
        assert_eq!(outcome, StepOutcome::Continue);
        assert_eq!(ctx.value_count("seen"), 1);
    }

    #[test]
    fn test_env_continuation() {
        let sink = MemoryEventSink::new();
        let chain: ChainId = "idp-sso".parse().unwrap();
        let env = StepEnv {
            index: 1,
            chain_id: &chain,
            base_url: "https://idp.example.org",
            sink: &sink,
        };
        let id = StateId::generate();
        let continuation = env.continuation("warn", &id).unwrap();
        assert_eq!(continuation.state_id, id);
        assert!(continuation.url.contains("/idp-sso/warn?StateId="));
    }

    #[test]
    fn test_env_continuation_bad_base() {
        let sink = MemoryEventSink::new();
        let chain: ChainId = "idp-sso".parse().unwrap();
        let env = StepEnv {
            index: 0,
            chain_id: &chain,
            base_url: "not a url",
            sink: &sink,
        };
        assert!(matches!(
            env.continuation("warn", &StateId::generate()),
            Err(StepError::InvalidBaseUrl(_))
        ));
    }
}
