//! Short SSO interval warning.
//!
//! When the same destination asks for SSO again shortly after the previous
//! one, the user is shown a warning page before the chain continues. This
//! usually points at a redirect loop on the service provider side.

use super::base::{PipelineStep, StepEnv, StepOutcome, StepResult};
use ac_protocol::{AuthContext, Event};
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use std::time::Duration;

pub const KIND: &str = "short-sso-interval";

/// Route of the warning page, relative to the chain.
pub const ROUTE: &str = "short_sso_interval";

/// Context key of the per-chain SSO counter.
pub const SSO_COUNT_KEY: &str = "core:sso:count";

pub struct ShortSsoInterval {
    min_interval: Duration,
}

impl ShortSsoInterval {
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval }
    }
}

/// Current SSO counter value of `context`.
pub fn sso_count(context: &AuthContext) -> u64 {
    context
        .metadata
        .extra
        .get(SSO_COUNT_KEY)
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0)
}

#[async_trait]
impl PipelineStep for ShortSsoInterval {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn process(
        &self,
        context: &mut AuthContext,
        env: &StepEnv<'_>,
    ) -> StepResult<StepOutcome> {
        if context.mark_entered(env.index, KIND) {
            let count = sso_count(context) + 1;
            context
                .metadata
                .extra
                .insert(SSO_COUNT_KEY.to_string(), count.into());
        }

        let Some(previous) = context.metadata.previous_sso else {
            return Ok(StepOutcome::Continue);
        };
        let min_interval = TimeDelta::from_std(self.min_interval).unwrap_or(TimeDelta::MAX);
        let elapsed = Utc::now() - previous;
        if elapsed >= min_interval {
            return Ok(StepOutcome::Continue);
        }

        tracing::debug!(
            state_id = %context.identifier,
            elapsed_ms = elapsed.num_milliseconds(),
            "Short SSO interval"
        );
        let destination = context
            .metadata
            .destination
            .as_ref()
            .map(|entity| entity.entity_id.clone());
        env.sink.emit(
            Event::new("core:short-sso-interval:warn")
                .with_field("destination", destination)
                .with_field("elapsed_ms", elapsed.num_milliseconds()),
        );

        let continuation = env.continuation(ROUTE, &context.identifier)?;
        Ok(StepOutcome::Suspend(continuation))
    }
}
