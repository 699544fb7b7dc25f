//! Steps with observable behaviour for driving chains in tests.

use ac_core::steps::{PipelineStep, StepEnv, StepError, StepOutcome, StepResult};
use ac_protocol::AuthContext;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Counts invocations and the irreversible effect it guards with the
/// entered marker.
#[derive(Default)]
pub struct Counters {
    pub calls: AtomicUsize,
    pub effects: AtomicUsize,
}

#[allow(dead_code)]
impl Counters {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn effects(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }
}

/// Records each call and continues.
#[allow(dead_code)]
pub struct RecordingStep {
    pub counters: Arc<Counters>,
}

#[async_trait]
impl PipelineStep for RecordingStep {
    fn kind(&self) -> &'static str {
        "recording"
    }

    async fn process(
        &self,
        context: &mut AuthContext,
        env: &StepEnv<'_>,
    ) -> StepResult<StepOutcome> {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        if context.mark_entered(env.index, self.kind()) {
            self.counters.effects.fetch_add(1, Ordering::SeqCst);
        }
        Ok(StepOutcome::Continue)
    }
}

/// Applies a guarded effect, then suspends.
#[allow(dead_code)]
pub struct SuspendingStep {
    pub counters: Arc<Counters>,
}

#[async_trait]
impl PipelineStep for SuspendingStep {
    fn kind(&self) -> &'static str {
        "suspending"
    }

    async fn process(
        &self,
        context: &mut AuthContext,
        env: &StepEnv<'_>,
    ) -> StepResult<StepOutcome> {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        if context.mark_entered(env.index, self.kind()) {
            self.counters.effects.fetch_add(1, Ordering::SeqCst);
        }
        Ok(StepOutcome::Suspend(env.continuation("wait", &context.identifier)?))
    }
}

/// Blocks until released, signalling once it has been entered.
#[allow(dead_code)]
#[derive(Default)]
pub struct GateStep {
    pub entered: Notify,
    pub release: Notify,
    pub counters: Counters,
}

#[allow(dead_code)]
pub struct Gate(pub Arc<GateStep>);

#[async_trait]
impl PipelineStep for Gate {
    fn kind(&self) -> &'static str {
        "gate"
    }

    async fn process(
        &self,
        _context: &mut AuthContext,
        _env: &StepEnv<'_>,
    ) -> StepResult<StepOutcome> {
        self.0.counters.calls.fetch_add(1, Ordering::SeqCst);
        self.0.entered.notify_one();
        self.0.release.notified().await;
        Ok(StepOutcome::Continue)
    }
}

/// Always fails.
#[allow(dead_code)]
pub struct FailingStep;

#[async_trait]
impl PipelineStep for FailingStep {
    fn kind(&self) -> &'static str {
        "failing"
    }

    async fn process(
        &self,
        _context: &mut AuthContext,
        _env: &StepEnv<'_>,
    ) -> StepResult<StepOutcome> {
        Err(StepError::Failed("backend unavailable".to_string()))
    }
}
