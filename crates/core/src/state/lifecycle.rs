//! Chain lifecycle state machine.
//!
//! This module provides the transitions of a chain instance,
//! each of which records an event in the event sink.
//!
//! Created -> Running -> {Suspended <-> Resumed} -> {Terminated | Rejected}

use super::error::{StateError, StateResult};
use crate::sink::EventSink;
use ac_protocol::{AuthContext, ChainStatus, Event, RejectReason};

fn lifecycle_event(context: &AuthContext, kind: &str) -> Event {
    Event::new(kind)
        .with_field("state_id", context.identifier.as_str())
        .with_field("chain_id", context.chain_id.as_str())
        .with_field("step_index", context.step_index)
        .with_field("track_id", context.metadata.track_id.as_str())
}

fn transition(context: &mut AuthContext, next: ChainStatus) -> StateResult<()> {
    let from = context.metadata.status;
    if !from.can_transition_to(next) {
        return Err(StateError::InvalidTransition { from, to: next });
    }
    context.metadata.status = next;
    context.touch();
    Ok(())
}

/// Transition a fresh context to Running.
pub fn start_chain(context: &mut AuthContext, sink: &dyn EventSink) -> StateResult<()> {
    transition(context, ChainStatus::Running)?;
    tracing::info!(state_id = %context.identifier, chain_id = %context.chain_id, "Chain started");
    sink.emit(lifecycle_event(context, "chain:started"));
    Ok(())
}

/// Transition to Suspended, remembering which step kind suspended.
pub fn suspend_chain(
    context: &mut AuthContext,
    stage: &str,
    sink: &dyn EventSink,
) -> StateResult<()> {
    transition(context, ChainStatus::Suspended)?;
    context.metadata.stage = Some(stage.to_string());
    tracing::info!(state_id = %context.identifier, stage, "Chain suspended");
    sink.emit(lifecycle_event(context, "chain:suspended").with_field("stage", stage));
    Ok(())
}

/// Transition a reloaded context from Suspended to Resumed.
pub fn resume_chain(context: &mut AuthContext, sink: &dyn EventSink) -> StateResult<()> {
    transition(context, ChainStatus::Resumed)?;
    tracing::info!(
        state_id = %context.identifier,
        step_index = context.step_index,
        "Chain resumed"
    );
    sink.emit(lifecycle_event(context, "chain:resumed"));
    Ok(())
}

/// Mark the chain as successfully finished.
pub fn terminate_chain(context: &mut AuthContext, sink: &dyn EventSink) -> StateResult<()> {
    transition(context, ChainStatus::Terminated)?;
    tracing::info!(state_id = %context.identifier, "Chain terminated");
    sink.emit(lifecycle_event(context, "chain:terminated"));
    Ok(())
}

/// Mark the chain as failed.
pub fn reject_chain(
    context: &mut AuthContext,
    reason: &RejectReason,
    sink: &dyn EventSink,
) -> StateResult<()> {
    transition(context, ChainStatus::Rejected)?;
    tracing::info!(state_id = %context.identifier, reason = reason.kind(), "Chain rejected");
    sink.emit(lifecycle_event(context, "chain:rejected").with_field("reason", reason.kind()));
    Ok(())
}
