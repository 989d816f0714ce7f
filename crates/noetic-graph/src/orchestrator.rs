//! The turn orchestrator (§4.J edges): drives the fixed node sequence and
//! the reasoning/tools loop, enforcing the outer and inner loop guards.
//!
//! Entry -> intent -> emotion -> memory-recall -> reasoning. From reasoning:
//! if a tool call was approved, go to tools and loop back to reasoning; if
//! an external-step request is pending, go to external-step and suspend;
//! an idempotency refusal loops straight back to reasoning without visiting
//! tools at all; otherwise the turn ends.

use crate::error::Result;
use crate::node::TurnObserver;
use crate::nodes::{emotion, external_step, intent, memory_recall, reasoning, tools};
use crate::services::GraphServices;
use crate::state::{GraphState, GraphStatus};

pub async fn run_turn(
    services: &GraphServices<'_>,
    observer: &mut dyn TurnObserver,
    state: &mut GraphState,
) -> Result<()> {
    intent::run(services, state).await?;
    observer.after_node("intent", state).await?;

    emotion::run(services, state).await?;
    observer.after_node("emotion", state).await?;

    memory_recall::run(services, state).await?;
    observer.after_node("memory-recall", state).await?;

    loop {
        state.inner_iterations = 0;
        loop {
            if state.inner_iterations >= services.graph.inner_loop_max {
                return stop_on_max_loop(state, "inner", observer).await;
            }
            reasoning::run(services, state).await?;
            state.inner_iterations += 1;
            observer.after_node("reasoning", state).await?;

            if state.idempotency_refused {
                continue;
            }
            break;
        }

        if !state.pending_tool_calls.is_empty() {
            if state.outer_iterations >= services.graph.outer_loop_max {
                return stop_on_max_loop(state, "outer", observer).await;
            }
            state.outer_iterations += 1;

            tools::run(services, state).await?;
            observer.after_node("tools", state).await?;
            continue;
        }

        if state.ecs_request.is_some() {
            external_step::run(services, state).await?;
            observer.after_node("external-step", state).await?;
            return Ok(());
        }

        state.status = GraphStatus::Idle;
        return Ok(());
    }
}

async fn stop_on_max_loop(
    state: &mut GraphState,
    which: &str,
    observer: &mut dyn TurnObserver,
) -> Result<()> {
    state.response = Some(format!(
        "I've gone back and forth on this longer than I should without landing on an answer. Let's try a different approach."
    ));
    state.status = GraphStatus::Idle;
    state.trace("orchestrator", "max-loop", Some(format!("{which} bound exceeded")));
    observer.after_node("orchestrator", state).await?;
    Ok(())
}
