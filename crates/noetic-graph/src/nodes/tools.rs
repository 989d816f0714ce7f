//! Tools node (§4.J): executes every pending tool call against its matching
//! Contract, FIFO-matched by `(service, method)` — not by a stored id, since
//! reasoning never stamps one onto `ToolCallSpec`. A tool call with no
//! matching pending Contract still runs (the "legacy path"), it just can't
//! be tracked through the state machine, so a warning is logged instead of
//! failing the turn.

use crate::error::Result;
use crate::services::GraphServices;
use crate::state::{GraphState, GraphStatus};
use noetic_contracts::{Actor, ExecutionContract, ExecutionStatus};
use tracing::{instrument, warn};

#[instrument(skip(services, state))]
pub async fn run(services: &GraphServices<'_>, state: &mut GraphState) -> Result<()> {
    let calls = std::mem::take(&mut state.pending_tool_calls);
    let mut observations = Vec::with_capacity(calls.len());

    for call in calls {
        let contract_idx = state
            .pending_executions
            .iter()
            .position(|c| contract_matches(c, &call.service, &call.method));

        if contract_idx.is_none() {
            warn!(
                service = %call.service,
                method = %call.method,
                "noetic-graph: tool call has no matching pending contract, running uncontracted"
            );
        }

        if let Some(idx) = contract_idx {
            let contract = &mut state.pending_executions[idx];
            if let Err(err) = contract.transition("start", Actor::ToolNode, None) {
                state.status = GraphStatus::Error;
                return Err(err.into());
            }
            state.trace(
                "tools",
                &format!("transition:{}:pending->running", contract.execution_id),
                None,
            );
        }

        let timeout = contract_idx
            .map(|idx| &state.pending_executions[idx])
            .and_then(|c| c.timeout_seconds)
            .map(std::time::Duration::from_secs)
            .unwrap_or_else(|| services.graph.tool_timeout());
        let outcome = noetic_toolhost::execute(
            services.tool_hosts,
            &call.service,
            &call.method,
            call.args.clone(),
            timeout,
        )
        .await?;

        if let Some(idx) = contract_idx {
            let trigger = if outcome.success { "succeed" } else { "fail" };
            let contract = &mut state.pending_executions[idx];
            contract.result = outcome.result.clone().map(serde_json::Value::String);
            contract.error_message = outcome.error.clone();
            if let Err(err) = contract.transition(trigger, Actor::ToolNode, outcome.error.clone()) {
                state.status = GraphStatus::Error;
                return Err(err.into());
            }
            state.trace(
                "tools",
                &format!("transition:{}:running->{}", contract.execution_id, contract.status.value()),
                None,
            );
        }

        if let Some(idx) = contract_idx {
            let contract = state.pending_executions.remove(idx);
            if contract.status.is_terminal() {
                state.completed_executions.push(contract);
            } else {
                state.pending_executions.push(contract);
            }
        }

        let summary = if outcome.success {
            format!("{}.{} -> {}", call.service, call.method, outcome.result.clone().unwrap_or_default())
        } else {
            format!("{}.{} failed: {}", call.service, call.method, outcome.error.clone().unwrap_or_default())
        };
        state.tool_call_history.push(summary.clone());
        observations.push(summary);
    }

    state.observation = if observations.is_empty() {
        None
    } else {
        Some(observations.join("\n"))
    };

    state.trace("tools", "batch-complete", Some(format!("{} calls", state.tool_call_history.len())));
    Ok(())
}

fn contract_matches(contract: &ExecutionContract, service: &str, method: &str) -> bool {
    if contract.status != ExecutionStatus::Pending {
        return false;
    }
    contract.action_detail.get("service").and_then(|v| v.as_str()) == Some(service)
        && contract.action_detail.get("method").and_then(|v| v.as_str()) == Some(method)
}
