//! The action runner: executes one action against the threaded value.

use crate::errors::Fault;
use crate::eventual::Eventual;
use crate::pipeline::build::Action;
use crate::Value;

/// Runs one action.
///
/// Order of operations: augment hook, guard, input extraction, handler,
/// output policy. A guard returning false skips the handler, addressing and
/// discard entirely and yields the (augmented) value unchanged. Any failure
/// along the way is re-raised as a structured fault carrying the action's id
/// and the working value, with the original classification and cause
/// preserved.
///
/// A handler that realizes immediately keeps the whole call realized; the
/// pending machinery is only touched for genuinely asynchronous results.
pub(crate) fn run_step(action: &Action, value: Value) -> Eventual<Value> {
    // 1. instrumentation; its failure is the action's own
    let value = match &action.augment {
        Some(augment) => match augment(value.clone(), &action.step_id) {
            Ok(augmented) => augmented,
            Err(fault) => return Eventual::fault(attribute(fault, action, value)),
        },
        None => value,
    };

    // 2. guard
    if let Some(guard) = &action.guard {
        if !guard(&value) {
            tracing::debug!(step = %action.step_id, stage = %action.stage, "guard rejected, skipping");
            return Eventual::ok(value);
        }
    }

    // 3. extract the addressed input
    let input = match &action.input {
        Some(path) => path.get(&value).cloned().unwrap_or(Value::Null),
        None => value.clone(),
    };

    // 4. handler
    match (action.handler)(input) {
        Eventual::Ready(result) => Eventual::from_result(settle_outcome(action, value, result)),
        Eventual::Pending(fut) => {
            let action = action.clone();
            Eventual::from_future(async move {
                let result = fut.await;
                settle_outcome(&action, value, result)
            })
        }
    }
}

/// Output policy on success, fault attribution on failure.
fn settle_outcome(
    action: &Action,
    current: Value,
    result: Result<Value, Fault>,
) -> Result<Value, Fault> {
    match result {
        Ok(produced) => Ok(apply_output(action, current, produced)),
        Err(fault) => Err(attribute(fault, action, current)),
    }
}

fn apply_output(action: &Action, current: Value, produced: Value) -> Value {
    if action.discard {
        current
    } else if let Some(path) = &action.output {
        path.put(current, produced)
    } else {
        produced
    }
}

fn attribute(fault: Fault, action: &Action, at_failure: Value) -> Fault {
    tracing::warn!(
        step = %action.step_id,
        stage = %action.stage,
        kind = %fault.kind,
        "action failed: {}",
        fault.message
    );
    fault.with_step(action.step_id.clone()).with_context(at_failure)
}
