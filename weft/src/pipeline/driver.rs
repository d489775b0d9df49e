//! The pipeline restarter: a trampolined state machine over the built
//! action sequence.
//!
//! The drive loop lives in one spawned task and dispatches every action
//! onto the injected [`TaskExecutor`](crate::executor::TaskExecutor) as a
//! fresh task, awaiting its completion over a oneshot channel. Pipeline
//! length is therefore bounded by queue memory, never by call-stack depth,
//! and a long synchronous handler cannot monopolize the caller's thread.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::errors::Fault;
use crate::eventual::Eventual;
use crate::executor::TaskExecutor;
use crate::path::Path;
use crate::pipeline::build::Action;
use crate::pipeline::options::StopPredicate;
use crate::pipeline::runner::run_step;
use crate::step::{ErrorContext, ErrorHandler};
use crate::Value;

/// The run-scoped configuration the driver needs.
#[derive(Clone)]
pub(crate) struct RunConfig {
    pub executor: Arc<dyn TaskExecutor>,
    pub stop_when: Option<StopPredicate>,
    pub out: Option<Path>,
}

/// Identity of the action whose failure is being recovered.
#[derive(Debug, Clone)]
struct FailingAction {
    step: String,
    stage: String,
}

/// The restarter's states. `Succeeded`/`Failed` are terminal.
enum RunState {
    Running {
        queue: VecDeque<Action>,
        value: Value,
    },
    Recovering {
        chain: VecDeque<ErrorHandler>,
        failing: FailingAction,
        /// Actions that were still pending after the failing one; the failed
        /// action itself is never retried.
        queue: VecDeque<Action>,
        /// The threaded value as of the failure.
        value: Value,
        fault: Fault,
    },
    Succeeded(Value),
    Failed(Fault),
}

/// Spawns the drive loop and returns the run's result slot.
pub(crate) fn launch(actions: Vec<Action>, initial: Value, config: RunConfig) -> Eventual<Value> {
    let (resolver, result) = Eventual::deferred();
    let executor = config.executor.clone();
    executor.spawn(Box::pin(async move {
        match drive(actions, initial, &config).await {
            Ok(value) => resolver.resolve(value),
            Err(fault) => resolver.reject(fault),
        }
    }));
    result
}

async fn drive(actions: Vec<Action>, initial: Value, config: &RunConfig) -> Result<Value, Fault> {
    let mut state = RunState::Running {
        queue: VecDeque::from(actions),
        value: initial,
    };

    loop {
        state = match state {
            RunState::Running { mut queue, value } => match queue.pop_front() {
                None => RunState::Succeeded(value),
                Some(action) => {
                    tracing::debug!(step = %action.step_id, stage = %action.stage, "dispatching action");
                    match dispatch(config.executor.as_ref(), action.clone(), value).await {
                        Ok(next) => after_success(config, queue, next),
                        Err(fault) => {
                            let value = fault.context.clone().unwrap_or(Value::Null);
                            RunState::Recovering {
                                chain: action.error_chain.clone().into(),
                                failing: FailingAction {
                                    step: action.step_id.clone(),
                                    stage: action.stage.clone(),
                                },
                                queue,
                                value,
                                fault,
                            }
                        }
                    }
                }
            },

            RunState::Recovering {
                mut chain,
                failing,
                queue,
                value,
                fault,
            } => match chain.pop_front() {
                // chain exhausted: the failure stands
                None => RunState::Failed(fault),
                Some(handler) => {
                    let context = ErrorContext {
                        step: failing.step.clone(),
                        stage: failing.stage.clone(),
                        value: value.clone(),
                        fault: fault.clone(),
                    };
                    match handler(context).settle().await {
                        Ok(recovered) => {
                            tracing::debug!(step = %failing.step, "recovery handler resolved the failure");
                            // recovery counts as a successful action completion
                            after_success(config, queue, recovered)
                        }
                        Err(new_fault) => RunState::Recovering {
                            chain,
                            failing,
                            queue,
                            value,
                            fault: new_fault,
                        },
                    }
                }
            },

            RunState::Succeeded(value) => return Ok(project(config, value)),
            RunState::Failed(fault) => {
                tracing::warn!(
                    step = fault.step.as_deref().unwrap_or("<unattributed>"),
                    kind = %fault.kind,
                    "pipeline run failed: {}",
                    fault.message
                );
                return Err(fault);
            }
        };
    }
}

fn after_success(config: &RunConfig, queue: VecDeque<Action>, value: Value) -> RunState {
    if stop_requested(config, &value) {
        tracing::debug!(remaining = queue.len(), "stop predicate hit, exiting early");
        RunState::Succeeded(value)
    } else {
        RunState::Running { queue, value }
    }
}

fn stop_requested(config: &RunConfig, value: &Value) -> bool {
    config.stop_when.as_ref().is_some_and(|stop| stop(value))
}

fn project(config: &RunConfig, value: Value) -> Value {
    match &config.out {
        Some(path) => path.get(&value).cloned().unwrap_or(Value::Null),
        None => value,
    }
}

/// Runs one action on the executor, never on the driver's own stack.
async fn dispatch(
    executor: &dyn TaskExecutor,
    action: Action,
    value: Value,
) -> Result<Value, Fault> {
    let (tx, rx) = oneshot::channel();
    executor.spawn(Box::pin(async move {
        let result = run_step(&action, value).settle().await;
        let _ = tx.send(result);
    }));
    match rx.await {
        Ok(result) => result,
        Err(_) => Err(Fault::fault("task executor dropped an in-flight action")),
    }
}
