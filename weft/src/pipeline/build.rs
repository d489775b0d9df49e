//! The stage builder: steps in, flat ordered action sequence out.

use crate::path::Path;
use crate::pipeline::options::{AugmentFn, RunOptions};
use crate::step::{ErrorHandler, Guard, Handler, StepDef};

/// One (step, stage) execution unit in the built sequence.
///
/// Actions are positional; the whole pipeline is a linear sequence, not a
/// tree. Everything an action carries is fixed at build time.
#[derive(Clone)]
pub struct Action {
    /// Id of the declaring step.
    pub step_id: String,
    /// Stage this action runs in.
    pub stage: String,
    pub(crate) handler: Handler,
    pub(crate) input: Option<Path>,
    pub(crate) output: Option<Path>,
    pub(crate) guard: Option<Guard>,
    pub(crate) discard: bool,
    pub(crate) augment: Option<AugmentFn>,
    /// Recovery handlers available to this action, nearest declared first,
    /// starting with the declaring step's own.
    pub(crate) error_chain: Vec<ErrorHandler>,
}

impl Action {
    /// Number of recovery handlers reachable from this action.
    #[must_use]
    pub fn error_chain_len(&self) -> usize {
        self.error_chain.len()
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("step_id", &self.step_id)
            .field("stage", &self.stage)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("discard", &self.discard)
            .field("error_chain_len", &self.error_chain.len())
            .finish()
    }
}

/// Builds the flat action sequence for a run.
///
/// The direction flag starts forward and flips after every stage, so the
/// default `enter`/`leave` pair traverses the steps outward-in and then
/// unwinds inward-out. Each emitted action's error chain is computed here,
/// once, from build order: the declared handlers of the emitted prefix
/// (including the action's own step), most recent first.
///
/// Deterministic: identical steps and stages yield an identical sequence
/// and identical chains.
pub(crate) fn build_actions(steps: &[StepDef], options: &RunOptions) -> Vec<Action> {
    let mut actions: Vec<Action> = Vec::new();
    let mut declared: Vec<Option<ErrorHandler>> = Vec::new();
    let mut forward = true;

    for stage in &options.stages {
        let mut selected: Vec<&StepDef> = steps
            .iter()
            .filter(|step| step.handler_for(stage).is_some())
            .collect();
        if !forward {
            selected.reverse();
        }

        for step in selected {
            let Some(handler) = step.handler_for(stage) else {
                continue;
            };
            declared.push(step.on_error.clone());
            let error_chain: Vec<ErrorHandler> =
                declared.iter().rev().filter_map(Clone::clone).collect();

            actions.push(Action {
                step_id: step.id.clone(),
                stage: stage.clone(),
                handler: handler.clone(),
                input: step.input_path().cloned(),
                output: step.output_path().cloned(),
                guard: step.guard.clone(),
                discard: step.discard,
                augment: options.augment.clone(),
                error_chain,
            });
        }

        forward = !forward;
    }

    tracing::debug!(
        actions = actions.len(),
        stages = options.stages.len(),
        "built action sequence"
    );
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{sync_handler, StepDef};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn noop() -> crate::step::Handler {
        sync_handler(Ok)
    }

    fn step(id: &str) -> StepDef {
        StepDef::named(id).enter(noop())
    }

    fn ids(actions: &[Action]) -> Vec<(String, String)> {
        actions
            .iter()
            .map(|a| (a.step_id.clone(), a.stage.clone()))
            .collect()
    }

    #[test]
    fn enter_forward_then_leave_reversed() {
        let steps = vec![
            StepDef::named("a").enter(noop()).leave(noop()),
            StepDef::named("b").enter(noop()).leave(noop()),
            StepDef::named("c").enter(noop()).leave(noop()),
        ];
        let actions = build_actions(&steps, &RunOptions::new());
        assert_eq!(
            ids(&actions),
            vec![
                ("a".to_string(), "enter".to_string()),
                ("b".to_string(), "enter".to_string()),
                ("c".to_string(), "enter".to_string()),
                ("c".to_string(), "leave".to_string()),
                ("b".to_string(), "leave".to_string()),
                ("a".to_string(), "leave".to_string()),
            ]
        );
    }

    #[test]
    fn steps_without_a_stage_handler_are_filtered() {
        let steps = vec![
            step("enter-only"),
            StepDef::named("leave-only").leave(noop()),
        ];
        let actions = build_actions(&steps, &RunOptions::new());
        assert_eq!(
            ids(&actions),
            vec![
                ("enter-only".to_string(), "enter".to_string()),
                ("leave-only".to_string(), "leave".to_string()),
            ]
        );
    }

    #[test]
    fn direction_flips_after_every_stage() {
        let steps = vec![
            StepDef::named("a")
                .on_stage("one", noop())
                .on_stage("two", noop())
                .on_stage("three", noop()),
            StepDef::named("b")
                .on_stage("one", noop())
                .on_stage("two", noop())
                .on_stage("three", noop()),
        ];
        let options = RunOptions::new().with_stages(["one", "two", "three"]);
        let actions = build_actions(&steps, &options);
        let sequence: Vec<&str> = actions.iter().map(|a| a.step_id.as_str()).collect();
        assert_eq!(sequence, vec!["a", "b", "b", "a", "a", "b"]);
    }

    #[test]
    fn error_chain_starts_with_own_handler_then_walks_backward() {
        let steps = vec![
            step("first").on_error(|_| crate::eventual::Eventual::ok(json!(1))),
            step("second"),
            step("third").on_error(|_| crate::eventual::Eventual::ok(json!(3))),
        ];
        let options = RunOptions::new().with_stages(["enter"]);
        let actions = build_actions(&steps, &options);

        assert_eq!(actions[0].error_chain_len(), 1); // own
        assert_eq!(actions[1].error_chain_len(), 1); // first's only
        assert_eq!(actions[2].error_chain_len(), 2); // own, then first's
    }

    #[test]
    fn chain_reaches_back_across_stages() {
        let steps = vec![
            StepDef::named("outer")
                .enter(noop())
                .leave(noop())
                .on_error(|_| crate::eventual::Eventual::ok(json!(0))),
            StepDef::named("inner").enter(noop()).leave(noop()),
        ];
        let actions = build_actions(&steps, &RunOptions::new());
        // leave-stage actions still see the enter-stage handler declarations
        let leave_inner = actions
            .iter()
            .find(|a| a.step_id == "inner" && a.stage == "leave")
            .map(Action::error_chain_len);
        assert_eq!(leave_inner, Some(1));

        // a step emitting two actions contributes its handler at both
        let leave_outer = actions
            .iter()
            .find(|a| a.step_id == "outer" && a.stage == "leave")
            .map(Action::error_chain_len);
        assert_eq!(leave_outer, Some(2));
    }

    #[test]
    fn build_is_deterministic() {
        let make = || {
            vec![
                StepDef::named("a").enter(noop()).leave(noop()),
                StepDef::named("b").enter(noop()),
                StepDef::named("c").leave(noop()),
            ]
        };
        let first = build_actions(&make(), &RunOptions::new());
        let second = build_actions(&make(), &RunOptions::new());
        assert_eq!(ids(&first), ids(&second));
        let chains = |actions: &[Action]| {
            actions
                .iter()
                .map(Action::error_chain_len)
                .collect::<Vec<_>>()
        };
        assert_eq!(chains(&first), chains(&second));
    }
}
