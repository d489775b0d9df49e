//! Pipeline assembly and execution.
//!
//! [`Pipeline::build`] normalizes the step declarations, validates the
//! options, and fixes the action sequence, all synchronously and before any
//! asynchronous work starts. [`Pipeline::run`] then threads a value through
//! the sequence; a built pipeline is immutable and reusable, and concurrent
//! runs are independent.

mod build;
mod driver;
mod options;
mod runner;


pub use build::Action;
pub use options::{AugmentFn, InitFn, RunOptions, StopPredicate};

use std::collections::HashSet;

use crate::errors::BuildError;
use crate::eventual::Eventual;
use crate::step::{normalize, StepDecl};
use crate::Value;

/// A built, reusable pipeline.
#[derive(Clone)]
pub struct Pipeline {
    actions: Vec<Action>,
    initialize: Option<InitFn>,
    config: driver::RunConfig,
}

impl Pipeline {
    /// Assembles a pipeline from step declarations and options.
    ///
    /// # Errors
    ///
    /// Invalid-configuration when the options fail structural validation;
    /// invalid-step when a declaration is malformed or two steps share an
    /// id. Nothing asynchronous has started when this returns an error.
    pub fn build(steps: Vec<StepDecl>, options: RunOptions) -> Result<Self, BuildError> {
        options.validate()?;

        let defs = steps
            .into_iter()
            .map(normalize)
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        for def in &defs {
            if !seen.insert(def.id.as_str()) {
                return Err(BuildError::invalid_step(format!(
                    "duplicate step id '{}'",
                    def.id
                )));
            }
        }

        let actions = build::build_actions(&defs, &options);
        Ok(Self {
            actions,
            initialize: options.initialize.clone(),
            config: driver::RunConfig {
                executor: options.executor.clone(),
                stop_when: options.stop_when.clone(),
                out: options.out.clone(),
            },
        })
    }

    /// Threads a value through the pipeline.
    ///
    /// The returned eventual is the run's single-assignment result slot: it
    /// settles exactly once, with the final (possibly projected) value or
    /// with the structured fault of the failing action.
    #[must_use]
    pub fn run(&self, initial: Value) -> Eventual<Value> {
        let initial = match &self.initialize {
            Some(initialize) => match initialize(initial) {
                Ok(value) => value,
                Err(fault) => return Eventual::fault(fault),
            },
            None => initial,
        };
        driver::launch(self.actions.clone(), initial, self.config.clone())
    }

    /// Number of actions in the built sequence.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("actions", &self.actions)
            .field("initialize_present", &self.initialize.is_some())
            .finish()
    }
}

/// Builds and immediately runs a pipeline.
///
/// # Errors
///
/// Build errors are returned synchronously, before any asynchronous work.
pub fn run(
    initial: Value,
    steps: Vec<StepDecl>,
    options: RunOptions,
) -> Result<Eventual<Value>, BuildError> {
    Ok(Pipeline::build(steps, options)?.run(initial))
}
