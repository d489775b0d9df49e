//! Run options and their structural validation.

use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::{BuildError, Fault};
use crate::executor::{TaskExecutor, TokioExecutor};
use crate::path::Path;
use crate::step::{ENTER, LEAVE};
use crate::Value;

/// Context-stamping hook applied to the threaded value before each action's
/// handler. A fault raised here counts as the action's own failure.
pub type AugmentFn = Arc<dyn Fn(Value, &str) -> Result<Value, Fault> + Send + Sync>;

/// Pre-processing applied to the initial value before the first action.
pub type InitFn = Arc<dyn Fn(Value) -> Result<Value, Fault> + Send + Sync>;

/// Early-exit predicate evaluated after every successful action.
pub type StopPredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Options for a pipeline run.
#[derive(Clone)]
pub struct RunOptions {
    /// Context-stamping hook.
    pub augment: Option<AugmentFn>,
    /// Initial-value pre-processing.
    pub initialize: Option<InitFn>,
    /// Task pool every action boundary is dispatched through.
    pub executor: Arc<dyn TaskExecutor>,
    /// Ordered stage names; traversal direction flips after every stage.
    pub stages: Vec<String>,
    /// Early-exit predicate.
    pub stop_when: Option<StopPredicate>,
    /// Address to project the final value from.
    pub out: Option<Path>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            augment: None,
            initialize: None,
            executor: Arc::new(TokioExecutor::new()),
            stages: vec![ENTER.to_string(), LEAVE.to_string()],
            stop_when: None,
            out: None,
        }
    }
}

impl RunOptions {
    /// Creates default options: two stages (`enter`, `leave`), tokio
    /// executor, no hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the context-stamping hook.
    #[must_use]
    pub fn with_augment<F>(mut self, augment: F) -> Self
    where
        F: Fn(Value, &str) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        self.augment = Some(Arc::new(augment));
        self
    }

    /// Sets the initial-value pre-processing hook.
    #[must_use]
    pub fn with_initialize<F>(mut self, initialize: F) -> Self
    where
        F: Fn(Value) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        self.initialize = Some(Arc::new(initialize));
        self
    }

    /// Sets the task executor.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Replaces the stage list.
    #[must_use]
    pub fn with_stages<I, S>(mut self, stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stages = stages.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the early-exit predicate.
    #[must_use]
    pub fn stop_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.stop_when = Some(Arc::new(predicate));
        self
    }

    /// Synonym for [`RunOptions::stop_when`].
    #[must_use]
    pub fn terminate_when<F>(self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.stop_when(predicate)
    }

    /// Sets the final-value projection address.
    #[must_use]
    pub fn with_out(mut self, path: Path) -> Self {
        self.out = Some(path);
        self
    }

    /// Checks the options' structure.
    ///
    /// # Errors
    ///
    /// Invalid-configuration when the stage list is empty, a stage name is
    /// blank, or stage names repeat.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.stages.is_empty() {
            return Err(BuildError::invalid_config("stage list cannot be empty"));
        }
        let mut seen = HashSet::new();
        for stage in &self.stages {
            if stage.trim().is_empty() {
                return Err(BuildError::invalid_config("stage name cannot be blank"));
            }
            if !seen.insert(stage.as_str()) {
                return Err(BuildError::invalid_config(format!(
                    "duplicate stage name '{stage}'"
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("augment_present", &self.augment.is_some())
            .field("initialize_present", &self.initialize.is_some())
            .field("stages", &self.stages)
            .field("stop_when_present", &self.stop_when.is_some())
            .field("out", &self.out)
            .finish()
    }
}
