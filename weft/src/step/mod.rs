//! Step declarations and the normalizer.
//!
//! A [`StepDef`] is the canonical, immutable description of one pipeline
//! step: which stages it participates in, how its input is addressed, and
//! how its failures recover. Steps can be declared in several looser shapes
//! ([`StepDecl`]); [`normalize`] turns each of them into a canonical record
//! or rejects it as invalid.

use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::{BuildError, Fault};
use crate::eventual::Eventual;
use crate::path::Path;
use crate::Value;

/// The `enter` stage name, the forward pass of the default traversal.
pub const ENTER: &str = "enter";

/// The `leave` stage name, the reversed unwind pass of the default traversal.
pub const LEAVE: &str = "leave";

/// A step handler: consumes the addressed input, produces the step's result,
/// possibly asynchronously.
pub type Handler = Arc<dyn Fn(Value) -> Eventual<Value> + Send + Sync>;

/// A predicate gating whether a step's handler executes at all.
pub type Guard = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Everything a recovery handler learns about the failure it may resolve.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Id of the failing action.
    pub step: String,
    /// Stage the failing action ran in.
    pub stage: String,
    /// The threaded value as of the failure.
    pub value: Value,
    /// The failure itself.
    pub fault: Fault,
}

/// A per-step recovery handler. Returning a value resumes the run after the
/// failing action; returning a fault passes recovery to the next handler in
/// the chain.
pub type ErrorHandler = Arc<dyn Fn(ErrorContext) -> Eventual<Value> + Send + Sync>;

/// Wraps a synchronous, fallible function as a [`Handler`].
pub fn sync_handler<F>(f: F) -> Handler
where
    F: Fn(Value) -> Result<Value, Fault> + Send + Sync + 'static,
{
    Arc::new(move |value| Eventual::from_result(f(value)))
}

/// Wraps an async function as a [`Handler`].
pub fn async_handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Value, Fault>> + Send + 'static,
{
    Arc::new(move |value| Eventual::from_future(f(value)))
}

/// Canonical description of one pipeline step. Immutable once normalized.
#[derive(Clone)]
pub struct StepDef {
    /// Unique id within a pipeline.
    pub id: String,
    /// Handlers keyed by stage name. At least one must be present.
    pub handlers: BTreeMap<String, Handler>,
    /// Address the handler's input is extracted from.
    pub input: Option<Path>,
    /// Address the handler's result is written back to.
    pub output: Option<Path>,
    /// Combined address: same path for extraction and write-back.
    /// Supersedes `input`/`output`; declaring both is invalid.
    pub lens: Option<Path>,
    /// Predicate gating execution.
    pub guard: Option<Guard>,
    /// Run the handler but leave the threaded value unmodified.
    pub discard: bool,
    /// Recovery handler for this step's failures (and failures of later
    /// steps whose own chains reach back this far).
    pub on_error: Option<ErrorHandler>,
}

impl StepDef {
    /// Starts an empty step with the given id.
    #[must_use]
    pub fn named(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            handlers: BTreeMap::new(),
            input: None,
            output: None,
            lens: None,
            guard: None,
            discard: false,
            on_error: None,
        }
    }

    /// Sets the `enter` handler.
    #[must_use]
    pub fn enter(self, handler: Handler) -> Self {
        self.on_stage(ENTER, handler)
    }

    /// Sets the `leave` handler.
    #[must_use]
    pub fn leave(self, handler: Handler) -> Self {
        self.on_stage(LEAVE, handler)
    }

    /// Sets the handler for an arbitrary stage name.
    #[must_use]
    pub fn on_stage(mut self, stage: impl Into<String>, handler: Handler) -> Self {
        self.handlers.insert(stage.into(), handler);
        self
    }

    /// Sets the input address.
    #[must_use]
    pub fn with_input(mut self, path: Path) -> Self {
        self.input = Some(path);
        self
    }

    /// Sets the output address.
    #[must_use]
    pub fn with_output(mut self, path: Path) -> Self {
        self.output = Some(path);
        self
    }

    /// Sets the combined input/output address.
    #[must_use]
    pub fn with_lens(mut self, path: Path) -> Self {
        self.lens = Some(path);
        self
    }

    /// Sets the guard predicate.
    #[must_use]
    pub fn with_guard<F>(mut self, guard: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Marks the step as discarding: the handler runs for its effects only.
    #[must_use]
    pub fn discarding(mut self) -> Self {
        self.discard = true;
        self
    }

    /// Sets the recovery handler.
    #[must_use]
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(ErrorContext) -> Eventual<Value> + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(handler));
        self
    }

    /// The handler declared for a stage, if any.
    #[must_use]
    pub fn handler_for(&self, stage: &str) -> Option<&Handler> {
        self.handlers.get(stage)
    }

    /// The effective extraction address: `lens` wins over `input`.
    #[must_use]
    pub fn input_path(&self) -> Option<&Path> {
        self.lens.as_ref().or(self.input.as_ref())
    }

    /// The effective write-back address: `lens` wins over `output`.
    #[must_use]
    pub fn output_path(&self) -> Option<&Path> {
        self.lens.as_ref().or(self.output.as_ref())
    }

    /// Checks the declaration's structure.
    ///
    /// # Errors
    ///
    /// Invalid-step when the id is blank, no stage has a handler, or `lens`
    /// is combined with `input`/`output`.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.id.trim().is_empty() {
            return Err(BuildError::invalid_step("step id cannot be blank"));
        }
        if self.handlers.is_empty() {
            return Err(BuildError::invalid_step(format!(
                "step '{}' declares no handler for any stage",
                self.id
            )));
        }
        if self.lens.is_some() && (self.input.is_some() || self.output.is_some()) {
            return Err(BuildError::invalid_step(format!(
                "step '{}' combines lens with in/out addressing",
                self.id
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for StepDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepDef")
            .field("id", &self.id)
            .field("stages", &self.handlers.keys().collect::<Vec<_>>())
            .field("input", &self.input)
            .field("output", &self.output)
            .field("lens", &self.lens)
            .field("guard_present", &self.guard.is_some())
            .field("discard", &self.discard)
            .field("on_error_present", &self.on_error.is_some())
            .finish()
    }
}

/// The loose step declaration shapes accepted by [`normalize`].
#[derive(Clone)]
pub enum StepDecl {
    /// A structured record, passed through after validation.
    Def(StepDef),
    /// An `(id, handler)` pair; the handler becomes the `enter` handler.
    Pair(String, Handler),
    /// A bare handler; a unique id is generated.
    Handler(Handler),
}

impl StepDecl {
    /// Declares a step from a named callable, deriving the id from the
    /// callable's qualified type name.
    pub fn named_ref<F>(f: F) -> Self
    where
        F: Fn(Value) -> Eventual<Value> + Send + Sync + 'static,
    {
        Self::Pair(std::any::type_name::<F>().to_string(), Arc::new(f))
    }
}

impl From<StepDef> for StepDecl {
    fn from(def: StepDef) -> Self {
        Self::Def(def)
    }
}

impl std::fmt::Debug for StepDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Def(def) => f.debug_tuple("Def").field(def).finish(),
            Self::Pair(id, _) => f.debug_tuple("Pair").field(id).finish(),
            Self::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// Turns a loose declaration into a canonical [`StepDef`].
///
/// Pure: the same declaration always normalizes to the same record (modulo
/// the generated id of a bare handler).
///
/// # Errors
///
/// Invalid-step for structurally invalid declarations.
pub fn normalize(decl: StepDecl) -> Result<StepDef, BuildError> {
    match decl {
        StepDecl::Def(def) => {
            def.validate()?;
            Ok(def)
        }
        StepDecl::Pair(id, handler) => {
            let def = StepDef::named(id).enter(handler);
            def.validate()?;
            Ok(def)
        }
        StepDecl::Handler(handler) => {
            Ok(StepDef::named(format!("step-{}", Uuid::new_v4())).enter(handler))
        }
    }
}
