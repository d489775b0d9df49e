//! # Weft
//!
//! An asynchronous stage-pipeline engine. Weft threads a value through an
//! ordered list of steps, where each step's handler may complete
//! synchronously or asynchronously, with:
//!
//! - **Two-phase traversal**: an `enter` pass over the steps followed by a
//!   reversed `leave` pass (arbitrary stage lists are supported; direction
//!   flips after every stage)
//! - **Stack safety**: every action boundary is a fresh dispatch onto a
//!   task executor, so chain length never grows the call stack
//! - **Guards and addressing**: per-step predicates, and `in`/`out`/`lens`
//!   paths extracting handler input from (and writing output into) a nested
//!   value
//! - **Backward error recovery**: each action carries a precomputed chain of
//!   recovery handlers, searched outward from the point of failure toward
//!   the start of the pipeline
//! - **Combinators**: a fan-in [`zip`](eventual::zip) over mixed sync/async
//!   values and a selective [`catch_matching`](eventual::catch_matching)
//!   interceptor, also usable standalone
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use weft::prelude::*;
//! use serde_json::json;
//!
//! let inc = sync_handler(|v| Ok(json!(v.as_i64().unwrap_or(0) + 1)));
//! let pipeline = Pipeline::build(
//!     vec![StepDef::named("inc").enter(inc).into()],
//!     RunOptions::new(),
//! )?;
//! let result = pipeline.run(json!(0)).settle().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]

pub mod errors;
pub mod eventual;
pub mod executor;
pub mod path;
pub mod pipeline;
pub mod step;
pub mod timing;

/// The threaded value passed between actions. Opaque to the engine except
/// where a [`Path`](path::Path) names a sub-location.
pub type Value = serde_json::Value;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::{BuildError, Fault, FaultKind};
    pub use crate::eventual::{catch_matching, zip, CatchPattern, Caught, Eventual, Resolver};
    pub use crate::executor::{HandleExecutor, TaskExecutor, TokioExecutor};
    pub use crate::path::Path;
    pub use crate::pipeline::{run, Pipeline, RunOptions};
    pub use crate::step::{
        async_handler, normalize, sync_handler, ErrorContext, ErrorHandler, Guard, Handler,
        StepDecl, StepDef, ENTER, LEAVE,
    };
    pub use crate::Value;
}
