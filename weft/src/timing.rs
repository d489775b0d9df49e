//! Timing instrumentation for pipeline runs.
//!
//! A pure pair over the threaded value: [`initialize`] stamps the run start,
//! [`augment`] stamps per-step elapsed time. All state lives in the value
//! itself, under the reserved [`TRACE_KEY`]; there is no process-wide clock
//! state. Instrumentation never fails a run: values with nowhere to write
//! (non-objects) pass through untouched.

use chrono::Utc;

use crate::path::Path;
use crate::pipeline::{AugmentFn, InitFn};
use crate::Value;

/// Reserved key the stamps live under.
pub const TRACE_KEY: &str = "__trace";

/// Stamps the run start (epoch milliseconds) into the value.
#[must_use]
pub fn initialize(value: Value) -> Value {
    if !value.is_object() {
        return value;
    }
    Path::new([TRACE_KEY, "started_ms"]).put(value, Value::from(Utc::now().timestamp_millis()))
}

/// Stamps the elapsed milliseconds since [`initialize`] under the step's id.
///
/// Without a prior [`initialize`] stamp (or on a non-object value) this is a
/// no-op.
#[must_use]
pub fn augment(value: Value, step_id: &str) -> Value {
    if !value.is_object() {
        return value;
    }
    let Some(started_ms) = Path::new([TRACE_KEY, "started_ms"])
        .get(&value)
        .and_then(Value::as_i64)
    else {
        return value;
    };
    let elapsed = Utc::now().timestamp_millis() - started_ms;
    Path::new([TRACE_KEY, "steps", step_id]).put(value, Value::from(elapsed))
}

/// Adapts [`initialize`] to the `initialize` run option.
#[must_use]
pub fn initialize_hook() -> InitFn {
    std::sync::Arc::new(|value| Ok(initialize(value)))
}

/// Adapts [`augment`] to the `augment` run option.
#[must_use]
pub fn augment_hook() -> AugmentFn {
    std::sync::Arc::new(|value, step_id| Ok(augment(value, step_id)))
}
