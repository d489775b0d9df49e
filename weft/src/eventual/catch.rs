//! Selective, pattern-matched interception of failures in a chain.

use std::sync::Arc;

use super::Eventual;
use crate::errors::{Fault, FaultKind};
use crate::Value;

/// What a matched handler receives.
#[derive(Debug, Clone)]
pub enum Caught {
    /// The intercepted fault itself.
    Fault(Fault),
    /// A value selected from the fault (its data payload, or whatever a
    /// predicate pattern returned).
    Data(Value),
}

/// A pattern deciding whether an interceptor fires for a given fault.
///
/// Passing `None` to [`catch_matching`] matches every fault.
#[derive(Clone)]
pub enum CatchPattern {
    /// Matches when the fault's classification equals the tag. The handler
    /// receives the fault's data payload, not the fault itself.
    Kind(FaultKind),
    /// Matches when the function selects a value from the fault. The handler
    /// receives the selected value.
    Predicate(Arc<dyn Fn(&Fault) -> Option<Value> + Send + Sync>),
    /// Matches on the fault's cause. The handler receives the fault itself.
    Cause(Arc<dyn Fn(&Fault) -> bool + Send + Sync>),
}

impl CatchPattern {
    /// Pattern matching a classification tag.
    #[must_use]
    pub fn kind(kind: FaultKind) -> Self {
        Self::Kind(kind)
    }

    /// Pattern matching a user-defined classification tag.
    #[must_use]
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Kind(FaultKind::Tag(tag.into()))
    }

    /// Pattern matching via a selector function.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Fault) -> Option<Value> + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Pattern matching when the fault's cause is an `E`.
    #[must_use]
    pub fn cause_of<E>() -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Cause(Arc::new(Fault::cause_is::<E>))
    }

    fn catch(&self, fault: Fault) -> Result<Caught, Fault> {
        match self {
            Self::Kind(kind) if fault.kind == *kind => Ok(Caught::Data(fault.data.clone())),
            Self::Predicate(selector) => match selector(&fault) {
                Some(selected) => Ok(Caught::Data(selected)),
                None => Err(fault),
            },
            Self::Cause(matcher) if matcher(&fault) => Ok(Caught::Fault(fault)),
            _ => Err(fault),
        }
    }
}

impl std::fmt::Debug for CatchPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kind(kind) => f.debug_tuple("Kind").field(kind).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
            Self::Cause(_) => f.write_str("Cause(..)"),
        }
    }
}

/// Intercepts a failure flowing through a chain.
///
/// When the value succeeds it passes through untouched (and stays realized
/// if it was). When it fails and the pattern matches, the handler's result
/// becomes the chain's new value; a fault raised by the handler propagates
/// as a new failure. When the pattern does not match, the original fault
/// propagates unchanged so an outer interceptor can try.
pub fn catch_matching<H>(
    value: Eventual<Value>,
    pattern: Option<CatchPattern>,
    handler: H,
) -> Eventual<Value>
where
    H: FnOnce(Caught) -> Eventual<Value> + Send + 'static,
{
    match value {
        Eventual::Ready(Ok(value)) => Eventual::ok(value),
        Eventual::Ready(Err(fault)) => intercept(pattern.as_ref(), handler, fault),
        Eventual::Pending(fut) => Eventual::from_future(async move {
            match fut.await {
                Ok(value) => Ok(value),
                Err(fault) => intercept(pattern.as_ref(), handler, fault).settle().await,
            }
        }),
    }
}

fn intercept<H>(pattern: Option<&CatchPattern>, handler: H, fault: Fault) -> Eventual<Value>
where
    H: FnOnce(Caught) -> Eventual<Value>,
{
    let caught = match pattern {
        None => Ok(Caught::Fault(fault)),
        Some(pattern) => pattern.catch(fault),
    };
    match caught {
        Ok(caught) => handler(caught),
        Err(original) => Eventual::fault(original),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn timeout_fault() -> Fault {
        Fault::tagged("timeout", "took too long").with_data(json!({"after_ms": 250}))
    }

    #[test]
    fn success_passes_through_untouched() {
        let out = catch_matching(Eventual::ok(json!(1)), None, |_| Eventual::ok(json!(99)));
        assert!(out.is_ready());
        assert_eq!(tokio_test::block_on(out.settle()).ok(), Some(json!(1)));
    }

    #[test]
    fn absent_pattern_matches_any_fault() {
        let out = catch_matching(
            Eventual::fault(Fault::fault("anything")),
            None,
            |caught| match caught {
                Caught::Fault(fault) => Eventual::ok(json!(fault.message)),
                Caught::Data(_) => Eventual::fault(Fault::fault("wrong arm")),
            },
        );
        assert_eq!(
            tokio_test::block_on(out.settle()).ok(),
            Some(json!("anything"))
        );
    }

    #[test]
    fn tag_pattern_hands_data_payload_to_handler() {
        let out = catch_matching(
            Eventual::fault(timeout_fault()),
            Some(CatchPattern::tag("timeout")),
            |caught| match caught {
                Caught::Data(data) => Eventual::ok(data),
                Caught::Fault(_) => Eventual::fault(Fault::fault("wrong arm")),
            },
        );
        assert_eq!(
            tokio_test::block_on(out.settle()).ok(),
            Some(json!({"after_ms": 250}))
        );
    }

    #[test]
    fn non_matching_tag_propagates_original_fault() {
        let original = timeout_fault().with_step("slow");
        let out = catch_matching(
            Eventual::fault(original.clone()),
            Some(CatchPattern::tag("io")),
            |_| Eventual::ok(json!("recovered")),
        );
        let propagated = tokio_test::block_on(out.settle()).unwrap_err();
        assert_eq!(propagated.kind, original.kind);
        assert_eq!(propagated.message, original.message);
        assert_eq!(propagated.step, original.step);
        assert_eq!(propagated.data, original.data);
    }

    #[test]
    fn predicate_pattern_hands_selection_to_handler() {
        let out = catch_matching(
            Eventual::fault(timeout_fault()),
            Some(CatchPattern::predicate(|fault| {
                fault.data.get("after_ms").cloned()
            })),
            |caught| match caught {
                Caught::Data(data) => Eventual::ok(data),
                Caught::Fault(_) => Eventual::fault(Fault::fault("wrong arm")),
            },
        );
        assert_eq!(tokio_test::block_on(out.settle()).ok(), Some(json!(250)));
    }

    #[test]
    fn cause_pattern_matches_concrete_error_type() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let fault = Fault::from_error(anyhow::Error::new(io));

        let out = catch_matching(
            Eventual::fault(fault),
            Some(CatchPattern::cause_of::<std::io::Error>()),
            |_| Eventual::ok(json!("io recovered")),
        );
        assert_eq!(
            tokio_test::block_on(out.settle()).ok(),
            Some(json!("io recovered"))
        );

        let out = catch_matching(
            Eventual::fault(Fault::fault("no cause")),
            Some(CatchPattern::cause_of::<std::io::Error>()),
            |_| Eventual::ok(json!("never")),
        );
        assert!(tokio_test::block_on(out.settle()).is_err());
    }

    #[test]
    fn handler_fault_becomes_new_failure() {
        let out = catch_matching(Eventual::fault(Fault::fault("first")), None, |_| {
            Eventual::fault(Fault::fault("second"))
        });
        let fault = tokio_test::block_on(out.settle()).unwrap_err();
        assert_eq!(fault.message, "second");
    }

    #[tokio::test]
    async fn intercepts_pending_failures() {
        let pending = Eventual::from_future(async { Err(timeout_fault()) });
        let out = catch_matching(pending, Some(CatchPattern::tag("timeout")), |_| {
            Eventual::from_future(async { Ok(json!("async recovery")) })
        });
        assert_eq!(out.settle().await.ok(), Some(json!("async recovery")));
    }

    #[tokio::test]
    async fn nested_interceptors_try_outward() {
        let inner = catch_matching(
            Eventual::fault(timeout_fault()),
            Some(CatchPattern::tag("io")),
            |_| Eventual::ok(json!("inner")),
        );
        let outer = catch_matching(inner, Some(CatchPattern::tag("timeout")), |_| {
            Eventual::ok(json!("outer"))
        });
        assert_eq!(outer.settle().await.ok(), Some(json!("outer")));
    }
}
