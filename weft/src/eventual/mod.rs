//! The asynchronous value primitive and its combinators.
//!
//! An [`Eventual`] is a handle to a computation that may already be realized
//! or may still be in flight. Realized values stay realized: chaining a
//! synchronous transform onto a `Ready` eventual never allocates a future,
//! which is what lets an all-synchronous pipeline run without touching the
//! pending machinery.

mod catch;
mod zip;

pub use catch::{catch_matching, CatchPattern, Caught};
pub use zip::zip;

use futures::future::BoxFuture;
use std::future::{Future, IntoFuture};
use tokio::sync::oneshot;

use crate::errors::Fault;

/// A value that is either realized or still pending.
pub enum Eventual<T> {
    /// The computation has completed.
    Ready(Result<T, Fault>),
    /// The computation is still in flight.
    Pending(BoxFuture<'static, Result<T, Fault>>),
}

impl<T> Eventual<T> {
    /// A realized success.
    #[must_use]
    pub fn ok(value: T) -> Self {
        Self::Ready(Ok(value))
    }

    /// A realized failure.
    #[must_use]
    pub fn fault(fault: Fault) -> Self {
        Self::Ready(Err(fault))
    }

    /// Realizes a result directly.
    #[must_use]
    pub fn from_result(result: Result<T, Fault>) -> Self {
        Self::Ready(result)
    }

    /// Wraps a future as a pending value.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, Fault>> + Send + 'static,
    {
        Self::Pending(Box::pin(future))
    }

    /// Returns true when the value is realized.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

impl<T: Send + 'static> Eventual<T> {
    /// Creates a pending value together with its single-assignment completer.
    ///
    /// Dropping the [`Resolver`] without resolving rejects the value rather
    /// than hanging its consumers.
    #[must_use]
    pub fn deferred() -> (Resolver<T>, Self) {
        let (tx, rx) = oneshot::channel();
        let pending = Self::from_future(async move {
            rx.await
                .unwrap_or_else(|_| Err(Fault::fault("deferred value dropped without resolution")))
        });
        (Resolver { tx }, pending)
    }

    /// Applies a synchronous transform to the realized value, propagating
    /// failures through unchanged. Ready values stay ready.
    #[must_use]
    pub fn map<U, F>(self, f: F) -> Eventual<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        match self {
            Self::Ready(result) => Eventual::Ready(result.map(f)),
            Self::Pending(fut) => Eventual::from_future(async move { fut.await.map(f) }),
        }
    }

    /// Like [`Eventual::map`] but the transform may itself fail.
    #[must_use]
    pub fn and_then_sync<U, F>(self, f: F) -> Eventual<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U, Fault> + Send + 'static,
    {
        match self {
            Self::Ready(result) => Eventual::Ready(result.and_then(f)),
            Self::Pending(fut) => Eventual::from_future(async move { fut.await.and_then(f) }),
        }
    }

    /// Awaits realization.
    pub async fn settle(self) -> Result<T, Fault> {
        self.into_future().await
    }
}

impl<T: Send + 'static> IntoFuture for Eventual<T> {
    type Output = Result<T, Fault>;
    type IntoFuture = BoxFuture<'static, Result<T, Fault>>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Self::Ready(result) => Box::pin(std::future::ready(result)),
            Self::Pending(fut) => fut,
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Eventual<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Single-assignment completer for a deferred [`Eventual`].
///
/// Consuming `self` on both operations makes double completion
/// unrepresentable.
#[derive(Debug)]
pub struct Resolver<T> {
    tx: oneshot::Sender<Result<T, Fault>>,
}

impl<T> Resolver<T> {
    /// Completes the value successfully.
    pub fn resolve(self, value: T) {
        let _ = self.tx.send(Ok(value));
    }

    /// Completes the value with a failure.
    pub fn reject(self, fault: Fault) {
        let _ = self.tx.send(Err(fault));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ready_map_stays_ready() {
        let doubled = Eventual::ok(21).map(|n| n * 2);
        assert!(doubled.is_ready());
        assert_eq!(tokio_test::block_on(doubled.settle()).ok(), Some(42));
    }

    #[test]
    fn map_propagates_failure_unchanged() {
        let failed: Eventual<i32> = Eventual::fault(Fault::fault("nope"));
        let mapped = failed.map(|n| n + 1);
        let fault = tokio_test::block_on(mapped.settle()).unwrap_err();
        assert_eq!(fault.message, "nope");
    }

    #[test]
    fn and_then_sync_can_fail() {
        let out = Eventual::ok(1).and_then_sync(|_| Err::<i32, _>(Fault::fault("later")));
        assert!(tokio_test::block_on(out.settle()).is_err());
    }

    #[tokio::test]
    async fn deferred_resolves() {
        let (resolver, pending) = Eventual::deferred();
        assert!(!pending.is_ready());

        tokio::spawn(async move {
            resolver.resolve("done");
        });

        assert_eq!(pending.settle().await.ok(), Some("done"));
    }

    #[tokio::test]
    async fn deferred_rejects() {
        let (resolver, pending) = Eventual::<i32>::deferred();
        resolver.reject(Fault::tagged("boom", "rejected"));
        assert!(pending.settle().await.is_err());
    }

    #[tokio::test]
    async fn dropped_resolver_rejects_instead_of_hanging() {
        let (resolver, pending) = Eventual::<i32>::deferred();
        drop(resolver);
        let fault = pending.settle().await.unwrap_err();
        assert!(fault.message.contains("dropped"));
    }

    #[tokio::test]
    async fn from_future_settles() {
        let pending = Eventual::from_future(async { Ok(5) });
        assert_eq!(pending.settle().await.ok(), Some(5));
    }

    #[tokio::test]
    async fn pending_map_applies_after_realization() {
        let (resolver, pending) = Eventual::deferred();
        let mapped = pending.map(|n: i32| n + 1);
        resolver.resolve(9);
        assert_eq!(mapped.settle().await.ok(), Some(10));
    }
}
