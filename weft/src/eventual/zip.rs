//! Fan-in join over a mixed list of realized and pending values.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

use super::Eventual;
use crate::errors::Fault;

/// Waits for every element of a mixed sync/async list.
///
/// Resolves to the realized results in input order once all elements have
/// resolved, regardless of completion order. The first failure among any
/// element fails the whole join immediately with that single fault;
/// outstanding elements are not cancelled, but their completions are no-ops
/// against the already-resolved join.
///
/// When every element is already realized the result is produced inline and
/// no join state is allocated. The pending path spawns one task per
/// unrealized element and therefore needs an ambient tokio runtime.
pub fn zip<T>(items: Vec<Eventual<T>>) -> Eventual<Vec<T>>
where
    T: Send + 'static,
{
    let total = items.len();
    let has_pending = items.iter().any(|item| !item.is_ready());

    if !has_pending {
        let mut values = Vec::with_capacity(total);
        for item in items {
            match item {
                Eventual::Ready(Ok(value)) => values.push(value),
                Eventual::Ready(Err(fault)) => return Eventual::fault(fault),
                // ruled out by has_pending
                Eventual::Pending(_) => {
                    return Eventual::fault(Fault::fault("pending element in realized join"))
                }
            }
        }
        return Eventual::ok(values);
    }

    let (tx, rx) = oneshot::channel();
    let state = Arc::new(JoinState {
        slots: Mutex::new((0..total).map(|_| None).collect()),
        remaining: AtomicUsize::new(total),
        outcome: Mutex::new(Some(tx)),
    });

    for (index, item) in items.into_iter().enumerate() {
        match item {
            Eventual::Ready(Ok(value)) => complete_slot(&state, index, value),
            Eventual::Ready(Err(fault)) => {
                fail(&state, fault);
                break;
            }
            Eventual::Pending(fut) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    match fut.await {
                        Ok(value) => complete_slot(&state, index, value),
                        Err(fault) => fail(&state, fault),
                    }
                });
            }
        }
    }

    Eventual::from_future(async move {
        rx.await
            .unwrap_or_else(|_| Err(Fault::fault("join state dropped before completion")))
    })
}

struct JoinState<T> {
    slots: Mutex<Vec<Option<T>>>,
    remaining: AtomicUsize,
    outcome: Mutex<Option<oneshot::Sender<Result<Vec<T>, Fault>>>>,
}

fn complete_slot<T>(state: &Arc<JoinState<T>>, index: usize, value: T) {
    state.slots.lock()[index] = Some(value);
    if state.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
        finish(state);
    }
}

fn finish<T>(state: &Arc<JoinState<T>>) {
    let Some(tx) = state.outcome.lock().take() else {
        return;
    };
    let slots = std::mem::take(&mut *state.slots.lock());
    let mut values = Vec::with_capacity(slots.len());
    for slot in slots {
        match slot {
            Some(value) => values.push(value),
            None => {
                let _ = tx.send(Err(Fault::fault("join completed with an unfilled slot")));
                return;
            }
        }
    }
    let _ = tx.send(Ok(values));
}

fn fail<T>(state: &Arc<JoinState<T>>, fault: Fault) {
    if let Some(tx) = state.outcome.lock().take() {
        let _ = tx.send(Err(fault));
    }
}
