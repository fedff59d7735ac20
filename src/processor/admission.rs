//! Semaphore-gated admission and index-ordered settlement.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;

use crate::types::{ItemState, Outcome};

use super::attempt::{
    AttemptParams, InFlightGuard, SharedClassifier, SharedValidator, cancelled_before_admission,
    run_attempt, worker_lost,
};

/// Per-index slot of the pre-sized result container.
///
/// Every input index gets exactly one slot, pushed in input order by the admission
/// loop. A slot is either still running or already settled; only the aggregating
/// task ever turns a slot into an outcome.
pub(super) enum Slot<T> {
    /// Admitted and spawned; the handle yields the outcome and aborts the
    /// worker if dropped before it settles
    Running {
        handle: AbortOnDropHandle<Outcome<T>>,
        key: Option<String>,
    },
    /// Settled without running (cancelled before admission)
    Settled(Outcome<T>),
}

/// Parameters for admitting every item of a batch
pub(super) struct AdmitParams<I, T> {
    pub(super) items: Vec<I>,
    pub(super) semaphore: Arc<Semaphore>,
    pub(super) classifier: SharedClassifier<I, T>,
    pub(super) validator: Option<SharedValidator<T>>,
    pub(super) cancel_token: CancellationToken,
    pub(super) in_flight: Arc<AtomicUsize>,
}

/// Admit items in input order, spawning one worker per admitted item.
///
/// Workers are owned by their slots. Dropping the slots, or the `process`
/// future holding them, aborts every worker that has not settled yet.
///
/// Blocks on the semaphore while the concurrency cap is saturated. Each owned
/// permit moves into its worker and is released when the worker finishes, whether
/// it succeeded, failed or panicked. Once the cancellation token fires, the
/// remaining items are settled as cancelled without being started.
pub(super) async fn admit_all<I, T>(params: AdmitParams<I, T>) -> Vec<Slot<T>>
where
    I: Send + Sync + 'static,
    T: Send + 'static,
{
    let AdmitParams {
        items,
        semaphore,
        classifier,
        validator,
        cancel_token,
        in_flight,
    } = params;

    let mut slots = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let key = classifier.item_key(&item);

        // Acquire an admission token (blocks while `concurrency` attempts are running)
        let permit = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => None,
            permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
        };

        let Some(permit) = permit else {
            tracing::debug!(index, "Item cancelled before admission");
            debug_assert!(ItemState::Pending.can_transition_to(ItemState::Cancelled));
            slots.push(Slot::Settled(cancelled_before_admission(index, key)));
            continue;
        };

        debug_assert!(ItemState::Pending.can_transition_to(ItemState::Admitted));
        let (guard, now_in_flight) = InFlightGuard::enter(&in_flight);
        tracing::debug!(
            index,
            key = key.as_deref(),
            in_flight = now_in_flight,
            "Item admitted"
        );

        let attempt = AttemptParams {
            index,
            key: key.clone(),
            item,
            classifier: Arc::clone(&classifier),
            validator: validator.clone(),
            cancel_token: cancel_token.clone(),
            in_flight: guard,
        };

        let handle = tokio::spawn(async move {
            let _permit = permit;
            run_attempt(attempt).await
        });

        slots.push(Slot::Running {
            handle: AbortOnDropHandle::new(handle),
            key,
        });
    }

    slots
}

/// Wait for every slot to settle and return outcomes in input order.
///
/// `join_all` preserves the order of its inputs, so position `i` of the result is
/// the outcome of slot `i` no matter which worker finished first.
pub(super) async fn settle_all<T>(slots: Vec<Slot<T>>) -> Vec<Outcome<T>>
where
    T: Send + 'static,
{
    futures::future::join_all(slots.into_iter().enumerate().map(
        |(index, slot)| async move {
            match slot {
                Slot::Settled(outcome) => outcome,
                Slot::Running { handle, key } => match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => worker_lost(index, key, e),
                },
            }
        },
    ))
    .await
}
