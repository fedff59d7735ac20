//! Single-item attempt: one classify call, validation, and failure capture.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio_util::sync::CancellationToken;

use crate::classify::{Classify, ResultValidator};
use crate::error::ClassifyError;
use crate::types::{FailureReason, ItemError, ItemState, Outcome};

/// Shared classifier handle as held by the processor.
pub(super) type SharedClassifier<I, T> = Arc<dyn Classify<I, Output = T>>;

/// Shared validator handle as held by the processor.
pub(super) type SharedValidator<T> = Arc<dyn ResultValidator<T>>;

/// Decrements the in-flight gauge when the attempt settles, on every path.
pub(super) struct InFlightGuard {
    gauge: Arc<AtomicUsize>,
}

impl InFlightGuard {
    /// Count one more attempt as in flight; returns the guard and the new count.
    pub(super) fn enter(gauge: &Arc<AtomicUsize>) -> (Self, usize) {
        let now = gauge.fetch_add(1, Ordering::SeqCst) + 1;
        (
            Self {
                gauge: Arc::clone(gauge),
            },
            now,
        )
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Parameters for running one admitted item
pub(super) struct AttemptParams<I, T> {
    /// Position of the item in the input
    pub(super) index: usize,
    /// Caller-defined key, computed before admission
    pub(super) key: Option<String>,
    /// The item itself, owned by the attempt until it settles
    pub(super) item: I,
    /// Classify capability
    pub(super) classifier: SharedClassifier<I, T>,
    /// Optional result shape check
    pub(super) validator: Option<SharedValidator<T>>,
    /// Batch-wide cancellation signal
    pub(super) cancel_token: CancellationToken,
    /// In-flight guard for this attempt
    pub(super) in_flight: InFlightGuard,
}

/// Run one admitted item to a terminal outcome.
///
/// Invokes the classifier exactly once. Errors, validation rejections and
/// cancellation all become a `Failure` at this item's index; nothing escapes.
pub(super) async fn run_attempt<I, T>(params: AttemptParams<I, T>) -> Outcome<T>
where
    I: Send + Sync + 'static,
    T: Send + 'static,
{
    let AttemptParams {
        index,
        key,
        item,
        classifier,
        validator,
        cancel_token,
        in_flight,
    } = params;

    let result = tokio::select! {
        biased;
        _ = cancel_token.cancelled() => Err(ClassifyError::Cancelled),
        result = classifier.classify(&item) => result,
    };

    let outcome = match result {
        Ok(value) => match validator.as_deref().map(|v| v.validate(&value)) {
            Some(Err(reason)) => Outcome::Failure(ItemError {
                index,
                key,
                reason: FailureReason::Malformed,
                message: format!("malformed result: {}", reason),
            }),
            _ => Outcome::Success(value),
        },
        Err(e) => Outcome::Failure(ItemError {
            index,
            key,
            reason: failure_reason(&e),
            message: e.to_string(),
        }),
    };

    debug_assert!(ItemState::Admitted.can_transition_to(outcome.state()));

    match &outcome {
        Outcome::Success(_) => {
            tracing::debug!(index, "Item classified");
        }
        Outcome::Failure(err) => {
            tracing::warn!(
                index,
                key = err.key.as_deref(),
                reason = %err.reason,
                error = %err.message,
                "Item failed"
            );
        }
    }

    drop(in_flight);
    outcome
}

/// Map a classify error onto the failure taxonomy.
pub(super) fn failure_reason(err: &ClassifyError) -> FailureReason {
    match err {
        ClassifyError::Timeout(_) => FailureReason::Timeout,
        ClassifyError::InvalidResponse(_) => FailureReason::Malformed,
        ClassifyError::Cancelled => FailureReason::Cancelled,
        ClassifyError::Service(_) | ClassifyError::RateLimited(_) | ClassifyError::Other(_) => {
            FailureReason::Classify
        }
    }
}

/// Failure recorded for an item that was never admitted.
pub(super) fn cancelled_before_admission<T>(index: usize, key: Option<String>) -> Outcome<T> {
    Outcome::Failure(ItemError {
        index,
        key,
        reason: FailureReason::Cancelled,
        message: "cancelled before admission".to_string(),
    })
}

/// Failure recorded for an attempt whose worker panicked or was aborted.
pub(super) fn worker_lost<T>(
    index: usize,
    key: Option<String>,
    err: tokio::task::JoinError,
) -> Outcome<T> {
    let message = if err.is_panic() {
        let payload = err.into_panic();
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        format!("classify worker panicked: {}", detail)
    } else {
        "classify worker was aborted".to_string()
    };

    tracing::error!(index, key = key.as_deref(), error = %message, "Item worker lost");

    Outcome::Failure(ItemError {
        index,
        key,
        reason: FailureReason::Panicked,
        message,
    })
}
