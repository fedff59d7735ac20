//! Bounded-concurrency batch processor.
//!
//! Split into focused submodules:
//! - [`admission`] - Semaphore-gated admission, worker spawning, index-ordered settlement
//! - [`attempt`] - One classify call per item, validation, failure capture
//!
//! The processor takes N items and returns a [`Batch`] of exactly N outcomes in
//! input order. At most `concurrency` classify calls are in flight at any moment;
//! a failing item never affects its siblings.

mod admission;
mod attempt;


use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::classify::{Classify, ResultValidator, WithRetry, WithTimeout};
use crate::config::ProcessorConfig;
use crate::error::{Error, Result};
use crate::types::Batch;

use admission::{AdmitParams, admit_all, settle_all};
use attempt::{SharedClassifier, SharedValidator};

/// Runs a classify capability over batches of items with a concurrency cap.
///
/// # Example
///
/// ```no_run
/// use review_classify::{BatchProcessor, ClassifyError, ProcessorConfig};
/// use review_classify::classify::classify_fn;
///
/// # async fn example() -> review_classify::Result<()> {
/// let classifier = classify_fn(|text: String| async move {
///     // call the remote service here
///     Ok::<_, ClassifyError>(text.len())
/// });
///
/// let processor = BatchProcessor::new(ProcessorConfig::with_concurrency(3), classifier)?;
/// let batch = processor
///     .process(vec!["too small".to_string(), "broke after a week".to_string()])
///     .await;
///
/// let summary = batch.summary();
/// println!("{} ok, {} failed", summary.succeeded, summary.failed);
/// # Ok(())
/// # }
/// ```
pub struct BatchProcessor<I, T> {
    config: ProcessorConfig,
    classifier: SharedClassifier<I, T>,
    validator: Option<SharedValidator<T>>,
    cancel_token: Option<CancellationToken>,
}

impl<I, T> BatchProcessor<I, T>
where
    I: Send + Sync + 'static,
    T: Send + 'static,
{
    /// Create a processor, validating the configuration before anything is scheduled.
    ///
    /// When the config sets `item_timeout` and/or `retry`, the classifier is wrapped
    /// in [`WithTimeout`] (innermost, so every attempt gets the deadline) and
    /// [`WithRetry`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `concurrency` is zero or another setting is invalid.
    pub fn new<C>(config: ProcessorConfig, classifier: C) -> Result<Self>
    where
        C: Classify<I, Output = T> + 'static,
    {
        config.validate()?;

        let mut classifier: SharedClassifier<I, T> = Arc::new(classifier);
        if let Some(timeout) = config.item_timeout {
            classifier = Arc::new(WithTimeout::new(classifier, timeout));
        }
        if let Some(retry) = config.retry.clone() {
            classifier = Arc::new(WithRetry::new(classifier, retry));
        }

        Ok(Self {
            config,
            classifier,
            validator: None,
            cancel_token: None,
        })
    }

    /// Reject successful results that fail `validator`
    #[must_use]
    pub fn with_validator<V>(mut self, validator: V) -> Self
    where
        V: ResultValidator<T> + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Abort pending and in-flight items when `token` is cancelled
    ///
    /// Items that have not been admitted yet are never started; in-flight calls are
    /// abandoned. Both settle as failures with reason `Cancelled`.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// The configuration this processor was built with
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Classify every item and return one outcome per item, in input order.
    ///
    /// Returns only once every item has settled. Per-item failures are recorded
    /// in the batch; this call itself cannot fail. Dropping the returned future
    /// aborts every worker that is still running.
    pub async fn process(&self, items: Vec<I>) -> Batch<T> {
        if items.is_empty() {
            return Batch::empty();
        }

        let total = items.len();
        let concurrency = self.config.concurrency.min(Semaphore::MAX_PERMITS);
        let started = Instant::now();

        tracing::debug!(items = total, concurrency, "Processing batch");

        let slots = admit_all(AdmitParams {
            items,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            classifier: Arc::clone(&self.classifier),
            validator: self.validator.clone(),
            cancel_token: self.cancel_token.clone().unwrap_or_default(),
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
        .await;

        let outcomes = settle_all(slots).await;
        debug_assert_eq!(outcomes.len(), total);

        let batch = Batch::new(outcomes);
        let summary = batch.summary();
        tracing::info!(
            items = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch processed"
        );

        batch
    }

    /// Re-drive only the failed items of `previous` through a fresh run.
    ///
    /// `items` must be the same input `previous` was produced from. Successful
    /// outcomes are kept; failed indices are replaced with their new outcomes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if `items` and `previous` differ in length.
    pub async fn retry_failed(&self, items: &[I], previous: Batch<T>) -> Result<Batch<T>>
    where
        I: Clone,
    {
        if items.len() != previous.len() {
            return Err(Error::LengthMismatch {
                items: items.len(),
                outcomes: previous.len(),
            });
        }

        let failed = previous.failed_indices();
        if failed.is_empty() {
            return Ok(previous);
        }

        tracing::info!(failed = failed.len(), "Re-driving failed items");

        let retry_items = failed.iter().map(|&i| items[i].clone()).collect();
        let retried = self.process(retry_items).await;

        Ok(previous.merge_retry(&failed, retried))
    }
}

/// Classify `items` with at most `limit` calls in flight.
///
/// Convenience wrapper over [`BatchProcessor`] with default settings otherwise.
///
/// # Errors
///
/// Returns [`Error::Config`] when `limit` is zero, before any item is scheduled.
pub async fn process<I, C>(items: Vec<I>, limit: usize, classify: C) -> Result<Batch<C::Output>>
where
    I: Send + Sync + 'static,
    C: Classify<I> + 'static,
{
    let processor = BatchProcessor::new(ProcessorConfig::with_concurrency(limit), classify)?;
    Ok(processor.process(items).await)
}
