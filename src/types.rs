//! Core types for review-classify

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an item settled as a failure
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The classify operation returned an error
    Classify,
    /// The classify operation exceeded its deadline
    Timeout,
    /// The classify operation succeeded but its result failed validation
    Malformed,
    /// The batch was cancelled before the item settled
    Cancelled,
    /// The worker running the item panicked
    Panicked,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureReason::Classify => "classify",
            FailureReason::Timeout => "timeout",
            FailureReason::Malformed => "malformed",
            FailureReason::Cancelled => "cancelled",
            FailureReason::Panicked => "panicked",
        };
        f.write_str(s)
    }
}

/// Captured failure of a single item
///
/// Carries the failing item's identity (its input index and optional caller key)
/// and the underlying error's description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ItemError {
    /// Position of the item in the input sequence
    pub index: usize,
    /// Caller-defined key, if the classifier provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Failure category
    pub reason: FailureReason,
    /// Human-readable description of the underlying error
    pub message: String,
}

/// Settled result of classifying one item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome<T> {
    /// The classify call returned a usable result
    Success(T),
    /// The classify call failed, or was never allowed to finish
    Failure(ItemError),
}

impl<T> Outcome<T> {
    /// Whether this outcome is a success
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Whether this outcome is a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// The success value, if any
    pub fn success(&self) -> Option<&T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    /// The captured failure, if any
    pub fn failure(&self) -> Option<&ItemError> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(err) => Some(err),
        }
    }

    /// Convert into a standard `Result`
    pub fn into_result(self) -> std::result::Result<T, ItemError> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(err) => Err(err),
        }
    }

    /// Terminal state this outcome represents
    pub fn state(&self) -> ItemState {
        match self {
            Outcome::Success(_) => ItemState::Succeeded,
            Outcome::Failure(err) if err.reason == FailureReason::Cancelled => {
                ItemState::Cancelled
            }
            Outcome::Failure(_) => ItemState::Failed,
        }
    }
}

/// Per-item lifecycle
///
/// `Pending -> Admitted -> {Succeeded | Failed | Cancelled}`, or
/// `Pending -> Cancelled` when the batch is cancelled before admission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    /// Waiting for an admission token
    Pending,
    /// Holding a token, classify call in flight
    Admitted,
    /// Settled with a result
    Succeeded,
    /// Settled with a failure
    Failed,
    /// Settled because the batch was cancelled
    Cancelled,
}

impl ItemState {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemState::Succeeded | ItemState::Failed | ItemState::Cancelled
        )
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: ItemState) -> bool {
        matches!(
            (self, next),
            (ItemState::Pending, ItemState::Admitted)
                | (ItemState::Pending, ItemState::Cancelled)
                | (ItemState::Admitted, ItemState::Succeeded)
                | (ItemState::Admitted, ItemState::Failed)
                | (ItemState::Admitted, ItemState::Cancelled)
        )
    }
}

/// Success/failure counts for a batch
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Number of items in the batch
    pub total: usize,
    /// Items that settled as a success
    pub succeeded: usize,
    /// Items that settled as a failure (cancelled ones included)
    pub failed: usize,
    /// Failed items whose reason was cancellation
    pub cancelled: usize,
    /// Message of the lowest-index failure
    pub first_error: Option<String>,
}

impl BatchSummary {
    /// Fraction of items that failed (0.0 for an empty batch)
    pub fn failure_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.failed as f64 / self.total as f64
        }
    }
}

/// Complete, index-aligned set of outcomes for one processing call
///
/// `batch[i]` is the outcome of input item `i`. A batch is only ever handed out
/// once every index has settled, and is immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Batch<T> {
    outcomes: Vec<Outcome<T>>,
}

impl<T> Batch<T> {
    pub(crate) fn new(outcomes: Vec<Outcome<T>>) -> Self {
        Self { outcomes }
    }

    /// An empty batch
    pub fn empty() -> Self {
        Self {
            outcomes: Vec::new(),
        }
    }

    /// Number of outcomes (always equal to the number of input items)
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the batch holds no outcomes
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Outcome of the item at `index`
    pub fn get(&self, index: usize) -> Option<&Outcome<T>> {
        self.outcomes.get(index)
    }

    /// Iterate outcomes in input order
    pub fn iter(&self) -> std::slice::Iter<'_, Outcome<T>> {
        self.outcomes.iter()
    }

    /// All outcomes in input order
    pub fn outcomes(&self) -> &[Outcome<T>] {
        &self.outcomes
    }

    /// Consume the batch into its outcomes
    pub fn into_outcomes(self) -> Vec<Outcome<T>> {
        self.outcomes
    }

    /// `(index, value)` for every successful item
    pub fn successes(&self) -> impl Iterator<Item = (usize, &T)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.success().map(|v| (i, v)))
    }

    /// Every captured failure, in input order
    pub fn failures(&self) -> impl Iterator<Item = &ItemError> {
        self.outcomes.iter().filter_map(Outcome::failure)
    }

    /// Indices of failed items, ascending
    pub fn failed_indices(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_failure())
            .map(|(i, _)| i)
            .collect()
    }

    /// Count successes and failures
    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            total: self.outcomes.len(),
            ..BatchSummary::default()
        };

        for outcome in &self.outcomes {
            match outcome {
                Outcome::Success(_) => summary.succeeded += 1,
                Outcome::Failure(err) => {
                    summary.failed += 1;
                    if err.reason == FailureReason::Cancelled {
                        summary.cancelled += 1;
                    }
                    if summary.first_error.is_none() {
                        summary.first_error = Some(err.message.clone());
                    }
                }
            }
        }

        summary
    }

    /// Replace the outcomes at `indices` with the outcomes of a re-driven batch
    ///
    /// `retried[j]` is the fresh outcome for original index `indices[j]`; failures
    /// are re-addressed to their original index.
    pub(crate) fn merge_retry(mut self, indices: &[usize], retried: Batch<T>) -> Self {
        debug_assert_eq!(indices.len(), retried.len());
        for (&index, outcome) in indices.iter().zip(retried.outcomes) {
            let outcome = match outcome {
                Outcome::Failure(mut err) => {
                    err.index = index;
                    Outcome::Failure(err)
                }
                success => success,
            };
            if let Some(slot) = self.outcomes.get_mut(index) {
                *slot = outcome;
            }
        }
        self
    }
}

impl<T> std::ops::Index<usize> for Batch<T> {
    type Output = Outcome<T>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.outcomes[index]
    }
}

impl<T> IntoIterator for Batch<T> {
    type Item = Outcome<T>;
    type IntoIter = std::vec::IntoIter<Outcome<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Batch<T> {
    type Item = &'a Outcome<T>;
    type IntoIter = std::slice::Iter<'a, Outcome<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.iter()
    }
}
