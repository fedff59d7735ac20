//! The injected "classify one item" capability and its adapters.
//!
//! The batch processor treats a [`Classify`] implementation as opaque: it only
//! bounds how many calls are in flight and records what each call returns.
//! Transport, prompt and label taxonomy all live behind this trait.
//!
//! Adapters in this module are themselves [`Classify`] implementations and can be
//! stacked, e.g. `WithRetry::new(WithTimeout::new(client, deadline), retry_config)`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::config::RetryConfig;
use crate::error::ClassifyError;

/// Abstraction over the external classification dependency, enabling testability.
///
/// Implementations must tolerate concurrent calls from many tasks; the processor
/// does not serialize calls beyond its concurrency limit.
#[async_trait::async_trait]
pub trait Classify<I: ?Sized>: Send + Sync {
    /// Result produced for one item
    type Output: Send + 'static;

    /// Classify a single item
    async fn classify(&self, item: &I) -> Result<Self::Output, ClassifyError>;

    /// Caller-defined key attached to failures and log lines for `item`
    fn item_key(&self, _item: &I) -> Option<String> {
        None
    }
}

#[async_trait::async_trait]
impl<I, C> Classify<I> for Arc<C>
where
    I: ?Sized + Sync,
    C: Classify<I> + ?Sized,
{
    type Output = C::Output;

    async fn classify(&self, item: &I) -> Result<Self::Output, ClassifyError> {
        (**self).classify(item).await
    }

    fn item_key(&self, item: &I) -> Option<String> {
        (**self).item_key(item)
    }
}

/// [`Classify`] implementation backed by an async closure
///
/// The closure receives an owned clone of the item, so the returned future
/// does not borrow from the batch.
pub struct FnClassifier<F> {
    f: F,
}

/// Wrap an async closure as a [`Classify`] implementation
///
/// ```
/// use review_classify::classify::classify_fn;
/// use review_classify::ClassifyError;
///
/// let classifier = classify_fn(|text: String| async move {
///     if text.is_empty() {
///         Err(ClassifyError::InvalidResponse("empty review".into()))
///     } else {
///         Ok(text.len())
///     }
/// });
/// # let _ = classifier;
/// ```
pub fn classify_fn<F>(f: F) -> FnClassifier<F> {
    FnClassifier { f }
}

#[async_trait::async_trait]
impl<I, F, Fut, T> Classify<I> for FnClassifier<F>
where
    I: Clone + Send + Sync + 'static,
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, ClassifyError>> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    async fn classify(&self, item: &I) -> Result<T, ClassifyError> {
        (self.f)(item.clone()).await
    }
}

/// [`Classify`] implementation for a synchronous, blocking closure
///
/// Each call runs on tokio's blocking thread pool so a blocking HTTP client
/// does not stall the async worker threads driving other items.
///
/// A blocking call cannot be interrupted. When the awaiting side gives up (a
/// [`WithTimeout`] deadline, cancellation) the thread keeps running until the
/// closure returns, so every call holds a permit from this classifier's own
/// semaphore until its thread finishes. Live calls against the service never
/// exceed `max_live_calls`, abandoned ones included.
pub struct BlockingClassifier<F> {
    f: Arc<F>,
    live_calls: Arc<Semaphore>,
}

/// Wrap a blocking closure as a [`Classify`] implementation
///
/// At most `max_live_calls` invocations of `f` run at once; use the batch
/// concurrency limit. Zero is treated as one.
pub fn classify_blocking<F>(max_live_calls: usize, f: F) -> BlockingClassifier<F> {
    let permits = max_live_calls.clamp(1, Semaphore::MAX_PERMITS);
    BlockingClassifier {
        f: Arc::new(f),
        live_calls: Arc::new(Semaphore::new(permits)),
    }
}

#[async_trait::async_trait]
impl<I, F, T> Classify<I> for BlockingClassifier<F>
where
    I: Clone + Send + Sync + 'static,
    F: Fn(&I) -> Result<T, ClassifyError> + Send + Sync + 'static,
    T: Send + 'static,
{
    type Output = T;

    async fn classify(&self, item: &I) -> Result<T, ClassifyError> {
        let permit = Arc::clone(&self.live_calls)
            .acquire_owned()
            .await
            .map_err(|_| ClassifyError::Other("blocking classifier closed".to_string()))?;
        let f = Arc::clone(&self.f);
        let item = item.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f(&item)
        })
        .await
        .map_err(|e| ClassifyError::Other(format!("blocking classify task failed: {}", e)))?
    }
}

/// Attaches a caller-defined key to every item handled by the inner classifier
pub struct WithKey<C, K> {
    inner: C,
    key: K,
}

impl<C, K> WithKey<C, K> {
    /// Key items with `key` while delegating classification to `inner`
    pub fn new(inner: C, key: K) -> Self {
        Self { inner, key }
    }
}

#[async_trait::async_trait]
impl<I, C, K> Classify<I> for WithKey<C, K>
where
    I: ?Sized + Sync,
    C: Classify<I>,
    K: Fn(&I) -> String + Send + Sync,
{
    type Output = C::Output;

    async fn classify(&self, item: &I) -> Result<Self::Output, ClassifyError> {
        self.inner.classify(item).await
    }

    fn item_key(&self, item: &I) -> Option<String> {
        Some((self.key)(item))
    }
}

/// Bounds every call of the inner classifier with a deadline
///
/// An elapsed deadline is reported as [`ClassifyError::Timeout`], which the
/// processor records as that item's failure.
pub struct WithTimeout<C> {
    inner: C,
    timeout: Duration,
}

impl<C> WithTimeout<C> {
    /// Bound calls to `inner` by `timeout`
    pub fn new(inner: C, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait::async_trait]
impl<I, C> Classify<I> for WithTimeout<C>
where
    I: ?Sized + Sync,
    C: Classify<I>,
{
    type Output = C::Output;

    async fn classify(&self, item: &I) -> Result<Self::Output, ClassifyError> {
        tokio::time::timeout(self.timeout, self.inner.classify(item))
            .await
            .map_err(|_| ClassifyError::Timeout(self.timeout))?
    }

    fn item_key(&self, item: &I) -> Option<String> {
        self.inner.item_key(item)
    }
}

/// Re-invokes the inner classifier on retryable errors with exponential backoff
///
/// See [`crate::retry::IsRetryable`] for which errors are retried.
pub struct WithRetry<C> {
    inner: C,
    config: RetryConfig,
}

impl<C> WithRetry<C> {
    /// Retry calls to `inner` according to `config`
    pub fn new(inner: C, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait::async_trait]
impl<I, C> Classify<I> for WithRetry<C>
where
    I: ?Sized + Sync,
    C: Classify<I>,
{
    type Output = C::Output;

    async fn classify(&self, item: &I) -> Result<Self::Output, ClassifyError> {
        crate::retry::classify_with_retry(&self.config, || self.inner.classify(item)).await
    }

    fn item_key(&self, item: &I) -> Option<String> {
        self.inner.item_key(item)
    }
}

/// Shape check applied to successful classify results
///
/// A rejected result is recorded as a failure with reason
/// [`crate::types::FailureReason::Malformed`].
pub trait ResultValidator<T: ?Sized>: Send + Sync {
    /// Return `Err(description)` if `output` is unusable
    fn validate(&self, output: &T) -> Result<(), String>;
}

/// Rejects empty results
#[derive(Clone, Copy, Debug, Default)]
pub struct NonEmpty;

impl ResultValidator<String> for NonEmpty {
    fn validate(&self, output: &String) -> Result<(), String> {
        if output.trim().is_empty() {
            Err("result is empty".to_string())
        } else {
            Ok(())
        }
    }
}

impl<U> ResultValidator<Vec<U>> for NonEmpty {
    fn validate(&self, output: &Vec<U>) -> Result<(), String> {
        if output.is_empty() {
            Err("result is empty".to_string())
        } else {
            Ok(())
        }
    }
}

impl ResultValidator<serde_json::Value> for NonEmpty {
    fn validate(&self, output: &serde_json::Value) -> Result<(), String> {
        let empty = match output {
            serde_json::Value::Null => true,
            serde_json::Value::String(s) => s.trim().is_empty(),
            serde_json::Value::Array(a) => a.is_empty(),
            serde_json::Value::Object(o) => o.is_empty(),
            _ => false,
        };
        if empty {
            Err("result is empty".to_string())
        } else {
            Ok(())
        }
    }
}
