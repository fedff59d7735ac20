//! # review-classify
//!
//! Bounded-concurrency batch classification of product reviews.
//!
//! ## Design Philosophy
//!
//! review-classify is designed to be:
//! - **Transport-agnostic** - The remote classifier is an injected [`Classify`] capability
//! - **Failure-local** - One item failing never affects the rest of the batch
//! - **Order-preserving** - Outcome `i` always belongs to input item `i`
//! - **Library-first** - No CLI or file I/O, purely a Rust crate for embedding
//!
//! ## Quick Start
//!
//! ```no_run
//! use review_classify::{BatchProcessor, ClassifyError, ProcessorConfig, Review};
//! use review_classify::classify::classify_fn;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reviews: Vec<Review> = review_classify::review::parse_reviews("[]")?;
//!
//!     let classifier = review_classify::review::keyed(classify_fn(|review: Review| async move {
//!         // Call the remote model here; its own errors become ClassifyError
//!         let response = format!("[{{\"text\": {:?}}}]", review.review_text);
//!         review_classify::response::parse_json(&response)
//!     }));
//!
//!     let config = ProcessorConfig {
//!         concurrency: 10,
//!         item_timeout: Some(Duration::from_secs(60)),
//!         ..Default::default()
//!     };
//!     let processor = BatchProcessor::new(config, classifier)?;
//!
//!     let batch = processor.process(reviews).await;
//!     for failure in batch.failures() {
//!         eprintln!("review {} failed: {}", failure.index, failure);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Classify capability and adapters
pub mod classify;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Bounded-concurrency batch processor
pub mod processor;
/// Model response handling
pub mod response;
/// Retry logic with exponential backoff
pub mod retry;
/// Review records and the low-rated filter
pub mod review;
/// Core types (outcomes, batches, item states)
pub mod types;

// Re-export commonly used types
pub use classify::{Classify, ResultValidator};
pub use config::{ProcessorConfig, RetryConfig};
pub use error::{ClassifyError, Error, Result};
pub use processor::{BatchProcessor, process};
pub use review::{RawReview, Review};
pub use types::{Batch, BatchSummary, FailureReason, ItemError, ItemState, Outcome};

/// Cancellation token accepted by [`BatchProcessor::with_cancellation`]
pub use tokio_util::sync::CancellationToken;
