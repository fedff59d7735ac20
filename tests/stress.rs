//! Stress test: many items, skewed latencies, induced failures
//!
//! Asserts the processor neither deadlocks nor loses or duplicates outcomes
//! under load, and that the concurrency cap holds throughout.

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use common::{FakeService, probes};
use review_classify::{BatchProcessor, Outcome, ProcessorConfig};

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn five_hundred_items_twenty_wide() {
    let items = probes(500, 1..25, 0.10, 42);
    let induced: HashSet<usize> = items.iter().filter(|p| p.fail).map(|p| p.index).collect();
    let service = Arc::new(FakeService::default());
    let processor =
        BatchProcessor::new(ProcessorConfig::with_concurrency(20), Arc::clone(&service)).unwrap();

    let batch = tokio::time::timeout(Duration::from_secs(30), processor.process(items))
        .await
        .expect("batch should finish well within 30s");

    // No missing or duplicated indices
    assert_eq!(batch.len(), 500);
    assert_eq!(service.calls(), 500);
    for (i, outcome) in batch.iter().enumerate() {
        match outcome {
            Outcome::Success(index) => assert_eq!(*index, i),
            Outcome::Failure(e) => assert_eq!(e.index, i),
        }
    }

    // Failures are exactly the induced ones
    let failed: HashSet<usize> = batch.failed_indices().into_iter().collect();
    assert_eq!(failed, induced);

    // ~10% of 500, with generous statistical tolerance
    let summary = batch.summary();
    assert!(
        (25..=75).contains(&summary.failed),
        "failure count {} outside tolerance",
        summary.failed
    );

    let max = service.max_in_flight();
    assert!(max <= 20, "saw {max} concurrent calls with limit 20");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn back_to_back_batches_share_one_processor() {
    let service = Arc::new(FakeService::default());
    let processor = Arc::new(
        BatchProcessor::new(ProcessorConfig::with_concurrency(5), Arc::clone(&service)).unwrap(),
    );

    let handles: Vec<_> = (0..4u64)
        .map(|seed| {
            let processor = Arc::clone(&processor);
            tokio::spawn(async move { processor.process(probes(50, 1..5, 0.2, seed)).await })
        })
        .collect();

    for handle in handles {
        let batch = handle.await.unwrap();
        assert_eq!(batch.len(), 50);
    }
    assert_eq!(service.calls(), 200);
    // Each batch has its own cap of 5; four concurrent batches stay within 20
    assert!(service.max_in_flight() <= 20);
}
