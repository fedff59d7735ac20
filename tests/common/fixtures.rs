//! Item fixtures and review generators

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use review_classify::{RawReview, Review};

/// One scripted item: how long the fake service takes and whether it fails
#[derive(Clone, Debug)]
pub struct Probe {
    pub index: usize,
    pub latency_ms: u64,
    pub fail: bool,
}

/// Generate `count` probes with latencies in `latency_ms` and roughly
/// `failure_rate` of them failing. Seeded so runs are reproducible.
pub fn probes(
    count: usize,
    latency_ms: std::ops::Range<u64>,
    failure_rate: f64,
    seed: u64,
) -> Vec<Probe> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|index| Probe {
            index,
            latency_ms: rng.gen_range(latency_ms.clone()),
            fail: rng.gen_bool(failure_rate),
        })
        .collect()
}

/// Scraper-exported review with the given id and rating
pub fn raw_review(id: &str, rating: f64) -> RawReview {
    RawReview {
        id: id.to_string(),
        product_asin: "B07XJ8C8F5".to_string(),
        author_title: format!("Customer {id}"),
        body: format!("Review {id}: the strap broke after two weeks"),
        rating,
        review_timestamp: 1_752_681_600,
        date: "July 16, 2025".to_string(),
    }
}

/// Canonical low-rated reviews `R0..R{count}`
pub fn reviews(count: usize) -> Vec<Review> {
    (0..count)
        .map(|i| Review::from(raw_review(&format!("R{i}"), 2.0)))
        .collect()
}
