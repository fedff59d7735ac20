//! Fake classification service instrumented for concurrency assertions

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use review_classify::{Classify, ClassifyError};

use super::fixtures::Probe;

/// In-memory stand-in for the remote classifier.
///
/// Sleeps for each probe's latency, fails the probes marked to fail, and records
/// how many calls were in flight at once.
#[derive(Default)]
pub struct FakeService {
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FakeService {
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Classify<Probe> for FakeService {
    type Output = usize;

    async fn classify(&self, probe: &Probe) -> Result<usize, ClassifyError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(probe.latency_ms)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if probe.fail {
            Err(ClassifyError::Service(format!("induced failure #{}", probe.index)))
        } else {
            Ok(probe.index)
        }
    }

    fn item_key(&self, probe: &Probe) -> Option<String> {
        Some(format!("probe-{}", probe.index))
    }
}
