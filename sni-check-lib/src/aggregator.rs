//! Ordered collection of working hostnames.

use crate::types::ProbeOutcome;
use std::sync::{Arc, Mutex, MutexGuard};

/// Mutex-guarded result set shared by all workers of a run.
///
/// Entries keep completion order. No deduplication, no size cap.
#[derive(Clone, Default)]
pub struct ResultAggregator {
    results: Arc<Mutex<Vec<ProbeOutcome>>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one outcome.
    pub fn record(&self, outcome: ProbeOutcome) {
        self.lock().push(outcome);
    }

    /// Current ordered view. Only final once every worker has exited.
    pub fn snapshot(&self) -> Vec<ProbeOutcome> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Take the results out, leaving the aggregator empty.
    pub fn finish(&self) -> Vec<ProbeOutcome> {
        std::mem::take(&mut *self.lock())
    }

    // A panic while holding the lock cannot leave a half-pushed Vec behind.
    fn lock(&self) -> MutexGuard<'_, Vec<ProbeOutcome>> {
        self.results.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
