//! Progress reporting for a probing run.
//!
//! Workers send one [`CompletionEvent`] per finished hostname over an
//! unbounded channel. The [`ProgressReporter`] task is the only owner of
//! the counters; it stops as soon as `completed == total`.
//!
//! A snapshot is published every [`REPORT_EVERY`] completions and once more
//! for the final completion. How a snapshot is drawn is up to the sink.

use crate::types::ProgressState;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::warn;

/// Publish a snapshot every this many completions.
pub const REPORT_EVERY: usize = 100;

/// Emitted by a worker once per hostname, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent {
    pub hostname: String,
    pub working: bool,
}

/// Sending half used by workers.
pub type CompletionSender = mpsc::UnboundedSender<CompletionEvent>;

/// Receiving half consumed by the reporter.
pub type CompletionReceiver = mpsc::UnboundedReceiver<CompletionEvent>;

/// Callback receiving each published snapshot.
pub type ProgressSink = Arc<dyn Fn(&ProgressSnapshot) + Send + Sync>;

/// Create the completion event channel.
pub fn completion_channel() -> (CompletionSender, CompletionReceiver) {
    mpsc::unbounded_channel()
}

/// Throughput and ETA at one point of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub total: usize,
    pub working: usize,
    pub elapsed: Duration,
    /// Completions per second
    pub rate: f64,
    /// Zero when the rate is still zero
    pub eta: Duration,
}

impl ProgressSnapshot {
    /// `rate = completed / elapsed`, `eta = (total - completed) / rate`.
    pub fn compute(completed: usize, total: usize, working: usize, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 {
            completed as f64 / secs
        } else {
            0.0
        };
        let remaining = total.saturating_sub(completed) as f64;
        let eta = if rate > 0.0 {
            Duration::from_secs_f64(remaining / rate)
        } else {
            Duration::ZERO
        };

        Self {
            completed,
            total,
            working,
            elapsed,
            rate,
            eta,
        }
    }

    /// Completed share in 0.0..=1.0.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Whether a snapshot is due after `completed` completions.
pub fn should_report(completed: usize, total: usize) -> bool {
    completed % REPORT_EVERY == 0 || completed == total
}

/// Consumes completion events and owns the progress counters.
pub struct ProgressReporter {
    state: ProgressState,
    working: usize,
    events: CompletionReceiver,
    sink: Option<ProgressSink>,
}

impl ProgressReporter {
    pub fn new(total: usize, events: CompletionReceiver, sink: Option<ProgressSink>) -> Self {
        Self {
            state: ProgressState::new(total),
            working: 0,
            events,
            sink,
        }
    }

    /// Count completions until `completed == total`.
    ///
    /// If every sender is dropped first the reporter stops early and the
    /// returned state shows the shortfall.
    pub async fn run(mut self) -> ProgressState {
        let start = Instant::now();

        while !self.state.is_finished() {
            match self.events.recv().await {
                Some(event) => {
                    self.state.completed += 1;
                    if event.working {
                        self.working += 1;
                    }
                    if should_report(self.state.completed, self.state.total) {
                        self.publish(start.elapsed());
                    }
                }
                None => {
                    warn!(
                        completed = self.state.completed,
                        total = self.state.total,
                        "completion channel closed before all hostnames finished"
                    );
                    break;
                }
            }
        }

        self.state
    }

    fn publish(&self, elapsed: Duration) {
        if let Some(sink) = &self.sink {
            let snapshot = ProgressSnapshot::compute(
                self.state.completed,
                self.state.total,
                self.working,
                elapsed,
            );
            sink(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn event(hostname: &str, working: bool) -> CompletionEvent {
        CompletionEvent {
            hostname: hostname.to_string(),
            working,
        }
    }

    #[test]
    fn test_snapshot_formulas() {
        let snapshot = ProgressSnapshot::compute(100, 300, 7, Duration::from_secs(10));
        assert!((snapshot.rate - 10.0).abs() < 1e-9);
        assert_eq!(snapshot.eta, Duration::from_secs(20));
        assert!((snapshot.fraction() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(snapshot.working, 7);
    }

    #[test]
    fn test_snapshot_zero_rate_has_zero_eta() {
        let snapshot = ProgressSnapshot::compute(0, 10, 0, Duration::ZERO);
        assert_eq!(snapshot.rate, 0.0);
        assert_eq!(snapshot.eta, Duration::ZERO);
    }

    #[test]
    fn test_report_cadence() {
        assert!(!should_report(1, 250));
        assert!(!should_report(99, 250));
        assert!(should_report(100, 250));
        assert!(should_report(200, 250));
        assert!(!should_report(249, 250));
        assert!(should_report(250, 250));
        assert!(should_report(3, 3));
    }

    #[tokio::test]
    async fn test_reporter_counts_every_event_once() {
        let published: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_published = Arc::clone(&published);
        let sink: ProgressSink = Arc::new(move |snapshot: &ProgressSnapshot| {
            sink_published.lock().unwrap().push(snapshot.completed);
        });

        let (tx, rx) = completion_channel();
        let reporter = tokio::spawn(ProgressReporter::new(250, rx, Some(sink)).run());

        for i in 0..250 {
            tx.send(event(&format!("h{}.com", i), i % 2 == 0)).unwrap();
        }

        let state = reporter.await.unwrap();
        assert_eq!(state.completed, 250);
        assert_eq!(state.total, 250);
        assert_eq!(*published.lock().unwrap(), vec![100, 200, 250]);
    }

    #[tokio::test]
    async fn test_reporter_stops_when_senders_drop() {
        let (tx, rx) = completion_channel();
        tx.send(event("a.com", true)).unwrap();
        drop(tx);

        let state = ProgressReporter::new(5, rx, None).run().await;
        assert_eq!(state.completed, 1);
        assert!(!state.is_finished());
    }

    #[tokio::test]
    async fn test_reporter_with_zero_total_returns_immediately() {
        let (_tx, rx) = completion_channel();
        let state = ProgressReporter::new(0, rx, None).run().await;
        assert_eq!(state, ProgressState::new(0));
    }
}
