//! Main checker implementation.
//!
//! This module provides the `SniChecker` struct that runs a whole probing
//! pass: it fills the work queue, starts the worker pool and the progress
//! reporter, waits for the backlog to drain, stops the workers, and hands
//! back the aggregated results.

use crate::aggregator::ResultAggregator;
use crate::concurrent::WorkerPool;
use crate::error::SniCheckError;
use crate::probe::{HttpTransport, Prober, Transport};
use crate::progress::{completion_channel, ProgressReporter, ProgressSink};
use crate::queue::WorkQueue;
use crate::types::{CheckConfig, ProbeOutcome, RunReport};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Probes candidate hostnames against one server address.
///
/// # Example
///
/// ```rust,no_run
/// use sni_check_lib::{CheckConfig, SniChecker};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let checker = SniChecker::with_config("203.0.113.7", CheckConfig::default())?;
///     let hosts = vec!["www.example.com".to_string(), "cdn.example.net".to_string()];
///     let report = checker.check_hosts(&hosts).await?;
///
///     for outcome in &report.results {
///         println!("{}|{}", outcome.hostname, outcome.protocols);
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct SniChecker {
    /// Configuration settings for this checker instance
    config: CheckConfig,
    /// Probe bound to the server address
    prober: Prober,
    /// Receives progress snapshots, if set
    progress_sink: Option<ProgressSink>,
}

impl SniChecker {
    /// Create a checker with default configuration (50 workers, 5s timeout).
    pub fn new<A: Into<String>>(address: A) -> Result<Self, SniCheckError> {
        Self::with_config(address, CheckConfig::default())
    }

    /// Create a checker with custom configuration and the HTTP transport.
    pub fn with_config<A: Into<String>>(
        address: A,
        config: CheckConfig,
    ) -> Result<Self, SniCheckError> {
        let transport = HttpTransport::from_config(&config)?;
        Ok(Self::with_transport(address, config, Arc::new(transport)))
    }

    /// Create a checker that sends its requests through `transport`.
    pub fn with_transport<A: Into<String>>(
        address: A,
        config: CheckConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let prober = Prober::new(address, &config, transport);
        Self {
            config,
            prober,
            progress_sink: None,
        }
    }

    /// Receive a progress snapshot every 100 completions and at the end.
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress_sink = Some(sink);
        self
    }

    /// Get the current configuration for this checker.
    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// The server address every probe targets.
    pub fn address(&self) -> &str {
        self.prober.address()
    }

    /// Probe a single hostname without the pool.
    pub async fn check_host(&self, hostname: &str) -> ProbeOutcome {
        ProbeOutcome::new(hostname, self.prober.probe(hostname).await)
    }

    /// Probe every hostname with `concurrency` workers.
    ///
    /// The returned results are in completion order and contain only
    /// hostnames that answered on at least one protocol. The progress state
    /// in the report has `completed == total` after a full run.
    ///
    /// # Errors
    ///
    /// Returns `SniCheckError::EmptyInput` if `hostnames` is empty; nothing
    /// is probed in that case. Individual probe failures are never errors.
    pub async fn check_hosts(&self, hostnames: &[String]) -> Result<RunReport, SniCheckError> {
        if hostnames.is_empty() {
            return Err(SniCheckError::EmptyInput);
        }

        let start_time = Instant::now();

        let mut queue = WorkQueue::new();
        for hostname in hostnames {
            queue.enqueue(hostname.as_str());
        }
        let total = queue.total();

        let results = ResultAggregator::new();
        let (completions, events) = completion_channel();

        let reporter = tokio::spawn(
            ProgressReporter::new(total, events, self.progress_sink.clone()).run(),
        );

        let workers = self.config.concurrency.max(1);
        info!(
            address = self.address(),
            total, workers, "starting probe run"
        );
        let pool = WorkerPool::spawn(workers, &queue, &self.prober, &results, &completions);
        // Workers hold the only remaining senders from here on.
        drop(completions);

        queue.drain().await;
        debug!("work queue drained, stopping workers");
        queue.close(pool.size());

        let processed = pool.join().await;
        if processed != total {
            warn!(processed, total, "workers processed an unexpected number of hostnames");
        }

        let progress = reporter.await?;

        let report = RunReport {
            results: results.finish(),
            progress,
            duration: start_time.elapsed(),
        };

        info!(
            completed = report.progress.completed,
            working = report.results.len(),
            elapsed_ms = report.duration.as_millis() as u64,
            "probe run finished"
        );

        Ok(report)
    }
}
