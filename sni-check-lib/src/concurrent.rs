//! Fixed-size worker pool.
//!
//! Exactly `size` tasks pull from the work queue, so the worker count is the
//! only concurrency bound: at most `size` probes, and therefore at most
//! `size` connections to the target, are in flight at any time.

use crate::aggregator::ResultAggregator;
use crate::error::SniCheckError;
use crate::probe::Prober;
use crate::progress::{CompletionEvent, CompletionSender};
use crate::queue::{QueueHandle, WorkItem, WorkQueue};
use crate::types::ProbeOutcome;
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Handles to the spawned workers of one run.
pub struct WorkerPool {
    workers: Vec<JoinHandle<usize>>,
}

impl WorkerPool {
    /// Spawn `size` workers on the current runtime.
    pub fn spawn(
        size: usize,
        queue: &WorkQueue,
        prober: &Prober,
        results: &ResultAggregator,
        completions: &CompletionSender,
    ) -> Self {
        let workers = (0..size)
            .map(|id| {
                let worker = Worker {
                    id,
                    queue: queue.handle(),
                    prober: prober.clone(),
                    results: results.clone(),
                    completions: completions.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        Self { workers }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Wait for every worker to exit; returns the number of hostnames they
    /// processed between them.
    pub async fn join(self) -> usize {
        let mut processed = 0;
        for handle in self.workers {
            match handle.await {
                Ok(count) => processed += count,
                Err(e) => error!(error = %e, "worker task ended abnormally"),
            }
        }
        processed
    }
}

struct Worker {
    id: usize,
    queue: QueueHandle,
    prober: Prober,
    results: ResultAggregator,
    completions: CompletionSender,
}

impl Worker {
    async fn run(self) -> usize {
        let mut processed = 0;

        loop {
            let hostname = match self.queue.dequeue().await {
                WorkItem::Host(hostname) => hostname,
                WorkItem::Stop => break,
            };

            self.process(hostname).await;
            self.queue.task_done();
            processed += 1;
        }

        debug!(worker = self.id, processed, "worker stopped");
        processed
    }

    /// Probe one hostname, then report it. A panic inside the probe is
    /// confined to this hostname.
    async fn process(&self, hostname: String) {
        let probed = AssertUnwindSafe(self.prober.probe(&hostname))
            .catch_unwind()
            .await;

        let outcome = match probed {
            Ok(protocols) => ProbeOutcome::new(hostname.clone(), protocols),
            Err(panic) => {
                let err = SniCheckError::worker_internal(&hostname, panic_message(panic.as_ref()));
                error!(worker = self.id, error = %err, "hostname skipped");
                ProbeOutcome::new(hostname.clone(), Default::default())
            }
        };

        let working = outcome.is_working();
        let event = CompletionEvent { hostname, working };
        if self.completions.send(event).is_err() {
            debug!(worker = self.id, "progress reporter is gone");
        }

        if working {
            self.results.record(outcome);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::Transport;
    use crate::progress::completion_channel;
    use crate::types::{CheckConfig, Protocol};
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Answers 200 on HTTP for everything, panics for "boom.com".
    struct FlakyTransport;

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn status(
            &self,
            protocol: Protocol,
            _address: &str,
            _port: u16,
            hostname: &str,
        ) -> Result<u16, SniCheckError> {
            if hostname == "boom.com" {
                panic!("transport exploded");
            }
            match protocol {
                Protocol::Http => Ok(200),
                Protocol::Https => Err(SniCheckError::transport("https", hostname, "refused")),
            }
        }
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "panic with non-string payload");
    }

    #[tokio::test]
    async fn test_worker_survives_panicking_probe() {
        let mut queue = WorkQueue::new();
        for host in ["a.com", "boom.com", "b.com"] {
            queue.enqueue(host);
        }

        let prober = Prober::new("192.0.2.1", &CheckConfig::default(), Arc::new(FlakyTransport));
        let results = ResultAggregator::new();
        let (tx, mut rx) = completion_channel();

        let pool = WorkerPool::spawn(1, &queue, &prober, &results, &tx);
        assert_eq!(pool.size(), 1);

        queue.drain().await;
        queue.close(pool.size());
        assert_eq!(pool.join().await, 3);

        drop(tx);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.len(), 3);
        assert!(events.iter().any(|e| e.hostname == "boom.com" && !e.working));

        let names: Vec<String> = results.snapshot().into_iter().map(|o| o.hostname).collect();
        assert_eq!(names, vec!["a.com", "b.com"]);
    }
}
