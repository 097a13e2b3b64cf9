//! FIFO work queue between the orchestrator and the workers.
//!
//! The queue is filled with every hostname before any worker starts. Once
//! the backlog is drained the orchestrator pushes one [`WorkItem::Stop`] per
//! worker; each worker exits after taking exactly one of them.
//!
//! `drain` counts hostnames only. A hostname is outstanding from `enqueue`
//! until the worker that took it calls [`QueueHandle::task_done`], which it
//! does after the probe returned and its events were emitted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify};

/// One unit taken from the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// A hostname to probe
    Host(String),
    /// No more work for the worker that takes this
    Stop,
}

struct Shared {
    receiver: Mutex<mpsc::UnboundedReceiver<WorkItem>>,
    outstanding: AtomicUsize,
    drained: Notify,
}

/// Queue owned by the orchestrator for the lifetime of a run.
pub struct WorkQueue {
    sender: mpsc::UnboundedSender<WorkItem>,
    shared: Arc<Shared>,
    enqueued: usize,
}

/// Consumer side handed to each worker.
#[derive(Clone)]
pub struct QueueHandle {
    shared: Arc<Shared>,
}

impl WorkQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            shared: Arc::new(Shared {
                receiver: Mutex::new(receiver),
                outstanding: AtomicUsize::new(0),
                drained: Notify::new(),
            }),
            enqueued: 0,
        }
    }

    /// Add one hostname to the backlog. Never blocks.
    pub fn enqueue<H: Into<String>>(&mut self, hostname: H) {
        self.shared.outstanding.fetch_add(1, Ordering::SeqCst);
        // The receiver lives in `shared`, which `self` keeps alive.
        let _ = self.sender.send(WorkItem::Host(hostname.into()));
        self.enqueued += 1;
    }

    /// Number of hostnames ever enqueued.
    pub fn total(&self) -> usize {
        self.enqueued
    }

    /// Hostnames enqueued but not yet marked done.
    pub fn outstanding(&self) -> usize {
        self.shared.outstanding.load(Ordering::SeqCst)
    }

    /// A consumer handle for one worker.
    pub fn handle(&self) -> QueueHandle {
        QueueHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Wait until every enqueued hostname has been processed.
    pub async fn drain(&self) {
        loop {
            let notified = self.shared.drained.notified();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Push one stop marker per worker.
    pub fn close(&self, workers: usize) {
        for _ in 0..workers {
            let _ = self.sender.send(WorkItem::Stop);
        }
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueHandle {
    /// Wait for the next item.
    ///
    /// A closed channel reads as `Stop`, so a worker can never spin on it.
    pub async fn dequeue(&self) -> WorkItem {
        let mut receiver = self.shared.receiver.lock().await;
        receiver.recv().await.unwrap_or(WorkItem::Stop)
    }

    /// Mark one dequeued hostname as fully processed.
    pub fn task_done(&self) {
        let previous = self.shared.outstanding.fetch_sub(1, Ordering::SeqCst);
        if previous == 1 {
            self.shared.drained.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_order_then_stop() {
        let mut queue = WorkQueue::new();
        queue.enqueue("a.com");
        queue.enqueue("b.com");
        let handle = queue.handle();

        assert_eq!(handle.dequeue().await, WorkItem::Host("a.com".to_string()));
        assert_eq!(handle.dequeue().await, WorkItem::Host("b.com".to_string()));
        handle.task_done();
        handle.task_done();

        queue.drain().await;
        queue.close(1);
        assert_eq!(handle.dequeue().await, WorkItem::Stop);
    }

    #[tokio::test]
    async fn test_drain_waits_for_task_done() {
        let mut queue = WorkQueue::new();
        queue.enqueue("slow.com");
        let handle = queue.handle();

        let item = handle.dequeue().await;
        assert_eq!(item, WorkItem::Host("slow.com".to_string()));
        assert_eq!(queue.outstanding(), 1);

        // Dequeued but not done yet: drain must not complete.
        let pending = tokio::time::timeout(Duration::from_millis(50), queue.drain()).await;
        assert!(pending.is_err());

        let worker = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            worker.task_done();
        });

        tokio::time::timeout(Duration::from_secs(2), queue.drain())
            .await
            .expect("drain should finish after task_done");
        assert_eq!(queue.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_drain_on_empty_queue_returns() {
        let queue = WorkQueue::new();
        tokio::time::timeout(Duration::from_millis(100), queue.drain())
            .await
            .expect("empty queue is already drained");
    }

    #[tokio::test]
    async fn test_one_stop_per_worker() {
        let queue = WorkQueue::new();
        queue.close(3);
        let handle = queue.handle();
        for _ in 0..3 {
            assert_eq!(handle.dequeue().await, WorkItem::Stop);
        }
        assert_eq!(queue.total(), 0);
    }
}
