use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Named single-worker queue; jobs run one at a time in submission order
#[derive(Clone)]
pub struct SerialQueue {
    name: Arc<str>,
    sender: mpsc::UnboundedSender<Job>,
    submitted: Arc<AtomicU64>,
}

impl SerialQueue {
    /// Create the queue and spawn its worker on the current runtime
    pub fn new(name: &str) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let name: Arc<str> = Arc::from(name);

        tokio::spawn(queue_worker(Arc::clone(&name), receiver));
        debug!("Serial queue '{}' started", name);

        Self {
            name,
            sender,
            submitted: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Submit a job; returns false when the worker has shut down
    pub fn execute<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let sequence = self.submitted.fetch_add(1, Ordering::SeqCst);
        trace!("Queue '{}' accepted job #{}", self.name, sequence);

        if self.sender.send(Box::new(job)).is_err() {
            warn!("Queue '{}' is closed, dropping job #{}", self.name, sequence);
            return false;
        }
        true
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of jobs submitted so far
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::SeqCst)
    }
}

async fn queue_worker(name: Arc<str>, mut receiver: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = receiver.recv().await {
        job();
    }
    debug!("Serial queue '{}' stopped", name);
}

/// Single delivery context for every caller-visible callback
#[derive(Clone)]
pub struct Dispatcher {
    queue: SerialQueue,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            queue: SerialQueue::new("delivery"),
        }
    }

    /// Post a callback to the delivery context
    pub fn post<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.execute(callback);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_jobs_run_in_submission_order() {
        let queue = SerialQueue::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..20 {
            let seen = Arc::clone(&seen);
            queue.execute(move || seen.lock().push(i));
        }

        let (done_tx, done_rx) = oneshot::channel();
        queue.execute(move || {
            let _ = done_tx.send(());
        });
        done_rx.await.unwrap();

        assert_eq!(*seen.lock(), (0..20).collect::<Vec<_>>());
        assert_eq!(queue.submitted(), 21);
        assert_eq!(queue.name(), "test");
    }

    #[tokio::test]
    async fn test_dispatcher_delivers_callbacks() {
        let dispatcher = Dispatcher::new();
        let (tx, rx) = oneshot::channel();

        dispatcher.post(move || {
            let _ = tx.send(42);
        });

        let value = tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value, 42);
    }
}
