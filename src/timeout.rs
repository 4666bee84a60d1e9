use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Photo capture deadline
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_millis(40_000);

type TimeoutCallback = Box<dyn FnOnce() + Send + 'static>;

/// Deadline wrapper around one asynchronous engine operation.
///
/// Exactly one terminal outcome gets through: either the first
/// [`TimeoutGuard::complete`] call or the deadline, whichever wins the
/// `terminated` flag. The deadline is armed by the first
/// [`TimeoutGuard::notify_start`] and later start signals do not move it.
#[derive(Clone)]
pub struct TimeoutGuard {
    inner: Arc<GuardInner>,
}

struct GuardInner {
    name: String,
    timeout: Duration,
    terminated: AtomicBool,
    finished: CancellationToken,
    start_count: AtomicU32,
    deadline: Mutex<Option<JoinHandle<()>>>,
    on_timeout: Mutex<Option<TimeoutCallback>>,
}

impl GuardInner {
    fn try_terminate(&self) -> bool {
        let won = self
            .terminated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if won {
            self.finished.cancel();
        }
        won
    }
}

impl TimeoutGuard {
    /// `on_timeout` runs at most once, and only if the deadline wins
    pub fn new<F>(name: impl Into<String>, timeout: Duration, on_timeout: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            inner: Arc::new(GuardInner {
                name: name.into(),
                timeout,
                terminated: AtomicBool::new(false),
                finished: CancellationToken::new(),
                start_count: AtomicU32::new(0),
                deadline: Mutex::new(None),
                on_timeout: Mutex::new(Some(Box::new(on_timeout))),
            }),
        }
    }

    /// Record a start signal; returns how many have been seen so far
    pub fn notify_start(&self) -> u32 {
        let count = self.inner.start_count.fetch_add(1, Ordering::SeqCst) + 1;
        if count > 1 || self.is_terminated() {
            return count;
        }

        let deadline = Instant::now() + self.inner.timeout;
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            sleep_until(deadline).await;
            if !inner.try_terminate() {
                return;
            }
            warn!(
                "Operation '{}' timed out after {}ms",
                inner.name,
                inner.timeout.as_millis()
            );
            let callback = inner.on_timeout.lock().take();
            if let Some(callback) = callback {
                callback();
            }
        });

        *self.inner.deadline.lock() = Some(handle);
        debug!(
            "Armed {}ms deadline for '{}'",
            self.inner.timeout.as_millis(),
            self.inner.name
        );
        count
    }

    /// Stop the guard; true only for the call that actually terminated it
    pub fn terminate(&self) -> bool {
        if !self.inner.try_terminate() {
            return false;
        }
        if let Some(handle) = self.inner.deadline.lock().take() {
            handle.abort();
        }
        self.inner.on_timeout.lock().take();
        true
    }

    /// Run `deliver` if the operation has not already finished or timed out
    pub fn complete<F>(&self, deliver: F) -> bool
    where
        F: FnOnce(),
    {
        if !self.terminate() {
            debug!(
                "Dropping late completion of '{}', already terminated",
                self.inner.name
            );
            return false;
        }
        deliver();
        true
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.terminated.load(Ordering::SeqCst)
    }

    /// Resolves once the guard is terminated by a completion or the deadline
    pub async fn terminated(&self) {
        self.inner.finished.cancelled().await
    }

    pub fn start_count(&self) -> u32 {
        self.inner.start_count.load(Ordering::SeqCst)
    }
}
