//! Priority scheduler that throttles calls into the external metadata API.
//!
//! Callers submit futures with a priority tier; a single dispatcher task pops
//! the highest-priority pending request whenever both a concurrency slot and
//! the minimum inter-request delay allow it. Failures propagate to the caller
//! unchanged; retry policy belongs to the caller.

use crate::shared::errors::{AppError, AppResult};
use futures::future::BoxFuture;
use governor::{Quota, RateLimiter};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex, Notify, Semaphore};

type DirectRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
    governor::middleware::NoOpMiddleware,
>;

/// Priority tier for scheduled requests. Background work is expected to use
/// `Low`; interactive lookups sit above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RequestPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum simultaneous in-flight requests.
    pub max_concurrent: usize,
    /// Minimum spacing between request dispatches.
    pub min_request_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            min_request_delay: Duration::from_millis(200),
        }
    }
}

/// A queued request: the boxed body resolves the caller's oneshot when run.
struct PendingRequest {
    priority: RequestPriority,
    seq: u64,
    task: BoxFuture<'static, ()>,
}

impl PartialEq for PendingRequest {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for PendingRequest {}

impl PartialOrd for PendingRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingRequest {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, then FIFO within a tier.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct SchedulerInner {
    queue: Mutex<BinaryHeap<PendingRequest>>,
    notify: Notify,
    semaphore: Arc<Semaphore>,
    limiter: DirectRateLimiter,
    in_flight: AtomicUsize,
    seq: AtomicU64,
    is_running: AtomicBool,
}

pub struct RequestScheduler {
    inner: Arc<SchedulerInner>,
}

impl RequestScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let period = if config.min_request_delay.is_zero() {
            Duration::from_nanos(1)
        } else {
            config.min_request_delay
        };
        let quota = Quota::with_period(period)
            .unwrap()
            .allow_burst(NonZeroU32::new(1).unwrap());

        Self {
            inner: Arc::new(SchedulerInner {
                queue: Mutex::new(BinaryHeap::new()),
                notify: Notify::new(),
                semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
                limiter: RateLimiter::direct(quota),
                in_flight: AtomicUsize::new(0),
                seq: AtomicU64::new(0),
                is_running: AtomicBool::new(false),
            }),
        }
    }

    /// Start the dispatcher task. Requests submitted before `start` stay
    /// queued and are dispatched once it runs.
    pub fn start(&self) {
        if self
            .inner
            .is_running
            .swap(true, AtomicOrdering::SeqCst)
        {
            return; // Already running
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            Self::dispatch_loop(inner).await;
        });
        log::debug!("Request scheduler dispatcher started");
    }

    /// Stop the dispatcher. Requests still queued are dropped and their
    /// callers see an internal error.
    pub fn stop(&self) {
        self.inner.is_running.store(false, AtomicOrdering::SeqCst);
        self.inner.notify.notify_one();
    }

    async fn dispatch_loop(inner: Arc<SchedulerInner>) {
        loop {
            if !inner.is_running.load(AtomicOrdering::SeqCst) {
                break;
            }

            let next = inner.queue.lock().await.pop();
            let request = match next {
                Some(request) => request,
                None => {
                    inner.notify.notified().await;
                    continue;
                }
            };

            let permit = match inner.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break, // Semaphore closed, scheduler going away
            };
            inner.limiter.until_ready().await;

            inner.in_flight.fetch_add(1, AtomicOrdering::SeqCst);
            let tracker = inner.clone();
            tokio::spawn(async move {
                request.task.await;
                tracker.in_flight.fetch_sub(1, AtomicOrdering::SeqCst);
                drop(permit);
            });
        }
        log::debug!("Request scheduler dispatcher stopped");
    }

    /// Submit a request and wait for its result.
    pub async fn submit<T, F>(&self, request: F, priority: RequestPriority) -> AppResult<T>
    where
        T: Send + 'static,
        F: Future<Output = AppResult<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let task: BoxFuture<'static, ()> = Box::pin(async move {
            let result = request.await;
            let _ = tx.send(result);
        });

        let seq = self.inner.seq.fetch_add(1, AtomicOrdering::Relaxed);
        self.inner.queue.lock().await.push(PendingRequest {
            priority,
            seq,
            task,
        });
        self.inner.notify.notify_one();

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(AppError::InternalError(
                "Request was dropped by the scheduler".to_string(),
            )),
        }
    }

    /// Submit background work; identical behavior at the lowest tier.
    pub async fn submit_background<T, F>(&self, request: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: Future<Output = AppResult<T>> + Send + 'static,
    {
        self.submit(request, RequestPriority::Low).await
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(AtomicOrdering::SeqCst)
    }

    pub async fn queue_len(&self) -> usize {
        self.inner.queue.lock().await.len()
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running.load(AtomicOrdering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(priority: RequestPriority, seq: u64) -> PendingRequest {
        PendingRequest {
            priority,
            seq,
            task: Box::pin(async {}),
        }
    }

    #[test]
    fn heap_pops_by_priority_then_age() {
        let mut heap = BinaryHeap::new();
        heap.push(pending(RequestPriority::Low, 0));
        heap.push(pending(RequestPriority::High, 1));
        heap.push(pending(RequestPriority::Medium, 2));
        heap.push(pending(RequestPriority::High, 3));

        let order: Vec<(RequestPriority, u64)> = std::iter::from_fn(|| {
            heap.pop().map(|r| (r.priority, r.seq))
        })
        .collect();

        assert_eq!(
            order,
            vec![
                (RequestPriority::High, 1),
                (RequestPriority::High, 3),
                (RequestPriority::Medium, 2),
                (RequestPriority::Low, 0),
            ]
        );
    }

    #[test]
    fn default_config_matches_api_budget() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.min_request_delay, Duration::from_millis(200));
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let scheduler = RequestScheduler::new(SchedulerConfig::default());
        scheduler.start();
        scheduler.start();
        assert!(scheduler.is_running());
        scheduler.stop();
    }
}
