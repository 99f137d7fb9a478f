//! L2 job queue (C9): a bounded, multi-worker queue with retry, circuit
//! breaker, and drop policy (§4.8). The single largest component in this
//! system — it is what keeps a slow or failing diagnostic backend from
//! ever blocking ingest.

use crate::config::DropPolicy;
use crate::domain::FaultType;
use crate::egress::{EgressPort, HealthEvent};
use crate::features::FeatureVector;
use crate::fsm::FaultEvidence;
use serde::Serialize;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;

/// An enqueued diagnostic task. Immutable except `retries`, which the
/// worker pool mutates on retry (§3 Ownership).
#[derive(Clone)]
pub struct L2Job {
    pub site: String,
    pub asset: String,
    pub point: String,
    pub features: FeatureVector,
    pub fault_evidence: FaultEvidence,
    pub health_event: HealthEvent,
    pub fault_type: FaultType,
    /// Workers hold only a weak egress handle — they must not prolong its
    /// lifetime beyond the orchestrator that owns it (§9).
    pub publisher: Weak<dyn EgressPort>,
    pub retries: u32,
}

pub type WorkerFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;
/// The registered diagnostic worker function: takes ownership of a job,
/// returns `Ok(())` on success or `Err(reason)` on failure (§4.8).
pub type L2WorkerFn = Arc<dyn Fn(L2Job) -> WorkerFuture + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct QueueMetricsSnapshot {
    pub jobs_processed: u64,
    pub jobs_failed: u64,
    pub jobs_dropped: u64,
    pub queue_size: usize,
    pub circuit_open: bool,
    pub capacity: usize,
}

struct Inner {
    capacity: usize,
    drop_policy: DropPolicy,
    max_retries: u32,
    fail_threshold: u32,
    reset_seconds: u64,
    jobs: AsyncMutex<VecDeque<L2Job>>,
    queue_len: AtomicUsize,
    notify: Notify,
    jobs_processed: AtomicU64,
    jobs_failed: AtomicU64,
    jobs_dropped: AtomicU64,
    consecutive_fails: AtomicU32,
    circuit_open_until: StdMutex<Option<Instant>>,
    running: AtomicBool,
}

#[derive(Clone)]
pub struct L2Queue {
    inner: Arc<Inner>,
}

impl L2Queue {
    pub fn new(
        capacity: usize,
        drop_policy: DropPolicy,
        max_retries: u32,
        fail_threshold: u32,
        reset_seconds: u64,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity,
                drop_policy,
                max_retries,
                fail_threshold,
                reset_seconds,
                jobs: AsyncMutex::new(VecDeque::new()),
                queue_len: AtomicUsize::new(0),
                notify: Notify::new(),
                jobs_processed: AtomicU64::new(0),
                jobs_failed: AtomicU64::new(0),
                jobs_dropped: AtomicU64::new(0),
                consecutive_fails: AtomicU32::new(0),
                circuit_open_until: StdMutex::new(None),
                running: AtomicBool::new(false),
            }),
        }
    }

    /// Non-blocking enqueue (§4.8, §5). Returns `true` on acceptance. On a
    /// full queue: `drop_oldest` evicts the head then inserts; `drop_new`
    /// drops the incoming job. Either way a drop increments `jobs_dropped`.
    pub fn enqueue(&self, job: L2Job) -> bool {
        let Ok(mut guard) = self.inner.jobs.try_lock() else {
            // Held only during push/pop; a busy try_lock under a
            // non-blocking enqueue contract still counts as a drop rather
            // than spin-waiting the ingest path.
            self.inner.jobs_dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        let accepted = if guard.len() >= self.inner.capacity {
            match self.inner.drop_policy {
                DropPolicy::DropOldest => {
                    guard.pop_front();
                    self.inner.jobs_dropped.fetch_add(1, Ordering::Relaxed);
                    guard.push_back(job);
                    true
                }
                DropPolicy::DropNew => {
                    self.inner.jobs_dropped.fetch_add(1, Ordering::Relaxed);
                    false
                }
            }
        } else {
            guard.push_back(job);
            true
        };
        self.inner.queue_len.store(guard.len(), Ordering::Relaxed);
        drop(guard);
        if accepted {
            self.inner.notify.notify_one();
        }
        accepted
    }

    /// Spawn `worker_count` tokio tasks running `worker_fn` against the
    /// shared queue. Returns their join handles for [`Self::stop`].
    pub fn start(&self, worker_count: usize, worker_fn: L2WorkerFn) -> Vec<JoinHandle<()>> {
        self.inner.running.store(true, Ordering::Relaxed);
        (0..worker_count)
            .map(|id| {
                let inner = self.inner.clone();
                let worker_fn = worker_fn.clone();
                tokio::spawn(async move { worker_loop(id, inner, worker_fn).await })
            })
            .collect()
    }

    /// Flip the running flag and join workers with a bounded timeout
    /// (§5 Cancellation).
    pub async fn stop(&self, handles: Vec<JoinHandle<()>>, shutdown_timeout: Duration) {
        self.inner.running.store(false, Ordering::Relaxed);
        self.inner.notify.notify_waiters();
        let deadline = tokio::time::Instant::now() + shutdown_timeout;
        for handle in handles {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let _ = tokio::time::timeout(remaining, handle).await;
        }
    }

    pub fn metrics(&self) -> QueueMetricsSnapshot {
        let circuit_open = self
            .inner
            .circuit_open_until
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .map(|until| Instant::now() < until)
            .unwrap_or(false);

        QueueMetricsSnapshot {
            jobs_processed: self.inner.jobs_processed.load(Ordering::Relaxed),
            jobs_failed: self.inner.jobs_failed.load(Ordering::Relaxed),
            jobs_dropped: self.inner.jobs_dropped.load(Ordering::Relaxed),
            queue_size: self.inner.queue_len.load(Ordering::Relaxed),
            circuit_open,
            capacity: self.inner.capacity,
        }
    }
}

async fn worker_loop(_id: usize, inner: Arc<Inner>, worker_fn: L2WorkerFn) {
    const POLL: Duration = Duration::from_millis(crate::config::defaults::QUEUE_POLL_MS);

    while inner.running.load(Ordering::Relaxed) {
        let popped = {
            let mut guard = inner.jobs.lock().await;
            let job = guard.pop_front();
            inner.queue_len.store(guard.len(), Ordering::Relaxed);
            job
        };

        let Some(mut job) = popped else {
            // Wait up to 1s for a job to arrive (§4.8); the timeout also
            // doubles as our `running` re-check interval.
            let _ = tokio::time::timeout(POLL, inner.notify.notified()).await;
            continue;
        };

        let breaker_open = inner
            .circuit_open_until
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .map(|until| Instant::now() < until)
            .unwrap_or(false);
        if breaker_open {
            inner.jobs_dropped.fetch_add(1, Ordering::Relaxed);
            continue;
        }

        match worker_fn(job.clone()).await {
            Ok(()) => {
                inner.jobs_processed.fetch_add(1, Ordering::Relaxed);
                inner.consecutive_fails.store(0, Ordering::Relaxed);
            }
            Err(reason) => {
                tracing::warn!(site = %job.site, asset = %job.asset, point = %job.point, reason, "L2 worker failed");
                inner.jobs_failed.fetch_add(1, Ordering::Relaxed);
                let fails = inner.consecutive_fails.fetch_add(1, Ordering::Relaxed) + 1;

                if job.retries < inner.max_retries {
                    job.retries += 1;
                    L2Queue { inner: inner.clone() }.enqueue(job);
                }

                if fails >= inner.fail_threshold {
                    let mut guard = inner.circuit_open_until.lock().unwrap_or_else(|e| e.into_inner());
                    *guard = Some(Instant::now() + Duration::from_secs(inner.reset_seconds));
                    tracing::warn!(reset_seconds = inner.reset_seconds, "L2 circuit breaker opened");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Severity;
    use std::sync::atomic::AtomicU32 as StdAtomicU32;

    fn job(retries: u32) -> L2Job {
        L2Job {
            site: "s".into(),
            asset: "a".into(),
            point: "p".into(),
            features: FeatureVector::zero(0.0),
            fault_evidence: FaultEvidence {
                state: Severity::Alarm,
                confidence: 1.0,
                dominant_feature: "acc_rms_g",
                timestamp: 0.0,
            },
            health_event: HealthEvent {
                point_health_index: 10.0,
                state: Severity::Alarm,
                fsm_state: Severity::Alarm,
                fault_type: None,
                confidence: 1.0,
                timestamp: 0.0,
            },
            fault_type: FaultType::GeneralHealth,
            publisher: Weak::<crate::egress::InMemoryEgress>::new(),
            retries,
        }
    }

    #[test]
    fn t8_drop_oldest_keeps_size_at_capacity() {
        let queue = L2Queue::new(2, DropPolicy::DropOldest, 0, 100, 60);
        assert!(queue.enqueue(job(0)));
        assert!(queue.enqueue(job(0)));
        assert!(queue.enqueue(job(0)));
        let m = queue.metrics();
        assert_eq!(m.queue_size, 2);
        assert_eq!(m.jobs_dropped, 1);
    }

    #[test]
    fn drop_new_rejects_when_full() {
        let queue = L2Queue::new(2, DropPolicy::DropNew, 0, 100, 60);
        assert!(queue.enqueue(job(0)));
        assert!(queue.enqueue(job(0)));
        assert!(!queue.enqueue(job(0)));
        let m = queue.metrics();
        assert_eq!(m.queue_size, 2);
        assert_eq!(m.jobs_dropped, 1);
    }

    #[tokio::test]
    async fn t10_retry_then_success_counts_processed_exactly_once() {
        let queue = L2Queue::new(10, DropPolicy::DropOldest, 3, 100, 60);
        let attempts = Arc::new(StdAtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let worker: L2WorkerFn = Arc::new(move |_job| {
            let attempts = attempts_clone.clone();
            Box::pin(async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("transient".to_string())
                } else {
                    Ok(())
                }
            })
        });
        queue.enqueue(job(0));
        let handles = queue.start(1, worker);
        tokio::time::sleep(Duration::from_millis(200)).await;
        queue.stop(handles, Duration::from_secs(1)).await;

        let m = queue.metrics();
        assert_eq!(m.jobs_processed, 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn t9_breaker_opens_after_fail_threshold_and_blocks_execution() {
        let queue = L2Queue::new(10, DropPolicy::DropOldest, 0, 3, 60);
        let executions = Arc::new(AtomicU64::new(0));
        let executions_clone = executions.clone();
        let worker: L2WorkerFn = Arc::new(move |_job| {
            let executions = executions_clone.clone();
            Box::pin(async move {
                executions.fetch_add(1, Ordering::SeqCst);
                Err("always fails".to_string())
            })
        });

        for _ in 0..5 {
            queue.enqueue(job(0));
        }
        let handles = queue.start(1, worker);
        tokio::time::sleep(Duration::from_millis(300)).await;
        queue.stop(handles, Duration::from_secs(1)).await;

        let m = queue.metrics();
        assert!(m.jobs_failed >= 3);
        assert!(m.circuit_open);
        assert_eq!(m.queue_size, 0);
    }
}
