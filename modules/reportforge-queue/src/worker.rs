//! Bounded-concurrency worker and the maintenance scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::job::JobView;
use crate::queue::JobQueue;

/// How long one lease poll blocks before re-checking for shutdown.
const LEASE_POLL: Duration = Duration::from_secs(2);

/// Scheduler cadence; stalled-check and retention run every sixth tick.
const TICK_INTERVAL: Duration = Duration::from_secs(5);
const SLOW_TICK_EVERY: u64 = 6;

/// The job-processing seam. `process` returns the job result or the error
/// that becomes its `failedReason`; `on_terminal_failure` runs after the
/// final attempt and must swallow its own errors.
#[async_trait]
pub trait JobProcessor: Send + Sync + 'static {
    async fn process(&self, job: &JobView) -> anyhow::Result<serde_json::Value>;

    async fn on_terminal_failure(&self, job: &JobView, reason: &str);
}

pub struct Worker {
    queue: Arc<JobQueue>,
    processor: Arc<dyn JobProcessor>,
    concurrency: usize,
    running: Arc<AtomicBool>,
}

impl Worker {
    pub fn new(queue: Arc<JobQueue>, processor: Arc<dyn JobProcessor>, concurrency: usize) -> Self {
        Self {
            queue,
            processor,
            concurrency: concurrency.max(1),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag for readiness/stats reporting.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Run the lease loop until `shutdown` flips, then drain in-flight jobs
    /// up to `drain_timeout`. The handle resolves to whether the drain
    /// finished in time.
    pub fn spawn(
        self,
        shutdown: watch::Receiver<bool>,
        drain_timeout: Duration,
    ) -> JoinHandle<bool> {
        tokio::spawn(self.run(shutdown, drain_timeout))
    }

    async fn run(self, shutdown: watch::Receiver<bool>, drain_timeout: Duration) -> bool {
        self.running.store(true, Ordering::SeqCst);
        info!(concurrency = self.concurrency, "Worker started");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        while !*shutdown.borrow() {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            match self.queue.lease(LEASE_POLL).await {
                Ok(Some(job)) => {
                    let queue = self.queue.clone();
                    let processor = self.processor.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        run_job(queue, processor, job).await;
                    });
                }
                Ok(None) => drop(permit),
                Err(e) => {
                    drop(permit);
                    warn!(error = %e, "Lease failed, backing off");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        info!("Worker draining in-flight jobs");
        self.running.store(false, Ordering::SeqCst);
        let drained = tokio::time::timeout(
            drain_timeout,
            semaphore.acquire_many(self.concurrency as u32),
        )
        .await
        .is_ok();
        if drained {
            info!("Worker drained cleanly");
        } else {
            warn!("Worker drain timed out with jobs still in flight");
        }
        drained
    }
}

/// Process one leased job and record the outcome: completion, a delayed
/// retry, or a terminal failure followed by the best-effort notification.
/// The lease already counted this attempt, so `job.attempts_made` is the
/// current attempt number (1-indexed).
async fn run_job(queue: Arc<JobQueue>, processor: Arc<dyn JobProcessor>, job: JobView) {
    let attempt = job.attempts_made;
    info!(
        job_id = %job.id,
        use_case = %job.payload.use_case,
        attempt,
        max_attempts = job.max_attempts,
        "Processing job"
    );

    match processor.process(&job).await {
        Ok(result) => {
            if let Err(e) = queue.complete(&job.id, result).await {
                error!(job_id = %job.id, error = %e, "Failed to record job completion");
            }
        }
        Err(err) => {
            let reason = format!("{err:#}");
            if attempt < job.max_attempts {
                let delay_ms = queue.options.backoff_delay_ms(attempt);
                warn!(
                    job_id = %job.id,
                    attempt,
                    delay_ms,
                    error = %reason,
                    "Job failed, scheduling retry"
                );
                if let Err(e) = queue.retry_later(&job.id, delay_ms).await {
                    error!(job_id = %job.id, error = %e, "Failed to schedule retry");
                }
            } else {
                error!(job_id = %job.id, attempt, error = %reason, "Job failed terminally");
                if let Err(e) = queue.fail(&job.id, &reason).await {
                    error!(job_id = %job.id, error = %e, "Failed to record job failure");
                }
                processor.on_terminal_failure(&job, &reason).await;
            }
        }
    }
}

/// Periodic maintenance: promote due delayed jobs every tick; requeue
/// stalled jobs and apply retention on the slow tick.
pub fn spawn_scheduler(queue: Arc<JobQueue>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(TICK_INTERVAL);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut ticks: u64 = 0;

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tick.tick() => {
                    if let Err(e) = queue.promote_due().await {
                        warn!(error = %e, "Delayed-job promotion failed");
                    }
                    ticks += 1;
                    if ticks % SLOW_TICK_EVERY == 0 {
                        if let Err(e) = queue.requeue_stalled().await {
                            warn!(error = %e, "Stalled-job check failed");
                        }
                        if let Err(e) = queue.cleanup_expired().await {
                            warn!(error = %e, "Retention cleanup failed");
                        }
                    }
                }
            }
        }
        info!("Queue scheduler stopped");
    })
}
