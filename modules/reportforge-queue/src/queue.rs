//! Durable job queue over Redis.
//!
//! Keyspace for a queue named `Q` (Bull-compatible layout):
//! `bull:Q:<id>` job hash, `bull:Q:id` counter, `bull:Q:waiting` FIFO list,
//! `bull:Q:active` lease set, `bull:Q:completed` / `bull:Q:failed` /
//! `bull:Q:delayed` sorted sets, `bull:Q:stalled-check` marker set,
//! `bull:Q:events` capped lifecycle stream. Redis is the sole source of
//! truth for job state; nothing is cached in memory across calls.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use thiserror::Error;

use crate::job::{JobPayload, JobState, JobView};

const EVENTS_MAXLEN: u64 = 512;
const PROMOTE_BATCH: isize = 100;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QueueError>;

/// Per-queue policy knobs; defaults follow the service contract.
#[derive(Debug, Clone)]
pub struct QueueOptions {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    /// Completed jobs are removed when older than this…
    pub completed_retention: Duration,
    /// …or beyond this many retained entries (disjunction).
    pub completed_keep_count: u64,
    pub failed_retention: Duration,
    pub stall_window: Duration,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 1_000,
            backoff_cap_ms: 30_000,
            completed_retention: Duration::from_secs(24 * 3600),
            completed_keep_count: 1_000,
            failed_retention: Duration::from_secs(7 * 24 * 3600),
            stall_window: Duration::from_secs(30 * 60),
        }
    }
}

impl QueueOptions {
    /// Exponential backoff for the n-th failure (1-indexed): base·2^(n−1),
    /// capped.
    pub fn backoff_delay_ms(&self, attempts_made: u32) -> u64 {
        let exp = attempts_made.saturating_sub(1).min(31);
        (self.backoff_base_ms << exp).min(self.backoff_cap_ms)
    }
}

struct QueueKeys {
    id: String,
    waiting: String,
    active: String,
    completed: String,
    failed: String,
    delayed: String,
    stalled_check: String,
    events: String,
    prefix: String,
}

impl QueueKeys {
    fn new(name: &str) -> Self {
        let prefix = format!("bull:{name}");
        Self {
            id: format!("{prefix}:id"),
            waiting: format!("{prefix}:waiting"),
            active: format!("{prefix}:active"),
            completed: format!("{prefix}:completed"),
            failed: format!("{prefix}:failed"),
            delayed: format!("{prefix}:delayed"),
            stalled_check: format!("{prefix}:stalled-check"),
            events: format!("{prefix}:events"),
            prefix,
        }
    }

    fn job(&self, id: &str) -> String {
        format!("{}:{}", self.prefix, id)
    }
}

/// Aggregate counts for introspection endpoints.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct QueueCounts {
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub delayed: u64,
    pub total: u64,
}

pub struct JobQueue {
    conn: ConnectionManager,
    /// Dedicated connection for `BRPOP`: a blocking pop parks the whole
    /// multiplexed connection server-side, so it must not share one with
    /// scheduler ticks and introspection calls.
    blocking_conn: ConnectionManager,
    keys: QueueKeys,
    pub options: QueueOptions,
    name: String,
}

impl JobQueue {
    pub async fn connect(redis_url: &str, name: &str, options: QueueOptions) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        let blocking_conn = client.get_connection_manager().await?;
        tracing::info!(queue = name, "Connected to Redis");
        Ok(Self {
            conn,
            blocking_conn,
            keys: QueueKeys::new(name),
            options,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Durably enqueue a job: allocate the next id, write the hash, push
    /// onto the waiting list.
    pub async fn add(&self, payload: &JobPayload) -> Result<String> {
        let mut conn = self.conn.clone();
        let id: i64 = conn.incr(&self.keys.id, 1i64).await?;
        let id = id.to_string();
        let now = now_ms();

        let fields: Vec<(&str, String)> = vec![
            ("useCase", payload.use_case.clone()),
            ("recipient", payload.recipient.clone()),
            ("filters", serde_json::to_string(&payload.filters)?),
            ("attemptsMade", "0".to_string()),
            ("maxAttempts", self.options.max_attempts.to_string()),
            ("state", JobState::Waiting.as_str().to_string()),
            ("createdAt", now.to_string()),
        ];

        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset_multiple(self.keys.job(&id), &fields)
            .ignore()
            .lpush(&self.keys.waiting, &id)
            .ignore();
        let _: () = pipe.query_async(&mut conn).await?;

        self.emit("waiting", &id, None).await;
        tracing::info!(job_id = %id, use_case = %payload.use_case, "Job enqueued");
        Ok(id)
    }

    /// Block on the waiting list up to `timeout`, then atomically mark the
    /// popped job active. Returns `None` on timeout. `BRPOP` gives each id
    /// to exactly one worker. Each lease counts as an attempt.
    pub async fn lease(&self, timeout: Duration) -> Result<Option<JobView>> {
        let mut blocking = self.blocking_conn.clone();
        let popped: Option<(String, String)> = blocking
            .brpop(&self.keys.waiting, timeout.as_secs_f64())
            .await?;
        let mut conn = self.conn.clone();
        let Some((_, id)) = popped else {
            return Ok(None);
        };

        let now = now_ms();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .sadd(&self.keys.active, &id)
            .ignore()
            .hset(self.keys.job(&id), "state", JobState::Active.as_str())
            .ignore()
            .hset(self.keys.job(&id), "processedOn", now)
            .ignore()
            .hincr(self.keys.job(&id), "attemptsMade", 1i64)
            .ignore();
        let _: () = pipe.query_async(&mut conn).await?;

        self.emit("active", &id, None).await;
        self.job_view(&id).await
    }

    pub async fn complete(&self, id: &str, result: serde_json::Value) -> Result<()> {
        let mut conn = self.conn.clone();
        let now = now_ms();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset(self.keys.job(id), "state", JobState::Completed.as_str())
            .ignore()
            .hset(self.keys.job(id), "finishedOn", now)
            .ignore()
            .hset(self.keys.job(id), "result", serde_json::to_string(&result)?)
            .ignore()
            .srem(&self.keys.active, id)
            .ignore()
            .zadd(&self.keys.completed, id, now)
            .ignore();
        let _: () = pipe.query_async(&mut conn).await?;

        self.emit("completed", id, None).await;
        tracing::info!(job_id = %id, "Job completed");
        Ok(())
    }

    /// Record a non-terminal failure: park the job in the delayed set until
    /// `now + delay`. The attempt itself was counted at lease time.
    pub async fn retry_later(&self, id: &str, delay_ms: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        let run_at = now_ms() + delay_ms as i64;
        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset(self.keys.job(id), "state", JobState::Delayed.as_str())
            .ignore()
            .srem(&self.keys.active, id)
            .ignore()
            .zadd(&self.keys.delayed, id, run_at)
            .ignore();
        let _: () = pipe.query_async(&mut conn).await?;

        self.emit("delayed", id, None).await;
        Ok(())
    }

    /// Record a terminal failure.
    pub async fn fail(&self, id: &str, reason: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let now = now_ms();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset(self.keys.job(id), "state", JobState::Failed.as_str())
            .ignore()
            .hset(self.keys.job(id), "finishedOn", now)
            .ignore()
            .hset(self.keys.job(id), "failedReason", reason)
            .ignore()
            .srem(&self.keys.active, id)
            .ignore()
            .zadd(&self.keys.failed, id, now)
            .ignore();
        let _: () = pipe.query_async(&mut conn).await?;

        self.emit("failed", id, Some(reason)).await;
        Ok(())
    }

    pub async fn job_view(&self, id: &str) -> Result<Option<JobView>> {
        let mut conn = self.conn.clone();
        let hash: HashMap<String, String> = conn.hgetall(self.keys.job(id)).await?;
        Ok(JobView::from_hash(id, hash))
    }

    pub async fn stats(&self) -> Result<QueueCounts> {
        let mut conn = self.conn.clone();
        let waiting: u64 = conn.llen(&self.keys.waiting).await?;
        let active: u64 = conn.scard(&self.keys.active).await?;
        let completed: u64 = conn.zcard(&self.keys.completed).await?;
        let failed: u64 = conn.zcard(&self.keys.failed).await?;
        let delayed: u64 = conn.zcard(&self.keys.delayed).await?;
        Ok(QueueCounts {
            waiting,
            active,
            completed,
            failed,
            delayed,
            total: waiting + active + completed + failed + delayed,
        })
    }

    /// Move a terminally-failed job back to waiting, preserving its attempt
    /// count. Returns false when the job is not currently failed.
    pub async fn retry_job(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let state: Option<String> = conn.hget(self.keys.job(id), "state").await?;
        if state.as_deref() != Some(JobState::Failed.as_str()) {
            return Ok(false);
        }
        let removed: i64 = conn.zrem(&self.keys.failed, id).await?;
        if removed == 0 {
            return Ok(false);
        }

        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset(self.keys.job(id), "state", JobState::Waiting.as_str())
            .ignore()
            .lpush(&self.keys.waiting, id)
            .ignore();
        let _: () = pipe.query_async(&mut conn).await?;

        self.emit("waiting", id, Some("manual-retry")).await;
        tracing::info!(job_id = %id, "Failed job requeued by explicit retry");
        Ok(true)
    }

    /// Promote delayed jobs whose run-at time has passed back onto the
    /// waiting list. Promoted jobs queue after everything currently waiting.
    pub async fn promote_due(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        let now = now_ms();
        let due: Vec<String> = conn
            .zrangebyscore_limit(&self.keys.delayed, "-inf", now, 0, PROMOTE_BATCH)
            .await?;

        let mut promoted = 0;
        for id in due {
            // ZREM races other schedulers; only the winner promotes.
            let removed: i64 = conn.zrem(&self.keys.delayed, &id).await?;
            if removed == 0 {
                continue;
            }
            let mut pipe = redis::pipe();
            pipe.atomic()
                .hset(self.keys.job(&id), "state", JobState::Waiting.as_str())
                .ignore()
                .lpush(&self.keys.waiting, &id)
                .ignore();
            let _: () = pipe.query_async(&mut conn).await?;
            self.emit("waiting", &id, Some("promoted")).await;
            promoted += 1;
        }
        if promoted > 0 {
            tracing::debug!(promoted, "Promoted delayed jobs");
        }
        Ok(promoted)
    }

    /// Requeue jobs that have sat in the active set longer than the stall
    /// window (their worker died mid-flight). Two-phase marking: a job is
    /// only considered stalled once it has survived a full window in the
    /// marker set, confirmed against its `processedOn` timestamp.
    pub async fn requeue_stalled(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        let active: Vec<String> = conn.smembers(&self.keys.active).await?;
        let marked: Vec<String> = conn.smembers(&self.keys.stalled_check).await?;
        let now = now_ms();
        let window_ms = self.options.stall_window.as_millis() as i64;

        let mut requeued = 0;
        for id in marked.iter().filter(|id| active.contains(*id)) {
            let processed_on: Option<i64> = conn.hget(self.keys.job(id), "processedOn").await?;
            let stalled = processed_on.map_or(true, |t| now - t >= window_ms);
            if !stalled {
                continue;
            }
            // SREM races other workers; only the winner requeues.
            let removed: i64 = conn.srem(&self.keys.active, id).await?;
            if removed == 0 {
                continue;
            }
            let mut pipe = redis::pipe();
            pipe.atomic()
                .hset(self.keys.job(id), "state", JobState::Waiting.as_str())
                .ignore()
                .lpush(&self.keys.waiting, id)
                .ignore();
            let _: () = pipe.query_async(&mut conn).await?;
            self.emit("stalled", id, None).await;
            tracing::warn!(job_id = %id, "Requeued stalled job");
            requeued += 1;
        }

        // Re-mark whatever is active now for the next pass.
        let remaining: Vec<String> = conn.smembers(&self.keys.active).await?;
        let _: () = conn.del(&self.keys.stalled_check).await?;
        if !remaining.is_empty() {
            let _: () = conn.sadd(&self.keys.stalled_check, &remaining).await?;
        }
        Ok(requeued)
    }

    /// Apply the retention policy: completed jobs are removed when older
    /// than the retention age or beyond the keep count; failed jobs when
    /// older than theirs.
    pub async fn cleanup_expired(&self) -> Result<(usize, usize)> {
        let mut conn = self.conn.clone();
        let now = now_ms();

        let completed_cutoff = now - self.options.completed_retention.as_millis() as i64;
        let mut expired: Vec<String> = conn
            .zrangebyscore(&self.keys.completed, "-inf", completed_cutoff)
            .await?;

        let total: i64 = conn.zcard(&self.keys.completed).await?;
        let overflow = total - self.options.completed_keep_count as i64;
        if overflow > 0 {
            let oldest: Vec<String> = conn
                .zrange(&self.keys.completed, 0, (overflow - 1) as isize)
                .await?;
            for id in oldest {
                if !expired.contains(&id) {
                    expired.push(id);
                }
            }
        }
        let completed_removed = self.remove_jobs(&self.keys.completed, &expired).await?;

        let failed_cutoff = now - self.options.failed_retention.as_millis() as i64;
        let failed_expired: Vec<String> = conn
            .zrangebyscore(&self.keys.failed, "-inf", failed_cutoff)
            .await?;
        let failed_removed = self.remove_jobs(&self.keys.failed, &failed_expired).await?;

        if completed_removed + failed_removed > 0 {
            tracing::debug!(
                completed = completed_removed,
                failed = failed_removed,
                "Retention cleanup removed jobs"
            );
        }
        Ok((completed_removed, failed_removed))
    }

    async fn remove_jobs(&self, index_key: &str, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for id in ids {
            pipe.zrem(index_key, id).ignore();
            pipe.del(self.keys.job(id)).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(ids.len())
    }

    /// Append a lifecycle event to the capped stream. Best-effort: queue
    /// state is already durable, so stream errors are only logged.
    async fn emit(&self, event: &str, job_id: &str, detail: Option<&str>) {
        let mut cmd = redis::cmd("XADD");
        cmd.arg(&self.keys.events)
            .arg("MAXLEN")
            .arg("~")
            .arg(EVENTS_MAXLEN)
            .arg("*")
            .arg("event")
            .arg(event)
            .arg("jobId")
            .arg(job_id)
            .arg("ts")
            .arg(now_ms());
        if let Some(detail) = detail {
            cmd.arg("detail").arg(detail);
        }
        let mut conn = self.conn.clone();
        let appended: redis::RedisResult<String> = cmd.query_async(&mut conn).await;
        if let Err(e) = appended {
            tracing::debug!(error = %e, event, job_id, "Failed to append queue event");
        }
    }
}

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
