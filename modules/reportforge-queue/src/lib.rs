//! Redis-backed durable job queue with a bounded-concurrency worker,
//! exponential-backoff retries, stalled-job recovery, and retention-based
//! cleanup.

pub mod job;
pub mod queue;
pub mod worker;

pub use job::{JobPayload, JobState, JobView};
pub use queue::{JobQueue, QueueCounts, QueueError, QueueOptions, Result};
pub use worker::{spawn_scheduler, JobProcessor, Worker};
