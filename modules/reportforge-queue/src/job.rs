//! Job model and its Redis hash representation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
    Delayed,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Delayed => "delayed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "waiting" => Some(JobState::Waiting),
            "active" => Some(JobState::Active),
            "completed" => Some(JobState::Completed),
            "failed" => Some(JobState::Failed),
            "delayed" => Some(JobState::Delayed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the submitter provides: which report, for whom, with which filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    pub use_case: String,
    pub recipient: String,
    #[serde(default)]
    pub filters: HashMap<String, String>,
}

/// A read view of one job, assembled from its Redis hash.
#[derive(Debug, Clone)]
pub struct JobView {
    pub id: String,
    pub payload: JobPayload,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub state: JobState,
    /// Unix milliseconds.
    pub created_at: i64,
    pub processed_on: Option<i64>,
    pub finished_on: Option<i64>,
    pub result: Option<serde_json::Value>,
    pub failed_reason: Option<String>,
}

impl JobView {
    /// Rebuild a view from an `HGETALL` result. Returns `None` for an empty
    /// hash (job removed by retention).
    pub(crate) fn from_hash(id: &str, hash: HashMap<String, String>) -> Option<Self> {
        if hash.is_empty() {
            return None;
        }
        let filters = hash
            .get("filters")
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();
        Some(Self {
            id: id.to_string(),
            payload: JobPayload {
                use_case: hash.get("useCase").cloned().unwrap_or_default(),
                recipient: hash.get("recipient").cloned().unwrap_or_default(),
                filters,
            },
            attempts_made: parse_field(&hash, "attemptsMade").unwrap_or(0),
            max_attempts: parse_field(&hash, "maxAttempts").unwrap_or(1),
            state: hash
                .get("state")
                .and_then(|s| JobState::parse(s))
                .unwrap_or(JobState::Waiting),
            created_at: parse_field(&hash, "createdAt").unwrap_or(0),
            processed_on: parse_field(&hash, "processedOn"),
            finished_on: parse_field(&hash, "finishedOn"),
            result: hash
                .get("result")
                .and_then(|raw| serde_json::from_str(raw).ok()),
            failed_reason: hash.get("failedReason").cloned(),
        })
    }
}

fn parse_field<T: std::str::FromStr>(hash: &HashMap<String, String>, key: &str) -> Option<T> {
    hash.get(key).and_then(|v| v.parse().ok())
}
