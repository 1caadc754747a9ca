use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Topic every graph-sync job is pushed under unless configured otherwise.
pub const DEFAULT_JOB_TOPIC: &str = "aw";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Done => "DONE",
            JobStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub i64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Groups the jobs produced by one logical user action, e.g. a bulk upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub topic: String,
    pub status: JobStatus,
    /// Serialized [`crate::Envelope`].
    pub data: Vec<u8>,
    pub correlation_id: Option<CorrelationId>,
}

impl Job {
    pub fn pending(topic: &str, data: Vec<u8>, correlation_id: Option<CorrelationId>) -> Self {
        Self {
            topic: topic.to_string(),
            status: JobStatus::Pending,
            data,
            correlation_id,
        }
    }
}
