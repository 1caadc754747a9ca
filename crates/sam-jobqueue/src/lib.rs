use std::collections::HashMap;

use async_trait::async_trait;
use sam_core::{DeadLetterSink, Job, JobId, JobQueue};
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    pub id: JobId,
    pub job: Job,
}

/// Process-local queue. Jobs are kept per topic in push order.
#[derive(Default)]
pub struct InMemoryJobQueue {
    topics: RwLock<HashMap<String, Vec<QueuedJob>>>,
    sequence: RwLock<i64>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn jobs(&self, topic: &str) -> Vec<QueuedJob> {
        let topics = self.topics.read().await;
        topics.get(topic).cloned().unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        let topics = self.topics.read().await;
        topics.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn push(&self, job: Job, topic: &str) -> anyhow::Result<JobId> {
        let mut sequence_guard = self.sequence.write().await;
        *sequence_guard += 1;
        let id = JobId(*sequence_guard);

        let mut topics = self.topics.write().await;
        topics
            .entry(topic.to_string())
            .or_default()
            .push(QueuedJob { id, job });

        debug!(job_id = %id, topic, "job queued");
        Ok(id)
    }
}

/// Keeps undeliverable jobs for inspection or a later re-drive.
#[derive(Default)]
pub struct InMemoryDeadLetterSink {
    letters: RwLock<Vec<(Job, String)>>,
}

impl InMemoryDeadLetterSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn letters(&self) -> Vec<(Job, String)> {
        self.letters.read().await.clone()
    }

    /// Hands every recorded job back to `queue`, keeping the ones that fail again.
    pub async fn redrive(&self, queue: &dyn JobQueue) -> usize {
        let pending = std::mem::take(&mut *self.letters.write().await);
        let mut delivered = 0;
        let mut still_failing = Vec::new();

        for (job, reason) in pending {
            let topic = job.topic.clone();
            match queue.push(job.clone(), &topic).await {
                Ok(_) => delivered += 1,
                Err(err) => {
                    warn!(topic = %topic, "redrive failed: {err:#}");
                    still_failing.push((job, reason));
                }
            }
        }

        self.letters.write().await.extend(still_failing);
        delivered
    }
}

#[async_trait]
impl DeadLetterSink for InMemoryDeadLetterSink {
    async fn record(&self, job: Job, reason: String) {
        self.letters.write().await.push((job, reason));
    }
}
