use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use sam_core::{Job, JobId, JobQueue};
use tracing::debug;

const JOB_SEQUENCE_KEY: &str = "jobs:sequence";

/// Job queue on Redis: the job body lives in the hash `job:{id}` and its id is
/// appended to the list `jobs:{topic}` that consumers pop from.
#[derive(Clone)]
pub struct RedisJobQueue {
    client: Client,
}

impl RedisJobQueue {
    pub fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

pub fn job_key(id: JobId) -> String {
    format!("job:{id}")
}

pub fn topic_key(topic: &str) -> String {
    format!("jobs:{topic}")
}

/// Hash fields of a queued job. The stored topic is the list the id goes on.
fn job_fields(job: Job, topic: &str) -> Vec<(&'static str, Vec<u8>)> {
    if job.topic != topic {
        debug!(job_topic = %job.topic, topic, "job queued under a different topic");
    }
    let mut fields = vec![
        ("topic", topic.as_bytes().to_vec()),
        ("status", job.status.as_str().as_bytes().to_vec()),
        ("data", job.data),
    ];
    if let Some(correlation_id) = job.correlation_id {
        fields.push(("correlation_id", correlation_id.as_str().as_bytes().to_vec()));
    }
    fields
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn push(&self, job: Job, topic: &str) -> Result<JobId> {
        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("redis connection failed")?;

        let id = JobId(connection.incr(JOB_SEQUENCE_KEY, 1).await?);

        let _: () = redis::pipe()
            .atomic()
            .hset_multiple(job_key(id), &job_fields(job, topic))
            .ignore()
            .rpush(topic_key(topic), id.0)
            .ignore()
            .query_async(&mut connection)
            .await
            .with_context(|| format!("failed to enqueue job {id} on {topic}"))?;

        debug!(job_id = %id, topic, "job pushed to redis");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use sam_core::CorrelationId;

    use super::*;

    #[test]
    fn correlation_id_is_only_stored_when_present() {
        let plain = job_fields(Job::pending("aw", b"{}".to_vec(), None), "aw");
        assert_eq!(
            plain.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
            vec!["topic", "status", "data"]
        );
        assert_eq!(plain[1].1, b"PENDING");

        let correlation = CorrelationId::from("batch-7".to_string());
        let grouped = job_fields(
            Job::pending("aw", b"{}".to_vec(), Some(correlation)),
            "aw",
        );
        assert_eq!(grouped[3], ("correlation_id", b"batch-7".to_vec()));
    }

    #[test]
    fn stored_topic_matches_the_list_the_job_is_pushed_to() {
        let fields = job_fields(Job::pending("aw", b"{}".to_vec(), None), "rpc");
        assert_eq!(fields[0], ("topic", b"rpc".to_vec()));
    }

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(job_key(JobId(42)), "job:42");
        assert_eq!(topic_key("aw"), "jobs:aw");
    }
}
