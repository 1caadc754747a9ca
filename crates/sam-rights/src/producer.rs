use std::sync::Arc;

use sam_core::{CorrelationId, DeadLetterSink, DomainEvent, Job, JobId, JobQueue, encode};
use tracing::{debug, error};

/// Pushes one job per committed mutation so the graph index can catch up.
///
/// Publishing is best effort: a failure is logged and handed to the dead
/// letter sink, but never reported to the caller and never undoes the write
/// that preceded it.
#[derive(Clone)]
pub struct OutboxProducer {
    queue: Arc<dyn JobQueue>,
    topic: String,
    dead_letters: Option<Arc<dyn DeadLetterSink>>,
}

impl OutboxProducer {
    pub fn new(queue: Arc<dyn JobQueue>, topic: impl Into<String>) -> Self {
        Self {
            queue,
            topic: topic.into(),
            dead_letters: None,
        }
    }

    pub fn with_dead_letter(mut self, sink: Arc<dyn DeadLetterSink>) -> Self {
        self.dead_letters = Some(sink);
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub async fn publish(&self, event: &DomainEvent) -> Option<JobId> {
        self.publish_correlated(event, None).await
    }

    pub async fn publish_correlated(
        &self,
        event: &DomainEvent,
        correlation_id: Option<&CorrelationId>,
    ) -> Option<JobId> {
        let kind = event.kind();
        let scope = event.scope();
        let entity = event.entity_key();

        let data = match encode(event).and_then(|envelope| envelope.to_bytes()) {
            Ok(data) => data,
            Err(err) => {
                error!(
                    kind = %kind,
                    scope,
                    entity = %entity,
                    retryable = false,
                    "failed to encode job payload: {err:#}"
                );
                return None;
            }
        };

        let job = Job::pending(&self.topic, data, correlation_id.cloned());
        match self.queue.push(job.clone(), &self.topic).await {
            Ok(id) => {
                debug!(
                    job_id = %id,
                    kind = %kind,
                    scope,
                    entity = %entity,
                    correlation_id = correlation_id.map(CorrelationId::as_str),
                    "graph sync job queued"
                );
                Some(id)
            }
            Err(err) => {
                error!(
                    kind = %kind,
                    scope,
                    entity = %entity,
                    topic = %self.topic,
                    retryable = true,
                    "failed to push graph sync job: {err:#}"
                );
                if let Some(sink) = &self.dead_letters {
                    sink.record(job, format!("{err:#}")).await;
                }
                None
            }
        }
    }
}
