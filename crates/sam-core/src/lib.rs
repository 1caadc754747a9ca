pub mod envelope;
pub mod events;
pub mod job;
pub mod models;
pub mod storage;

pub use envelope::{Envelope, EnvelopeError, decode, encode};
pub use events::{
    AcquiredRightKey, AcquiredRightUpserted, ConcurrentUserKey, ConcurrentUserUpserted,
    DomainEvent, EventKind, NominativeUserDetails, NominativeUserKey, NominativeUserUpserted,
    ProductKey,
};
pub use job::{CorrelationId, DEFAULT_JOB_TOPIC, Job, JobId, JobStatus};
pub use models::{
    AcquiredRight, Aggregation, ConcurrentUser, CostCategory, NominativeUser, Product,
    ProductType, ScopeCost,
};
pub use storage::{
    AcquiredRightsStore, ComplianceReadStore, DeadLetterSink, JobQueue, ProductUsersStore,
};

#[cfg(any(test, feature = "testing"))]
pub use storage::{
    MockAcquiredRightsStore, MockComplianceReadStore, MockDeadLetterSink, MockJobQueue,
    MockProductUsersStore,
};
