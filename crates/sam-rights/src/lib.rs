//! Mutation services for license rights and product usage, plus the
//! compliance dashboards that read across scopes.
//!
//! Every committed mutation is followed by a best-effort push of a typed
//! event onto the job queue, from which a separate worker keeps the graph
//! index in step with the system of record.

pub mod compliance;
pub mod error;
pub mod fanout;
pub mod producer;
pub mod rights;
pub mod users;
pub mod validation;

pub use compliance::{CategoryCosts, ComplianceService, fill_scope_costs};
pub use error::{ServiceError, ServiceResult};
pub use fanout::{
    AggregateQuerySpec, Aggregation, FanOut, FanOutOutcome, FanOutResponse, FanOutState,
};
pub use producer::OutboxProducer;
pub use rights::AcquiredRightsService;
pub use users::ProductUsersService;
