pub mod config;
pub mod contracts;
pub mod db;
pub mod postgres;
pub mod redis_queue;

pub use config::ServiceConfig;
pub use contracts::{
    Claims, GroupComplianceEditorRequest, GroupComplianceEditorResponse, NominativeUserInput,
    Role, ScopesEditorCosts, SuccessResponse, UpsertAcquiredRightRequest,
    UpsertConcurrentUserRequest, UpsertNominativeUsersRequest, UpsertNominativeUsersResponse,
};
pub use db::connect_database;
pub use postgres::PgLicenseStore;
pub use redis_queue::RedisJobQueue;
