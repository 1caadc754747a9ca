use async_trait::async_trait;

use crate::job::{Job, JobId};
use crate::models::{
    AcquiredRight, Aggregation, ConcurrentUser, CostCategory, NominativeUser, Product, ScopeCost,
};

/// Durable queue feeding the graph consumer. Delivery is at-least-once;
/// implementations must tolerate concurrent callers.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn push(&self, job: Job, topic: &str) -> anyhow::Result<JobId>;
}

/// Receives jobs the producer could not hand to the queue.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn record(&self, job: Job, reason: String);
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AcquiredRightsStore: Send + Sync {
    async fn get_acquired_right(
        &self,
        scope: &str,
        sku: &str,
    ) -> anyhow::Result<Option<AcquiredRight>>;
    async fn upsert_acquired_right(&self, right: &AcquiredRight) -> anyhow::Result<()>;
    /// Returns whether a row was removed.
    async fn delete_acquired_right(&self, scope: &str, sku: &str) -> anyhow::Result<bool>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ProductUsersStore: Send + Sync {
    async fn get_aggregation(&self, scope: &str, id: i32) -> anyhow::Result<Option<Aggregation>>;
    async fn get_product(&self, scope: &str, swidtag: &str) -> anyhow::Result<Option<Product>>;
    async fn upsert_product(&self, product: &Product) -> anyhow::Result<()>;

    /// Inserts when `user.id` is zero, otherwise updates. Returns the row id.
    async fn upsert_concurrent_user(&self, user: &ConcurrentUser) -> anyhow::Result<i32>;
    async fn get_concurrent_user(
        &self,
        scope: &str,
        id: i32,
    ) -> anyhow::Result<Option<ConcurrentUser>>;
    async fn delete_concurrent_user(&self, scope: &str, id: i32) -> anyhow::Result<()>;

    /// Writes the whole batch in one transaction, keyed by email and profile.
    async fn upsert_nominative_users(&self, users: &[NominativeUser]) -> anyhow::Result<()>;
    async fn get_nominative_user(
        &self,
        scope: &str,
        id: i32,
    ) -> anyhow::Result<Option<NominativeUser>>;
    async fn delete_nominative_user(&self, scope: &str, id: i32) -> anyhow::Result<()>;

    /// Concurrent plus nominative users still attached to the product.
    async fn count_product_users(&self, scope: &str, swidtag: &str) -> anyhow::Result<i64>;
    async fn delete_product(&self, scope: &str, swidtag: &str) -> anyhow::Result<()>;
}

/// Read side of the compliance dashboards.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ComplianceReadStore: Send + Sync {
    /// Per-scope cost for one editor. Scopes without data are omitted.
    async fn scope_costs(
        &self,
        category: CostCategory,
        scopes: &[String],
        editor: &str,
    ) -> anyhow::Result<Vec<ScopeCost>>;
}
