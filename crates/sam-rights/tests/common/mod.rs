#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use sam_core::{
    AcquiredRight, AcquiredRightsStore, Aggregation, ComplianceReadStore, ConcurrentUser,
    CostCategory, DomainEvent, Envelope, JobQueue, NominativeUser, Product, ProductUsersStore,
    ScopeCost, decode,
};
use sam_jobqueue::{InMemoryJobQueue, QueuedJob};
use sam_platform::{Claims, Role};
use sam_rights::OutboxProducer;
use tokio::sync::Mutex;

pub const TOPIC: &str = "aw";

/// Routes service logs through the test harness; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "sam_rights=debug".to_string()),
        )
        .with_test_writer()
        .try_init();
}

pub fn claims(scopes: &[&str]) -> Claims {
    Claims {
        user_id: "admin@test.com".to_string(),
        role: Role::Admin,
        scopes: scopes.iter().map(|scope| scope.to_string()).collect(),
    }
}

pub fn super_admin(scopes: &[&str]) -> Claims {
    Claims {
        role: Role::SuperAdmin,
        ..claims(scopes)
    }
}

pub fn producer(queue: Arc<dyn JobQueue>) -> OutboxProducer {
    OutboxProducer::new(queue, TOPIC)
}

pub fn decode_job(job: &QueuedJob) -> DomainEvent {
    let envelope = Envelope::from_bytes(&job.job.data).expect("job data is an envelope");
    decode(&envelope).expect("envelope decodes")
}

pub async fn published(queue: &InMemoryJobQueue) -> Vec<DomainEvent> {
    queue.jobs(TOPIC).await.iter().map(decode_job).collect()
}

#[derive(Default)]
pub struct FakeRightsStore {
    rights: Mutex<HashMap<(String, String), AcquiredRight>>,
    fail_writes: AtomicBool,
}

impl FakeRightsStore {
    pub fn failing_writes() -> Self {
        let store = Self::default();
        store.fail_writes.store(true, Ordering::SeqCst);
        store
    }

    pub async fn get(&self, scope: &str, sku: &str) -> Option<AcquiredRight> {
        self.rights
            .lock()
            .await
            .get(&(scope.to_string(), sku.to_string()))
            .cloned()
    }
}

#[async_trait]
impl AcquiredRightsStore for FakeRightsStore {
    async fn get_acquired_right(&self, scope: &str, sku: &str) -> Result<Option<AcquiredRight>> {
        Ok(self.get(scope, sku).await)
    }

    async fn upsert_acquired_right(&self, right: &AcquiredRight) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("connection reset by peer");
        }
        self.rights
            .lock()
            .await
            .insert((right.scope.clone(), right.sku.clone()), right.clone());
        Ok(())
    }

    async fn delete_acquired_right(&self, scope: &str, sku: &str) -> Result<bool> {
        Ok(self
            .rights
            .lock()
            .await
            .remove(&(scope.to_string(), sku.to_string()))
            .is_some())
    }
}

#[derive(Default)]
struct UsersState {
    next_id: i32,
    aggregations: Vec<Aggregation>,
    products: Vec<Product>,
    concurrent: Vec<ConcurrentUser>,
    nominative: Vec<NominativeUser>,
}

#[derive(Default)]
pub struct FakeUsersStore {
    state: Mutex<UsersState>,
}

impl FakeUsersStore {
    pub async fn add_aggregation(&self, id: i32, scope: &str, name: &str) {
        self.state.lock().await.aggregations.push(Aggregation {
            id,
            scope: scope.to_string(),
            name: name.to_string(),
            editor: "oracle".to_string(),
        });
    }

    pub async fn products(&self) -> Vec<Product> {
        self.state.lock().await.products.clone()
    }

    pub async fn concurrent_users(&self) -> Vec<ConcurrentUser> {
        self.state.lock().await.concurrent.clone()
    }

    pub async fn nominative_users(&self) -> Vec<NominativeUser> {
        self.state.lock().await.nominative.clone()
    }
}

#[async_trait]
impl ProductUsersStore for FakeUsersStore {
    async fn get_aggregation(&self, scope: &str, id: i32) -> Result<Option<Aggregation>> {
        let state = self.state.lock().await;
        Ok(state
            .aggregations
            .iter()
            .find(|aggregation| aggregation.scope == scope && aggregation.id == id)
            .cloned())
    }

    async fn get_product(&self, scope: &str, swidtag: &str) -> Result<Option<Product>> {
        let state = self.state.lock().await;
        Ok(state
            .products
            .iter()
            .find(|product| product.scope == scope && product.swidtag == swidtag)
            .cloned())
    }

    async fn upsert_product(&self, product: &Product) -> Result<()> {
        let mut state = self.state.lock().await;
        state.products.retain(|existing| {
            !(existing.scope == product.scope && existing.swidtag == product.swidtag)
        });
        state.products.push(product.clone());
        Ok(())
    }

    async fn upsert_concurrent_user(&self, user: &ConcurrentUser) -> Result<i32> {
        let mut state = self.state.lock().await;
        if user.id > 0 {
            let Some(existing) = state
                .concurrent
                .iter_mut()
                .find(|existing| existing.scope == user.scope && existing.id == user.id)
            else {
                bail!("concurrent user {} not found", user.id);
            };
            *existing = user.clone();
            return Ok(user.id);
        }

        state.next_id += 1;
        let id = state.next_id;
        state.concurrent.push(ConcurrentUser {
            id,
            ..user.clone()
        });
        Ok(id)
    }

    async fn get_concurrent_user(&self, scope: &str, id: i32) -> Result<Option<ConcurrentUser>> {
        let state = self.state.lock().await;
        Ok(state
            .concurrent
            .iter()
            .find(|user| user.scope == scope && user.id == id)
            .cloned())
    }

    async fn delete_concurrent_user(&self, scope: &str, id: i32) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .concurrent
            .retain(|user| !(user.scope == scope && user.id == id));
        Ok(())
    }

    async fn upsert_nominative_users(&self, users: &[NominativeUser]) -> Result<()> {
        let mut state = self.state.lock().await;
        for user in users {
            let position = state.nominative.iter().position(|existing| {
                existing.scope == user.scope
                    && existing.swidtag == user.swidtag
                    && existing.aggregation_id == user.aggregation_id
                    && existing.email == user.email
                    && existing.profile == user.profile
            });
            match position {
                Some(index) => {
                    let id = state.nominative[index].id;
                    state.nominative[index] = NominativeUser {
                        id,
                        ..user.clone()
                    };
                }
                None => {
                    state.next_id += 1;
                    let id = state.next_id;
                    state.nominative.push(NominativeUser {
                        id,
                        ..user.clone()
                    });
                }
            }
        }
        Ok(())
    }

    async fn get_nominative_user(&self, scope: &str, id: i32) -> Result<Option<NominativeUser>> {
        let state = self.state.lock().await;
        Ok(state
            .nominative
            .iter()
            .find(|user| user.scope == scope && user.id == id)
            .cloned())
    }

    async fn delete_nominative_user(&self, scope: &str, id: i32) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .nominative
            .retain(|user| !(user.scope == scope && user.id == id));
        Ok(())
    }

    async fn count_product_users(&self, scope: &str, swidtag: &str) -> Result<i64> {
        let state = self.state.lock().await;
        let concurrent = state
            .concurrent
            .iter()
            .filter(|user| user.scope == scope && user.swidtag == swidtag)
            .count();
        let nominative = state
            .nominative
            .iter()
            .filter(|user| user.scope == scope && user.swidtag == swidtag)
            .count();
        Ok((concurrent + nominative) as i64)
    }

    async fn delete_product(&self, scope: &str, swidtag: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .products
            .retain(|product| !(product.scope == scope && product.swidtag == swidtag));
        Ok(())
    }
}

/// Answers each cost category after its own delay, or fails it.
#[derive(Default)]
pub struct DelayedComplianceStore {
    answers: HashMap<CostCategory, (Duration, Result<Vec<ScopeCost>, String>)>,
}

impl DelayedComplianceStore {
    pub fn answer(mut self, category: CostCategory, delay_ms: u64, costs: Vec<ScopeCost>) -> Self {
        self.answers
            .insert(category, (Duration::from_millis(delay_ms), Ok(costs)));
        self
    }

    pub fn fail(mut self, category: CostCategory, delay_ms: u64, reason: &str) -> Self {
        self.answers.insert(
            category,
            (Duration::from_millis(delay_ms), Err(reason.to_string())),
        );
        self
    }
}

#[async_trait]
impl ComplianceReadStore for DelayedComplianceStore {
    async fn scope_costs(
        &self,
        category: CostCategory,
        scopes: &[String],
        _editor: &str,
    ) -> Result<Vec<ScopeCost>> {
        let Some((delay, answer)) = self.answers.get(&category) else {
            return Ok(Vec::new());
        };
        tokio::time::sleep(*delay).await;
        match answer {
            Ok(costs) => Ok(costs
                .iter()
                .filter(|cost| scopes.contains(&cost.scope))
                .cloned()
                .collect()),
            Err(reason) => bail!("{reason}"),
        }
    }
}
