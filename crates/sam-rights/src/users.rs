use std::sync::Arc;

use chrono::Utc;
use sam_core::{
    Aggregation, ConcurrentUser, ConcurrentUserKey, ConcurrentUserUpserted, CorrelationId,
    DomainEvent, NominativeUser, NominativeUserKey, NominativeUserUpserted, Product, ProductKey,
    ProductType, ProductUsersStore,
};
use sam_platform::{
    Claims, SuccessResponse, UpsertConcurrentUserRequest, UpsertNominativeUsersRequest,
    UpsertNominativeUsersResponse,
};
use tracing::{debug, error, info};

use crate::error::{ServiceError, ServiceResult};
use crate::producer::OutboxProducer;
use crate::validation::{derive_swidtag, purchase_date, screen_nominative_users};

/// Where a usage record points: an aggregation of products or a single
/// product identified by its swidtag.
enum UsageTarget {
    Aggregation(Aggregation),
    Product { swidtag: String },
}

impl UsageTarget {
    fn aggregation_id(&self) -> i32 {
        match self {
            UsageTarget::Aggregation(aggregation) => aggregation.id,
            UsageTarget::Product { .. } => 0,
        }
    }

    fn swidtag(&self) -> &str {
        match self {
            UsageTarget::Aggregation(_) => "",
            UsageTarget::Product { swidtag } => swidtag,
        }
    }
}

pub struct ProductUsersService {
    store: Arc<dyn ProductUsersStore>,
    producer: OutboxProducer,
}

impl ProductUsersService {
    pub fn new(store: Arc<dyn ProductUsersStore>, producer: OutboxProducer) -> Self {
        Self { store, producer }
    }

    pub async fn upsert_concurrent_user(
        &self,
        claims: &Claims,
        request: UpsertConcurrentUserRequest,
    ) -> ServiceResult<SuccessResponse> {
        ensure_scope(claims, &request.scope)?;

        let aggregation_id = if request.is_aggregation {
            request.aggregation_id
        } else {
            0
        };
        let target = self
            .resolve_target(
                claims,
                &request.scope,
                aggregation_id,
                &request.product_name,
                &request.product_editor,
                &request.product_version,
            )
            .await?;

        let existing = if request.id > 0 {
            let existing = self
                .store
                .get_concurrent_user(&request.scope, request.id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("concurrent user {}", request.id)))?;
            Some(existing.purchase_date)
        } else {
            None
        };
        let purchase_date = purchase_date(Utc::now().date_naive(), existing);

        let user = ConcurrentUser {
            id: request.id,
            scope: request.scope,
            is_aggregation: request.is_aggregation,
            aggregation_id: target.aggregation_id(),
            swidtag: target.swidtag().to_string(),
            product_name: request.product_name,
            product_editor: request.product_editor,
            product_version: request.product_version,
            number_of_users: request.number_of_users,
            profile_user: request.profile_user,
            team: request.team,
            purchase_date,
            created_by: claims.user_id.clone(),
        };
        let id = self.store.upsert_concurrent_user(&user).await?;
        info!(id, scope = %user.scope, "concurrent user saved");

        self.producer
            .publish(&DomainEvent::UpsertConcurrentUserRecord(
                ConcurrentUserUpserted {
                    scope: user.scope,
                    is_aggregation: user.is_aggregation,
                    aggregation_id: user.aggregation_id,
                    swidtag: user.swidtag,
                    product_editor: user.product_editor,
                    product_name: user.product_name,
                    product_version: user.product_version,
                    number_of_users: user.number_of_users,
                    profile_user: user.profile_user,
                    team: user.team,
                    purchase_date: user.purchase_date,
                    created_by: user.created_by,
                },
            ))
            .await;

        Ok(SuccessResponse { success: true })
    }

    pub async fn delete_concurrent_user(
        &self,
        claims: &Claims,
        scope: &str,
        id: i32,
    ) -> ServiceResult<SuccessResponse> {
        ensure_scope(claims, scope)?;

        let user = self
            .store
            .get_concurrent_user(scope, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("concurrent user {id}")))?;
        self.store.delete_concurrent_user(scope, id).await?;
        info!(id, scope, "concurrent user deleted");

        let via_aggregation = user.is_aggregation && user.aggregation_id > 0;
        self.producer
            .publish(&DomainEvent::DeleteConcurrentUserRecord(ConcurrentUserKey {
                scope: scope.to_string(),
                is_aggregation: user.is_aggregation,
                aggregation_id: if via_aggregation { user.aggregation_id } else { 0 },
                swidtag: if via_aggregation {
                    String::new()
                } else {
                    user.swidtag.clone()
                },
                purchase_date: user.purchase_date,
            }))
            .await;

        if !user.is_aggregation {
            self.remove_product_without_users(scope, &user.swidtag).await;
        }

        Ok(SuccessResponse { success: true })
    }

    pub async fn upsert_nominative_users(
        &self,
        claims: &Claims,
        request: UpsertNominativeUsersRequest,
    ) -> ServiceResult<UpsertNominativeUsersResponse> {
        ensure_scope(claims, &request.scope)?;

        let target = self
            .resolve_target(
                claims,
                &request.scope,
                request.aggregation_id,
                &request.product_name,
                &request.product_editor,
                &request.product_version,
            )
            .await?;
        let aggregation_name = match &target {
            UsageTarget::Aggregation(aggregation) => aggregation.name.clone(),
            UsageTarget::Product { .. } => String::new(),
        };

        let screened = screen_nominative_users(&request.user_details);
        let users: Vec<NominativeUser> = screened
            .accepted
            .iter()
            .map(|details| NominativeUser {
                id: 0,
                scope: request.scope.clone(),
                aggregation_id: target.aggregation_id(),
                swidtag: target.swidtag().to_string(),
                user_name: details.user_name.clone(),
                first_name: details.first_name.clone(),
                email: details.email.clone(),
                profile: details.profile.clone(),
                activation_date: details.activation_date,
                created_by: claims.user_id.clone(),
            })
            .collect();

        if !users.is_empty() {
            self.store.upsert_nominative_users(&users).await?;
        }
        info!(
            scope = %request.scope,
            accepted = users.len(),
            rejected = screened.rejected,
            "nominative users saved"
        );

        let correlation_id = CorrelationId::generate();
        for details in screened.accepted.iter().cloned() {
            let event = DomainEvent::UpsertNominativeUserRecord(NominativeUserUpserted {
                scope: request.scope.clone(),
                aggregation_id: target.aggregation_id(),
                aggregation_name: aggregation_name.clone(),
                swidtag: target.swidtag().to_string(),
                product_editor: request.product_editor.clone(),
                product_name: request.product_name.clone(),
                product_version: request.product_version.clone(),
                created_by: claims.user_id.clone(),
                user: details,
            });
            self.producer
                .publish_correlated(&event, Some(&correlation_id))
                .await;
        }

        Ok(UpsertNominativeUsersResponse {
            success: true,
            accepted_users: users.len(),
            rejected_users: screened.rejected,
        })
    }

    pub async fn delete_nominative_user(
        &self,
        claims: &Claims,
        scope: &str,
        id: i32,
    ) -> ServiceResult<SuccessResponse> {
        ensure_scope(claims, scope)?;

        let user = self
            .store
            .get_nominative_user(scope, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("nominative user {id}")))?;
        self.store.delete_nominative_user(scope, id).await?;
        info!(id, scope, "nominative user deleted");

        self.producer
            .publish(&DomainEvent::DeleteNominativeUserRecord(NominativeUserKey {
                scope: scope.to_string(),
                aggregation_id: user.aggregation_id,
                swidtag: user.swidtag.clone(),
                email: user.email,
                profile: user.profile,
            }))
            .await;

        if user.aggregation_id == 0 {
            self.remove_product_without_users(scope, &user.swidtag).await;
        }

        Ok(SuccessResponse { success: true })
    }

    async fn resolve_target(
        &self,
        claims: &Claims,
        scope: &str,
        aggregation_id: i32,
        product_name: &str,
        product_editor: &str,
        product_version: &str,
    ) -> ServiceResult<UsageTarget> {
        if aggregation_id > 0 {
            let aggregation = self
                .store
                .get_aggregation(scope, aggregation_id)
                .await?
                .ok_or_else(|| {
                    ServiceError::validation(format!("aggregation {aggregation_id} does not exist"))
                })?;
            return Ok(UsageTarget::Aggregation(aggregation));
        }

        if product_name.trim().is_empty() || product_editor.trim().is_empty() {
            return Err(ServiceError::validation(
                "either an aggregation or a product name and editor is required",
            ));
        }

        let swidtag = derive_swidtag(product_name, product_editor, product_version);
        if self.store.get_product(scope, &swidtag).await?.is_none() {
            self.store
                .upsert_product(&Product {
                    scope: scope.to_string(),
                    swidtag: swidtag.clone(),
                    name: product_name.to_string(),
                    editor: product_editor.to_string(),
                    version: product_version.to_string(),
                    product_type: ProductType::Saas,
                    created_by: claims.user_id.clone(),
                })
                .await?;
            info!(swidtag = %swidtag, scope, "saas product created");
        }

        Ok(UsageTarget::Product { swidtag })
    }

    /// Deletes a SaaS product once its last user is gone. Failures are
    /// logged; the user deletion that triggered the cleanup stands.
    async fn remove_product_without_users(&self, scope: &str, swidtag: &str) -> bool {
        let remaining = match self.store.count_product_users(scope, swidtag).await {
            Ok(remaining) => remaining,
            Err(err) => {
                error!(scope, swidtag, "failed to count product users: {err:#}");
                return false;
            }
        };
        if remaining > 0 {
            debug!(scope, swidtag, remaining, "product still has users");
            return false;
        }

        if let Err(err) = self.store.delete_product(scope, swidtag).await {
            error!(scope, swidtag, "failed to delete product: {err:#}");
            return false;
        }
        info!(scope, swidtag, "product without users deleted");

        self.producer
            .publish(&DomainEvent::DeleteProductRecord(ProductKey {
                scope: scope.to_string(),
                swidtag: swidtag.to_string(),
            }))
            .await;
        true
    }
}

fn ensure_scope(claims: &Claims, scope: &str) -> ServiceResult<()> {
    if claims.has_scope(scope) {
        Ok(())
    } else {
        Err(ServiceError::PermissionDenied(format!(
            "no access to scope {scope}"
        )))
    }
}
