use std::sync::Arc;

use sam_core::{
    AcquiredRight, AcquiredRightKey, AcquiredRightUpserted, AcquiredRightsStore, DomainEvent,
};
use sam_platform::{Claims, SuccessResponse, UpsertAcquiredRightRequest};
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use crate::producer::OutboxProducer;
use crate::validation::{check_maintenance_window, parse_maintenance_date};

pub struct AcquiredRightsService {
    store: Arc<dyn AcquiredRightsStore>,
    producer: OutboxProducer,
}

impl AcquiredRightsService {
    pub fn new(store: Arc<dyn AcquiredRightsStore>, producer: OutboxProducer) -> Self {
        Self { store, producer }
    }

    pub async fn upsert_acquired_right(
        &self,
        claims: &Claims,
        request: UpsertAcquiredRightRequest,
    ) -> ServiceResult<SuccessResponse> {
        if !claims.has_scope(&request.scope) {
            return Err(ServiceError::PermissionDenied(format!(
                "no access to scope {}",
                request.scope
            )));
        }
        for (field, value) in [
            ("sku", &request.sku),
            ("swidtag", &request.swidtag),
            ("scope", &request.scope),
        ] {
            if value.trim().is_empty() {
                return Err(ServiceError::validation(format!("{field} is required")));
            }
        }

        let start_of_maintenance = parse_maintenance_date(&request.start_of_maintenance);
        let end_of_maintenance = parse_maintenance_date(&request.end_of_maintenance);
        check_maintenance_window(start_of_maintenance, end_of_maintenance)?;

        let previous = self
            .store
            .get_acquired_right(&request.scope, &request.sku)
            .await?;
        let is_swidtag_modified = previous
            .as_ref()
            .is_some_and(|previous| previous.swidtag != request.swidtag);
        let is_metric_modified = previous
            .as_ref()
            .is_some_and(|previous| previous.metric != request.metric_type);

        let right = AcquiredRight {
            sku: request.sku,
            scope: request.scope,
            swidtag: request.swidtag,
            product_name: request.product_name,
            product_editor: request.product_editor,
            metric: request.metric_type,
            version: request.version,
            entity: request.entity,
            num_licenses_acquired: request.num_licenses_acquired,
            num_licences_maintenance: request.num_licences_maintenance,
            avg_unit_price: request.avg_unit_price,
            avg_maintenance_unit_price: request.avg_maintenance_unit_price,
            total_purchase_cost: request.total_purchase_cost,
            total_maintenance_cost: request.total_maintenance_cost,
            total_cost: request.total_cost,
            start_of_maintenance,
            end_of_maintenance,
            created_by: claims.user_id.clone(),
        };
        self.store.upsert_acquired_right(&right).await?;
        info!(sku = %right.sku, scope = %right.scope, "acquired right saved");

        let event = DomainEvent::UpsertAcquiredRight(AcquiredRightUpserted {
            sku: right.sku,
            swidtag: right.swidtag,
            product_name: right.product_name,
            product_editor: right.product_editor,
            metric_type: right.metric,
            version: right.version,
            entity: right.entity,
            scope: right.scope,
            num_licenses_acquired: right.num_licenses_acquired,
            num_licences_maintenance: right.num_licences_maintenance,
            avg_unit_price: right.avg_unit_price,
            avg_maintenance_unit_price: right.avg_maintenance_unit_price,
            total_purchase_cost: right.total_purchase_cost,
            total_maintenance_cost: right.total_maintenance_cost,
            total_cost: right.total_cost,
            start_of_maintenance: right.start_of_maintenance,
            end_of_maintenance: right.end_of_maintenance,
            is_swidtag_modified,
            is_metric_modified,
        });
        self.producer.publish(&event).await;

        Ok(SuccessResponse { success: true })
    }

    pub async fn delete_acquired_right(
        &self,
        claims: &Claims,
        scope: &str,
        sku: &str,
    ) -> ServiceResult<SuccessResponse> {
        if !claims.has_scope(scope) {
            return Err(ServiceError::PermissionDenied(format!(
                "no access to scope {scope}"
            )));
        }

        if !self.store.delete_acquired_right(scope, sku).await? {
            return Err(ServiceError::NotFound(format!("acquired right {sku}")));
        }
        info!(sku, scope, "acquired right deleted");

        self.producer
            .publish(&DomainEvent::DeleteAcquiredRight(AcquiredRightKey {
                sku: sku.to_string(),
                scope: scope.to_string(),
            }))
            .await;

        Ok(SuccessResponse { success: true })
    }
}
