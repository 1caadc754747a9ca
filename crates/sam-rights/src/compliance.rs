use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rust_decimal::Decimal;
use sam_core::{ComplianceReadStore, CostCategory, ScopeCost};
use sam_platform::{Claims, GroupComplianceEditorRequest, GroupComplianceEditorResponse, Role};
use tracing::error;

use crate::error::{ServiceError, ServiceResult};
use crate::fanout::{AggregateQuerySpec, Aggregation, FanOut, FanOutOutcome, FanOutResponse};

/// One cost category across the requested scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCosts {
    pub costs: Vec<ScopeCost>,
    pub group_total: Decimal,
}

impl FanOutResponse for GroupComplianceEditorResponse {
    type Slot = CostCategory;
    type Partial = CategoryCosts;

    fn merge(&mut self, slot: CostCategory, partial: CategoryCosts) {
        match slot {
            CostCategory::Counterfeiting => {
                self.costs.counterfeiting = partial.costs;
                self.group_counterfeiting_cost = partial.group_total;
            }
            CostCategory::UnderUsage => {
                self.costs.under_usage = partial.costs;
                self.group_under_usage_cost = partial.group_total;
            }
            CostCategory::Total => {
                self.costs.total = partial.costs;
                self.group_total_cost = partial.group_total;
            }
        }
    }
}

/// Lists each requested scope once, in request order, zero where the store
/// had nothing for it. The group total counts every returned row once.
pub fn fill_scope_costs(scopes: &[String], found: Vec<ScopeCost>) -> CategoryCosts {
    let group_total: Decimal = found.iter().map(|cost| cost.cost).sum();

    let mut by_scope: HashMap<String, Decimal> = HashMap::new();
    for cost in found {
        *by_scope.entry(cost.scope).or_default() += cost.cost;
    }

    let mut listed = HashSet::new();
    let costs: Vec<ScopeCost> = scopes
        .iter()
        .filter(|scope| listed.insert(scope.as_str()))
        .map(|scope| ScopeCost {
            scope: scope.clone(),
            cost: by_scope.get(scope).copied().unwrap_or(Decimal::ZERO),
        })
        .collect();

    CategoryCosts { costs, group_total }
}

pub struct ComplianceService {
    store: Arc<dyn ComplianceReadStore>,
}

impl ComplianceService {
    pub fn new(store: Arc<dyn ComplianceReadStore>) -> Self {
        Self { store }
    }

    /// Runs the counterfeiting, under-usage and total cost queries side by
    /// side. A failing query yields an empty response rather than an error.
    pub async fn group_compliance_editor_cost(
        &self,
        claims: &Claims,
        request: GroupComplianceEditorRequest,
    ) -> ServiceResult<GroupComplianceEditorResponse> {
        let aggregation = self.editor_cost_aggregation(claims, request).await?;
        if let FanOutOutcome::Failed(err) = &aggregation.outcome {
            error!("group compliance editor cost failed: {err:#}");
        }
        Ok(aggregation.response)
    }

    /// Same as [`Self::group_compliance_editor_cost`] but keeps the fan-out
    /// outcome visible to the caller.
    pub async fn editor_cost_aggregation(
        &self,
        claims: &Claims,
        request: GroupComplianceEditorRequest,
    ) -> ServiceResult<Aggregation<GroupComplianceEditorResponse>> {
        if claims.role != Role::SuperAdmin {
            return Err(ServiceError::PermissionDenied(
                "group compliance requires a super admin".to_string(),
            ));
        }
        if request.editor.trim().is_empty() {
            return Err(ServiceError::validation("editor is required"));
        }
        if request.scopes.is_empty() {
            return Err(ServiceError::validation("at least one scope is required"));
        }

        let spec = AggregateQuerySpec {
            scopes: request.scopes,
            editor: request.editor,
        };
        let fan_out = [
            CostCategory::Counterfeiting,
            CostCategory::UnderUsage,
            CostCategory::Total,
        ]
        .into_iter()
        .fold(
            FanOut::<GroupComplianceEditorResponse>::new(),
            |fan_out, category| fan_out.with_query(category, spec.clone()),
        );

        let aggregation = fan_out
            .run(|category, spec| {
                let store = Arc::clone(&self.store);
                async move {
                    let found = store
                        .scope_costs(category, &spec.scopes, &spec.editor)
                        .await?;
                    Ok::<_, anyhow::Error>(fill_scope_costs(&spec.scopes, found))
                }
            })
            .await;

        Ok(aggregation)
    }
}
