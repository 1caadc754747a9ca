use rust_decimal::Decimal;
use sam_core::ScopeCost;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    User,
}

/// Identity of the caller as established by the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub role: Role,
    pub scopes: Vec<String>,
}

impl Claims {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|owned| owned == scope)
    }

    pub fn has_scopes(&self, scopes: &[String]) -> bool {
        scopes.iter().all(|scope| self.has_scope(scope))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpsertAcquiredRightRequest {
    pub sku: String,
    pub swidtag: String,
    pub product_name: String,
    pub product_editor: String,
    pub metric_type: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub entity: String,
    pub scope: String,
    pub num_licenses_acquired: i32,
    #[serde(default)]
    pub num_licences_maintenance: i32,
    pub avg_unit_price: Decimal,
    #[serde(default)]
    pub avg_maintenance_unit_price: Decimal,
    pub total_purchase_cost: Decimal,
    #[serde(default)]
    pub total_maintenance_cost: Decimal,
    pub total_cost: Decimal,
    /// RFC 3339; anything unparseable is treated as absent.
    #[serde(default)]
    pub start_of_maintenance: String,
    #[serde(default)]
    pub end_of_maintenance: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpsertConcurrentUserRequest {
    /// Zero creates a new record.
    #[serde(default)]
    pub id: i32,
    pub scope: String,
    #[serde(default)]
    pub is_aggregation: bool,
    #[serde(default)]
    pub aggregation_id: i32,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_editor: String,
    #[serde(default)]
    pub product_version: String,
    pub number_of_users: i32,
    #[serde(default)]
    pub profile_user: String,
    #[serde(default)]
    pub team: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NominativeUserInput {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub first_name: String,
    pub email: String,
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub activation_date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpsertNominativeUsersRequest {
    pub scope: String,
    #[serde(default)]
    pub aggregation_id: i32,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_editor: String,
    #[serde(default)]
    pub product_version: String,
    pub user_details: Vec<NominativeUserInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertNominativeUsersResponse {
    pub success: bool,
    pub accepted_users: usize,
    pub rejected_users: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupComplianceEditorRequest {
    pub editor: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopesEditorCosts {
    pub counterfeiting: Vec<ScopeCost>,
    pub under_usage: Vec<ScopeCost>,
    pub total: Vec<ScopeCost>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupComplianceEditorResponse {
    pub costs: ScopesEditorCosts,
    pub group_counterfeiting_cost: Decimal,
    pub group_under_usage_cost: Decimal,
    pub group_total_cost: Decimal,
}
