use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquiredRight {
    pub sku: String,
    pub scope: String,
    pub swidtag: String,
    pub product_name: String,
    pub product_editor: String,
    pub metric: String,
    pub version: String,
    pub entity: String,
    pub num_licenses_acquired: i32,
    pub num_licences_maintenance: i32,
    pub avg_unit_price: Decimal,
    pub avg_maintenance_unit_price: Decimal,
    pub total_purchase_cost: Decimal,
    pub total_maintenance_cost: Decimal,
    pub total_cost: Decimal,
    pub start_of_maintenance: Option<DateTime<Utc>>,
    pub end_of_maintenance: Option<DateTime<Utc>>,
    pub created_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductType {
    OnPremise,
    Saas,
}

impl ProductType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductType::OnPremise => "ONPREMISE",
            ProductType::Saas => "SAAS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub scope: String,
    pub swidtag: String,
    pub name: String,
    pub editor: String,
    pub version: String,
    pub product_type: ProductType,
    pub created_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    pub id: i32,
    pub scope: String,
    pub name: String,
    pub editor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrentUser {
    /// Zero until the store assigns one.
    pub id: i32,
    pub scope: String,
    pub is_aggregation: bool,
    pub aggregation_id: i32,
    pub swidtag: String,
    pub product_name: String,
    pub product_editor: String,
    pub product_version: String,
    pub number_of_users: i32,
    pub profile_user: String,
    pub team: String,
    pub purchase_date: NaiveDate,
    pub created_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NominativeUser {
    pub id: i32,
    pub scope: String,
    pub aggregation_id: i32,
    pub swidtag: String,
    pub user_name: String,
    pub first_name: String,
    pub email: String,
    pub profile: String,
    pub activation_date: Option<NaiveDate>,
    pub created_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CostCategory {
    Counterfeiting,
    UnderUsage,
    Total,
}

impl CostCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            CostCategory::Counterfeiting => "counterfeiting",
            CostCategory::UnderUsage => "under_usage",
            CostCategory::Total => "total",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeCost {
    pub scope: String,
    pub cost: Decimal,
}
