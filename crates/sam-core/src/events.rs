use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Wire discriminant of a [`DomainEvent`]. The string forms are part of the
/// contract with the graph consumer and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    UpsertAcquiredRight,
    DeleteAcquiredRight,
    UpsertConcurrentUserRecord,
    DeleteConcurrentUserRecord,
    UpsertNominativeUserRecord,
    DeleteNominativeUserRecord,
    DeleteProductRecord,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::UpsertAcquiredRight,
        EventKind::DeleteAcquiredRight,
        EventKind::UpsertConcurrentUserRecord,
        EventKind::DeleteConcurrentUserRecord,
        EventKind::UpsertNominativeUserRecord,
        EventKind::DeleteNominativeUserRecord,
        EventKind::DeleteProductRecord,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::UpsertAcquiredRight => "UpsertAcquiredRight",
            EventKind::DeleteAcquiredRight => "DeleteAcquiredRight",
            EventKind::UpsertConcurrentUserRecord => "UpsertConcurrentUserRecord",
            EventKind::DeleteConcurrentUserRecord => "DeleteConcurrentUserRecord",
            EventKind::UpsertNominativeUserRecord => "UpsertNominativeUserRecord",
            EventKind::DeleteNominativeUserRecord => "DeleteNominativeUserRecord",
            EventKind::DeleteProductRecord => "DeleteProductRecord",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == raw)
            .ok_or_else(|| UnknownEventKind(raw.to_string()))
    }
}

/// A committed mutation of the system of record, to be replayed onto the
/// graph index by the asynchronous consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    UpsertAcquiredRight(AcquiredRightUpserted),
    DeleteAcquiredRight(AcquiredRightKey),
    UpsertConcurrentUserRecord(ConcurrentUserUpserted),
    DeleteConcurrentUserRecord(ConcurrentUserKey),
    UpsertNominativeUserRecord(NominativeUserUpserted),
    DeleteNominativeUserRecord(NominativeUserKey),
    DeleteProductRecord(ProductKey),
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::UpsertAcquiredRight(_) => EventKind::UpsertAcquiredRight,
            DomainEvent::DeleteAcquiredRight(_) => EventKind::DeleteAcquiredRight,
            DomainEvent::UpsertConcurrentUserRecord(_) => EventKind::UpsertConcurrentUserRecord,
            DomainEvent::DeleteConcurrentUserRecord(_) => EventKind::DeleteConcurrentUserRecord,
            DomainEvent::UpsertNominativeUserRecord(_) => EventKind::UpsertNominativeUserRecord,
            DomainEvent::DeleteNominativeUserRecord(_) => EventKind::DeleteNominativeUserRecord,
            DomainEvent::DeleteProductRecord(_) => EventKind::DeleteProductRecord,
        }
    }

    pub fn scope(&self) -> &str {
        match self {
            DomainEvent::UpsertAcquiredRight(payload) => &payload.scope,
            DomainEvent::DeleteAcquiredRight(payload) => &payload.scope,
            DomainEvent::UpsertConcurrentUserRecord(payload) => &payload.scope,
            DomainEvent::DeleteConcurrentUserRecord(payload) => &payload.scope,
            DomainEvent::UpsertNominativeUserRecord(payload) => &payload.scope,
            DomainEvent::DeleteNominativeUserRecord(payload) => &payload.scope,
            DomainEvent::DeleteProductRecord(payload) => &payload.scope,
        }
    }

    /// Natural key of the mutated entity inside its scope, used for log fields.
    pub fn entity_key(&self) -> String {
        match self {
            DomainEvent::UpsertAcquiredRight(payload) => payload.sku.clone(),
            DomainEvent::DeleteAcquiredRight(payload) => payload.sku.clone(),
            DomainEvent::UpsertConcurrentUserRecord(payload) => {
                target_key(payload.aggregation_id, &payload.swidtag)
            }
            DomainEvent::DeleteConcurrentUserRecord(payload) => {
                target_key(payload.aggregation_id, &payload.swidtag)
            }
            DomainEvent::UpsertNominativeUserRecord(payload) => payload.user.email.clone(),
            DomainEvent::DeleteNominativeUserRecord(payload) => payload.email.clone(),
            DomainEvent::DeleteProductRecord(payload) => payload.swidtag.clone(),
        }
    }
}

fn target_key(aggregation_id: i32, swidtag: &str) -> String {
    if aggregation_id > 0 {
        format!("aggregation:{aggregation_id}")
    } else {
        swidtag.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquiredRightUpserted {
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
    #[serde(default)]
    pub start_of_maintenance: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_of_maintenance: Option<DateTime<Utc>>,
    /// The record previously pointed at another product; the consumer must
    /// move the edge instead of updating the node in place.
    #[serde(default, rename = "isSwidtagModified")]
    pub is_swidtag_modified: bool,
    #[serde(default, rename = "isMetricModified")]
    pub is_metric_modified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquiredRightKey {
    pub sku: String,
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrentUserUpserted {
    pub scope: String,
    pub is_aggregation: bool,
    #[serde(default)]
    pub aggregation_id: i32,
    #[serde(default)]
    pub swidtag: String,
    #[serde(default)]
    pub product_editor: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_version: String,
    pub number_of_users: i32,
    #[serde(default)]
    pub profile_user: String,
    #[serde(default)]
    pub team: String,
    pub purchase_date: NaiveDate,
    pub created_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrentUserKey {
    pub scope: String,
    pub is_aggregation: bool,
    #[serde(default)]
    pub aggregation_id: i32,
    #[serde(default)]
    pub swidtag: String,
    pub purchase_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NominativeUserDetails {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub first_name: String,
    pub email: String,
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub activation_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NominativeUserUpserted {
    pub scope: String,
    #[serde(default)]
    pub aggregation_id: i32,
    #[serde(default)]
    pub aggregation_name: String,
    #[serde(default)]
    pub swidtag: String,
    #[serde(default)]
    pub product_editor: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_version: String,
    pub created_by: String,
    pub user: NominativeUserDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NominativeUserKey {
    pub scope: String,
    #[serde(default)]
    pub aggregation_id: i32,
    #[serde(default)]
    pub swidtag: String,
    pub email: String,
    #[serde(default)]
    pub profile: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductKey {
    pub scope: String,
    pub swidtag: String,
}
