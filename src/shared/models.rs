use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current state of a delivery as reported by the delivery-record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: Uuid,
    pub name: String,
    pub vip: bool,
    pub last_interaction: Option<DateTime<Utc>>,
}

/// Read-only delivery context consumed by classification and auto-responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: Uuid,
    pub tracking_number: String,
    pub status: DeliveryStatus,
    pub eta: Option<DateTime<Utc>>,
    pub declared_value: Option<f64>,
    pub customer: CustomerRecord,
}
