//! Supplier merge request models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a merge request; only `Accepted` requests may be executed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergeStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

/// A request to fold N source market suppliers into one target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRequest {
    pub id: Uuid,
    pub target_market_supplier_id: Uuid,
    pub source_market_supplier_ids: Vec<Uuid>,
    pub status: MergeStatus,
    pub created_at: DateTime<Utc>,
}
