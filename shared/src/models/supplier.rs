//! Supplier models: canonical (market) and tenant-scoped records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supplier category, used to filter price alerts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SupplierLabel {
    #[default]
    Food,
    Beverage,
}

/// Cross-tenant canonical supplier, deduplicated by cleaned name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSupplier {
    pub id: Uuid,
    pub name: String,
    pub label: SupplierLabel,
    pub created_at: DateTime<Utc>,
}

/// Tenant-scoped supplier record, aliasing one market supplier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub market_supplier_id: Uuid,
    pub name: String,
    pub label: SupplierLabel,
    pub siret: Option<String>,
    pub vat_number: Option<String>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}
