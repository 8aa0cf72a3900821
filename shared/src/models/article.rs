//! Product catalog and purchase observation models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cross-tenant canonical product under a market supplier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketMasterArticle {
    pub id: Uuid,
    pub market_supplier_id: Uuid,
    pub name: String,
    pub unit: String,
    /// Cache of the most recently observed unit price across tenants
    pub current_unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Tenant-scoped canonical product, aliasing one market master article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterArticle {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub supplier_id: Uuid,
    pub market_master_article_id: Uuid,
    pub name: String,
    pub unit: String,
    /// Cache of the most recently observed unit price for this tenant
    pub current_unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// One observed purchase line, tied to an invoice and a master article.
///
/// Lines sharing a master article on the same invoice are blended into a
/// single quantity-weighted observation before this record is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub master_article_id: Uuid,
    pub invoice_id: Uuid,
    pub date: NaiveDate,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discounts: Decimal,
    pub duties_and_taxes: Decimal,
    /// Recorded purchase value of the line (quantity x price - discounts + duties)
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Article {
    pub fn compute_total(
        quantity: Decimal,
        unit_price: Decimal,
        discounts: Decimal,
        duties_and_taxes: Decimal,
    ) -> Decimal {
        quantity * unit_price - discounts + duties_and_taxes
    }
}
