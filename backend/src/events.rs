//! Domain events emitted by the mutation pipelines.
//!
//! The engine core never talks to the notification collaborator directly;
//! it returns events and a dispatcher decides what leaves the system.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use shared::models::SupplierLabel;

/// Something the engine detected that outside parties may care about
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum DomainEvent {
    PriceVariationDetected {
        establishment_id: Uuid,
        master_article_id: Uuid,
        article_name: String,
        supplier_label: SupplierLabel,
        date: NaiveDate,
        old_unit_price: Decimal,
        new_unit_price: Decimal,
        percentage: Decimal,
    },
}
