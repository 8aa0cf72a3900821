//! Invoice and import job models, including the structured payload the
//! import pipeline consumes (produced upstream by the OCR/extraction step)

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::SupplierLabel;

/// One supplier bill, resolved by (establishment, supplier, invoice_number)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub supplier_id: Uuid,
    pub invoice_number: String,
    pub date: NaiveDate,
    pub total_excl_tax: Decimal,
    pub total_incl_tax: Decimal,
    pub total_vat: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Import job lifecycle: `Pending` -> exactly one run -> `Completed` | `Error`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }
}

/// A queued invoice import with its structured payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub status: JobStatus,
    pub payload: InvoicePayload,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Structured invoice payload: one invoice block, one supplier block, lines
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InvoicePayload {
    #[validate]
    pub invoice: InvoiceBlock,
    #[validate]
    pub supplier: SupplierBlock,
    #[validate]
    pub lines: Vec<InvoiceLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InvoiceBlock {
    #[validate(length(min = 1))]
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub total_excl_tax: Decimal,
    pub total_incl_tax: Decimal,
    pub total_vat: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SupplierBlock {
    /// Supplier name as extracted, before cleaning
    #[validate(length(min = 1))]
    pub raw_name: String,
    #[serde(default)]
    pub label: Option<SupplierLabel>,
    pub siret: Option<String>,
    pub vat_number: Option<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub phones: Vec<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InvoiceLine {
    /// Product name as extracted, before cleaning
    #[validate(length(min = 1))]
    pub product_name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_price_excl_tax: Decimal,
    pub line_total_excl_tax: Decimal,
    pub discounts: Option<Decimal>,
    pub duties_and_taxes: Option<Decimal>,
}
