//! Versioned cost-history ledger models.
//!
//! Both sub-ledgers share the same temporal rules: entries for an owner are
//! totally ordered by date, version numbers are non-decreasing along that
//! order, and the owner's cached cost fields always mirror the
//! chronologically latest entry.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What caused a ledger write.
///
/// `Import` is a fact replay from an invoice: a back-dated import corrects
/// the snapshot that was computed assuming the old fact, in place. `Manual`
/// is an operator checkpoint and always appends a new integer version.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Import,
    Manual,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Import => "import",
            Trigger::Manual => "manual",
        }
    }
}

/// One dated cost snapshot of an ingredient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientHistory {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub ingredient_id: Uuid,
    /// Referenced master article at snapshot time (ARTICLE ingredients only)
    pub master_article_id: Option<Uuid>,
    pub date: NaiveDate,
    /// Decimal so that fractional legacy versions survive round-trips
    pub version_number: Decimal,
    pub trigger: Trigger,
    pub gross_unit_price: Decimal,
    /// Full line cost: gross price x (1 + loss/100) x quantity
    pub unit_cost: Decimal,
    /// Share of `unit_cost` attributable to percentage loss
    pub loss_value: Decimal,
    pub unit_cost_per_portion_recipe: Decimal,
    pub invoice_id: Option<Uuid>,
    /// Purchase observation this snapshot was derived from, when imported
    pub source_article_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// One dated cost/margin snapshot of a recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeHistory {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub recipe_id: Uuid,
    pub date: NaiveDate,
    pub version_number: Decimal,
    pub trigger: Trigger,
    pub purchase_cost_total: Decimal,
    pub purchase_cost_per_portion: Decimal,
    /// Absent when the recipe is not saleable+active or has no sale price
    pub margin: Option<Decimal>,
    pub contains_sub_recipe: bool,
    pub invoice_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
