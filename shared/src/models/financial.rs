//! Monthly financial report models.
//!
//! A report and its recipe/ingredient rows are rebuilt wholesale for a month
//! each time the aggregator runs; nothing here is updated incrementally.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ReportMonth;

/// Establishment-level inputs to one monthly aggregation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportInput {
    pub month: ReportMonth,
    pub sales_mix: Vec<RecipeSales>,
    pub labor_costs: Decimal,
    pub fixed_costs: Decimal,
    pub variable_costs: Decimal,
    pub other_costs: Decimal,
    pub employees_count: u32,
}

/// Units sold for one recipe during the report month
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeSales {
    pub recipe_id: Uuid,
    pub units_sold: i64,
}

/// Monthly aggregate for an establishment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialReport {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub month: ReportMonth,
    pub revenue_total: Decimal,
    pub material_costs: Decimal,
    /// material_costs / revenue, as a percentage
    pub material_ratio: Decimal,
    pub labor_costs: Decimal,
    pub labor_ratio: Decimal,
    pub fixed_costs: Decimal,
    pub variable_costs: Decimal,
    pub other_costs: Decimal,
    pub commercial_margin: Decimal,
    pub ebitda: Decimal,
    pub ebitda_ratio: Decimal,
    pub break_even_point: Decimal,
    pub safety_margin: Decimal,
    pub employees_count: u32,
    pub revenue_per_employee: Option<Decimal>,
    pub revenue_per_dish: Option<Decimal>,
    pub purchase_score: Decimal,
    pub recipe_score: Decimal,
    pub financial_score: Decimal,
    pub global_score: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Per-recipe breakdown of one monthly report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialRecipe {
    pub id: Uuid,
    pub report_id: Uuid,
    pub recipe_id: Uuid,
    pub name: String,
    pub units_sold: i64,
    pub sale_price_per_portion: Decimal,
    pub purchase_cost_per_portion: Decimal,
    pub revenue: Decimal,
    pub material_cost: Decimal,
    pub margin: Decimal,
    pub margin_ratio: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Per-ingredient breakdown of one report recipe row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialIngredient {
    pub id: Uuid,
    pub financial_recipe_id: Uuid,
    pub ingredient_id: Uuid,
    /// Referenced master article, when the ingredient is an ARTICLE line
    pub master_article_id: Option<Uuid>,
    pub name: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub cost_total: Decimal,
    pub created_at: DateTime<Utc>,
}
