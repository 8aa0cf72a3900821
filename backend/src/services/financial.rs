//! Monthly financial aggregation.
//!
//! Rebuilds an establishment's report for a month wholesale from a sales
//! mix and establishment-level cost inputs: per-recipe revenue and material
//! cost, establishment ratios, EBITDA, break-even, and the three weighted
//! sub-scores blended into a global score.

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::models::{
    Establishment, FinancialIngredient, FinancialRecipe, FinancialReport, Ingredient, Recipe,
    ReportInput,
};

use crate::error::{AppError, AppResult};
use crate::store::{Query, Store};

use super::ledger::{HistoryIndex, LedgerService};
use super::live_score::LiveScoreService;

/// Financial aggregator
#[derive(Clone)]
pub struct FinancialService<S> {
    store: S,
    ledger: LedgerService<S>,
    live_score: LiveScoreService<S>,
}

impl<S: Store + Clone> FinancialService<S> {
    pub fn new(store: S, ledger: LedgerService<S>, live_score: LiveScoreService<S>) -> Self {
        Self {
            store,
            ledger,
            live_score,
        }
    }

    /// Rebuild the month's report from scratch and return it
    pub async fn build_monthly_report(
        &self,
        establishment_id: Uuid,
        input: ReportInput,
    ) -> AppResult<FinancialReport> {
        let establishment: Establishment = self
            .store
            .get_by_id(establishment_id)
            .await?
            .ok_or_else(|| AppError::not_found("Establishment"))?;

        self.wipe_month(establishment_id, &input).await?;

        let report_id = Uuid::new_v4();
        let month_end = input.month.last_day();

        let mut revenue_total = Decimal::ZERO;
        let mut material_costs = Decimal::ZERO;
        let mut units_total: i64 = 0;
        let mut weighted_margin = Decimal::ZERO;
        let mut recipe_rows: Vec<FinancialRecipe> = Vec::new();
        let mut ingredient_rows: Vec<FinancialIngredient> = Vec::new();

        for sales in &input.sales_mix {
            let recipe: Recipe = self
                .store
                .get_by_id(sales.recipe_id)
                .await?
                .filter(|r: &Recipe| r.establishment_id == establishment_id)
                .ok_or_else(|| AppError::not_found("Recipe"))?;

            // Cost as of the end of the report month
            let index = HistoryIndex::new(self.ledger.recipe_history(recipe.id).await?);
            let cost_per_portion = index
                .latest_on_or_before(month_end)
                .map(|e| e.purchase_cost_per_portion)
                .unwrap_or(recipe.purchase_cost_per_portion);

            let sale_price = recipe.sale_price_per_portion.unwrap_or(Decimal::ZERO);
            let units = Decimal::from(sales.units_sold);
            let revenue = units * sale_price;
            let material_cost = units * cost_per_portion;
            let margin = revenue - material_cost;
            let margin_ratio = ratio(margin, revenue);

            revenue_total += revenue;
            material_costs += material_cost;
            units_total += sales.units_sold;
            weighted_margin += margin_ratio * units;

            let financial_recipe_id = Uuid::new_v4();
            recipe_rows.push(FinancialRecipe {
                id: financial_recipe_id,
                report_id,
                recipe_id: recipe.id,
                name: recipe.name.clone(),
                units_sold: sales.units_sold,
                sale_price_per_portion: sale_price,
                purchase_cost_per_portion: cost_per_portion,
                revenue,
                material_cost,
                margin,
                margin_ratio,
                created_at: Utc::now(),
            });

            let ingredients: Vec<Ingredient> = self
                .store
                .get_all(Query::new().eq("recipe_id", recipe.id))
                .await?;
            for ingredient in ingredients {
                ingredient_rows.push(FinancialIngredient {
                    id: Uuid::new_v4(),
                    financial_recipe_id,
                    ingredient_id: ingredient.id,
                    master_article_id: ingredient.kind.master_article_id(),
                    name: ingredient.name.clone(),
                    quantity: ingredient.quantity,
                    unit_cost: ingredient.unit_cost,
                    cost_total: ingredient.unit_cost,
                    created_at: Utc::now(),
                });
            }
        }

        let material_ratio = ratio(material_costs, revenue_total);
        let labor_ratio = ratio(input.labor_costs, revenue_total);
        let commercial_margin = revenue_total - material_costs;
        let ebitda = revenue_total
            - material_costs
            - input.labor_costs
            - input.fixed_costs
            - input.variable_costs
            - input.other_costs;
        let ebitda_ratio = ratio(ebitda, revenue_total);

        // Break-even on the contribution margin; labor is treated as fixed
        let contribution_rate =
            ratio(revenue_total - material_costs - input.variable_costs, revenue_total)
                / Decimal::ONE_HUNDRED;
        let break_even_point = if contribution_rate > Decimal::ZERO {
            (input.fixed_costs + input.labor_costs) / contribution_rate
        } else {
            Decimal::ZERO
        };
        let safety_margin = if break_even_point > Decimal::ZERO {
            revenue_total - break_even_point
        } else {
            Decimal::ZERO
        };

        let mean_margin_ratio = if units_total > 0 {
            weighted_margin / Decimal::from(units_total)
        } else {
            Decimal::ZERO
        };

        let purchase = purchase_score(material_ratio);
        let recipe = recipe_score(mean_margin_ratio);
        let financial = financial_score(ebitda_ratio);

        let report = FinancialReport {
            id: report_id,
            establishment_id,
            month: input.month,
            revenue_total,
            material_costs,
            material_ratio,
            labor_costs: input.labor_costs,
            labor_ratio,
            fixed_costs: input.fixed_costs,
            variable_costs: input.variable_costs,
            other_costs: input.other_costs,
            commercial_margin,
            ebitda,
            ebitda_ratio,
            break_even_point,
            safety_margin,
            employees_count: input.employees_count,
            revenue_per_employee: if input.employees_count > 0 {
                Some(revenue_total / Decimal::from(input.employees_count))
            } else {
                None
            },
            revenue_per_dish: if units_total > 0 {
                Some(revenue_total / Decimal::from(units_total))
            } else {
                None
            },
            purchase_score: purchase,
            recipe_score: recipe,
            financial_score: financial,
            global_score: global_score(purchase, recipe, financial),
            created_at: Utc::now(),
        };

        let report = self.store.create(report).await?;
        for row in recipe_rows {
            self.store.create(row).await?;
        }
        for row in ingredient_rows {
            self.store.create(row).await?;
        }

        // A rebuilt latest month refreshes the rolling score
        if self.is_latest_report(&report).await? {
            self.live_score
                .refresh_at(establishment.id, Utc::now().date_naive())
                .await?;
        }

        tracing::info!(
            establishment = %establishment.name,
            month = %report.month,
            revenue = %report.revenue_total,
            "monthly report rebuilt"
        );
        Ok(report)
    }

    /// Drop the month's report and its recipe/ingredient rows
    async fn wipe_month(&self, establishment_id: Uuid, input: &ReportInput) -> AppResult<()> {
        let existing: Vec<FinancialReport> = self
            .store
            .get_all(
                Query::new()
                    .eq("establishment_id", establishment_id)
                    .eq("month", input.month),
            )
            .await?;
        for report in existing {
            let recipes: Vec<FinancialRecipe> = self
                .store
                .get_all(Query::new().eq("report_id", report.id))
                .await?;
            for recipe_row in recipes {
                let ingredients: Vec<FinancialIngredient> = self
                    .store
                    .get_all(Query::new().eq("financial_recipe_id", recipe_row.id))
                    .await?;
                for ingredient_row in ingredients {
                    self.store
                        .delete::<FinancialIngredient>(ingredient_row.id)
                        .await?;
                }
                self.store.delete::<FinancialRecipe>(recipe_row.id).await?;
            }
            self.store.delete::<FinancialReport>(report.id).await?;
        }
        Ok(())
    }

    async fn is_latest_report(&self, report: &FinancialReport) -> AppResult<bool> {
        let all: Vec<FinancialReport> = self
            .store
            .get_all(Query::new().eq("establishment_id", report.establishment_id))
            .await?;
        Ok(all.iter().all(|r| r.month <= report.month))
    }
}

/// Numerator over denominator as a percentage; zero when dividing by zero
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator * Decimal::ONE_HUNDRED
    }
}

/// Purchase sub-score from the material-cost ratio
pub fn purchase_score(material_ratio: Decimal) -> Decimal {
    let steps = [(25, 100), (30, 85), (35, 70), (40, 50), (50, 30)];
    for (threshold, score) in steps {
        if material_ratio <= Decimal::from(threshold) {
            return Decimal::from(score);
        }
    }
    Decimal::from(10)
}

/// Recipe sub-score from the units-weighted mean margin ratio
pub fn recipe_score(mean_margin_ratio: Decimal) -> Decimal {
    let steps = [(75, 100), (70, 85), (65, 70), (55, 50), (45, 30)];
    for (threshold, score) in steps {
        if mean_margin_ratio >= Decimal::from(threshold) {
            return Decimal::from(score);
        }
    }
    Decimal::from(10)
}

/// Financial sub-score from the EBITDA ratio
pub fn financial_score(ebitda_ratio: Decimal) -> Decimal {
    let steps = [(20, 100), (15, 85), (10, 70), (5, 50), (0, 30)];
    for (threshold, score) in steps {
        if ebitda_ratio >= Decimal::from(threshold) {
            return Decimal::from(score);
        }
    }
    Decimal::from(10)
}

/// Weighted blend of the three sub-scores
pub fn global_score(purchase: Decimal, recipe: Decimal, financial: Decimal) -> Decimal {
    let thirty = Decimal::new(3, 1);
    let forty = Decimal::new(4, 1);
    purchase * thirty + recipe * thirty + financial * forty
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_tables_are_monotone() {
        assert_eq!(purchase_score(Decimal::from(20)), Decimal::from(100));
        assert_eq!(purchase_score(Decimal::from(33)), Decimal::from(70));
        assert_eq!(purchase_score(Decimal::from(80)), Decimal::from(10));

        assert_eq!(recipe_score(Decimal::from(80)), Decimal::from(100));
        assert_eq!(recipe_score(Decimal::from(60)), Decimal::from(50));

        assert_eq!(financial_score(Decimal::from(-5)), Decimal::from(10));
        assert_eq!(financial_score(Decimal::ZERO), Decimal::from(30));
    }

    #[test]
    fn global_blend_weights() {
        let g = global_score(Decimal::from(100), Decimal::from(100), Decimal::from(100));
        assert_eq!(g, Decimal::from(100));

        let g = global_score(Decimal::from(100), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(g, Decimal::from(30));
    }

    #[test]
    fn ratio_guards_division_by_zero() {
        assert_eq!(ratio(Decimal::from(5), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(ratio(Decimal::from(25), Decimal::from(100)), Decimal::from(25));
    }
}
