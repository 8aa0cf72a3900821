//! Recipe duplication.
//!
//! Clones a recipe's identity and its full ingredient set (same variants,
//! quantities, costs), seeds a single fresh version-1 history entry for each
//! clone at the duplication date, and recomputes margin when the duplicate
//! is saleable and active. Sub-recipe references point at the original
//! children; the composition graph is shared, not deep-copied.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::models::{Ingredient, IngredientKind, Recipe, Trigger};

use crate::error::{AppError, AppResult};
use crate::store::{Query, Store};

use super::ledger::{HistoryIndex, IngredientCostInput, LedgerService, RecipeCostInput};

/// Recipe duplication pipeline
#[derive(Clone)]
pub struct DuplicationService<S> {
    store: S,
    ledger: LedgerService<S>,
}

impl<S: Store + Clone> DuplicationService<S> {
    pub fn new(store: S, ledger: LedgerService<S>) -> Self {
        Self { store, ledger }
    }

    /// Duplicate a recipe at the given date, returning the new recipe
    pub async fn duplicate_recipe(
        &self,
        establishment_id: Uuid,
        recipe_id: Uuid,
        new_name: Option<String>,
        date: NaiveDate,
    ) -> AppResult<Recipe> {
        let source: Recipe = self
            .store
            .get_by_id(recipe_id)
            .await?
            .filter(|r: &Recipe| r.establishment_id == establishment_id)
            .ok_or_else(|| AppError::not_found("Recipe"))?;

        let clone = self
            .store
            .create(Recipe {
                id: Uuid::new_v4(),
                establishment_id,
                name: new_name.unwrap_or_else(|| format!("{} (copy)", source.name)),
                portion_count: source.portion_count,
                saleable: source.saleable,
                active: source.active,
                sale_price_per_portion: source.sale_price_per_portion,
                purchase_cost_total: source.purchase_cost_total,
                purchase_cost_per_portion: source.purchase_cost_per_portion,
                margin: source.margin,
                created_at: Utc::now(),
            })
            .await?;

        let ingredients: Vec<Ingredient> = self
            .store
            .get_all(Query::new().eq("recipe_id", source.id))
            .await?;

        let mut cost_total = Decimal::ZERO;
        let mut contains_sub_recipe = false;

        for ingredient in ingredients {
            let gross = self.latest_gross_price(&ingredient).await?;
            let cloned = self
                .store
                .create(Ingredient {
                    id: Uuid::new_v4(),
                    establishment_id,
                    recipe_id: clone.id,
                    name: ingredient.name.clone(),
                    kind: ingredient.kind,
                    quantity: ingredient.quantity,
                    percentage_loss: ingredient.percentage_loss,
                    unit_cost: ingredient.unit_cost,
                    created_at: Utc::now(),
                })
                .await?;

            // Seed exactly one version-1 entry for the clone
            self.ledger
                .record_ingredient_cost(
                    &cloned,
                    IngredientCostInput {
                        trigger: Trigger::Manual,
                        date,
                        gross_unit_price: gross,
                        invoice_id: None,
                        source_article_id: None,
                    },
                )
                .await?;

            let refreshed = self.ledger.refresh_ingredient_cache(cloned.id).await?;
            cost_total += refreshed.unit_cost;
            contains_sub_recipe |= matches!(cloned.kind, IngredientKind::SubRecipe { .. });
        }

        self.ledger
            .record_recipe_cost(
                &clone,
                RecipeCostInput {
                    trigger: Trigger::Manual,
                    date,
                    purchase_cost_total: cost_total,
                    contains_sub_recipe,
                    invoice_id: None,
                },
            )
            .await?;

        tracing::info!(source = %source.name, clone = %clone.id, "recipe duplicated");
        self.store
            .get_by_id(clone.id)
            .await?
            .ok_or_else(|| AppError::not_found("Recipe"))
    }

    /// Gross price to seed the clone's first entry with: the source's latest
    /// recorded gross, falling back to the referenced master article's cache
    async fn latest_gross_price(&self, ingredient: &Ingredient) -> AppResult<Decimal> {
        let index = HistoryIndex::new(self.ledger.ingredient_history(ingredient.id).await?);
        if let Some(entry) = index.latest() {
            return Ok(entry.gross_unit_price);
        }
        if let Some(master_article_id) = ingredient.kind.master_article_id() {
            let master: Option<shared::models::MasterArticle> =
                self.store.get_by_id(master_article_id).await?;
            if let Some(master) = master {
                return Ok(master.current_unit_price);
            }
        }
        Ok(Decimal::ZERO)
    }
}
