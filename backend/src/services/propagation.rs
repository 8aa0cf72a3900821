//! Cost propagator: pushes ingredient-level cost changes upward through the
//! recipe / sub-recipe graph.
//!
//! Stage one records a ledger entry for every dirty ingredient and marks its
//! owning recipe. Stage two collects the upward closure of marked recipes
//! through SUBRECIPE edges and orders it children-first; a closure that
//! cannot be ordered contains a cycle and the run fails fast. Stage three
//! recomputes each recipe in that order, re-costing the SUBRECIPE
//! ingredients that reference it before their owners are processed.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::models::{Ingredient, IngredientKind, Recipe, Trigger};

use crate::error::{AppError, AppResult};
use crate::store::{Query, Store};

use super::ledger::{HistoryIndex, IngredientCostInput, LedgerService, RecipeCostInput};

/// Shared parameters of one propagation run
#[derive(Debug, Clone)]
pub struct PropagationContext {
    pub trigger: Trigger,
    pub date: NaiveDate,
    pub invoice_id: Option<Uuid>,
}

/// An ingredient whose cost input changed.
///
/// `gross_unit_price` is the new price when the caller knows it (an import's
/// blended price, a manual price edit); when absent the latest recorded
/// gross price is reused, which re-costs the ingredient after a quantity or
/// loss change.
#[derive(Debug, Clone)]
pub struct DirtyIngredient {
    pub ingredient_id: Uuid,
    pub gross_unit_price: Option<Decimal>,
    pub source_article_id: Option<Uuid>,
}

impl DirtyIngredient {
    pub fn repriced(ingredient_id: Uuid, gross_unit_price: Decimal) -> Self {
        Self {
            ingredient_id,
            gross_unit_price: Some(gross_unit_price),
            source_article_id: None,
        }
    }

    pub fn touched(ingredient_id: Uuid) -> Self {
        Self {
            ingredient_id,
            gross_unit_price: None,
            source_article_id: None,
        }
    }
}

/// What one propagation run did
#[derive(Debug, Clone, Default)]
pub struct PropagationOutcome {
    /// Recipes recomputed, children before parents
    pub recipes_recomputed: Vec<Uuid>,
}

/// Walks the ingredient -> recipe -> parent-recipe graph
#[derive(Clone)]
pub struct PropagationService<S> {
    store: S,
    ledger: LedgerService<S>,
}

impl<S: Store + Clone> PropagationService<S> {
    pub fn new(store: S, ledger: LedgerService<S>) -> Self {
        Self { store, ledger }
    }

    /// Propagate from a set of changed ingredients
    pub async fn propagate_ingredients(
        &self,
        dirty: Vec<DirtyIngredient>,
        ctx: &PropagationContext,
    ) -> AppResult<PropagationOutcome> {
        let mut seeds: HashSet<Uuid> = HashSet::new();

        for item in dirty {
            let ingredient: Ingredient = self
                .store
                .get_by_id(item.ingredient_id)
                .await?
                .ok_or_else(|| AppError::not_found("Ingredient"))?;

            let gross = match item.gross_unit_price {
                Some(price) => price,
                None => self.fallback_gross_price(&ingredient).await?,
            };

            self.ledger
                .record_ingredient_cost(
                    &ingredient,
                    IngredientCostInput {
                        trigger: ctx.trigger,
                        date: ctx.date,
                        gross_unit_price: gross,
                        invoice_id: ctx.invoice_id,
                        source_article_id: item.source_article_id,
                    },
                )
                .await?;

            seeds.insert(ingredient.recipe_id);
        }

        self.recompute_closure(seeds, ctx).await
    }

    /// Propagate from recipes whose own definition changed (portion count,
    /// sale price, composition)
    pub async fn propagate_recipes(
        &self,
        recipe_ids: Vec<Uuid>,
        ctx: &PropagationContext,
    ) -> AppResult<PropagationOutcome> {
        let seeds: HashSet<Uuid> = recipe_ids.into_iter().collect();
        self.recompute_closure(seeds, ctx).await
    }

    /// Latest recorded gross price for an ingredient, falling back to the
    /// referenced master article's cached price
    async fn fallback_gross_price(&self, ingredient: &Ingredient) -> AppResult<Decimal> {
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

    /// Recompute every recipe transitively reachable from the seeds through
    /// SUBRECIPE edges, children first
    async fn recompute_closure(
        &self,
        seeds: HashSet<Uuid>,
        ctx: &PropagationContext,
    ) -> AppResult<PropagationOutcome> {
        // Upward closure: child recipe id -> (parent recipe id, ingredient id)
        let mut nodes: HashSet<Uuid> = seeds.clone();
        let mut parent_edges: HashMap<Uuid, Vec<(Uuid, Uuid)>> = HashMap::new();
        let mut frontier: Vec<Uuid> = seeds.into_iter().collect();

        while let Some(recipe_id) = frontier.pop() {
            let referencing: Vec<Ingredient> = self
                .store
                .get_all(
                    Query::new()
                        .eq("variant", "SUBRECIPE")
                        .eq("sub_recipe_id", recipe_id),
                )
                .await?;
            for ingredient in referencing {
                parent_edges
                    .entry(recipe_id)
                    .or_default()
                    .push((ingredient.recipe_id, ingredient.id));
                if nodes.insert(ingredient.recipe_id) {
                    frontier.push(ingredient.recipe_id);
                }
            }
        }

        // Children-first order (Kahn): a recipe is ready once every closure
        // recipe it contains has been recomputed
        let mut in_degree: HashMap<Uuid, usize> = nodes.iter().map(|id| (*id, 0)).collect();
        for (child, edges) in &parent_edges {
            let parents: HashSet<Uuid> = edges.iter().map(|(parent, _)| *parent).collect();
            for parent in parents {
                if nodes.contains(child) {
                    *in_degree.entry(parent).or_insert(0) += 1;
                }
            }
        }

        let mut ready: VecDeque<Uuid> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut outcome = PropagationOutcome::default();
        let mut visited: HashSet<Uuid> = HashSet::new();

        while let Some(recipe_id) = ready.pop_front() {
            if !visited.insert(recipe_id) {
                continue;
            }
            let recipe = self.recompute_recipe(recipe_id, ctx).await?;
            outcome.recipes_recomputed.push(recipe_id);

            // Re-cost the SUBRECIPE ingredients pointing at this recipe,
            // then release their owners. A parent referencing this child
            // through several ingredients is released once.
            if let Some(edges) = parent_edges.get(&recipe_id) {
                let mut released: HashSet<Uuid> = HashSet::new();
                for (parent_id, ingredient_id) in edges {
                    let ingredient: Ingredient = self
                        .store
                        .get_by_id(*ingredient_id)
                        .await?
                        .ok_or_else(|| AppError::not_found("Ingredient"))?;
                    self.ledger
                        .record_ingredient_cost(
                            &ingredient,
                            IngredientCostInput {
                                trigger: ctx.trigger,
                                date: ctx.date,
                                gross_unit_price: recipe.purchase_cost_per_portion,
                                invoice_id: ctx.invoice_id,
                                source_article_id: None,
                            },
                        )
                        .await?;

                    if released.insert(*parent_id) {
                        let degree = in_degree.entry(*parent_id).or_insert(1);
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            ready.push_back(*parent_id);
                        }
                    }
                }
            }
        }

        if visited.len() < nodes.len() {
            let stuck = nodes
                .iter()
                .find(|id| !visited.contains(id))
                .copied()
                .unwrap_or_default();
            return Err(AppError::CycleDetected { recipe_id: stuck });
        }

        Ok(outcome)
    }

    /// Recompute one recipe's cost from its current ingredient caches and
    /// record the resulting ledger entry
    async fn recompute_recipe(
        &self,
        recipe_id: Uuid,
        ctx: &PropagationContext,
    ) -> AppResult<Recipe> {
        let recipe: Recipe = self
            .store
            .get_by_id(recipe_id)
            .await?
            .ok_or_else(|| AppError::not_found("Recipe"))?;

        let ingredients: Vec<Ingredient> = self
            .store
            .get_all(Query::new().eq("recipe_id", recipe_id))
            .await?;

        let purchase_cost_total: Decimal = ingredients.iter().map(|i| i.unit_cost).sum();
        let contains_sub_recipe = ingredients
            .iter()
            .any(|i| matches!(i.kind, IngredientKind::SubRecipe { .. }));

        self.ledger
            .record_recipe_cost(
                &recipe,
                RecipeCostInput {
                    trigger: ctx.trigger,
                    date: ctx.date,
                    purchase_cost_total,
                    contains_sub_recipe,
                    invoice_id: ctx.invoice_id,
                },
            )
            .await?;

        tracing::debug!(
            recipe = %recipe.name,
            total = %purchase_cost_total,
            "recipe cost recomputed"
        );

        self.store
            .get_by_id(recipe_id)
            .await?
            .ok_or_else(|| AppError::not_found("Recipe"))
    }
}
