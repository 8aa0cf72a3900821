//! Article and invoice deletion with cascading cleanup.
//!
//! Deleting a purchase observation removes the ledger entries it sourced and
//! re-derives the affected ingredient caches. When the observation was a
//! master article's last support, the master article is removed together
//! with every ingredient referencing it, every recipe left empty, and their
//! histories, transitively through SUBRECIPE edges. Whatever survives goes
//! through the normal propagation pipeline.

use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use shared::models::{
    Article, Ingredient, IngredientHistory, Invoice, MasterArticle, Recipe, RecipeHistory, Trigger,
};

use crate::error::{AppError, AppResult};
use crate::store::{Query, Store};

use super::ledger::LedgerService;
use super::propagation::{PropagationContext, PropagationService};

/// What one deletion removed and recomputed
#[derive(Debug, Clone, Default)]
pub struct DeletionOutcome {
    pub removed_master_articles: Vec<Uuid>,
    pub removed_ingredients: Vec<Uuid>,
    pub removed_recipes: Vec<Uuid>,
    pub recipes_recomputed: Vec<Uuid>,
}

/// Article / invoice deletion pipeline
#[derive(Clone)]
pub struct DeletionService<S> {
    store: S,
    ledger: LedgerService<S>,
    propagation: PropagationService<S>,
}

impl<S: Store + Clone> DeletionService<S> {
    pub fn new(store: S, ledger: LedgerService<S>, propagation: PropagationService<S>) -> Self {
        Self {
            store,
            ledger,
            propagation,
        }
    }

    /// Delete one purchase observation and everything it alone supported
    pub async fn delete_article(
        &self,
        establishment_id: Uuid,
        article_id: Uuid,
    ) -> AppResult<DeletionOutcome> {
        let article: Article = self
            .store
            .get_by_id(article_id)
            .await?
            .filter(|a: &Article| a.establishment_id == establishment_id)
            .ok_or_else(|| AppError::not_found("Article"))?;

        let mut outcome = DeletionOutcome::default();

        // Drop the ledger entries this observation sourced
        let sourced: Vec<IngredientHistory> = self
            .store
            .get_all(Query::new().eq("source_article_id", article.id))
            .await?;
        let mut affected_ingredients: HashSet<Uuid> = HashSet::new();
        for entry in sourced {
            affected_ingredients.insert(entry.ingredient_id);
            self.store.delete::<IngredientHistory>(entry.id).await?;
        }

        self.store.delete::<Article>(article.id).await?;

        let remaining: Vec<Article> = self
            .store
            .get_all(
                Query::new()
                    .eq("master_article_id", article.master_article_id)
                    .limit(1),
            )
            .await?;

        if remaining.is_empty() {
            self.cascade_master_article(article.master_article_id, &mut outcome)
                .await?;
        }

        // Survivors: re-derive caches from the remaining entries, then
        // recompute their owner recipes through the normal pipeline
        let mut owners: HashSet<Uuid> = HashSet::new();
        for ingredient_id in affected_ingredients {
            if outcome.removed_ingredients.contains(&ingredient_id) {
                continue;
            }
            let survivor: Option<Ingredient> = self.store.get_by_id(ingredient_id).await?;
            let Some(survivor) = survivor else {
                continue;
            };
            self.ledger.refresh_ingredient_cache(ingredient_id).await?;
            owners.insert(survivor.recipe_id);
        }

        if !owners.is_empty() {
            let ctx = PropagationContext {
                trigger: Trigger::Manual,
                date: Utc::now().date_naive(),
                invoice_id: None,
            };
            let propagation = self
                .propagation
                .propagate_recipes(owners.into_iter().collect(), &ctx)
                .await?;
            outcome.recipes_recomputed = propagation.recipes_recomputed;
        }

        Ok(outcome)
    }

    /// Delete an invoice by deleting each of its articles, then the invoice
    pub async fn delete_invoice(
        &self,
        establishment_id: Uuid,
        invoice_id: Uuid,
    ) -> AppResult<DeletionOutcome> {
        let invoice: Invoice = self
            .store
            .get_by_id(invoice_id)
            .await?
            .filter(|i: &Invoice| i.establishment_id == establishment_id)
            .ok_or_else(|| AppError::not_found("Invoice"))?;

        let articles: Vec<Article> = self
            .store
            .get_all(Query::new().eq("invoice_id", invoice.id))
            .await?;

        let mut outcome = DeletionOutcome::default();
        for article in articles {
            let partial = self.delete_article(establishment_id, article.id).await?;
            outcome.removed_master_articles.extend(partial.removed_master_articles);
            outcome.removed_ingredients.extend(partial.removed_ingredients);
            outcome.removed_recipes.extend(partial.removed_recipes);
            outcome.recipes_recomputed.extend(partial.recipes_recomputed);
        }

        self.store.delete::<Invoice>(invoice.id).await?;
        tracing::info!(invoice = %invoice.invoice_number, "invoice deleted");
        Ok(outcome)
    }

    /// Remove a master article that lost its last supporting observation,
    /// with everything that only existed because of it
    async fn cascade_master_article(
        &self,
        master_article_id: Uuid,
        outcome: &mut DeletionOutcome,
    ) -> AppResult<()> {
        let master: Option<MasterArticle> = self.store.get_by_id(master_article_id).await?;
        let Some(master) = master else {
            return Ok(());
        };

        tracing::info!(article = %master.name, "removing unsupported master article");
        self.store.delete::<MasterArticle>(master.id).await?;
        outcome.removed_master_articles.push(master.id);

        // The market-level entry goes when its last tenant alias goes
        let aliases: Vec<MasterArticle> = self
            .store
            .get_all(
                Query::new()
                    .eq("market_master_article_id", master.market_master_article_id)
                    .limit(1),
            )
            .await?;
        if aliases.is_empty() {
            self.store
                .delete::<shared::models::MarketMasterArticle>(master.market_master_article_id)
                .await?;
        }

        // Ingredients referencing the removed master article disappear with
        // it; their owner recipes are checked for emptiness
        let referencing: Vec<Ingredient> = self
            .store
            .get_all(
                Query::new()
                    .eq("variant", "ARTICLE")
                    .eq("master_article_id", master.id),
            )
            .await?;

        let mut owners_to_check: Vec<Uuid> = Vec::new();
        for ingredient in referencing {
            owners_to_check.push(ingredient.recipe_id);
            self.remove_ingredient(&ingredient, outcome).await?;
        }

        // Emptied recipes are removed; SUBRECIPE ingredients pointing at a
        // removed recipe follow, transitively
        while let Some(recipe_id) = owners_to_check.pop() {
            if outcome.removed_recipes.contains(&recipe_id) {
                continue;
            }
            let leftover: Vec<Ingredient> = self
                .store
                .get_all(Query::new().eq("recipe_id", recipe_id).limit(1))
                .await?;
            if !leftover.is_empty() {
                continue;
            }

            let recipe: Option<Recipe> = self.store.get_by_id(recipe_id).await?;
            let Some(recipe) = recipe else {
                continue;
            };
            tracing::info!(recipe = %recipe.name, "removing emptied recipe");
            self.store.delete::<Recipe>(recipe.id).await?;
            outcome.removed_recipes.push(recipe.id);

            let histories: Vec<RecipeHistory> = self
                .store
                .get_all(Query::new().eq("recipe_id", recipe.id))
                .await?;
            for entry in histories {
                self.store.delete::<RecipeHistory>(entry.id).await?;
            }

            let sub_references: Vec<Ingredient> = self
                .store
                .get_all(
                    Query::new()
                        .eq("variant", "SUBRECIPE")
                        .eq("sub_recipe_id", recipe.id),
                )
                .await?;
            for ingredient in sub_references {
                owners_to_check.push(ingredient.recipe_id);
                self.remove_ingredient(&ingredient, outcome).await?;
            }
        }

        Ok(())
    }

    /// Delete an ingredient with its full history
    async fn remove_ingredient(
        &self,
        ingredient: &Ingredient,
        outcome: &mut DeletionOutcome,
    ) -> AppResult<()> {
        let histories: Vec<IngredientHistory> = self
            .store
            .get_all(Query::new().eq("ingredient_id", ingredient.id))
            .await?;
        for entry in histories {
            self.store.delete::<IngredientHistory>(entry.id).await?;
        }
        self.store.delete::<Ingredient>(ingredient.id).await?;
        outcome.removed_ingredients.push(ingredient.id);
        Ok(())
    }
}
