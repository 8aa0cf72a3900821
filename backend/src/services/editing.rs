//! Manual edits of single ingredients and recipes.
//!
//! An edit applies its field patches, records a `manual` checkpoint in the
//! ledger, then pushes the change through the propagation pipeline so every
//! dependent recipe is recomputed. Margin updates only land on recipes that
//! are saleable and active.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::models::{Ingredient, Recipe, Trigger};
use shared::validation::{
    validate_percentage_loss, validate_portion_count, validate_quantity, validate_sale_price,
};

use crate::error::{AppError, AppResult};
use crate::store::Store;

use super::propagation::{
    DirtyIngredient, PropagationContext, PropagationOutcome, PropagationService,
};

/// Field patches for one ingredient edit; unset fields are left alone
#[derive(Debug, Clone, Default)]
pub struct IngredientEdit {
    pub name: Option<String>,
    pub gross_unit_price: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub percentage_loss: Option<Decimal>,
}

/// Field patches for one recipe edit; unset fields are left alone
#[derive(Debug, Clone, Default)]
pub struct RecipeEdit {
    pub name: Option<String>,
    pub portion_count: Option<Decimal>,
    pub sale_price_per_portion: Option<Decimal>,
    pub saleable: Option<bool>,
    pub active: Option<bool>,
}

/// Manual ingredient/recipe editor
#[derive(Clone)]
pub struct EditingService<S> {
    store: S,
    propagation: PropagationService<S>,
}

impl<S: Store + Clone> EditingService<S> {
    pub fn new(store: S, propagation: PropagationService<S>) -> Self {
        Self { store, propagation }
    }

    /// Apply an ingredient edit at the given date and propagate
    pub async fn edit_ingredient(
        &self,
        establishment_id: Uuid,
        ingredient_id: Uuid,
        date: NaiveDate,
        edit: IngredientEdit,
    ) -> AppResult<PropagationOutcome> {
        let mut ingredient: Ingredient = self
            .store
            .get_by_id(ingredient_id)
            .await?
            .filter(|i: &Ingredient| i.establishment_id == establishment_id)
            .ok_or_else(|| AppError::not_found("Ingredient"))?;

        if let Some(quantity) = edit.quantity {
            validate_quantity(quantity).map_err(AppError::validation)?;
            ingredient.quantity = quantity;
        }
        if let Some(percentage_loss) = edit.percentage_loss {
            validate_percentage_loss(percentage_loss).map_err(AppError::validation)?;
            ingredient.percentage_loss = percentage_loss;
        }
        if let Some(name) = edit.name {
            ingredient.name = name;
        }
        self.store
            .update(ingredient)
            .await?
            .ok_or_else(|| AppError::not_found("Ingredient"))?;

        let ctx = PropagationContext {
            trigger: Trigger::Manual,
            date,
            invoice_id: None,
        };
        self.propagation
            .propagate_ingredients(
                vec![DirtyIngredient {
                    ingredient_id,
                    gross_unit_price: edit.gross_unit_price,
                    source_article_id: None,
                }],
                &ctx,
            )
            .await
    }

    /// Apply a recipe edit at the given date and propagate
    pub async fn edit_recipe(
        &self,
        establishment_id: Uuid,
        recipe_id: Uuid,
        date: NaiveDate,
        edit: RecipeEdit,
    ) -> AppResult<PropagationOutcome> {
        let mut recipe: Recipe = self
            .store
            .get_by_id(recipe_id)
            .await?
            .filter(|r: &Recipe| r.establishment_id == establishment_id)
            .ok_or_else(|| AppError::not_found("Recipe"))?;

        if let Some(portion_count) = edit.portion_count {
            validate_portion_count(portion_count).map_err(AppError::validation)?;
            recipe.portion_count = portion_count;
        }
        if let Some(sale_price) = edit.sale_price_per_portion {
            validate_sale_price(sale_price).map_err(AppError::validation)?;
            recipe.sale_price_per_portion = Some(sale_price);
        }
        if let Some(name) = edit.name {
            recipe.name = name;
        }
        if let Some(saleable) = edit.saleable {
            recipe.saleable = saleable;
        }
        if let Some(active) = edit.active {
            recipe.active = active;
        }
        self.store
            .update(recipe)
            .await?
            .ok_or_else(|| AppError::not_found("Recipe"))?;

        let ctx = PropagationContext {
            trigger: Trigger::Manual,
            date,
            invoice_id: None,
        };
        self.propagation
            .propagate_recipes(vec![recipe_id], &ctx)
            .await
    }
}
