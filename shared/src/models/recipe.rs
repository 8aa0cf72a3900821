//! Recipe and ingredient models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sellable or intermediate product composed of ingredients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub name: String,
    /// Number of portions one batch of this recipe yields
    pub portion_count: Decimal,
    pub saleable: bool,
    pub active: bool,
    pub sale_price_per_portion: Option<Decimal>,
    /// Cache of the latest recipe-history cost figures
    pub purchase_cost_total: Decimal,
    pub purchase_cost_per_portion: Decimal,
    pub margin: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl Recipe {
    /// Margin recomputation (and score updates) only apply to recipes that
    /// are both offered for sale and currently on the menu.
    pub fn margin_applies(&self) -> bool {
        self.saleable && self.active
    }
}

/// What an ingredient line refers to.
///
/// Exactly one reference target is valid per variant: a master article for
/// `ARTICLE`, a child recipe for `SUBRECIPE`, nothing for `FIXED`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "variant", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngredientKind {
    Article { master_article_id: Uuid },
    #[serde(rename = "SUBRECIPE")]
    SubRecipe { sub_recipe_id: Uuid },
    Fixed,
}

impl IngredientKind {
    pub fn variant_name(&self) -> &'static str {
        match self {
            IngredientKind::Article { .. } => "ARTICLE",
            IngredientKind::SubRecipe { .. } => "SUBRECIPE",
            IngredientKind::Fixed => "FIXED",
        }
    }

    pub fn master_article_id(&self) -> Option<Uuid> {
        match self {
            IngredientKind::Article { master_article_id } => Some(*master_article_id),
            _ => None,
        }
    }

    pub fn sub_recipe_id(&self) -> Option<Uuid> {
        match self {
            IngredientKind::SubRecipe { sub_recipe_id } => Some(*sub_recipe_id),
            _ => None,
        }
    }
}

/// One line of a recipe's composition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub establishment_id: Uuid,
    /// Owning recipe
    pub recipe_id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub kind: IngredientKind,
    pub quantity: Decimal,
    pub percentage_loss: Decimal,
    /// Cache of the latest ingredient-history unit cost
    pub unit_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_with_variant_tag() {
        let id = Uuid::new_v4();
        let v = serde_json::to_value(IngredientKind::SubRecipe { sub_recipe_id: id }).unwrap();
        assert_eq!(v["variant"], "SUBRECIPE");
        assert_eq!(v["sub_recipe_id"], serde_json::json!(id));

        let v = serde_json::to_value(IngredientKind::Fixed).unwrap();
        assert_eq!(v["variant"], "FIXED");
    }

    #[test]
    fn kind_flattens_into_ingredient() {
        let ing = Ingredient {
            id: Uuid::new_v4(),
            establishment_id: Uuid::new_v4(),
            recipe_id: Uuid::new_v4(),
            name: "Tomate".to_string(),
            kind: IngredientKind::Article {
                master_article_id: Uuid::new_v4(),
            },
            quantity: Decimal::from(2),
            percentage_loss: Decimal::from(5),
            unit_cost: Decimal::ZERO,
            created_at: Utc::now(),
        };
        let v = serde_json::to_value(&ing).unwrap();
        assert_eq!(v["variant"], "ARTICLE");
        assert!(v.get("master_article_id").is_some());

        let back: Ingredient = serde_json::from_value(v).unwrap();
        assert_eq!(back.kind, ing.kind);
    }
}
