//! Table bindings for the shared domain models

use shared::models::{
    Article, Establishment, FinancialIngredient, FinancialRecipe, FinancialReport, ImportJob,
    Ingredient, IngredientHistory, Invoice, LiveScore, MarketMasterArticle, MarketSupplier,
    MasterArticle, MergeRequest, Recipe, RecipeHistory, Supplier, Variation,
};
use uuid::Uuid;

use super::Entity;

macro_rules! entity {
    ($type:ty, $table:literal) => {
        impl Entity for $type {
            const TABLE: &'static str = $table;

            fn id(&self) -> Uuid {
                self.id
            }
        }
    };
}

entity!(Establishment, "establishments");
entity!(MarketSupplier, "market_suppliers");
entity!(Supplier, "suppliers");
entity!(MarketMasterArticle, "market_master_articles");
entity!(MasterArticle, "master_articles");
entity!(Article, "articles");
entity!(Invoice, "invoices");
entity!(ImportJob, "import_jobs");
entity!(Recipe, "recipes");
entity!(Ingredient, "ingredients");
entity!(IngredientHistory, "ingredient_histories");
entity!(RecipeHistory, "recipe_histories");
entity!(Variation, "variations");
entity!(MergeRequest, "merge_requests");
entity!(FinancialReport, "financial_reports");
entity!(FinancialRecipe, "financial_recipes");
entity!(FinancialIngredient, "financial_ingredients");
entity!(LiveScore, "live_scores");
