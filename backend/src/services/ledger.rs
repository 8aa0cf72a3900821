//! Versioned history ledger: dated cost snapshots for ingredients and
//! recipes, with the temporal upsert rules shared by both sub-ledgers.
//!
//! An `import`-triggered write replays a fact: if a snapshot already exists
//! on or after the import date, that snapshot was computed assuming the old
//! fact and is corrected in place, version unchanged. A `manual` write is an
//! operator checkpoint and always appends a fresh integer version.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::models::{Ingredient, IngredientHistory, Recipe, RecipeHistory, Trigger};

use crate::error::{AppError, AppResult};
use crate::store::{Direction, Query, Store};

/// Default page size for bounded history scans
pub const DEFAULT_HISTORY_PAGE_SIZE: usize = 500;

/// Common shape of a ledger entry, shared by both sub-ledgers
pub trait HistoryEntry: Clone {
    fn date(&self) -> NaiveDate;
    fn version(&self) -> Decimal;
}

impl HistoryEntry for IngredientHistory {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn version(&self) -> Decimal {
        self.version_number
    }
}

impl HistoryEntry for RecipeHistory {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn version(&self) -> Decimal {
        self.version_number
    }
}

/// What the upsert rules decided for a given (trigger, date)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertDecision {
    /// Overwrite the entry at this index in place, version unchanged
    Overwrite(usize),
    /// Append a new entry with this version number
    Append(Decimal),
}

/// Date-ordered index over one owner's history entries.
///
/// Entries are sorted by (date, version), so "exact match", "nearest future
/// entry" and "chronologically latest" are all O(log n) lookups.
#[derive(Debug, Clone)]
pub struct HistoryIndex<T: HistoryEntry> {
    entries: Vec<T>,
}

impl<T: HistoryEntry> HistoryIndex<T> {
    pub fn new(mut entries: Vec<T>) -> Self {
        entries.sort_by(|a, b| a.date().cmp(&b.date()).then(a.version().cmp(&b.version())));
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    /// Chronologically latest entry; among same-date entries the highest
    /// version wins
    pub fn latest(&self) -> Option<&T> {
        self.entries.last()
    }

    /// Latest entry dated on or before the given date
    pub fn latest_on_or_before(&self, date: NaiveDate) -> Option<&T> {
        let idx = self.entries.partition_point(|e| e.date() <= date);
        if idx == 0 {
            None
        } else {
            self.entries.get(idx - 1)
        }
    }

    /// Last entry with exactly this date, if any
    pub fn exact(&self, date: NaiveDate) -> Option<usize> {
        let idx = self.entries.partition_point(|e| e.date() <= date);
        if idx > 0 && self.entries[idx - 1].date() == date {
            Some(idx - 1)
        } else {
            None
        }
    }

    /// First entry dated strictly after the given date
    pub fn nearest_future(&self, date: NaiveDate) -> Option<usize> {
        let idx = self.entries.partition_point(|e| e.date() <= date);
        if idx < self.entries.len() {
            Some(idx)
        } else {
            None
        }
    }

    /// Next version number: floor of the highest existing version plus one,
    /// or 1 for an empty ledger. Fractional legacy versions collapse back to
    /// the integer line.
    pub fn next_version(&self) -> Decimal {
        self.entries
            .iter()
            .map(|e| e.version().floor())
            .max()
            .map(|max| max + Decimal::ONE)
            .unwrap_or(Decimal::ONE)
    }

    /// Apply the temporal upsert rules
    pub fn decide(&self, trigger: Trigger, date: NaiveDate) -> UpsertDecision {
        match trigger {
            Trigger::Manual => UpsertDecision::Append(self.next_version()),
            Trigger::Import => {
                if let Some(idx) = self.exact(date) {
                    UpsertDecision::Overwrite(idx)
                } else if let Some(idx) = self.nearest_future(date) {
                    UpsertDecision::Overwrite(idx)
                } else {
                    UpsertDecision::Append(self.next_version())
                }
            }
        }
    }
}

/// Derived cost figures for one ingredient line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientCosts {
    /// Full line cost, loss and quantity included
    pub unit_cost: Decimal,
    /// Share of `unit_cost` attributable to percentage loss
    pub loss_value: Decimal,
    pub unit_cost_per_portion_recipe: Decimal,
}

impl IngredientCosts {
    pub fn compute(
        gross_unit_price: Decimal,
        quantity: Decimal,
        percentage_loss: Decimal,
        portion_count: Decimal,
    ) -> Self {
        let loss_rate = percentage_loss / Decimal::ONE_HUNDRED;
        let unit_cost = gross_unit_price * (Decimal::ONE + loss_rate) * quantity;
        let loss_value = gross_unit_price * loss_rate * quantity;
        let unit_cost_per_portion_recipe = if portion_count > Decimal::ZERO {
            unit_cost / portion_count
        } else {
            unit_cost
        };
        Self {
            unit_cost,
            loss_value,
            unit_cost_per_portion_recipe,
        }
    }
}

/// Input for one ingredient ledger write
#[derive(Debug, Clone)]
pub struct IngredientCostInput {
    pub trigger: Trigger,
    pub date: NaiveDate,
    pub gross_unit_price: Decimal,
    pub invoice_id: Option<Uuid>,
    pub source_article_id: Option<Uuid>,
}

/// Input for one recipe ledger write
#[derive(Debug, Clone)]
pub struct RecipeCostInput {
    pub trigger: Trigger,
    pub date: NaiveDate,
    pub purchase_cost_total: Decimal,
    pub contains_sub_recipe: bool,
    pub invoice_id: Option<Uuid>,
}

/// Versioned history ledger over the persistence collaborator
#[derive(Clone)]
pub struct LedgerService<S> {
    store: S,
    history_page_size: usize,
}

impl<S: Store + Clone> LedgerService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            history_page_size: DEFAULT_HISTORY_PAGE_SIZE,
        }
    }

    pub fn with_page_size(store: S, history_page_size: usize) -> Self {
        Self {
            store,
            history_page_size: history_page_size.max(1),
        }
    }

    /// Full history of an ingredient, via repeated bounded fetches
    pub async fn ingredient_history(
        &self,
        ingredient_id: Uuid,
    ) -> AppResult<Vec<IngredientHistory>> {
        let mut entries = Vec::new();
        let mut page = 0;
        loop {
            let batch: Vec<IngredientHistory> = self
                .store
                .get_all(
                    Query::new()
                        .eq("ingredient_id", ingredient_id)
                        .order_by("date", Direction::Asc)
                        .limit(self.history_page_size)
                        .page(page),
                )
                .await?;
            let fetched = batch.len();
            entries.extend(batch);
            if fetched < self.history_page_size {
                break;
            }
            page += 1;
        }
        Ok(entries)
    }

    /// Full history of a recipe, via repeated bounded fetches
    pub async fn recipe_history(&self, recipe_id: Uuid) -> AppResult<Vec<RecipeHistory>> {
        let mut entries = Vec::new();
        let mut page = 0;
        loop {
            let batch: Vec<RecipeHistory> = self
                .store
                .get_all(
                    Query::new()
                        .eq("recipe_id", recipe_id)
                        .order_by("date", Direction::Asc)
                        .limit(self.history_page_size)
                        .page(page),
                )
                .await?;
            let fetched = batch.len();
            entries.extend(batch);
            if fetched < self.history_page_size {
                break;
            }
            page += 1;
        }
        Ok(entries)
    }

    /// Record a cost snapshot for an ingredient and refresh its cached cost
    pub async fn record_ingredient_cost(
        &self,
        ingredient: &Ingredient,
        input: IngredientCostInput,
    ) -> AppResult<IngredientHistory> {
        if input.trigger == Trigger::Import && input.invoice_id.is_none() {
            return Err(AppError::validation(
                "import-triggered ledger writes require an invoice id",
            ));
        }

        let recipe: Recipe = self
            .store
            .get_by_id(ingredient.recipe_id)
            .await?
            .ok_or_else(|| AppError::not_found("Recipe"))?;

        let costs = IngredientCosts::compute(
            input.gross_unit_price,
            ingredient.quantity,
            ingredient.percentage_loss,
            recipe.portion_count,
        );

        let index = HistoryIndex::new(self.ingredient_history(ingredient.id).await?);
        let entry = match index.decide(input.trigger, input.date) {
            UpsertDecision::Overwrite(idx) => {
                let mut entry = index.entries()[idx].clone();
                entry.master_article_id = ingredient.kind.master_article_id();
                entry.trigger = input.trigger;
                entry.gross_unit_price = input.gross_unit_price;
                entry.unit_cost = costs.unit_cost;
                entry.loss_value = costs.loss_value;
                entry.unit_cost_per_portion_recipe = costs.unit_cost_per_portion_recipe;
                entry.invoice_id = input.invoice_id;
                entry.source_article_id = input.source_article_id;
                self.store
                    .update(entry.clone())
                    .await?
                    .ok_or_else(|| AppError::not_found("IngredientHistory"))?
            }
            UpsertDecision::Append(version) => {
                let entry = IngredientHistory {
                    id: Uuid::new_v4(),
                    establishment_id: ingredient.establishment_id,
                    ingredient_id: ingredient.id,
                    master_article_id: ingredient.kind.master_article_id(),
                    date: input.date,
                    version_number: version,
                    trigger: input.trigger,
                    gross_unit_price: input.gross_unit_price,
                    unit_cost: costs.unit_cost,
                    loss_value: costs.loss_value,
                    unit_cost_per_portion_recipe: costs.unit_cost_per_portion_recipe,
                    invoice_id: input.invoice_id,
                    source_article_id: input.source_article_id,
                    created_at: chrono::Utc::now(),
                };
                self.store.create(entry).await?
            }
        };

        self.refresh_ingredient_cache(ingredient.id).await?;
        Ok(entry)
    }

    /// Record a cost/margin snapshot for a recipe and refresh its cache
    pub async fn record_recipe_cost(
        &self,
        recipe: &Recipe,
        input: RecipeCostInput,
    ) -> AppResult<RecipeHistory> {
        if input.trigger == Trigger::Import && input.invoice_id.is_none() {
            return Err(AppError::validation(
                "import-triggered ledger writes require an invoice id",
            ));
        }

        let per_portion = if recipe.portion_count > Decimal::ZERO {
            input.purchase_cost_total / recipe.portion_count
        } else {
            input.purchase_cost_total
        };
        let margin = recipe_margin(recipe, per_portion);

        let index = HistoryIndex::new(self.recipe_history(recipe.id).await?);
        let entry = match index.decide(input.trigger, input.date) {
            UpsertDecision::Overwrite(idx) => {
                let mut entry = index.entries()[idx].clone();
                entry.trigger = input.trigger;
                entry.purchase_cost_total = input.purchase_cost_total;
                entry.purchase_cost_per_portion = per_portion;
                entry.margin = margin;
                entry.contains_sub_recipe = input.contains_sub_recipe;
                entry.invoice_id = input.invoice_id;
                self.store
                    .update(entry.clone())
                    .await?
                    .ok_or_else(|| AppError::not_found("RecipeHistory"))?
            }
            UpsertDecision::Append(version) => {
                let entry = RecipeHistory {
                    id: Uuid::new_v4(),
                    establishment_id: recipe.establishment_id,
                    recipe_id: recipe.id,
                    date: input.date,
                    version_number: version,
                    trigger: input.trigger,
                    purchase_cost_total: input.purchase_cost_total,
                    purchase_cost_per_portion: per_portion,
                    margin,
                    contains_sub_recipe: input.contains_sub_recipe,
                    invoice_id: input.invoice_id,
                    created_at: chrono::Utc::now(),
                };
                self.store.create(entry).await?
            }
        };

        self.refresh_recipe_cache(recipe.id).await?;
        Ok(entry)
    }

    /// Re-derive an ingredient's cached cost from its chronologically latest
    /// entry; zeroes the cache when no history remains
    pub async fn refresh_ingredient_cache(&self, ingredient_id: Uuid) -> AppResult<Ingredient> {
        let mut ingredient: Ingredient = self
            .store
            .get_by_id(ingredient_id)
            .await?
            .ok_or_else(|| AppError::not_found("Ingredient"))?;

        let index = HistoryIndex::new(self.ingredient_history(ingredient_id).await?);
        ingredient.unit_cost = index.latest().map(|e| e.unit_cost).unwrap_or(Decimal::ZERO);
        self.store
            .update(ingredient)
            .await?
            .ok_or_else(|| AppError::not_found("Ingredient"))
    }

    /// Re-derive a recipe's cached cost fields from its latest entry
    pub async fn refresh_recipe_cache(&self, recipe_id: Uuid) -> AppResult<Recipe> {
        let mut recipe: Recipe = self
            .store
            .get_by_id(recipe_id)
            .await?
            .ok_or_else(|| AppError::not_found("Recipe"))?;

        let index = HistoryIndex::new(self.recipe_history(recipe_id).await?);
        match index.latest() {
            Some(entry) => {
                recipe.purchase_cost_total = entry.purchase_cost_total;
                recipe.purchase_cost_per_portion = entry.purchase_cost_per_portion;
                recipe.margin = entry.margin;
            }
            None => {
                recipe.purchase_cost_total = Decimal::ZERO;
                recipe.purchase_cost_per_portion = Decimal::ZERO;
                recipe.margin = None;
            }
        }
        self.store
            .update(recipe)
            .await?
            .ok_or_else(|| AppError::not_found("Recipe"))
    }
}

/// Margin in percent of the sale price, for saleable+active recipes with a
/// positive sale price
pub fn recipe_margin(recipe: &Recipe, purchase_cost_per_portion: Decimal) -> Option<Decimal> {
    if !recipe.margin_applies() {
        return None;
    }
    let sale_price = recipe.sale_price_per_portion?;
    if sale_price <= Decimal::ZERO {
        return None;
    }
    Some((sale_price - purchase_cost_per_portion) / sale_price * Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        date: NaiveDate,
        version: Decimal,
    }

    impl HistoryEntry for Entry {
        fn date(&self) -> NaiveDate {
            self.date
        }

        fn version(&self) -> Decimal {
            self.version
        }
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    fn entry(date: &str, version: &str) -> Entry {
        Entry {
            date: d(date),
            version: Decimal::from_str(version).unwrap(),
        }
    }

    #[test]
    fn empty_index_appends_version_one() {
        let index: HistoryIndex<Entry> = HistoryIndex::new(vec![]);
        assert_eq!(
            index.decide(Trigger::Import, d("2026-03-01")),
            UpsertDecision::Append(Decimal::ONE)
        );
        assert_eq!(
            index.decide(Trigger::Manual, d("2026-03-01")),
            UpsertDecision::Append(Decimal::ONE)
        );
    }

    #[test]
    fn import_overwrites_exact_date_match() {
        let index = HistoryIndex::new(vec![entry("2026-03-01", "1"), entry("2026-04-01", "2")]);
        assert_eq!(
            index.decide(Trigger::Import, d("2026-03-01")),
            UpsertDecision::Overwrite(0)
        );
    }

    #[test]
    fn import_overwrites_nearest_future_entry() {
        let index = HistoryIndex::new(vec![entry("2026-03-01", "1"), entry("2026-05-01", "2")]);
        // 2026-04-10 has no exact match; the May entry was computed assuming
        // the old fact and must be corrected in place
        assert_eq!(
            index.decide(Trigger::Import, d("2026-04-10")),
            UpsertDecision::Overwrite(1)
        );
    }

    #[test]
    fn import_appends_when_target_is_newest() {
        let index = HistoryIndex::new(vec![entry("2026-03-01", "1"), entry("2026-04-01", "2")]);
        assert_eq!(
            index.decide(Trigger::Import, d("2026-06-01")),
            UpsertDecision::Append(Decimal::from(3))
        );
    }

    #[test]
    fn manual_always_appends_even_on_exact_match() {
        let index = HistoryIndex::new(vec![entry("2026-03-01", "1")]);
        assert_eq!(
            index.decide(Trigger::Manual, d("2026-03-01")),
            UpsertDecision::Append(Decimal::from(2))
        );
    }

    #[test]
    fn next_version_floors_fractional_versions() {
        let index = HistoryIndex::new(vec![entry("2026-03-01", "1"), entry("2026-03-15", "2.5")]);
        assert_eq!(index.next_version(), Decimal::from(3));
    }

    #[test]
    fn latest_prefers_highest_version_on_same_date() {
        let index = HistoryIndex::new(vec![entry("2026-03-01", "2"), entry("2026-03-01", "1")]);
        assert_eq!(index.latest().unwrap().version, Decimal::from(2));
    }

    #[test]
    fn latest_on_or_before_picks_preceding_entry() {
        let index = HistoryIndex::new(vec![entry("2026-03-01", "1"), entry("2026-05-01", "2")]);
        assert_eq!(
            index.latest_on_or_before(d("2026-04-15")).unwrap().date,
            d("2026-03-01")
        );
        assert!(index.latest_on_or_before(d("2026-02-01")).is_none());
    }

    #[test]
    fn costs_match_reference_scenario() {
        // quantity=2, loss=5%, gross=6.00, portions=4
        let costs = IngredientCosts::compute(
            Decimal::from(6),
            Decimal::from(2),
            Decimal::from(5),
            Decimal::from(4),
        );
        assert_eq!(costs.unit_cost, Decimal::from_str("12.60").unwrap());
        assert_eq!(costs.loss_value, Decimal::from_str("0.60").unwrap());
        assert_eq!(
            costs.unit_cost_per_portion_recipe,
            Decimal::from_str("3.15").unwrap()
        );
    }
}
