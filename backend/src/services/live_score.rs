//! Rolling live score: a 30-day variant of the monthly scoring dimensions.
//!
//! The purchase dimension reads the trailing month of price variations, the
//! recipe dimension reads current cached margins, and the financial
//! dimension carries the latest report's score forward. When the latest
//! monthly report is not for the calendar month immediately preceding
//! today, every dimension takes a fixed staleness penalty.

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::models::{FinancialReport, LiveScore, Recipe, ScoreKind, Variation};
use shared::types::ReportMonth;

use crate::error::{AppError, AppResult};
use crate::store::{Direction, Query, Store};

use super::financial::{global_score, recipe_score};

/// Points removed from every dimension when the latest report is stale
pub const STALENESS_PENALTY: u32 = 10;

/// Rolling-score maintenance
#[derive(Clone)]
pub struct LiveScoreService<S> {
    store: S,
}

impl<S: Store + Clone> LiveScoreService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Recompute and upsert the four score rows as of the given day
    pub async fn refresh_at(
        &self,
        establishment_id: Uuid,
        today: NaiveDate,
    ) -> AppResult<Vec<LiveScore>> {
        let latest = self.latest_report(establishment_id).await?;

        let purchase = self
            .purchase_dimension(establishment_id, today)
            .await?
            .unwrap_or(latest.purchase_score);
        let recipe = self
            .recipe_dimension(establishment_id)
            .await?
            .unwrap_or(latest.recipe_score);
        let financial = latest.financial_score;
        let global = global_score(purchase, recipe, financial);

        // Penalize every dimension when the report window has fallen behind
        let stale = latest.month != ReportMonth::from_date(today).pred();
        let adjust = |score: Decimal| {
            if stale {
                (score - Decimal::from(STALENESS_PENALTY)).max(Decimal::ZERO)
            } else {
                score
            }
        };

        let mut rows = Vec::with_capacity(ScoreKind::ALL.len());
        for (kind, value) in [
            (ScoreKind::Purchase, adjust(purchase)),
            (ScoreKind::Recipe, adjust(recipe)),
            (ScoreKind::Financial, adjust(financial)),
            (ScoreKind::Global, adjust(global)),
        ] {
            rows.push(self.upsert(establishment_id, kind, value).await?);
        }

        tracing::debug!(
            establishment = %establishment_id,
            stale,
            "live score refreshed"
        );
        Ok(rows)
    }

    /// Convenience wrapper using the current date
    pub async fn refresh(&self, establishment_id: Uuid) -> AppResult<Vec<LiveScore>> {
        self.refresh_at(establishment_id, Utc::now().date_naive()).await
    }

    async fn latest_report(&self, establishment_id: Uuid) -> AppResult<FinancialReport> {
        let latest: Vec<FinancialReport> = self
            .store
            .get_all(
                Query::new()
                    .eq("establishment_id", establishment_id)
                    .order_by("month", Direction::Desc)
                    .limit(1),
            )
            .await?;
        latest
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("FinancialReport"))
    }

    /// Mean absolute variation magnitude over the trailing 30 days, mapped
    /// to a score; `None` when the window holds no variations
    async fn purchase_dimension(
        &self,
        establishment_id: Uuid,
        today: NaiveDate,
    ) -> AppResult<Option<Decimal>> {
        let window_start = today - Duration::days(30);
        let variations: Vec<Variation> = self
            .store
            .get_all(
                Query::new()
                    .eq("establishment_id", establishment_id)
                    .eq("deleted", false)
                    .gte("date", window_start)
                    .lte("date", today),
            )
            .await?;

        if variations.is_empty() {
            return Ok(None);
        }
        let mean_abs = variations
            .iter()
            .map(|v| v.percentage.abs())
            .sum::<Decimal>()
            / Decimal::from(variations.len() as i64);
        Ok(Some(variation_score(mean_abs)))
    }

    /// Mean cached margin of the saleable+active recipes, mapped to a score
    async fn recipe_dimension(&self, establishment_id: Uuid) -> AppResult<Option<Decimal>> {
        let recipes: Vec<Recipe> = self
            .store
            .get_all(
                Query::new()
                    .eq("establishment_id", establishment_id)
                    .eq("saleable", true)
                    .eq("active", true),
            )
            .await?;

        let margins: Vec<Decimal> = recipes.iter().filter_map(|r| r.margin).collect();
        if margins.is_empty() {
            return Ok(None);
        }
        let mean = margins.iter().copied().sum::<Decimal>() / Decimal::from(margins.len() as i64);
        Ok(Some(recipe_score(mean)))
    }

    async fn upsert(
        &self,
        establishment_id: Uuid,
        kind: ScoreKind,
        value: Decimal,
    ) -> AppResult<LiveScore> {
        let existing: Vec<LiveScore> = self
            .store
            .get_all(
                Query::new()
                    .eq("establishment_id", establishment_id)
                    .eq("kind", kind),
            )
            .await?;

        if let Some(mut row) = existing.into_iter().next() {
            row.value = value;
            row.updated_at = Utc::now();
            return self
                .store
                .update(row)
                .await?
                .ok_or_else(|| AppError::not_found("LiveScore"));
        }

        self.store
            .create(LiveScore {
                id: Uuid::new_v4(),
                establishment_id,
                kind,
                value,
                updated_at: Utc::now(),
            })
            .await
            .map_err(Into::into)
    }
}

/// Price-stability score: calm purchase prices score high
pub fn variation_score(mean_abs_percentage: Decimal) -> Decimal {
    if mean_abs_percentage.is_zero() {
        return Decimal::from(100);
    }
    let steps = [(25, 85), (50, 70), (100, 50), (200, 30)];
    for (threshold_tenths, score) in steps {
        // thresholds are in tenths of a percent: 2.5, 5, 10, 20
        if mean_abs_percentage * Decimal::TEN < Decimal::from(threshold_tenths) {
            return Decimal::from(score);
        }
    }
    Decimal::from(10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variation_score_steps() {
        assert_eq!(variation_score(Decimal::ZERO), Decimal::from(100));
        assert_eq!(variation_score(Decimal::new(15, 1)), Decimal::from(85)); // 1.5%
        assert_eq!(variation_score(Decimal::from(7)), Decimal::from(50));
        assert_eq!(variation_score(Decimal::from(50)), Decimal::from(10));
    }
}
