//! Price variation events

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A detected change in a master article's unit cost between two purchase
/// observations. Soft-deleted (never physically removed) when its master
/// article disappears in a supplier merge, so audit history survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variation {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub master_article_id: Uuid,
    /// Product name at detection time, kept for alert wording
    pub article_name: String,
    pub date: NaiveDate,
    pub old_unit_price: Decimal,
    pub new_unit_price: Decimal,
    pub percentage: Decimal,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl Variation {
    /// Signed percentage change from `old` to `new`; zero when `old` is zero
    pub fn percentage_between(old: Decimal, new: Decimal) -> Decimal {
        if old.is_zero() {
            Decimal::ZERO
        } else {
            (new - old) / old * Decimal::ONE_HUNDRED
        }
    }
}
