//! Rolling live-score models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scoring dimension; one `LiveScore` row is upserted per dimension
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    Purchase,
    Recipe,
    Financial,
    Global,
}

impl ScoreKind {
    pub const ALL: [ScoreKind; 4] = [
        ScoreKind::Purchase,
        ScoreKind::Recipe,
        ScoreKind::Financial,
        ScoreKind::Global,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreKind::Purchase => "purchase",
            ScoreKind::Recipe => "recipe",
            ScoreKind::Financial => "financial",
            ScoreKind::Global => "global",
        }
    }
}

/// Rolling score for one establishment and dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveScore {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub kind: ScoreKind,
    pub value: Decimal,
    pub updated_at: DateTime<Utc>,
}
