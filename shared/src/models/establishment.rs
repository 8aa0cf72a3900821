//! Establishment (tenant) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SupplierLabel;

/// Which purchase categories an establishment wants price alerts for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SmsScope {
    #[default]
    #[serde(rename = "FOOD")]
    Food,
    #[serde(rename = "FOOD & BEVERAGES")]
    FoodAndBeverages,
}

impl SmsScope {
    /// Whether a supplier category falls inside this alert scope
    pub fn covers(&self, label: SupplierLabel) -> bool {
        match self {
            SmsScope::Food => label == SupplierLabel::Food,
            SmsScope::FoodAndBeverages => true,
        }
    }
}

/// Minimum price-variation magnitude that triggers an alert
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum VariationTrigger {
    #[default]
    #[serde(rename = "ALL")]
    All,
    #[serde(rename = "±5%")]
    FivePercent,
    #[serde(rename = "±10%")]
    TenPercent,
}

impl VariationTrigger {
    /// Whether a variation of the given percentage passes this threshold
    pub fn triggers_on(&self, percentage: Decimal) -> bool {
        match self {
            VariationTrigger::All => !percentage.is_zero(),
            VariationTrigger::FivePercent => percentage.abs() >= Decimal::from(5),
            VariationTrigger::TenPercent => percentage.abs() >= Decimal::from(10),
        }
    }
}

/// A tenant of the platform (a restaurant or other food-service operation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Establishment {
    pub id: Uuid,
    pub name: String,
    /// Whether price-variation alerts are delivered at all
    pub active_sms: bool,
    pub sms_scope: SmsScope,
    pub sms_variation_trigger: VariationTrigger,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn all_trigger_fires_on_any_nonzero_change() {
        let t = VariationTrigger::All;
        assert!(t.triggers_on(Decimal::from_str("0.01").unwrap()));
        assert!(t.triggers_on(Decimal::from(-3)));
        assert!(!t.triggers_on(Decimal::ZERO));
    }

    #[test]
    fn percent_triggers_use_magnitude() {
        let five = VariationTrigger::FivePercent;
        assert!(five.triggers_on(Decimal::from(-5)));
        assert!(!five.triggers_on(Decimal::from(4)));

        let ten = VariationTrigger::TenPercent;
        assert!(ten.triggers_on(Decimal::from(12)));
        assert!(!ten.triggers_on(Decimal::from(-9)));
    }

    #[test]
    fn scope_serializes_to_configured_labels() {
        assert_eq!(
            serde_json::to_string(&SmsScope::FoodAndBeverages).unwrap(),
            "\"FOOD & BEVERAGES\""
        );
        assert_eq!(
            serde_json::to_string(&VariationTrigger::FivePercent).unwrap(),
            "\"±5%\""
        );
    }
}
