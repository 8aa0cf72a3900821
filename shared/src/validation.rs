//! Validation utilities for the Food Cost Management Platform

use rust_decimal::Decimal;
use validator::Validate;

use crate::models::InvoicePayload;

// ============================================================================
// Invoice payload validations
// ============================================================================

/// Validate the structured invoice payload beyond per-field constraints:
/// the payload must contain at least one line, and every line must carry a
/// positive quantity and a non-negative unit price.
pub fn validate_invoice_payload(payload: &InvoicePayload) -> Result<(), &'static str> {
    if payload.validate().is_err() {
        return Err("Invoice payload failed field validation");
    }
    if payload.lines.is_empty() {
        return Err("Invoice payload must contain at least one line");
    }
    for line in &payload.lines {
        if line.quantity <= Decimal::ZERO {
            return Err("Invoice line quantity must be positive");
        }
        if line.unit_price_excl_tax < Decimal::ZERO {
            return Err("Invoice line unit price cannot be negative");
        }
    }
    Ok(())
}

// ============================================================================
// Recipe and ingredient validations
// ============================================================================

/// Validate an ingredient quantity
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a percentage loss (non-negative; 5 means a 5% uplift)
pub fn validate_percentage_loss(percentage_loss: Decimal) -> Result<(), &'static str> {
    if percentage_loss < Decimal::ZERO {
        return Err("Percentage loss cannot be negative");
    }
    Ok(())
}

/// Validate a recipe portion count
pub fn validate_portion_count(portion_count: Decimal) -> Result<(), &'static str> {
    if portion_count <= Decimal::ZERO {
        return Err("Portion count must be positive");
    }
    Ok(())
}

/// Validate a sale price
pub fn validate_sale_price(sale_price: Decimal) -> Result<(), &'static str> {
    if sale_price < Decimal::ZERO {
        return Err("Sale price cannot be negative");
    }
    Ok(())
}
