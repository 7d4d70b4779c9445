//! Validation utilities for inventory and activity input

use rust_decimal::Decimal;

use crate::models::StockAdjustment;

// ============================================================================
// Stock Validations
// ============================================================================

/// Validate an adjustment amount is strictly positive
pub fn validate_adjustment_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Adjustment amount must be positive");
    }
    Ok(())
}

/// Validate every amount in a batch, returning the index of the first bad line
pub fn validate_adjustment_batch(batch: &[StockAdjustment]) -> Result<(), (usize, &'static str)> {
    batch
        .iter()
        .enumerate()
        .try_for_each(|(i, op)| validate_adjustment_amount(op.amount).map_err(|e| (i, e)))
}

/// Validate an initial stock figure (zero allowed)
pub fn validate_initial_stock(stock: Decimal) -> Result<(), &'static str> {
    if stock < Decimal::ZERO {
        return Err("Stock cannot be negative");
    }
    Ok(())
}

/// Validate alert thresholds.
///
/// `critical_stock <= min_stock` is expected but deliberately not enforced.
pub fn validate_thresholds(min_stock: Decimal, critical_stock: Decimal) -> Result<(), &'static str> {
    if min_stock < Decimal::ZERO {
        return Err("Minimum stock cannot be negative");
    }
    if critical_stock < Decimal::ZERO {
        return Err("Critical stock cannot be negative");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate a free-text unit is present and short
pub fn validate_unit(unit: &str) -> Result<(), &'static str> {
    let trimmed = unit.trim();
    if trimmed.is_empty() {
        return Err("Unit is required");
    }
    if trimmed.chars().count() > 32 {
        return Err("Unit must be at most 32 characters");
    }
    Ok(())
}
