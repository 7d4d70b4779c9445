//! WebAssembly module for the farm inventory UI
//!
//! Provides client-side computation for:
//! - Unit conversion while a line is being edited
//! - Daily cost totals for activity records
//! - Stock alert levels for inline warnings

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::costing::*;
pub use shared::models::*;
pub use shared::units::*;

/// Convert an amount between units; unknown or cross-group units return it unchanged
#[wasm_bindgen]
pub fn convert_units(amount: f64, from: &str, to: &str) -> f64 {
    let Ok(decimal) = Decimal::try_from(amount) else {
        return amount;
    };
    convert(decimal, from, to).to_f64().unwrap_or(amount)
}

/// Conversion group of a unit: "mass", "volume" or "other"
#[wasm_bindgen]
pub fn unit_group_of(unit: &str) -> String {
    match unit_group(unit) {
        UnitGroup::Mass => "mass",
        UnitGroup::Volume => "volume",
        UnitGroup::Other => "other",
    }
    .to_string()
}

/// Compute a day's cost breakdown.
///
/// Takes the day record, the product catalog and the day's other expenses as JSON
/// and returns the serialized breakdown.
#[wasm_bindgen]
pub fn compute_day_total(day_json: &str, catalog_json: &str, expenses_json: &str) -> Result<String, JsValue> {
    let day: DayRecord = serde_json::from_str(day_json).map_err(|e| parse_error("day record", e))?;
    let catalog = ProductCatalog::from_json(catalog_json).map_err(|e| parse_error("catalog", e))?;
    let expenses: Vec<OtherExpense> = if expenses_json.trim().is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(expenses_json).map_err(|e| parse_error("other expenses", e))?
    };

    let cost = shared::costing::compute_day_total(&day, &catalog, &expenses)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_json::to_string(&cost).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Alert level for the given thresholds: "critical_stock", "low_stock" or "ok"
#[wasm_bindgen]
pub fn stock_alert_level(current_stock: f64, min_stock: f64, critical_stock: f64) -> String {
    let to_decimal = |v: f64| Decimal::try_from(v).unwrap_or(Decimal::ZERO);
    stock_alert_type(
        to_decimal(current_stock),
        to_decimal(min_stock),
        to_decimal(critical_stock),
    )
    .map_or("ok", |t| t.as_str())
    .to_string()
}

fn parse_error(what: &str, err: impl std::fmt::Display) -> JsValue {
    let message = format!("Invalid {} JSON: {}", what, err);
    #[cfg(target_arch = "wasm32")]
    web_sys::console::error_1(&JsValue::from_str(&message));
    JsValue::from_str(&message)
}
