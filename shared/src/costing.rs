//! Daily cost aggregation for activity days
//!
//! Pure and deterministic: the UI re-runs it whenever a line, quantity, unit or the
//! catalog changes, so nothing here is cached.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{DailyLineItem, DayRecord, OtherExpense, ProductCatalog, ProductCatalogEntry};
use crate::units::try_convert;

/// Which part of the day a cost line comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    Fertilizer,
    Phytosanitary,
    Water,
    OtherExpense,
}

/// Where a line's unit price was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Catalog,
    Stored,
    Missing,
}

/// Cost of a single line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineCost {
    pub category: CostCategory,
    pub product_id: Option<Uuid>,
    /// Quantity expressed in `unit`, the unit the price applies to
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub cost: Decimal,
    pub price_source: PriceSource,
}

/// Costs for a whole day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCost {
    pub total: Decimal,
    pub fertilizer_total: Decimal,
    pub phytosanitary_total: Decimal,
    pub water_total: Decimal,
    pub other_total: Decimal,
    pub lines: Vec<LineCost>,
}

/// Errors raised while pricing a day
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CostError {
    #[error("Cost of a {0:?} line is too large to represent")]
    Overflow(CostCategory),
}

fn multiply(category: CostCategory, quantity: Decimal, price: Decimal) -> Result<Decimal, CostError> {
    quantity
        .checked_mul(price)
        .ok_or(CostError::Overflow(category))
}

/// Price a product line against a resolved catalog entry, or its stored price
fn price_line(
    category: CostCategory,
    line: &DailyLineItem,
    entry: Option<&ProductCatalogEntry>,
) -> Result<LineCost, CostError> {
    match entry {
        Some(entry) => {
            let quantity = try_convert(line.amount, &line.unit, &entry.unit)
                .ok_or(CostError::Overflow(category))?;
            Ok(LineCost {
                category,
                product_id: line.product_id,
                quantity,
                unit: entry.unit.clone(),
                unit_price: entry.price_per_unit,
                cost: multiply(category, quantity, entry.price_per_unit)?,
                price_source: PriceSource::Catalog,
            })
        }
        None => {
            let (unit_price, price_source) = match line.price {
                Some(price) => (price, PriceSource::Stored),
                None => (Decimal::ZERO, PriceSource::Missing),
            };
            Ok(LineCost {
                category,
                product_id: line.product_id,
                quantity: line.amount,
                unit: line.unit.clone(),
                unit_price,
                cost: multiply(category, line.amount, unit_price)?,
                price_source,
            })
        }
    }
}

/// Cost of one fertilizer or phytosanitary line
pub fn line_cost(
    category: CostCategory,
    line: &DailyLineItem,
    catalog: &ProductCatalog,
) -> Result<LineCost, CostError> {
    let entry = line.product_id.as_ref().and_then(|id| catalog.get(id));
    price_line(category, line, entry)
}

/// Cost of the day's water consumption.
///
/// The line's own product link wins; otherwise the catalog's water product prices it.
pub fn water_cost(line: &DailyLineItem, catalog: &ProductCatalog) -> Result<LineCost, CostError> {
    let entry = line
        .product_id
        .as_ref()
        .and_then(|id| catalog.get(id))
        .or_else(|| catalog.water_entry());
    price_line(CostCategory::Water, line, entry)
}

/// Cost of a free-form expense: `amount × price`, no unit handling
pub fn other_expense_cost(expense: &OtherExpense) -> Result<LineCost, CostError> {
    Ok(LineCost {
        category: CostCategory::OtherExpense,
        product_id: None,
        quantity: expense.amount,
        unit: expense.unit.clone(),
        unit_price: expense.price,
        cost: multiply(CostCategory::OtherExpense, expense.amount, expense.price)?,
        price_source: PriceSource::Stored,
    })
}

/// Compute per-line costs and the day total.
///
/// Fails with [`CostError::Overflow`] instead of panicking when a line or a
/// subtotal does not fit in a `Decimal`.
pub fn compute_day_total(
    day: &DayRecord,
    catalog: &ProductCatalog,
    other_expenses: &[OtherExpense],
) -> Result<DayCost, CostError> {
    let mut lines = Vec::with_capacity(
        day.fertilizers.len() + day.phytosanitaries.len() + other_expenses.len() + 1,
    );

    for l in &day.fertilizers {
        lines.push(line_cost(CostCategory::Fertilizer, l, catalog)?);
    }
    for l in &day.phytosanitaries {
        lines.push(line_cost(CostCategory::Phytosanitary, l, catalog)?);
    }
    if let Some(water) = &day.water {
        lines.push(water_cost(water, catalog)?);
    }
    for expense in other_expenses {
        lines.push(other_expense_cost(expense)?);
    }

    let subtotal = |category: CostCategory| -> Result<Decimal, CostError> {
        lines
            .iter()
            .filter(|l| l.category == category)
            .try_fold(Decimal::ZERO, |acc, l| {
                acc.checked_add(l.cost).ok_or(CostError::Overflow(category))
            })
    };

    let fertilizer_total = subtotal(CostCategory::Fertilizer)?;
    let phytosanitary_total = subtotal(CostCategory::Phytosanitary)?;
    let water_total = subtotal(CostCategory::Water)?;
    let other_total = subtotal(CostCategory::OtherExpense)?;

    let total = [phytosanitary_total, water_total, other_total]
        .into_iter()
        .try_fold(fertilizer_total, |acc, t| acc.checked_add(t))
        .ok_or(CostError::Overflow(CostCategory::OtherExpense))?;

    Ok(DayCost {
        total,
        fertilizer_total,
        phytosanitary_total,
        water_total,
        other_total,
        lines,
    })
}
