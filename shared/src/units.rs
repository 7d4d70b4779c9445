//! Measurement units and the conversion table used for stock bookkeeping and cost display
//!
//! Units fall into two convertible groups, mass (kg, g) and volume (L, ml, m3).
//! Anything else (e.g. "unidad", "día", "jornal") is uncategorized and never converts.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A recognized measurement unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "kg")]
    Kg,
    #[serde(rename = "g")]
    G,
    #[serde(rename = "L")]
    L,
    #[serde(rename = "ml")]
    Ml,
    #[serde(rename = "m3")]
    M3,
}

/// Conversion group a unit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitGroup {
    Mass,
    Volume,
    Other,
}

impl Unit {
    /// Parse a free-text unit, accepting symbols, plurals and Spanish names
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        let unit = match normalized.as_str() {
            "kg" | "kgs" | "kilo" | "kilos" | "kilogramo" | "kilogramos" | "kilogram"
            | "kilograms" => Unit::Kg,
            "g" | "gr" | "grs" | "gramo" | "gramos" | "gram" | "grams" => Unit::G,
            "l" | "lt" | "lts" | "litro" | "litros" | "liter" | "liters" | "litre" | "litres" => {
                Unit::L
            }
            "ml" | "cc" | "mililitro" | "mililitros" | "milliliter" | "milliliters" => Unit::Ml,
            "m3" | "m³" | "metro cubico" | "metros cubicos" | "metro cúbico" | "metros cúbicos"
            | "cubic meter" | "cubic meters" => Unit::M3,
            _ => return None,
        };
        Some(unit)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Kg => "kg",
            Unit::G => "g",
            Unit::L => "L",
            Unit::Ml => "ml",
            Unit::M3 => "m3",
        }
    }

    pub fn group(&self) -> UnitGroup {
        match self {
            Unit::Kg | Unit::G => UnitGroup::Mass,
            Unit::L | Unit::Ml | Unit::M3 => UnitGroup::Volume,
        }
    }

    /// Size of one of this unit in its group's base unit (grams or millilitres)
    fn base_factor(&self) -> Decimal {
        match self {
            Unit::Kg => Decimal::from(1000),
            Unit::G => Decimal::ONE,
            Unit::L => Decimal::from(1000),
            Unit::Ml => Decimal::ONE,
            Unit::M3 => Decimal::from(1_000_000),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Group of a free-text unit; unrecognized spellings are `Other`
pub fn unit_group(raw: &str) -> UnitGroup {
    Unit::parse(raw).map_or(UnitGroup::Other, |u| u.group())
}

/// Canonical symbol for a recognized unit, otherwise the trimmed input
pub fn normalize_unit(raw: &str) -> String {
    match Unit::parse(raw) {
        Some(unit) => unit.symbol().to_string(),
        None => raw.trim().to_string(),
    }
}

/// Whether `convert(_, from, to)` performs an actual conversion
pub fn is_convertible(from: &str, to: &str) -> bool {
    match (Unit::parse(from), Unit::parse(to)) {
        (Some(a), Some(b)) => a != b && a.group() == b.group(),
        _ => false,
    }
}

/// Convert `amount` from one unit to another.
///
/// Returns `amount` unchanged when either unit is unrecognized, both are the same
/// unit, or the units belong to different groups (e.g. kg -> L). Callers must not
/// treat a cross-group result as meaningful. An amount too large to scale is also
/// returned unchanged; use [`try_convert`] to tell that case apart.
pub fn convert(amount: Decimal, from: &str, to: &str) -> Decimal {
    try_convert(amount, from, to).unwrap_or(amount)
}

/// Like [`convert`], but `None` when the scaled amount overflows `Decimal`.
pub fn try_convert(amount: Decimal, from: &str, to: &str) -> Option<Decimal> {
    let (Some(from), Some(to)) = (Unit::parse(from), Unit::parse(to)) else {
        return Some(amount);
    };
    if from == to || from.group() != to.group() {
        return Some(amount);
    }

    amount
        .checked_mul(from.base_factor())?
        .checked_div(to.base_factor())
}
