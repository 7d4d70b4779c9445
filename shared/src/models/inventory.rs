//! Inventory management models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ProductType;

/// A stocked product belonging to one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Catalog link; absent for items registered before they were tied to a product
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub product_type: Option<ProductType>,
    /// Never negative
    pub current_stock: Decimal,
    pub min_stock: Decimal,
    pub critical_stock: Decimal,
    /// Native unit every adjustment is converted into
    pub unit: String,
    pub location: String,
    pub expiry_date: Option<NaiveDate>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stock record from the pre-catalog inventory screens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyInventoryRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub quantity: Decimal,
    pub min_stock: Decimal,
    pub unit: Option<String>,
}

/// Direction of a stock adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockOperation {
    Add,
    Subtract,
}

impl StockOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockOperation::Add => "add",
            StockOperation::Subtract => "subtract",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add" => Some(StockOperation::Add),
            "subtract" => Some(StockOperation::Subtract),
            _ => None,
        }
    }
}

/// Provenance linking a movement back to the activity day that caused it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementContext {
    pub activity_id: Option<Uuid>,
    pub module: Option<String>,
    pub day_index: Option<i32>,
}

/// One requested change in a stock adjustment batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub product_id: Uuid,
    pub amount: Decimal,
    /// Defaults to the inventory item's own unit
    #[serde(default)]
    pub amount_unit: Option<String>,
    pub operation: StockOperation,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub context: Option<MovementContext>,
}

impl StockAdjustment {
    pub fn subtract(product_id: Uuid, amount: Decimal, unit: impl Into<String>) -> Self {
        Self {
            product_id,
            amount,
            amount_unit: Some(unit.into()),
            operation: StockOperation::Subtract,
            reason: None,
            context: None,
        }
    }

    pub fn add(product_id: Uuid, amount: Decimal, unit: impl Into<String>) -> Self {
        Self {
            operation: StockOperation::Add,
            ..Self::subtract(product_id, amount, unit)
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_context(mut self, context: MovementContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Append-only audit record of one applied adjustment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: Uuid,
    pub user_id: Uuid,
    pub inventory_item_id: Uuid,
    pub product_id: Option<Uuid>,
    pub operation: StockOperation,
    /// Amount as requested by the caller
    pub amount: Decimal,
    pub unit: String,
    pub amount_in_item_unit: Decimal,
    pub balance_after: Decimal,
    pub reason: Option<String>,
    pub activity_id: Option<Uuid>,
    pub module: Option<String>,
    pub day_index: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Per-line detail for a rejected subtraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockShortfall {
    pub product_id: Uuid,
    pub available: Decimal,
    pub requested: Decimal,
    /// Unit of `available` and `requested` (the item's native unit)
    pub unit: String,
}

/// Current stock figure used for client-side warnings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub current_stock: Decimal,
    pub unit: String,
}
