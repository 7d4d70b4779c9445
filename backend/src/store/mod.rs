//! Storage seam for inventory state
//!
//! Items, movements and alerts are three independent collections keyed by user.
//! `current_stock` is only ever changed through [`InventoryStore::apply_adjustments`],
//! which also carries any item creation or linking the batch depends on.

mod memory;
mod postgres;

pub use memory::MemoryInventoryStore;
pub use postgres::PgInventoryStore;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::models::{
    InventoryAlert, InventoryItem, InventoryMovement, LegacyInventoryRecord, MovementContext,
    ProductCatalogEntry, ProductType, StockOperation,
};
use shared::types::Pagination;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// One fully resolved step of an adjustment batch
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAdjustment {
    pub item_id: Uuid,
    /// Product id the caller asked for; absent for unlinked items
    pub product_id: Option<Uuid>,
    pub operation: StockOperation,
    /// Amount and unit as requested
    pub amount: Decimal,
    pub unit: String,
    /// Amount in the item's native unit; this is what moves the stock
    pub amount_in_item_unit: Decimal,
    pub item_unit: String,
    pub reason: Option<String>,
    pub context: MovementContext,
}

impl PlannedAdjustment {
    /// Movement record for this step once applied
    pub fn to_movement(
        &self,
        user_id: Uuid,
        balance_after: Decimal,
        created_at: DateTime<Utc>,
    ) -> InventoryMovement {
        InventoryMovement {
            id: Uuid::new_v4(),
            user_id,
            inventory_item_id: self.item_id,
            product_id: self.product_id,
            operation: self.operation,
            amount: self.amount,
            unit: self.unit.clone(),
            amount_in_item_unit: self.amount_in_item_unit,
            balance_after,
            reason: self.reason.clone(),
            activity_id: self.context.activity_id,
            module: self.context.module.clone(),
            day_index: self.context.day_index,
            created_at,
        }
    }
}

/// Result of applying a plan
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    /// Every step applied; movements in plan order and the final state of each touched item
    Committed {
        movements: Vec<InventoryMovement>,
        items: Vec<InventoryItem>,
    },
    /// The conditional decrement of step `index` failed; nothing was applied
    Rejected { index: usize, available: Decimal },
}

/// Fields written when an unlinked item is matched to a catalog product by name
#[derive(Debug, Clone, PartialEq)]
pub struct ProductLink {
    pub product_id: Uuid,
    pub product_type: ProductType,
    /// Only written when the item has no unit yet
    pub unit: Option<String>,
}

impl ProductLink {
    pub fn apply_to(&self, item: &mut InventoryItem) {
        item.product_id = Some(self.product_id);
        item.product_type = Some(self.product_type);
        if item.unit.trim().is_empty() {
            if let Some(unit) = &self.unit {
                item.unit = unit.clone();
            }
        }
    }
}

/// Item write found during resolution, persisted together with the batch that needs it
#[derive(Debug, Clone, PartialEq)]
pub enum PendingItem {
    /// Link an active, still unlinked item to a catalog product
    Link { item_id: Uuid, link: ProductLink },
    /// Create an item from a legacy record and mark the record as migrated
    Materialize { item: InventoryItem, legacy_id: Uuid },
}

impl PendingItem {
    pub fn item_id(&self) -> Uuid {
        match self {
            PendingItem::Link { item_id, .. } => *item_id,
            PendingItem::Materialize { item, .. } => item.id,
        }
    }
}

/// Error for an add that would push stock past what a `Decimal` can hold
pub(crate) fn stock_overflow() -> AppError {
    AppError::validation(
        "amount",
        "Resulting stock is too large",
        "El stock resultante es demasiado grande",
    )
}

/// Editable item settings; stock and unit are intentionally absent
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSettings {
    pub min_stock: Decimal,
    pub critical_stock: Decimal,
    pub location: String,
    pub expiry_date: Option<NaiveDate>,
    pub active: bool,
}

impl From<&InventoryItem> for ItemSettings {
    fn from(item: &InventoryItem) -> Self {
        Self {
            min_stock: item.min_stock,
            critical_stock: item.critical_stock,
            location: item.location.clone(),
            expiry_date: item.expiry_date,
            active: item.active,
        }
    }
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Active item linked to a catalog product
    async fn find_item_by_product(&self, user_id: Uuid, product_id: Uuid) -> AppResult<Option<InventoryItem>>;

    /// Active item with an exact product name that is not linked to any product yet
    async fn find_unlinked_item_by_name(&self, user_id: Uuid, product_name: &str) -> AppResult<Option<InventoryItem>>;

    /// Item by id, active or not
    async fn find_item(&self, user_id: Uuid, item_id: Uuid) -> AppResult<Option<InventoryItem>>;

    /// Active items linked to any of the given products
    async fn find_items_by_products(&self, user_id: Uuid, product_ids: &[Uuid]) -> AppResult<Vec<InventoryItem>>;

    /// Every active item across all users
    async fn list_active_items(&self) -> AppResult<Vec<InventoryItem>>;

    async fn find_product(&self, product_id: Uuid) -> AppResult<Option<ProductCatalogEntry>>;

    /// Legacy record with the given name that has not been migrated to an item yet
    async fn find_legacy_record(&self, user_id: Uuid, name: &str) -> AppResult<Option<LegacyInventoryRecord>>;

    /// Fails with `DuplicateEntry` when the user already has an active item for the product
    async fn insert_item(&self, item: &InventoryItem) -> AppResult<()>;

    /// Update thresholds, location, expiry and active flag; never stock
    async fn update_item_settings(&self, user_id: Uuid, item_id: Uuid, settings: &ItemSettings) -> AppResult<InventoryItem>;

    /// Apply pending item writes and then the plan, all-or-nothing. Subtractions are
    /// conditional decrements that only succeed while `current_stock >= amount_in_item_unit`.
    /// A rejected or failed batch leaves every pending write unapplied. Committed items
    /// list pending items first, then the rest in plan order.
    async fn apply_adjustments(
        &self,
        user_id: Uuid,
        pending: &[PendingItem],
        plan: &[PlannedAdjustment],
    ) -> AppResult<BatchOutcome>;

    /// Newest first
    async fn list_movements(&self, user_id: Uuid, item_id: Uuid, page: Pagination) -> AppResult<Vec<InventoryMovement>>;

    /// Delete every alert of the item and insert the given ones, atomically
    async fn replace_alerts(&self, user_id: Uuid, item_id: Uuid, alerts: &[InventoryAlert]) -> AppResult<()>;

    async fn list_alerts(&self, user_id: Uuid, unread_only: bool) -> AppResult<Vec<InventoryAlert>>;

    /// Returns false when no such alert exists for the user
    async fn mark_alert_read(&self, user_id: Uuid, alert_id: Uuid) -> AppResult<bool>;
}
