//! In-process inventory store
//!
//! Honors the same all-or-nothing and conditional-decrement contract as the
//! PostgreSQL store: a batch runs against a scratch copy of the touched items under
//! a single lock and is only written back once every step has succeeded.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use shared::models::{
    InventoryAlert, InventoryItem, InventoryMovement, LegacyInventoryRecord, ProductCatalogEntry,
    StockOperation,
};
use shared::types::Pagination;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{stock_overflow, BatchOutcome, InventoryStore, ItemSettings, PendingItem, PlannedAdjustment};
use crate::error::{AppError, AppResult};

#[derive(Debug, Default)]
struct MemoryState {
    items: HashMap<Uuid, InventoryItem>,
    products: HashMap<Uuid, ProductCatalogEntry>,
    legacy: Vec<LegacyInventoryRecord>,
    migrated_legacy: HashSet<Uuid>,
    movements: Vec<InventoryMovement>,
    alerts: Vec<InventoryAlert>,
    fail_next_batch: bool,
    fail_alert_writes: bool,
}

/// Whether the user already has an active item for the product, looking at the
/// batch's scratch copies before the committed items
fn product_taken(
    items: &HashMap<Uuid, InventoryItem>,
    scratch: &HashMap<Uuid, InventoryItem>,
    user_id: Uuid,
    product_id: Uuid,
) -> bool {
    scratch
        .values()
        .chain(items.values().filter(|i| !scratch.contains_key(&i.id)))
        .any(|i| i.user_id == user_id && i.active && i.product_id == Some(product_id))
}

/// Inventory store kept entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryInventoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a catalog product
    pub async fn add_product(&self, product: ProductCatalogEntry) {
        self.state.lock().await.products.insert(product.id, product);
    }

    /// Register a pre-catalog inventory record
    pub async fn add_legacy_record(&self, record: LegacyInventoryRecord) {
        self.state.lock().await.legacy.push(record);
    }

    /// Make the next `apply_adjustments` call fail as if the commit was lost
    pub async fn fail_next_batch(&self) {
        self.state.lock().await.fail_next_batch = true;
    }

    /// Make every alert write fail until switched off again
    pub async fn set_alert_writes_failing(&self, failing: bool) {
        self.state.lock().await.fail_alert_writes = failing;
    }

    /// Every movement recorded for a user, oldest first
    pub async fn movements(&self, user_id: Uuid) -> Vec<InventoryMovement> {
        self.state
            .lock()
            .await
            .movements
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Alerts currently attached to an item
    pub async fn alerts_for_item(&self, item_id: Uuid) -> Vec<InventoryAlert> {
        self.state
            .lock()
            .await
            .alerts
            .iter()
            .filter(|a| a.item_id == item_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn find_item_by_product(&self, user_id: Uuid, product_id: Uuid) -> AppResult<Option<InventoryItem>> {
        let state = self.state.lock().await;
        Ok(state
            .items
            .values()
            .find(|i| i.user_id == user_id && i.active && i.product_id == Some(product_id))
            .cloned())
    }

    async fn find_unlinked_item_by_name(&self, user_id: Uuid, product_name: &str) -> AppResult<Option<InventoryItem>> {
        let state = self.state.lock().await;
        Ok(state
            .items
            .values()
            .filter(|i| {
                i.user_id == user_id
                    && i.active
                    && i.product_id.is_none()
                    && i.product_name == product_name
            })
            .min_by_key(|i| i.created_at)
            .cloned())
    }

    async fn find_item(&self, user_id: Uuid, item_id: Uuid) -> AppResult<Option<InventoryItem>> {
        let state = self.state.lock().await;
        Ok(state
            .items
            .get(&item_id)
            .filter(|i| i.user_id == user_id)
            .cloned())
    }

    async fn find_items_by_products(&self, user_id: Uuid, product_ids: &[Uuid]) -> AppResult<Vec<InventoryItem>> {
        let state = self.state.lock().await;
        Ok(state
            .items
            .values()
            .filter(|i| {
                i.user_id == user_id
                    && i.active
                    && i.product_id.is_some_and(|p| product_ids.contains(&p))
            })
            .cloned()
            .collect())
    }

    async fn list_active_items(&self) -> AppResult<Vec<InventoryItem>> {
        let state = self.state.lock().await;
        Ok(state.items.values().filter(|i| i.active).cloned().collect())
    }

    async fn find_product(&self, product_id: Uuid) -> AppResult<Option<ProductCatalogEntry>> {
        Ok(self.state.lock().await.products.get(&product_id).cloned())
    }

    async fn find_legacy_record(&self, user_id: Uuid, name: &str) -> AppResult<Option<LegacyInventoryRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .legacy
            .iter()
            .find(|r| {
                r.user_id == user_id && r.name == name && !state.migrated_legacy.contains(&r.id)
            })
            .cloned())
    }

    async fn insert_item(&self, item: &InventoryItem) -> AppResult<()> {
        if item.current_stock < Decimal::ZERO {
            return Err(AppError::StorageError("current_stock must not be negative".to_string()));
        }
        let mut state = self.state.lock().await;
        if state.items.contains_key(&item.id) {
            return Err(AppError::DuplicateEntry("inventory item id".to_string()));
        }
        if let Some(product_id) = item.product_id.filter(|_| item.active) {
            if product_taken(&state.items, &HashMap::new(), item.user_id, product_id) {
                return Err(AppError::DuplicateEntry("product".to_string()));
            }
        }
        state.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn update_item_settings(&self, user_id: Uuid, item_id: Uuid, settings: &ItemSettings) -> AppResult<InventoryItem> {
        let mut state = self.state.lock().await;
        let item = state
            .items
            .get_mut(&item_id)
            .filter(|i| i.user_id == user_id)
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;

        item.min_stock = settings.min_stock;
        item.critical_stock = settings.critical_stock;
        item.location = settings.location.clone();
        item.expiry_date = settings.expiry_date;
        item.active = settings.active;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn apply_adjustments(
        &self,
        user_id: Uuid,
        pending: &[PendingItem],
        plan: &[PlannedAdjustment],
    ) -> AppResult<BatchOutcome> {
        let mut state = self.state.lock().await;
        if std::mem::take(&mut state.fail_next_batch) {
            return Err(AppError::StorageError("commit lost".to_string()));
        }

        let now = Utc::now();
        let mut touched: Vec<Uuid> = Vec::new();
        let mut scratch: HashMap<Uuid, InventoryItem> = HashMap::new();
        let mut migrated: Vec<Uuid> = Vec::new();
        let mut movements = Vec::with_capacity(plan.len());

        for change in pending {
            match change {
                PendingItem::Link { item_id, link } => {
                    let mut item = scratch
                        .get(item_id)
                        .or_else(|| state.items.get(item_id))
                        .filter(|i| i.user_id == user_id && i.active && i.product_id.is_none())
                        .cloned()
                        .ok_or_else(|| AppError::NotFound("Unlinked inventory item".to_string()))?;
                    if product_taken(&state.items, &scratch, user_id, link.product_id) {
                        return Err(AppError::DuplicateEntry("product".to_string()));
                    }
                    link.apply_to(&mut item);
                    item.updated_at = now;
                    touched.push(item.id);
                    scratch.insert(item.id, item);
                }
                PendingItem::Materialize { item, legacy_id } => {
                    if item.user_id != user_id || item.current_stock < Decimal::ZERO {
                        return Err(AppError::StorageError("invalid migrated item".to_string()));
                    }
                    if state.items.contains_key(&item.id) || scratch.contains_key(&item.id) {
                        return Err(AppError::DuplicateEntry("inventory item id".to_string()));
                    }
                    if let Some(product_id) = item.product_id {
                        if product_taken(&state.items, &scratch, user_id, product_id) {
                            return Err(AppError::DuplicateEntry("product".to_string()));
                        }
                    }
                    let unmigrated = state.legacy.iter().any(|r| {
                        r.id == *legacy_id
                            && r.user_id == user_id
                            && !state.migrated_legacy.contains(&r.id)
                    });
                    if !unmigrated || migrated.contains(legacy_id) {
                        return Err(AppError::DuplicateEntry("legacy record".to_string()));
                    }
                    migrated.push(*legacy_id);
                    touched.push(item.id);
                    scratch.insert(item.id, item.clone());
                }
            }
        }

        for (index, step) in plan.iter().enumerate() {
            if !scratch.contains_key(&step.item_id) {
                let item = state
                    .items
                    .get(&step.item_id)
                    .filter(|i| i.user_id == user_id)
                    .cloned()
                    .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;
                touched.push(item.id);
                scratch.insert(item.id, item);
            }
            let Some(item) = scratch.get_mut(&step.item_id) else {
                continue;
            };

            match step.operation {
                StockOperation::Add => {
                    item.current_stock = item
                        .current_stock
                        .checked_add(step.amount_in_item_unit)
                        .ok_or_else(stock_overflow)?;
                }
                StockOperation::Subtract => {
                    if item.current_stock < step.amount_in_item_unit {
                        return Ok(BatchOutcome::Rejected {
                            index,
                            available: item.current_stock,
                        });
                    }
                    item.current_stock -= step.amount_in_item_unit;
                }
            }
            item.updated_at = now;
            movements.push(step.to_movement(user_id, item.current_stock, now));
        }

        let items: Vec<InventoryItem> = touched
            .iter()
            .filter_map(|id| scratch.remove(id))
            .collect();
        for item in &items {
            state.items.insert(item.id, item.clone());
        }
        state.migrated_legacy.extend(migrated);
        state.movements.extend(movements.iter().cloned());

        Ok(BatchOutcome::Committed { movements, items })
    }

    async fn list_movements(&self, user_id: Uuid, item_id: Uuid, page: Pagination) -> AppResult<Vec<InventoryMovement>> {
        let state = self.state.lock().await;
        Ok(state
            .movements
            .iter()
            .rev()
            .filter(|m| m.user_id == user_id && m.inventory_item_id == item_id)
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect())
    }

    async fn replace_alerts(&self, user_id: Uuid, item_id: Uuid, alerts: &[InventoryAlert]) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.fail_alert_writes {
            return Err(AppError::StorageError("alert collection unavailable".to_string()));
        }
        state
            .alerts
            .retain(|a| !(a.user_id == user_id && a.item_id == item_id));
        state.alerts.extend(alerts.iter().cloned());
        Ok(())
    }

    async fn list_alerts(&self, user_id: Uuid, unread_only: bool) -> AppResult<Vec<InventoryAlert>> {
        let state = self.state.lock().await;
        Ok(state
            .alerts
            .iter()
            .filter(|a| a.user_id == user_id && (!unread_only || !a.read))
            .cloned()
            .collect())
    }

    async fn mark_alert_read(&self, user_id: Uuid, alert_id: Uuid) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state
            .alerts
            .iter_mut()
            .find(|a| a.id == alert_id && a.user_id == user_id)
        {
            Some(alert) => {
                alert.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
