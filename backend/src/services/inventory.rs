//! Inventory service
//!
//! Resolves catalog products to stocked items (with the legacy fallbacks), applies
//! adjustment batches all-or-nothing and keeps derived alerts in step with stock.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::store::{
    BatchOutcome, InventoryStore, ItemSettings, PendingItem, PlannedAdjustment, ProductLink,
};
use shared::models::{
    derive_alerts, DayRecord, InventoryAlert, InventoryItem, InventoryMovement,
    LegacyInventoryRecord, MovementContext, ProductCatalogEntry, ProductType, StockAdjustment,
    StockLevel, StockOperation, StockShortfall, DEFAULT_EXPIRY_WARNING_DAYS,
};
use shared::types::Pagination;
use shared::units::{normalize_unit, try_convert, unit_group, UnitGroup};
use shared::validation::{
    validate_adjustment_batch, validate_initial_stock, validate_thresholds, validate_unit,
};

/// Rules applied when materializing items and deriving alerts
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryPolicy {
    /// Critical threshold of a legacy record is `floor(min_stock * ratio)`
    pub legacy_critical_ratio: Decimal,
    pub expiry_warning_days: i64,
    pub default_location: String,
}

impl Default for InventoryPolicy {
    fn default() -> Self {
        Self {
            legacy_critical_ratio: Decimal::new(5, 1),
            expiry_warning_days: DEFAULT_EXPIRY_WARNING_DAYS,
            default_location: "Almacén".to_string(),
        }
    }
}

/// Item a product resolved to, plus the write that still has to be persisted for it
#[derive(Debug, Clone)]
struct Resolution {
    item: InventoryItem,
    pending: Option<PendingItem>,
}

/// Inventory service over any [`InventoryStore`]
#[derive(Clone)]
pub struct InventoryService<S> {
    store: S,
    policy: InventoryPolicy,
}

/// Committed batch
#[derive(Debug, Clone, Default)]
pub struct AdjustOutcome {
    /// Final balance per requested product, in the item's native unit
    pub balances: HashMap<Uuid, Decimal>,
    /// Movements written, in application order
    pub movements: Vec<InventoryMovement>,
}

/// Structured result handed to the UI layer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_es: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<StockShortfall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balances: Option<HashMap<Uuid, Decimal>>,
}

impl From<AppResult<AdjustOutcome>> for AdjustResult {
    fn from(result: AppResult<AdjustOutcome>) -> Self {
        match result {
            Ok(outcome) => AdjustResult {
                ok: true,
                error: None,
                message: None,
                message_es: None,
                details: None,
                balances: Some(outcome.balances),
            },
            Err(err) => {
                let detail = err.detail();
                AdjustResult {
                    ok: false,
                    error: Some(detail.code),
                    message: Some(detail.message_en),
                    message_es: Some(detail.message_es),
                    details: detail.details,
                    balances: None,
                }
            }
        }
    }
}

/// Input for registering a stocked product
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStockInput {
    pub product_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub product_name: String,
    pub product_type: Option<ProductType>,
    #[serde(default)]
    pub initial_stock: Decimal,
    #[serde(default)]
    pub min_stock: Decimal,
    #[serde(default)]
    pub critical_stock: Decimal,
    #[validate(length(min = 1, max = 32))]
    pub unit: String,
    #[validate(length(max = 255))]
    pub location: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

/// Partial update of an item's settings; stock is never edited here
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemInput {
    pub min_stock: Option<Decimal>,
    pub critical_stock: Option<Decimal>,
    #[validate(length(min = 1, max = 255))]
    pub location: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    /// Remove the expiry date; ignored when `expiry_date` is also set
    #[serde(default)]
    pub clear_expiry: bool,
}

impl<S: InventoryStore> InventoryService<S> {
    pub fn new(store: S, policy: InventoryPolicy) -> Self {
        Self { store, policy }
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Find the stocked item for a catalog product, falling back to an unlinked item
    /// with the product's name and then to a legacy record. Whatever a fallback finds is
    /// persisted so the next lookup is a direct hit.
    pub async fn resolve_inventory_item(&self, user_id: Uuid, product_id: Uuid) -> AppResult<InventoryItem> {
        let Some(resolution) = self.resolve(user_id, product_id).await? else {
            return Err(AppError::InventoryItemNotFound { product_id });
        };
        let Some(change) = resolution.pending else {
            return Ok(resolution.item);
        };

        let outcome = match self
            .store
            .apply_adjustments(user_id, std::slice::from_ref(&change), &[])
            .await
        {
            Ok(outcome) => outcome,
            Err(e @ (AppError::DuplicateEntry(_) | AppError::NotFound(_))) => {
                // Another request persisted the same fallback first
                tracing::debug!(product_id = %product_id, error = %e, "Fallback already persisted");
                return self
                    .store
                    .find_item_by_product(user_id, product_id)
                    .await?
                    .ok_or(AppError::InventoryItemNotFound { product_id });
            }
            Err(e) => return Err(e),
        };

        let BatchOutcome::Committed { items, .. } = outcome else {
            return Err(AppError::Internal("item write without adjustments was rejected".to_string()));
        };
        let item = items
            .into_iter()
            .find(|i| i.id == change.item_id())
            .ok_or_else(|| AppError::Internal(format!("item {} missing after commit", change.item_id())))?;

        log_item_write(user_id, &change);
        self.recompute_alerts(&item).await;
        Ok(item)
    }

    /// Read-only lookup; fallbacks come back as a pending write
    async fn resolve(&self, user_id: Uuid, product_id: Uuid) -> AppResult<Option<Resolution>> {
        if let Some(item) = self.store.find_item_by_product(user_id, product_id).await? {
            return Ok(Some(Resolution { item, pending: None }));
        }

        let Some(product) = self.store.find_product(product_id).await? else {
            tracing::debug!("Product {} is not in the catalog", product_id);
            return Ok(None);
        };

        if let Some(mut item) = self
            .store
            .find_unlinked_item_by_name(user_id, &product.name)
            .await?
        {
            let link = ProductLink {
                product_id,
                product_type: product.product_type,
                unit: Some(product.unit.clone()).filter(|u| !u.trim().is_empty()),
            };
            link.apply_to(&mut item);
            return Ok(Some(Resolution {
                pending: Some(PendingItem::Link { item_id: item.id, link }),
                item,
            }));
        }

        let Some(legacy) = self.store.find_legacy_record(user_id, &product.name).await? else {
            tracing::debug!("No inventory record for product {} ('{}')", product_id, product.name);
            return Ok(None);
        };

        let legacy_id = legacy.id;
        let item = self.materialize_legacy(user_id, &product, legacy);
        Ok(Some(Resolution {
            pending: Some(PendingItem::Materialize { item: item.clone(), legacy_id }),
            item,
        }))
    }

    fn materialize_legacy(
        &self,
        user_id: Uuid,
        product: &ProductCatalogEntry,
        legacy: LegacyInventoryRecord,
    ) -> InventoryItem {
        let now = Utc::now();
        let critical_stock = legacy
            .min_stock
            .checked_mul(self.policy.legacy_critical_ratio)
            .unwrap_or(legacy.min_stock)
            .floor()
            .max(Decimal::ZERO);
        let unit = legacy
            .unit
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| product.unit.clone());

        InventoryItem {
            id: Uuid::new_v4(),
            user_id,
            product_id: Some(product.id),
            product_name: product.name.clone(),
            product_type: Some(product.product_type),
            current_stock: legacy.quantity.max(Decimal::ZERO),
            min_stock: legacy.min_stock,
            critical_stock,
            unit,
            location: self.policy.default_location.clone(),
            expiry_date: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    // ========================================================================
    // Stock adjustment
    // ========================================================================

    /// Apply a batch of adjustments all-or-nothing.
    ///
    /// Every product is resolved before anything is written, and items created or
    /// linked by a fallback are only persisted if the whole batch commits. Additions
    /// run before subtractions, each group in request order, and amounts are converted
    /// into the item's native unit.
    pub async fn adjust_stock(&self, user_id: Uuid, operations: &[StockAdjustment]) -> AppResult<AdjustOutcome> {
        if let Err((index, message)) = validate_adjustment_batch(operations) {
            return Err(AppError::Validation {
                field: format!("operations[{}].amount", index),
                message: message.to_string(),
                message_es: "La cantidad debe ser mayor que cero".to_string(),
            });
        }
        if operations.is_empty() {
            return Ok(AdjustOutcome::default());
        }

        let mut items: HashMap<Uuid, InventoryItem> = HashMap::new();
        let mut pending: Vec<PendingItem> = Vec::new();
        for op in operations {
            if items.contains_key(&op.product_id) {
                continue;
            }
            let resolved = self
                .resolve(user_id, op.product_id)
                .await
                .map_err(|e| Self::transaction_failed(user_id, e))?;

            // A fallback record serves the first product that claims it
            let claimed = resolved
                .as_ref()
                .and_then(|r| r.pending.as_ref())
                .is_some_and(|change| pending.iter().any(|p| same_source(p, change)));

            match resolved {
                Some(resolution) if !claimed => {
                    pending.extend(resolution.pending);
                    items.insert(op.product_id, resolution.item);
                }
                _ => {
                    tracing::warn!(
                        "Stock batch for user {} rejected: product {} has no inventory record",
                        user_id,
                        op.product_id
                    );
                    return Err(AppError::InventoryItemNotFound { product_id: op.product_id });
                }
            }
        }

        let mut ordered: Vec<&StockAdjustment> = operations.iter().collect();
        ordered.sort_by_key(|op| op.operation == StockOperation::Subtract);

        let mut plan: Vec<PlannedAdjustment> = Vec::with_capacity(ordered.len());
        for op in ordered {
            if let Some(item) = items.get(&op.product_id) {
                plan.push(plan_step(op, item)?);
            }
        }

        self.apply_plan(user_id, &pending, &plan).await
    }

    /// Subtract what a day of activity consumed
    pub async fn consume_day(&self, user_id: Uuid, day: &DayRecord, context: MovementContext) -> AppResult<AdjustOutcome> {
        let operations = day.stock_adjustments(&context);
        tracing::debug!(
            "Day record for user {} consumes {} inventory line(s)",
            user_id,
            operations.len()
        );
        self.adjust_stock(user_id, &operations).await
    }

    async fn apply_plan(
        &self,
        user_id: Uuid,
        pending: &[PendingItem],
        plan: &[PlannedAdjustment],
    ) -> AppResult<AdjustOutcome> {
        let outcome = self
            .store
            .apply_adjustments(user_id, pending, plan)
            .await
            .map_err(|e| Self::transaction_failed(user_id, e))?;

        match outcome {
            BatchOutcome::Rejected { index, available } => {
                let step = plan
                    .get(index)
                    .ok_or_else(|| AppError::Internal(format!("rejected step {} is not in the plan", index)))?;
                let shortfall = StockShortfall {
                    // Unlinked items report their own id
                    product_id: step.product_id.unwrap_or(step.item_id),
                    available,
                    requested: step.amount_in_item_unit,
                    unit: step.item_unit.clone(),
                };
                tracing::warn!(
                    user_id = %user_id,
                    product_id = %shortfall.product_id,
                    requested = %shortfall.requested,
                    available = %shortfall.available,
                    unit = %shortfall.unit,
                    "Stock batch rejected: insufficient stock"
                );
                Err(AppError::InsufficientStock { details: vec![shortfall] })
            }
            BatchOutcome::Committed { movements, items } => {
                let mut balances = HashMap::new();
                for step in plan {
                    let Some(product_id) = step.product_id else {
                        continue;
                    };
                    if let Some(item) = items.iter().find(|i| i.id == step.item_id) {
                        balances.insert(product_id, item.current_stock);
                    }
                }

                for change in pending {
                    log_item_write(user_id, change);
                }
                tracing::info!(
                    user_id = %user_id,
                    movements = movements.len(),
                    items = items.len(),
                    "Stock batch committed"
                );

                for item in &items {
                    self.recompute_alerts(item).await;
                }

                Ok(AdjustOutcome { balances, movements })
            }
        }
    }

    fn transaction_failed(user_id: Uuid, err: AppError) -> AppError {
        if matches!(err, AppError::Validation { .. }) {
            return err;
        }
        tracing::error!(user_id = %user_id, error = %err, "Stock transaction failed");
        AppError::TransactionFailed(err.to_string())
    }

    // ========================================================================
    // Alerts
    // ========================================================================

    /// Replace the item's alerts with freshly derived ones. Failures are logged and
    /// never propagated.
    pub async fn recompute_alerts(&self, item: &InventoryItem) {
        let alerts: Vec<InventoryAlert> = if item.active {
            derive_alerts(item, Utc::now().date_naive(), self.policy.expiry_warning_days)
        } else {
            Vec::new()
        };

        if let Err(e) = self.store.replace_alerts(item.user_id, item.id, &alerts).await {
            tracing::warn!(item_id = %item.id, error = %e, "Failed to recompute inventory alerts");
        }
    }

    pub async fn list_alerts(&self, user_id: Uuid, unread_only: bool) -> AppResult<Vec<InventoryAlert>> {
        self.store.list_alerts(user_id, unread_only).await
    }

    pub async fn mark_alert_read(&self, user_id: Uuid, alert_id: Uuid) -> AppResult<()> {
        if !self.store.mark_alert_read(user_id, alert_id).await? {
            return Err(AppError::NotFound("Alert".to_string()));
        }
        Ok(())
    }

    /// Re-derive alerts for every active item; expiry warnings age with the calendar
    /// even when stock never moves. Returns the number of items refreshed.
    pub async fn refresh_all_alerts(&self) -> AppResult<usize> {
        let items = self.store.list_active_items().await?;
        for item in &items {
            self.recompute_alerts(item).await;
        }
        tracing::info!("Refreshed alerts for {} inventory item(s)", items.len());
        Ok(items.len())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current stock of each linked product; products without an item are absent
    pub async fn get_stock_by_products(&self, user_id: Uuid, product_ids: &[Uuid]) -> AppResult<HashMap<Uuid, StockLevel>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let items = self.store.find_items_by_products(user_id, product_ids).await?;
        Ok(items
            .into_iter()
            .filter_map(|item| {
                item.product_id.map(|product_id| {
                    (
                        product_id,
                        StockLevel {
                            current_stock: item.current_stock,
                            unit: item.unit,
                        },
                    )
                })
            })
            .collect())
    }

    /// Movement history of one item, newest first
    pub async fn list_movements(&self, user_id: Uuid, item_id: Uuid, page: Pagination) -> AppResult<Vec<InventoryMovement>> {
        self.store
            .find_item(user_id, item_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;

        self.store.list_movements(user_id, item_id, page).await
    }

    // ========================================================================
    // Item lifecycle
    // ========================================================================

    /// Register a new stocked product. Initial stock is booked as an `add` movement.
    pub async fn register_stock(&self, user_id: Uuid, input: RegisterStockInput) -> AppResult<InventoryItem> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        validate_initial_stock(input.initial_stock)
            .map_err(|m| AppError::validation("initial_stock", m, "El stock inicial no puede ser negativo"))?;
        validate_thresholds(input.min_stock, input.critical_stock)
            .map_err(|m| AppError::validation("min_stock", m, "Los umbrales de stock no pueden ser negativos"))?;
        validate_unit(&input.unit)
            .map_err(|m| AppError::validation("unit", m, "La unidad no es válida"))?;

        if let Some(product_id) = input.product_id {
            if self.store.find_item_by_product(user_id, product_id).await?.is_some() {
                return Err(AppError::DuplicateEntry("product".to_string()));
            }
        }

        let now = Utc::now();
        let item = InventoryItem {
            id: Uuid::new_v4(),
            user_id,
            product_id: input.product_id,
            product_name: input.product_name.trim().to_string(),
            product_type: input.product_type,
            current_stock: Decimal::ZERO,
            min_stock: input.min_stock,
            critical_stock: input.critical_stock,
            unit: normalize_unit(&input.unit),
            location: input
                .location
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| self.policy.default_location.clone()),
            expiry_date: input.expiry_date,
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_item(&item).await?;
        tracing::info!("Registered inventory item {} ('{}')", item.id, item.product_name);

        if input.initial_stock.is_zero() {
            self.recompute_alerts(&item).await;
            return Ok(item);
        }

        let step = PlannedAdjustment {
            item_id: item.id,
            product_id: item.product_id,
            operation: StockOperation::Add,
            amount: input.initial_stock,
            unit: item.unit.clone(),
            amount_in_item_unit: input.initial_stock,
            item_unit: item.unit.clone(),
            reason: Some("initial_stock".to_string()),
            context: MovementContext::default(),
        };

        if let Err(e) = self.apply_plan(user_id, &[], std::slice::from_ref(&step)).await {
            // Undo the registration so a retry does not hit a duplicate
            let mut settings = ItemSettings::from(&item);
            settings.active = false;
            if let Err(undo) = self.store.update_item_settings(user_id, item.id, &settings).await {
                tracing::error!("Failed to deactivate item {} after failed registration: {}", item.id, undo);
            }
            return Err(e);
        }

        self.store
            .find_item(user_id, item.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))
    }

    /// Edit thresholds, location or expiry and re-derive alerts
    pub async fn update_item(&self, user_id: Uuid, item_id: Uuid, input: UpdateItemInput) -> AppResult<InventoryItem> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let item = self.active_item(user_id, item_id).await?;
        let mut settings = ItemSettings::from(&item);

        if let Some(min_stock) = input.min_stock {
            settings.min_stock = min_stock;
        }
        if let Some(critical_stock) = input.critical_stock {
            settings.critical_stock = critical_stock;
        }
        validate_thresholds(settings.min_stock, settings.critical_stock)
            .map_err(|m| AppError::validation("min_stock", m, "Los umbrales de stock no pueden ser negativos"))?;

        if let Some(location) = input.location {
            settings.location = location.trim().to_string();
        }
        match (input.expiry_date, input.clear_expiry) {
            (Some(date), _) => settings.expiry_date = Some(date),
            (None, true) => settings.expiry_date = None,
            (None, false) => {}
        }

        let updated = self.store.update_item_settings(user_id, item_id, &settings).await?;
        self.recompute_alerts(&updated).await;
        Ok(updated)
    }

    /// Soft-delete an item; its alerts are cleared and its movements kept
    pub async fn deactivate_item(&self, user_id: Uuid, item_id: Uuid) -> AppResult<InventoryItem> {
        let item = self.active_item(user_id, item_id).await?;
        let mut settings = ItemSettings::from(&item);
        settings.active = false;

        let updated = self.store.update_item_settings(user_id, item_id, &settings).await?;
        self.recompute_alerts(&updated).await;
        tracing::info!("Deactivated inventory item {}", item_id);
        Ok(updated)
    }

    async fn active_item(&self, user_id: Uuid, item_id: Uuid) -> AppResult<InventoryItem> {
        self.store
            .find_item(user_id, item_id)
            .await?
            .filter(|i| i.active)
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))
    }
}

/// Whether two pending writes consume the same fallback record
fn same_source(a: &PendingItem, b: &PendingItem) -> bool {
    match (a, b) {
        (PendingItem::Link { item_id: x, .. }, PendingItem::Link { item_id: y, .. }) => x == y,
        (
            PendingItem::Materialize { legacy_id: x, .. },
            PendingItem::Materialize { legacy_id: y, .. },
        ) => x == y,
        _ => false,
    }
}

fn log_item_write(user_id: Uuid, change: &PendingItem) {
    match change {
        PendingItem::Link { item_id, link } => tracing::info!(
            user_id = %user_id,
            item_id = %item_id,
            product_id = %link.product_id,
            "Linked inventory item to product by name"
        ),
        PendingItem::Materialize { item, legacy_id } => tracing::info!(
            user_id = %user_id,
            item_id = %item.id,
            legacy_id = %legacy_id,
            stock = %item.current_stock.normalize(),
            unit = %item.unit,
            "Materialized legacy stock as inventory item"
        ),
    }
}

/// Turn a requested adjustment into a concrete step against its resolved item
fn plan_step(op: &StockAdjustment, item: &InventoryItem) -> AppResult<PlannedAdjustment> {
    let unit = op
        .amount_unit
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(&item.unit)
        .to_string();

    let (from_group, to_group) = (unit_group(&unit), unit_group(&item.unit));
    if from_group != to_group && from_group != UnitGroup::Other && to_group != UnitGroup::Other {
        tracing::warn!(
            "Cannot convert {} to {} for item {}; amount applied unconverted",
            unit,
            item.unit,
            item.id
        );
    }

    let amount_in_item_unit = try_convert(op.amount, &unit, &item.unit).ok_or_else(|| {
        AppError::validation(
            "amount",
            "Amount is too large to convert into the item's unit",
            "La cantidad es demasiado grande para convertirla a la unidad del artículo",
        )
    })?;

    Ok(PlannedAdjustment {
        item_id: item.id,
        product_id: Some(op.product_id),
        operation: op.operation,
        amount: op.amount,
        amount_in_item_unit,
        unit,
        item_unit: item.unit.clone(),
        reason: op.reason.clone(),
        context: op.context.clone().unwrap_or_default(),
    })
}
