//! PostgreSQL inventory store

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::models::{
    AlertSeverity, AlertType, InventoryAlert, InventoryItem, InventoryMovement,
    LegacyInventoryRecord, ProductCatalogEntry, ProductType, StockOperation,
};
use shared::types::Pagination;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::{stock_overflow, BatchOutcome, InventoryStore, ItemSettings, PendingItem, PlannedAdjustment};
use crate::error::{AppError, AppResult};

/// Inventory store backed by PostgreSQL
#[derive(Clone)]
pub struct PgInventoryStore {
    db: PgPool,
}

impl PgInventoryStore {
    /// Create a new PgInventoryStore instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.db).await?;
        Ok(())
    }
}

/// Row for inventory item queries
#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Option<Uuid>,
    product_name: String,
    product_type: Option<String>,
    current_stock: Decimal,
    min_stock: Decimal,
    critical_stock: Decimal,
    unit: String,
    location: String,
    expiry_date: Option<NaiveDate>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ItemRow> for InventoryItem {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            product_name: row.product_name,
            product_type: row.product_type.as_deref().map(ProductType::parse),
            current_stock: row.current_stock,
            min_stock: row.min_stock,
            critical_stock: row.critical_stock,
            unit: row.unit,
            location: row.location,
            expiry_date: row.expiry_date,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Row for movement queries
#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    user_id: Uuid,
    inventory_item_id: Uuid,
    product_id: Option<Uuid>,
    operation: String,
    amount: Decimal,
    unit: String,
    amount_in_item_unit: Decimal,
    balance_after: Decimal,
    reason: Option<String>,
    activity_id: Option<Uuid>,
    module: Option<String>,
    day_index: Option<i32>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for InventoryMovement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let operation = StockOperation::parse(&row.operation).ok_or_else(|| {
            AppError::Internal(format!("Unknown movement operation '{}'", row.operation))
        })?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            inventory_item_id: row.inventory_item_id,
            product_id: row.product_id,
            operation,
            amount: row.amount,
            unit: row.unit,
            amount_in_item_unit: row.amount_in_item_unit,
            balance_after: row.balance_after,
            reason: row.reason,
            activity_id: row.activity_id,
            module: row.module,
            day_index: row.day_index,
            created_at: row.created_at,
        })
    }
}

/// Row for alert queries
#[derive(Debug, FromRow)]
struct AlertRow {
    id: Uuid,
    user_id: Uuid,
    item_id: Uuid,
    product_name: String,
    alert_type: String,
    message: String,
    message_es: String,
    severity: String,
    read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<AlertRow> for InventoryAlert {
    type Error = AppError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        let alert_type = AlertType::parse(&row.alert_type)
            .ok_or_else(|| AppError::Internal(format!("Unknown alert type '{}'", row.alert_type)))?;
        let severity = AlertSeverity::parse(&row.severity)
            .ok_or_else(|| AppError::Internal(format!("Unknown alert severity '{}'", row.severity)))?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            item_id: row.item_id,
            product_name: row.product_name,
            alert_type,
            message: row.message,
            message_es: row.message_es,
            severity,
            read: row.read,
            created_at: row.created_at,
        })
    }
}

/// Row for product catalog queries
#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    product_type: String,
    price_per_unit: Decimal,
    unit: String,
    brand: Option<String>,
    supplier: Option<String>,
}

impl From<ProductRow> for ProductCatalogEntry {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            product_type: ProductType::parse(&row.product_type),
            price_per_unit: row.price_per_unit,
            unit: row.unit,
            brand: row.brand,
            supplier: row.supplier,
        }
    }
}

/// Insert an item row, mapping the active (user, product) index to `DuplicateEntry`
async fn insert_item_row(conn: &mut PgConnection, item: &InventoryItem) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_items (
            id, user_id, product_id, product_name, product_type, current_stock, min_stock,
            critical_stock, unit, location, expiry_date, active, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(item.id)
    .bind(item.user_id)
    .bind(item.product_id)
    .bind(&item.product_name)
    .bind(item.product_type.map(|t| t.as_str()))
    .bind(item.current_stock)
    .bind(item.min_stock)
    .bind(item.critical_stock)
    .bind(&item.unit)
    .bind(&item.location)
    .bind(item.expiry_date)
    .bind(item.active)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AppError::DuplicateEntry("product".to_string());
            }
        }
        e.into()
    })?;

    Ok(())
}

/// Write one pending item inside the batch transaction
async fn apply_pending(conn: &mut PgConnection, user_id: Uuid, change: &PendingItem) -> AppResult<()> {
    match change {
        PendingItem::Link { item_id, link } => {
            let linked = sqlx::query(
                r#"
                UPDATE inventory_items
                SET product_id = $1,
                    product_type = $2,
                    unit = CASE WHEN btrim(unit) = '' THEN COALESCE($3, unit) ELSE unit END,
                    updated_at = NOW()
                WHERE id = $4 AND user_id = $5 AND active = TRUE AND product_id IS NULL
                "#,
            )
            .bind(link.product_id)
            .bind(link.product_type.as_str())
            .bind(link.unit.as_deref())
            .bind(item_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return AppError::DuplicateEntry("product".to_string());
                    }
                }
                e.into()
            })?;

            if linked.rows_affected() == 0 {
                return Err(AppError::NotFound("Unlinked inventory item".to_string()));
            }
        }
        PendingItem::Materialize { item, legacy_id } => {
            if item.user_id != user_id {
                return Err(AppError::StorageError("invalid migrated item".to_string()));
            }
            insert_item_row(conn, item).await?;

            let marked = sqlx::query(
                r#"
                UPDATE legacy_inventory
                SET migrated_item_id = $1
                WHERE id = $2 AND user_id = $3 AND migrated_item_id IS NULL
                "#,
            )
            .bind(item.id)
            .bind(legacy_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

            if marked.rows_affected() == 0 {
                return Err(AppError::DuplicateEntry("legacy record".to_string()));
            }
        }
    }

    Ok(())
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn find_item_by_product(&self, user_id: Uuid, product_id: Uuid) -> AppResult<Option<InventoryItem>> {
        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, user_id, product_id, product_name, product_type, current_stock, min_stock,
                   critical_stock, unit, location, expiry_date, active, created_at, updated_at
            FROM inventory_items
            WHERE user_id = $1 AND product_id = $2 AND active = TRUE
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_unlinked_item_by_name(&self, user_id: Uuid, product_name: &str) -> AppResult<Option<InventoryItem>> {
        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, user_id, product_id, product_name, product_type, current_stock, min_stock,
                   critical_stock, unit, location, expiry_date, active, created_at, updated_at
            FROM inventory_items
            WHERE user_id = $1 AND product_name = $2 AND active = TRUE AND product_id IS NULL
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(product_name)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_item(&self, user_id: Uuid, item_id: Uuid) -> AppResult<Option<InventoryItem>> {
        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, user_id, product_id, product_name, product_type, current_stock, min_stock,
                   critical_stock, unit, location, expiry_date, active, created_at, updated_at
            FROM inventory_items
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(item_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_items_by_products(&self, user_id: Uuid, product_ids: &[Uuid]) -> AppResult<Vec<InventoryItem>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, user_id, product_id, product_name, product_type, current_stock, min_stock,
                   critical_stock, unit, location, expiry_date, active, created_at, updated_at
            FROM inventory_items
            WHERE user_id = $1 AND product_id = ANY($2) AND active = TRUE
            "#,
        )
        .bind(user_id)
        .bind(product_ids)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_active_items(&self) -> AppResult<Vec<InventoryItem>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, user_id, product_id, product_name, product_type, current_stock, min_stock,
                   critical_stock, unit, location, expiry_date, active, created_at, updated_at
            FROM inventory_items
            WHERE active = TRUE
            ORDER BY user_id, product_name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_product(&self, product_id: Uuid) -> AppResult<Option<ProductCatalogEntry>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, product_type, price_per_unit, unit, brand, supplier
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_legacy_record(&self, user_id: Uuid, name: &str) -> AppResult<Option<LegacyInventoryRecord>> {
        let row = sqlx::query_as::<_, (Uuid, Uuid, String, Decimal, Decimal, Option<String>)>(
            r#"
            SELECT id, user_id, name, quantity, min_stock, unit
            FROM legacy_inventory
            WHERE user_id = $1 AND name = $2 AND migrated_item_id IS NULL
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|r| LegacyInventoryRecord {
            id: r.0,
            user_id: r.1,
            name: r.2,
            quantity: r.3,
            min_stock: r.4,
            unit: r.5,
        }))
    }

    async fn insert_item(&self, item: &InventoryItem) -> AppResult<()> {
        let mut conn = self.db.acquire().await?;
        insert_item_row(&mut conn, item).await
    }

    async fn update_item_settings(&self, user_id: Uuid, item_id: Uuid, settings: &ItemSettings) -> AppResult<InventoryItem> {
        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            UPDATE inventory_items
            SET min_stock = $1, critical_stock = $2, location = $3, expiry_date = $4,
                active = $5, updated_at = NOW()
            WHERE id = $6 AND user_id = $7
            RETURNING id, user_id, product_id, product_name, product_type, current_stock, min_stock,
                      critical_stock, unit, location, expiry_date, active, created_at, updated_at
            "#,
        )
        .bind(settings.min_stock)
        .bind(settings.critical_stock)
        .bind(&settings.location)
        .bind(settings.expiry_date)
        .bind(settings.active)
        .bind(item_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;

        Ok(row.into())
    }

    async fn apply_adjustments(
        &self,
        user_id: Uuid,
        pending: &[PendingItem],
        plan: &[PlannedAdjustment],
    ) -> AppResult<BatchOutcome> {
        let now = Utc::now();
        let mut touched: Vec<Uuid> = pending.iter().map(PendingItem::item_id).collect();
        let mut movements = Vec::with_capacity(plan.len());

        // Start transaction; dropping it without commit rolls back
        let mut tx = self.db.begin().await?;

        for change in pending {
            apply_pending(&mut tx, user_id, change).await?;
        }

        for (index, step) in plan.iter().enumerate() {
            let balance = match step.operation {
                StockOperation::Add => {
                    sqlx::query_scalar::<_, Decimal>(
                        r#"
                        UPDATE inventory_items
                        SET current_stock = current_stock + $1, updated_at = $2
                        WHERE id = $3 AND user_id = $4 AND current_stock <= $5 - $1
                        RETURNING current_stock
                        "#,
                    )
                    .bind(step.amount_in_item_unit)
                    .bind(now)
                    .bind(step.item_id)
                    .bind(user_id)
                    .bind(Decimal::MAX)
                    .fetch_optional(&mut *tx)
                    .await?
                }
                StockOperation::Subtract => {
                    sqlx::query_scalar::<_, Decimal>(
                        r#"
                        UPDATE inventory_items
                        SET current_stock = current_stock - $1, updated_at = $2
                        WHERE id = $3 AND user_id = $4 AND current_stock >= $1
                        RETURNING current_stock
                        "#,
                    )
                    .bind(step.amount_in_item_unit)
                    .bind(now)
                    .bind(step.item_id)
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await?
                }
            };

            let Some(balance_after) = balance else {
                let available = sqlx::query_scalar::<_, Decimal>(
                    "SELECT current_stock FROM inventory_items WHERE id = $1 AND user_id = $2",
                )
                .bind(step.item_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
                tx.rollback().await?;

                return match (step.operation, available) {
                    (StockOperation::Subtract, Some(available)) => {
                        Ok(BatchOutcome::Rejected { index, available })
                    }
                    (StockOperation::Add, Some(_)) => Err(stock_overflow()),
                    _ => Err(AppError::NotFound("Inventory item".to_string())),
                };
            };

            let movement = step.to_movement(user_id, balance_after, now);
            sqlx::query(
                r#"
                INSERT INTO inventory_movements (
                    id, user_id, inventory_item_id, product_id, operation, amount, unit,
                    amount_in_item_unit, balance_after, reason, activity_id, module, day_index, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                "#,
            )
            .bind(movement.id)
            .bind(movement.user_id)
            .bind(movement.inventory_item_id)
            .bind(movement.product_id)
            .bind(movement.operation.as_str())
            .bind(movement.amount)
            .bind(&movement.unit)
            .bind(movement.amount_in_item_unit)
            .bind(movement.balance_after)
            .bind(&movement.reason)
            .bind(movement.activity_id)
            .bind(&movement.module)
            .bind(movement.day_index)
            .bind(movement.created_at)
            .execute(&mut *tx)
            .await?;

            if !touched.contains(&step.item_id) {
                touched.push(step.item_id);
            }
            movements.push(movement);
        }

        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, user_id, product_id, product_name, product_type, current_stock, min_stock,
                   critical_stock, unit, location, expiry_date, active, created_at, updated_at
            FROM inventory_items
            WHERE id = ANY($1)
            "#,
        )
        .bind(&touched)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut items: Vec<InventoryItem> = rows.into_iter().map(Into::into).collect();
        items.sort_by_key(|i| touched.iter().position(|id| *id == i.id));

        Ok(BatchOutcome::Committed { movements, items })
    }

    async fn list_movements(&self, user_id: Uuid, item_id: Uuid, page: Pagination) -> AppResult<Vec<InventoryMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, user_id, inventory_item_id, product_id, operation, amount, unit,
                   amount_in_item_unit, balance_after, reason, activity_id, module, day_index, created_at
            FROM inventory_movements
            WHERE user_id = $1 AND inventory_item_id = $2
            ORDER BY seq DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(item_id)
        .bind(i64::from(page.limit()))
        .bind(page.offset() as i64)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(InventoryMovement::try_from).collect()
    }

    async fn replace_alerts(&self, user_id: Uuid, item_id: Uuid, alerts: &[InventoryAlert]) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM inventory_alerts WHERE user_id = $1 AND item_id = $2")
            .bind(user_id)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        for alert in alerts {
            sqlx::query(
                r#"
                INSERT INTO inventory_alerts (
                    id, user_id, item_id, product_name, alert_type, message, message_es,
                    severity, read, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(alert.id)
            .bind(alert.user_id)
            .bind(alert.item_id)
            .bind(&alert.product_name)
            .bind(alert.alert_type.as_str())
            .bind(&alert.message)
            .bind(&alert.message_es)
            .bind(alert.severity.as_str())
            .bind(alert.read)
            .bind(alert.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    async fn list_alerts(&self, user_id: Uuid, unread_only: bool) -> AppResult<Vec<InventoryAlert>> {
        let rows = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT id, user_id, item_id, product_name, alert_type, message, message_es,
                   severity, read, created_at
            FROM inventory_alerts
            WHERE user_id = $1 AND ($2 = FALSE OR read = FALSE)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(InventoryAlert::try_from).collect()
    }

    async fn mark_alert_read(&self, user_id: Uuid, alert_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE inventory_alerts SET read = TRUE WHERE id = $1 AND user_id = $2"
        )
        .bind(alert_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
