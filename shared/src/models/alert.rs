//! Inventory alert models and the rules that derive them from an item's current state

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::InventoryItem;

/// Default window, in days, for expiry warnings
pub const DEFAULT_EXPIRY_WARNING_DAYS: i64 = 30;

/// Kind of inventory alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowStock,
    CriticalStock,
    ExpiryWarning,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LowStock => "low_stock",
            AlertType::CriticalStock => "critical_stock",
            AlertType::ExpiryWarning => "expiry_warning",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low_stock" => Some(AlertType::LowStock),
            "critical_stock" => Some(AlertType::CriticalStock),
            "expiry_warning" => Some(AlertType::ExpiryWarning),
            _ => None,
        }
    }
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "warning" => Some(AlertSeverity::Warning),
            "critical" => Some(AlertSeverity::Critical),
            _ => None,
        }
    }
}

/// A derived alert for one inventory item
///
/// Alerts are a working set: every recomputation replaces all alerts of the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAlert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub product_name: String,
    pub alert_type: AlertType,
    pub message: String,
    pub message_es: String,
    pub severity: AlertSeverity,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Stock level classification against an item's thresholds
pub fn stock_alert_type(
    current_stock: Decimal,
    min_stock: Decimal,
    critical_stock: Decimal,
) -> Option<AlertType> {
    if current_stock <= critical_stock {
        Some(AlertType::CriticalStock)
    } else if current_stock <= min_stock {
        Some(AlertType::LowStock)
    } else {
        None
    }
}

/// Days until expiry if the date falls inside the warning window
pub fn days_until_expiry_warning(
    expiry_date: NaiveDate,
    today: NaiveDate,
    window_days: i64,
) -> Option<i64> {
    let days = (expiry_date - today).num_days();
    (days > 0 && days <= window_days).then_some(days)
}

/// Derive the full alert set for an item from its current fields only.
///
/// Stock and expiry checks are independent, so an item can carry both.
pub fn derive_alerts(item: &InventoryItem, today: NaiveDate, expiry_window_days: i64) -> Vec<InventoryAlert> {
    let now = Utc::now();
    let stock = format!("{} {}", item.current_stock.normalize(), item.unit);
    let mut alerts = Vec::new();

    let new_alert = |alert_type, severity, message: String, message_es: String| InventoryAlert {
        id: Uuid::new_v4(),
        user_id: item.user_id,
        item_id: item.id,
        product_name: item.product_name.clone(),
        alert_type,
        message,
        message_es,
        severity,
        read: false,
        created_at: now,
    };

    match stock_alert_type(item.current_stock, item.min_stock, item.critical_stock) {
        Some(AlertType::CriticalStock) => alerts.push(new_alert(
            AlertType::CriticalStock,
            AlertSeverity::Critical,
            format!("Critical stock for {}: {} left", item.product_name, stock),
            format!("Stock crítico de {}: quedan {}", item.product_name, stock),
        )),
        Some(_) => alerts.push(new_alert(
            AlertType::LowStock,
            AlertSeverity::Warning,
            format!("Low stock for {}: {} left", item.product_name, stock),
            format!("Stock bajo de {}: quedan {}", item.product_name, stock),
        )),
        None => {}
    }

    if let Some(days) = item
        .expiry_date
        .and_then(|d| days_until_expiry_warning(d, today, expiry_window_days))
    {
        alerts.push(new_alert(
            AlertType::ExpiryWarning,
            AlertSeverity::Warning,
            format!("{} expires in {} days", item.product_name, days),
            format!("{} caduca en {} días", item.product_name, days),
        ));
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item(current: i64, min: i64, critical: i64) -> InventoryItem {
        InventoryItem {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            product_id: None,
            product_name: "Urea".to_string(),
            product_type: None,
            current_stock: Decimal::from(current),
            min_stock: Decimal::from(min),
            critical_stock: Decimal::from(critical),
            unit: "kg".to_string(),
            location: "Almacén".to_string(),
            expiry_date: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_no_alert_above_min() {
        assert!(derive_alerts(&item(7, 5, 2), today(), 30).is_empty());
    }

    #[test]
    fn test_low_stock_at_min_boundary() {
        let alerts = derive_alerts(&item(5, 5, 2), today(), 30);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::LowStock);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
        assert!(!alerts[0].read);
    }

    #[test]
    fn test_critical_takes_precedence() {
        let alerts = derive_alerts(&item(2, 5, 2), today(), 30);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::CriticalStock);
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_expiry_window() {
        let mut it = item(100, 5, 2);
        it.expiry_date = Some(today() + Duration::days(30));
        let alerts = derive_alerts(&it, today(), 30);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::ExpiryWarning);

        it.expiry_date = Some(today() + Duration::days(31));
        assert!(derive_alerts(&it, today(), 30).is_empty());

        // Already expired or expiring today falls outside the window
        it.expiry_date = Some(today());
        assert!(derive_alerts(&it, today(), 30).is_empty());
    }

    #[test]
    fn test_stock_and_expiry_alerts_coexist() {
        let mut it = item(1, 5, 2);
        it.expiry_date = Some(today() + Duration::days(3));
        let types: Vec<_> = derive_alerts(&it, today(), 30)
            .into_iter()
            .map(|a| a.alert_type)
            .collect();
        assert_eq!(types, vec![AlertType::CriticalStock, AlertType::ExpiryWarning]);
    }
}
