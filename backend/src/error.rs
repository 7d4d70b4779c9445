//! Error handling for the farm inventory backend
//!
//! Provides consistent, structured error details in English and Spanish

use serde::Serialize;
use shared::models::StockShortfall;
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Stock adjustment errors
    #[error("No inventory item found for product {product_id}")]
    InventoryItemNotFound { product_id: Uuid },

    #[error("Insufficient stock for {} line(s)", .details.len())]
    InsufficientStock { details: Vec<StockShortfall> },

    #[error("Stock transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Bilingual error detail returned to the UI
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<StockShortfall>>,
}

impl AppError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } | AppError::ValidationError(_) => "validation_error",
            AppError::DuplicateEntry(_) => "duplicate_entry",
            AppError::NotFound(_) => "not_found",
            AppError::InventoryItemNotFound { .. } => "inventory_item_not_found",
            AppError::InsufficientStock { .. } => "insufficient_stock",
            AppError::TransactionFailed(_) => "transaction_failed",
            AppError::StorageError(_) => "storage_error",
            AppError::DatabaseError(_) | AppError::MigrationError(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Whether the caller may ask the user to confirm an override instead of failing hard
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, AppError::InsufficientStock { .. })
    }

    /// Shortcut for a field validation error
    pub fn validation(field: &str, message: &str, message_es: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_es: message_es.to_string(),
        }
    }

    /// Bilingual detail for the UI
    pub fn detail(&self) -> ErrorDetail {
        let (message_en, message_es, field, details) = match self {
            AppError::Validation { field, message, message_es } => {
                (message.clone(), message_es.clone(), Some(field.clone()), None)
            }
            AppError::ValidationError(msg) => (
                msg.clone(),
                format!("Datos no válidos: {}", msg),
                None,
                None,
            ),
            AppError::DuplicateEntry(what) => (
                format!("A record with this {} already exists", what),
                format!("Ya existe un registro con este {}", what),
                Some(what.clone()),
                None,
            ),
            AppError::NotFound(resource) => (
                format!("{} not found", resource),
                format!("No se encontró {}", resource),
                None,
                None,
            ),
            AppError::InventoryItemNotFound { product_id } => (
                format!("Product {} has no inventory record", product_id),
                format!("El producto {} no tiene registro de inventario", product_id),
                None,
                None,
            ),
            AppError::InsufficientStock { details } => {
                let lines: Vec<String> = details
                    .iter()
                    .map(|d| {
                        format!(
                            "{} {} requested, {} {} available",
                            d.requested.normalize(),
                            d.unit,
                            d.available.normalize(),
                            d.unit
                        )
                    })
                    .collect();
                let lines_es: Vec<String> = details
                    .iter()
                    .map(|d| {
                        format!(
                            "solicitado {} {}, disponible {} {}",
                            d.requested.normalize(),
                            d.unit,
                            d.available.normalize(),
                            d.unit
                        )
                    })
                    .collect();
                (
                    format!("Insufficient stock: {}", lines.join("; ")),
                    format!("Stock insuficiente: {}", lines_es.join("; ")),
                    None,
                    Some(details.clone()),
                )
            }
            AppError::TransactionFailed(_) => (
                "The stock update could not be saved; nothing was changed".to_string(),
                "No se pudo guardar la actualización de stock; no se modificó nada".to_string(),
                None,
                None,
            ),
            AppError::StorageError(msg) => (
                format!("Storage error: {}", msg),
                format!("Error de almacenamiento: {}", msg),
                None,
                None,
            ),
            AppError::DatabaseError(_) | AppError::MigrationError(_) => (
                "A database error occurred".to_string(),
                "Se produjo un error de base de datos".to_string(),
                None,
                None,
            ),
            AppError::Internal(msg) => (
                msg.clone(),
                "Error interno del servidor".to_string(),
                None,
                None,
            ),
        };

        ErrorDetail {
            code: self.code().to_string(),
            message_en,
            message_es,
            field,
            details,
        }
    }
}

/// Result type alias for services and stores
pub type AppResult<T> = Result<T, AppError>;
