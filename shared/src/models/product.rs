//! Product catalog models
//!
//! The catalog is owned by the product-management side of the application. Records
//! arrive in a loosely-typed shape and are normalized here before any conversion or
//! cost logic sees them.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Kind of product tracked by the farm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Fertilizer,
    Water,
    Phytosanitary,
    #[serde(other)]
    Other,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Fertilizer => "fertilizer",
            ProductType::Water => "water",
            ProductType::Phytosanitary => "phytosanitary",
            ProductType::Other => "other",
        }
    }

    /// Unknown kinds fall back to `Other`
    pub fn parse(s: &str) -> Self {
        match s {
            "fertilizer" => ProductType::Fertilizer,
            "water" => ProductType::Water,
            "phytosanitary" => ProductType::Phytosanitary,
            _ => ProductType::Other,
        }
    }
}

/// Canonical catalog entry consumed by the inventory and costing logic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCatalogEntry {
    pub id: Uuid,
    pub name: String,
    pub product_type: ProductType,
    pub price_per_unit: Decimal,
    pub unit: String,
    pub brand: Option<String>,
    pub supplier: Option<String>,
}

/// Product record as sent by the product-management screens
///
/// Older records use `_id` and `price` where newer ones use `id` and `pricePerUnit`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    #[serde(alias = "_id")]
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type", default = "default_product_type")]
    pub product_type: ProductType,
    #[serde(alias = "price", default)]
    pub price_per_unit: Option<Decimal>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
}

fn default_product_type() -> ProductType {
    ProductType::Other
}

/// Errors raised while building a catalog from raw records
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product {0} has a negative price")]
    NegativePrice(Uuid),

    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProductRecord {
    /// Normalize into the canonical entry shape
    pub fn normalize(self) -> Result<ProductCatalogEntry, CatalogError> {
        let price_per_unit = self.price_per_unit.unwrap_or(Decimal::ZERO);
        if price_per_unit < Decimal::ZERO {
            return Err(CatalogError::NegativePrice(self.id));
        }

        Ok(ProductCatalogEntry {
            id: self.id,
            name: self.name.trim().to_string(),
            product_type: self.product_type,
            price_per_unit,
            unit: self.unit.map(|u| u.trim().to_string()).unwrap_or_default(),
            brand: self.brand,
            supplier: self.supplier,
        })
    }
}

/// Read-only, id-indexed view of the product catalog
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    entries: HashMap<Uuid, ProductCatalogEntry>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a JSON array of raw product records
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let records: Vec<ProductRecord> = serde_json::from_str(json)?;
        records
            .into_iter()
            .map(ProductRecord::normalize)
            .collect::<Result<Vec<_>, _>>()
            .map(Self::from_iter)
    }

    pub fn insert(&mut self, entry: ProductCatalogEntry) {
        self.entries.insert(entry.id, entry);
    }

    pub fn get(&self, id: &Uuid) -> Option<&ProductCatalogEntry> {
        self.entries.get(id)
    }

    /// The water product used to price water consumption, if one is registered
    pub fn water_entry(&self) -> Option<&ProductCatalogEntry> {
        self.entries
            .values()
            .find(|e| e.product_type == ProductType::Water)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ProductCatalogEntry> for ProductCatalog {
    fn from_iter<I: IntoIterator<Item = ProductCatalogEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|e| (e.id, e)).collect(),
        }
    }
}
