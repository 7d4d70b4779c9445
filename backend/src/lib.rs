//! Farm inventory engine
//!
//! Keeps per-user stock of fertilizers, phytosanitaries and other inputs in step
//! with the activity records that consume them.

pub mod config;
pub mod error;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use services::{AdjustOutcome, AdjustResult, InventoryPolicy, InventoryService};
pub use store::{InventoryStore, MemoryInventoryStore, PgInventoryStore};
