//! Business logic services for the farm inventory engine

pub mod inventory;

pub use inventory::{AdjustOutcome, AdjustResult, InventoryPolicy, InventoryService};
