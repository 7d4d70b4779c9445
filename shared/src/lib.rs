//! Shared types and pure logic for the farm inventory platform
//!
//! This crate contains the unit conversion table, cost aggregation and alert
//! derivation rules shared between the backend and the frontend (via WASM).

pub mod costing;
pub mod models;
pub mod types;
pub mod units;
pub mod validation;

pub use costing::*;
pub use models::*;
pub use types::*;
pub use units::*;
pub use validation::*;
