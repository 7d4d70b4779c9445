//! Domain models for farm inventory and activity costing

mod activity;
mod alert;
mod inventory;
mod product;

pub use activity::*;
pub use alert::*;
pub use inventory::*;
pub use product::*;
