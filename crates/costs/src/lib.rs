//! Cost tracking: production and operating costs, optionally tied to a product
//! or a stock batch.

pub mod cost;

pub use cost::{Cost, CostId, CostType, CreateCostRequest, UpdateCostRequest};
