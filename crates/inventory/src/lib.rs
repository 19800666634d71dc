//! Inventory domain module: stock batches, the movements that change them, and
//! FEFO allocation of stock to outgoing demand.
//!
//! Pure domain logic (no IO, no HTTP, no storage).

pub mod allocation;
pub mod batch;
pub mod movement;

pub use allocation::{Allocation, allocate_fefo};
pub use batch::{BatchStatus, CreateStockBatchRequest, StockBatch, StockBatchId, UpdateStockBatchRequest};
pub use movement::{CreateStockMovementRequest, MovementType, StockMovement, StockMovementId};
