//! Locations domain module: warehouses and the storage bins inside them.

pub mod storage_bin;
pub mod warehouse;

pub use storage_bin::{CreateBinRequest, StorageBin, StorageBinId, UpdateBinRequest};
pub use warehouse::{CreateWarehouseRequest, UpdateWarehouseRequest, Warehouse, WarehouseId};
