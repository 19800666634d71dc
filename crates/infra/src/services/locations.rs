use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use demeter_core::{Page, PageRequest, Record, TenantId};
use demeter_inventory::StockBatch;
use demeter_locations::{
    CreateBinRequest, CreateWarehouseRequest, StorageBin, StorageBinId, UpdateBinRequest,
    UpdateWarehouseRequest, Warehouse, WarehouseId,
};

use super::{ServiceError, ServiceResult};
use crate::store::{Filter, Store};

/// Warehouses and the storage bins inside them.
#[derive(Clone)]
pub struct LocationService {
    store: Arc<dyn Store>,
}

impl LocationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list_warehouses(&self, tenant: &TenantId, page: PageRequest) -> ServiceResult<Page<Warehouse>> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.page::<Warehouse>(Vec::new(), page).await?)
    }

    pub async fn get_warehouse(&self, tenant: &TenantId, id: WarehouseId) -> ServiceResult<Warehouse> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.require::<Warehouse>(id).await?)
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant), err)]
    pub async fn create_warehouse(&self, tenant: &TenantId, req: CreateWarehouseRequest) -> ServiceResult<Warehouse> {
        let mut tx = self.store.begin(tenant).await?;
        let warehouse = Warehouse::create(req, Utc::now())?;
        tx.insert(&warehouse).await?;
        tx.commit().await?;
        Ok(warehouse)
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant), err)]
    pub async fn update_warehouse(
        &self,
        tenant: &TenantId,
        id: WarehouseId,
        req: UpdateWarehouseRequest,
    ) -> ServiceResult<Warehouse> {
        let mut tx = self.store.begin(tenant).await?;
        let mut warehouse = tx.require::<Warehouse>(id).await?;
        warehouse.apply_update(req, Utc::now())?;
        tx.update(&warehouse).await?;
        tx.commit().await?;
        Ok(warehouse)
    }

    /// Refused while the warehouse still has bins or stock.
    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    pub async fn delete_warehouse(&self, tenant: &TenantId, id: WarehouseId) -> ServiceResult<()> {
        let mut tx = self.store.begin(tenant).await?;
        tx.require::<Warehouse>(id).await?;
        let by_warehouse = [Filter::eq("warehouseId", id)];
        if tx.exists::<StorageBin>(&by_warehouse).await? {
            return Err(ServiceError::Conflict(format!("warehouse {id} still has storage bins")));
        }
        if tx.exists::<StockBatch>(&by_warehouse).await? {
            return Err(ServiceError::Conflict(format!("warehouse {id} still holds stock batches")));
        }
        tx.delete::<Warehouse>(id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_bins(&self, tenant: &TenantId, warehouse_id: WarehouseId) -> ServiceResult<Vec<StorageBin>> {
        let mut tx = self.store.begin(tenant).await?;
        tx.require::<Warehouse>(warehouse_id).await?;
        Ok(tx
            .find_all::<StorageBin>(vec![Filter::eq("warehouseId", warehouse_id)])
            .await?)
    }

    pub async fn get_bin(&self, tenant: &TenantId, id: StorageBinId) -> ServiceResult<StorageBin> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.require::<StorageBin>(id).await?)
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant), err)]
    pub async fn create_bin(
        &self,
        tenant: &TenantId,
        warehouse_id: WarehouseId,
        req: CreateBinRequest,
    ) -> ServiceResult<StorageBin> {
        let mut tx = self.store.begin(tenant).await?;
        tx.require::<Warehouse>(warehouse_id).await?;
        let bin = StorageBin::create(warehouse_id, req, Utc::now())?;
        tx.insert(&bin).await?;
        tx.commit().await?;
        Ok(bin)
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant), err)]
    pub async fn update_bin(&self, tenant: &TenantId, id: StorageBinId, req: UpdateBinRequest) -> ServiceResult<StorageBin> {
        let mut tx = self.store.begin(tenant).await?;
        let mut bin = tx.require::<StorageBin>(id).await?;
        bin.apply_update(req, Utc::now())?;
        tx.update(&bin).await?;
        tx.commit().await?;
        Ok(bin)
    }

    /// Refused while stock batches sit in the bin.
    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    pub async fn delete_bin(&self, tenant: &TenantId, id: StorageBinId) -> ServiceResult<()> {
        let mut tx = self.store.begin(tenant).await?;
        tx.require::<StorageBin>(id).await?;
        if tx.exists::<StockBatch>(&[Filter::eq("binId", id)]).await? {
            return Err(ServiceError::Conflict(format!("bin {id} still holds stock batches")));
        }
        if !tx.delete::<StorageBin>(id).await? {
            return Err(ServiceError::not_found(StorageBin::ENTITY, id));
        }
        tx.commit().await?;
        Ok(())
    }
}
