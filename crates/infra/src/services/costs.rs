use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use demeter_core::{Page, PageRequest, Record, TenantId};
use demeter_costs::{Cost, CostId, CreateCostRequest, UpdateCostRequest};
use demeter_inventory::{StockBatch, StockBatchId};
use demeter_products::{Product, ProductId};

use super::{ServiceError, ServiceResult};
use crate::store::{Filter, Store, Tx};

#[derive(Clone)]
pub struct CostService {
    store: Arc<dyn Store>,
}

async fn check_references(tx: &mut Tx, product_id: Option<ProductId>, batch_id: Option<StockBatchId>) -> ServiceResult<()> {
    if let Some(product_id) = product_id {
        tx.require::<Product>(product_id).await?;
    }
    if let Some(batch_id) = batch_id {
        let batch = tx.require::<StockBatch>(batch_id).await?;
        if product_id.is_some_and(|p| p != batch.product_id) {
            return Err(ServiceError::Validation(format!(
                "batch {batch_id} does not hold product {}",
                product_id.map(|p| p.to_string()).unwrap_or_default()
            )));
        }
    }
    Ok(())
}

impl CostService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, tenant: &TenantId, page: PageRequest) -> ServiceResult<Page<Cost>> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.page::<Cost>(Vec::new(), page).await?)
    }

    pub async fn get(&self, tenant: &TenantId, id: CostId) -> ServiceResult<Cost> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.require::<Cost>(id).await?)
    }

    pub async fn by_product(&self, tenant: &TenantId, product_id: ProductId, page: PageRequest) -> ServiceResult<Page<Cost>> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.page::<Cost>(vec![Filter::eq("productId", product_id)], page).await?)
    }

    pub async fn by_batch(&self, tenant: &TenantId, batch_id: StockBatchId, page: PageRequest) -> ServiceResult<Page<Cost>> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.page::<Cost>(vec![Filter::eq("batchId", batch_id)], page).await?)
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant, cost_type = req.cost_type.as_str()), err)]
    pub async fn create(&self, tenant: &TenantId, req: CreateCostRequest) -> ServiceResult<Cost> {
        let mut tx = self.store.begin(tenant).await?;
        check_references(&mut tx, req.product_id, req.batch_id).await?;
        let cost = Cost::create(req, Utc::now())?;
        tx.insert(&cost).await?;
        tx.commit().await?;
        Ok(cost)
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant), err)]
    pub async fn update(&self, tenant: &TenantId, id: CostId, req: UpdateCostRequest) -> ServiceResult<Cost> {
        let mut tx = self.store.begin(tenant).await?;
        let mut cost = tx.require::<Cost>(id).await?;
        cost.apply_update(req, Utc::now())?;
        check_references(&mut tx, cost.product_id, cost.batch_id).await?;
        tx.update(&cost).await?;
        tx.commit().await?;
        Ok(cost)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    pub async fn delete(&self, tenant: &TenantId, id: CostId) -> ServiceResult<()> {
        let mut tx = self.store.begin(tenant).await?;
        if !tx.delete::<Cost>(id).await? {
            return Err(ServiceError::not_found(Cost::ENTITY, id));
        }
        tx.commit().await?;
        Ok(())
    }
}
