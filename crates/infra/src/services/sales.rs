use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use demeter_core::{Page, PageRequest, TenantId};
use demeter_inventory::{CreateStockMovementRequest, MovementType, StockBatch, StockMovement, allocate_fefo};
use demeter_products::Product;
use demeter_sales::{CreateSaleRequest, Sale, SaleId};

use super::{ServiceError, ServiceResult};
use crate::store::{Filter, Store};

/// Sales and their effect on stock.
#[derive(Clone)]
pub struct SaleService {
    store: Arc<dyn Store>,
}

impl SaleService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, tenant: &TenantId, page: PageRequest) -> ServiceResult<Page<Sale>> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.page::<Sale>(Vec::new(), page).await?)
    }

    pub async fn get(&self, tenant: &TenantId, id: SaleId) -> ServiceResult<Sale> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.require::<Sale>(id).await?)
    }

    /// Every line must reference an existing, active product.
    #[instrument(skip(self, req), fields(tenant_id = %tenant, items = req.items.len()), err)]
    pub async fn create(&self, tenant: &TenantId, req: CreateSaleRequest, sold_by: Option<String>) -> ServiceResult<Sale> {
        let mut tx = self.store.begin(tenant).await?;
        for item in &req.items {
            let product = tx.require::<Product>(item.product_id).await?;
            if !product.can_be_sold() {
                return Err(ServiceError::Validation(format!(
                    "product {} is {} and cannot be sold",
                    product.sku,
                    product.state.as_str()
                )));
            }
        }
        let sale = Sale::create(req, sold_by, Utc::now())?;
        tx.insert(&sale).await?;
        tx.commit().await?;
        tracing::info!(sale_id = %sale.id, sale_number = %sale.sale_number, total = %sale.total, "sale created");
        Ok(sale)
    }

    /// Complete a pending sale, drawing stock FEFO.
    ///
    /// For each product the demand is allocated over its batches, every
    /// allocation becomes a `SALE` movement referencing the sale, and the sale
    /// is marked completed. Any shortfall aborts the whole transaction.
    #[instrument(skip(self), fields(tenant_id = %tenant, movements), err)]
    pub async fn complete(&self, tenant: &TenantId, id: SaleId, performed_by: Option<String>) -> ServiceResult<Sale> {
        let now = Utc::now();
        let mut tx = self.store.begin(tenant).await?;
        let mut sale = tx.require::<Sale>(id).await?;
        // Status is checked up front so a completed sale never reaches allocation.
        sale.clone().complete(now)?;

        let mut recorded = 0usize;
        for (product_id, demand) in sale.demand_by_product()? {
            let mut batches = tx
                .find_all::<StockBatch>(vec![Filter::eq("productId", product_id)])
                .await?;
            for allocation in allocate_fefo(&batches, product_id, demand, now)? {
                let Some(batch) = batches.iter_mut().find(|b| b.id == allocation.batch_id) else {
                    continue;
                };
                let movement = StockMovement::record(
                    batch,
                    CreateStockMovementRequest {
                        movement_type: MovementType::Sale,
                        batch_id: allocation.batch_id,
                        quantity: allocation.quantity,
                        reference_id: Some(sale.id.into()),
                        notes: Some(format!("sale {}", sale.sale_number)),
                        performed_at: Some(now),
                        destination_warehouse_id: None,
                        destination_bin_id: None,
                    },
                    performed_by.clone(),
                    now,
                )?;
                tx.update(&*batch).await?;
                tx.insert(&movement).await?;
                recorded += 1;
            }
        }

        sale.complete(now)?;
        tx.update(&sale).await?;
        tx.commit().await?;
        tracing::Span::current().record("movements", recorded);
        tracing::info!(sale_id = %sale.id, "sale completed");
        Ok(sale)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    pub async fn cancel(&self, tenant: &TenantId, id: SaleId) -> ServiceResult<Sale> {
        let mut tx = self.store.begin(tenant).await?;
        let mut sale = tx.require::<Sale>(id).await?;
        sale.cancel(Utc::now())?;
        tx.update(&sale).await?;
        tx.commit().await?;
        Ok(sale)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    pub async fn delete(&self, tenant: &TenantId, id: SaleId) -> ServiceResult<()> {
        let mut tx = self.store.begin(tenant).await?;
        let sale = tx.require::<Sale>(id).await?;
        sale.ensure_deletable()?;
        tx.delete::<Sale>(id).await?;
        tx.commit().await?;
        Ok(())
    }
}
