use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

use demeter_core::{Page, PageRequest, Record, TenantId};
use demeter_inventory::{
    BatchStatus, CreateStockBatchRequest, CreateStockMovementRequest, MovementType, StockBatch,
    StockBatchId, StockMovement, StockMovementId, UpdateStockBatchRequest,
};
use demeter_locations::{StorageBin, StorageBinId, Warehouse, WarehouseId};
use demeter_products::{Product, ProductId};

use super::{ServiceError, ServiceResult};
use crate::store::{Filter, Store, Tx};

/// Warehouse must exist; a bin must exist and sit in that warehouse.
pub(crate) async fn check_location(
    tx: &mut Tx,
    warehouse_id: Option<WarehouseId>,
    bin_id: Option<StorageBinId>,
) -> ServiceResult<()> {
    if let Some(warehouse_id) = warehouse_id {
        tx.require::<Warehouse>(warehouse_id).await?;
    }
    if let Some(bin_id) = bin_id {
        let bin = tx.require::<StorageBin>(bin_id).await?;
        if Some(bin.warehouse_id) != warehouse_id {
            return Err(ServiceError::Validation(format!(
                "bin {bin_id} does not belong to warehouse {}",
                warehouse_id.map(|w| w.to_string()).unwrap_or_else(|| "(none)".to_string())
            )));
        }
    }
    Ok(())
}

/// Stock batches.
#[derive(Clone)]
pub struct StockBatchService {
    store: Arc<dyn Store>,
}

impl StockBatchService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn page(&self, tenant: &TenantId, filters: Vec<Filter>, page: PageRequest) -> ServiceResult<Page<StockBatch>> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.page::<StockBatch>(filters, page).await?)
    }

    pub async fn list(&self, tenant: &TenantId, page: PageRequest) -> ServiceResult<Page<StockBatch>> {
        self.page(tenant, Vec::new(), page).await
    }

    pub async fn by_product(&self, tenant: &TenantId, product_id: ProductId, page: PageRequest) -> ServiceResult<Page<StockBatch>> {
        self.page(tenant, vec![Filter::eq("productId", product_id)], page).await
    }

    pub async fn by_warehouse(
        &self,
        tenant: &TenantId,
        warehouse_id: WarehouseId,
        page: PageRequest,
    ) -> ServiceResult<Page<StockBatch>> {
        self.page(tenant, vec![Filter::eq("warehouseId", warehouse_id)], page).await
    }

    pub async fn by_status(&self, tenant: &TenantId, status: BatchStatus, page: PageRequest) -> ServiceResult<Page<StockBatch>> {
        self.page(tenant, vec![Filter::eq("status", status.as_str())], page).await
    }

    pub async fn get(&self, tenant: &TenantId, id: StockBatchId) -> ServiceResult<StockBatch> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.require::<StockBatch>(id).await?)
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant, product_id = %req.product_id), err)]
    pub async fn create(&self, tenant: &TenantId, req: CreateStockBatchRequest) -> ServiceResult<StockBatch> {
        let mut tx = self.store.begin(tenant).await?;
        tx.require::<Product>(req.product_id).await?;
        check_location(&mut tx, req.warehouse_id, req.bin_id).await?;
        let batch = StockBatch::create(req, Utc::now())?;
        tx.insert(&batch).await?;
        tx.commit().await?;
        tracing::info!(batch_id = %batch.id, quantity = %batch.quantity, "stock batch created");
        Ok(batch)
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant), err)]
    pub async fn update(&self, tenant: &TenantId, id: StockBatchId, req: UpdateStockBatchRequest) -> ServiceResult<StockBatch> {
        let mut tx = self.store.begin(tenant).await?;
        let mut batch = tx.require::<StockBatch>(id).await?;
        batch.apply_update(req, Utc::now())?;
        check_location(&mut tx, batch.warehouse_id, batch.bin_id).await?;
        tx.update(&batch).await?;
        tx.commit().await?;
        Ok(batch)
    }

    /// Overwrite the on-hand quantity (stock count correction).
    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    pub async fn update_quantity(&self, tenant: &TenantId, id: StockBatchId, quantity: Decimal) -> ServiceResult<StockBatch> {
        let mut tx = self.store.begin(tenant).await?;
        let mut batch = tx.require::<StockBatch>(id).await?;
        batch.set_quantity(quantity, Utc::now())?;
        tx.update(&batch).await?;
        tx.commit().await?;
        Ok(batch)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    pub async fn delete(&self, tenant: &TenantId, id: StockBatchId) -> ServiceResult<()> {
        let mut tx = self.store.begin(tenant).await?;
        if !tx.delete::<StockBatch>(id).await? {
            return Err(ServiceError::not_found(StockBatch::ENTITY, id));
        }
        tx.commit().await?;
        Ok(())
    }
}

/// Stock movements. Recording one changes its batch in the same transaction.
#[derive(Clone)]
pub struct StockMovementService {
    store: Arc<dyn Store>,
}

impl StockMovementService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn page(&self, tenant: &TenantId, filters: Vec<Filter>, page: PageRequest) -> ServiceResult<Page<StockMovement>> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.page::<StockMovement>(filters, page).await?)
    }

    pub async fn list(&self, tenant: &TenantId, page: PageRequest) -> ServiceResult<Page<StockMovement>> {
        self.page(tenant, Vec::new(), page).await
    }

    pub async fn get(&self, tenant: &TenantId, id: StockMovementId) -> ServiceResult<StockMovement> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.require::<StockMovement>(id).await?)
    }

    pub async fn by_type(&self, tenant: &TenantId, movement_type: MovementType, page: PageRequest) -> ServiceResult<Page<StockMovement>> {
        self.page(tenant, vec![Filter::eq("movementType", movement_type.as_str())], page)
            .await
    }

    /// Movements performed in `[from, to)`.
    pub async fn by_date_range(
        &self,
        tenant: &TenantId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: PageRequest,
    ) -> ServiceResult<Page<StockMovement>> {
        if to <= from {
            return Err(ServiceError::Validation("'to' must be after 'from'".to_string()));
        }
        let filters = vec![Filter::on_or_after("performedAt", from), Filter::before("performedAt", to)];
        self.page(tenant, filters, page).await
    }

    pub async fn by_reference(&self, tenant: &TenantId, reference_id: Uuid, page: PageRequest) -> ServiceResult<Page<StockMovement>> {
        self.page(tenant, vec![Filter::eq("referenceId", reference_id)], page).await
    }

    #[instrument(
        skip(self, req),
        fields(tenant_id = %tenant, batch_id = %req.batch_id, movement_type = %req.movement_type),
        err
    )]
    pub async fn create(
        &self,
        tenant: &TenantId,
        req: CreateStockMovementRequest,
        performed_by: Option<String>,
    ) -> ServiceResult<StockMovement> {
        let mut tx = self.store.begin(tenant).await?;
        let mut batch = tx.require::<StockBatch>(req.batch_id).await?;
        if req.movement_type == MovementType::Transfer {
            let destination = req.destination_warehouse_id;
            if destination.is_some() {
                check_location(&mut tx, destination, req.destination_bin_id).await?;
            }
        }
        let movement = StockMovement::record(&mut batch, req, performed_by, Utc::now())?;
        tx.update(&batch).await?;
        tx.insert(&movement).await?;
        tx.commit().await?;
        tracing::info!(
            movement_id = %movement.id,
            balance_after = %movement.balance_after,
            "stock movement recorded"
        );
        Ok(movement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{store, tenant};
    use crate::services::{LocationService, ProductService};
    use demeter_locations::{CreateBinRequest, CreateWarehouseRequest};
    use demeter_products::CreateProductRequest;

    struct Fixture {
        tenant: TenantId,
        batches: StockBatchService,
        movements: StockMovementService,
        locations: LocationService,
        product: Product,
    }

    async fn fixture() -> Fixture {
        let shared = store();
        let t = tenant("tenant-alpha");
        let product = ProductService::new(shared.clone())
            .create(
                &t,
                CreateProductRequest {
                    sku: "ROSE-RED".into(),
                    name: "Red rose".into(),
                    description: None,
                    category_id: None,
                    state: None,
                    custom_attributes: None,
                },
            )
            .await
            .unwrap();
        Fixture {
            tenant: t,
            batches: StockBatchService::new(shared.clone()),
            movements: StockMovementService::new(shared.clone()),
            locations: LocationService::new(shared),
            product,
        }
    }

    fn batch_req(product_id: ProductId, qty: i64) -> CreateStockBatchRequest {
        CreateStockBatchRequest {
            product_id,
            batch_code: "LOT-1".into(),
            quantity: Decimal::from(qty),
            unit: "stems".into(),
            warehouse_id: None,
            bin_id: None,
            custom_attributes: None,
            entry_date: None,
            expiry_date: None,
        }
    }

    fn movement(movement_type: MovementType, batch_id: StockBatchId, qty: i64) -> CreateStockMovementRequest {
        CreateStockMovementRequest {
            movement_type,
            batch_id,
            quantity: Decimal::from(qty),
            reference_id: None,
            notes: None,
            performed_at: None,
            destination_warehouse_id: None,
            destination_bin_id: None,
        }
    }

    #[tokio::test]
    async fn batch_requires_existing_product() {
        let f = fixture().await;
        let err = f.batches.create(&f.tenant, batch_req(ProductId::new(), 5)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "Product", .. }));
    }

    #[tokio::test]
    async fn bin_must_belong_to_warehouse() {
        let f = fixture().await;
        let wh = |name: &str| CreateWarehouseRequest {
            name: name.into(),
            address: None,
            latitude: None,
            longitude: None,
        };
        let north = f.locations.create_warehouse(&f.tenant, wh("North")).await.unwrap();
        let south = f.locations.create_warehouse(&f.tenant, wh("South")).await.unwrap();
        let bin = f
            .locations
            .create_bin(
                &f.tenant,
                north.id,
                CreateBinRequest {
                    code: "A-01".into(),
                    description: None,
                    capacity: None,
                },
            )
            .await
            .unwrap();

        let mut req = batch_req(f.product.id, 5);
        req.warehouse_id = Some(south.id);
        req.bin_id = Some(bin.id);
        let err = f.batches.create(&f.tenant, req.clone()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        req.warehouse_id = Some(north.id);
        let batch = f.batches.create(&f.tenant, req).await.unwrap();
        assert_eq!(batch.bin_id, Some(bin.id));
    }

    #[tokio::test]
    async fn movements_apply_to_batch() {
        let f = fixture().await;
        let batch = f.batches.create(&f.tenant, batch_req(f.product.id, 10)).await.unwrap();

        let m = f
            .movements
            .create(&f.tenant, movement(MovementType::Entry, batch.id, 5), Some("u1".into()))
            .await
            .unwrap();
        assert_eq!(m.balance_after, Decimal::from(15));
        f.movements
            .create(&f.tenant, movement(MovementType::Loss, batch.id, 15), None)
            .await
            .unwrap();

        let batch = f.batches.get(&f.tenant, batch.id).await.unwrap();
        assert_eq!(batch.quantity, Decimal::ZERO);
        assert_eq!(batch.status, BatchStatus::Depleted);

        let page = f
            .movements
            .by_type(&f.tenant, MovementType::Loss, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_elements, 1);
    }

    #[tokio::test]
    async fn overdraw_changes_nothing() {
        let f = fixture().await;
        let batch = f.batches.create(&f.tenant, batch_req(f.product.id, 3)).await.unwrap();
        let err = f
            .movements
            .create(&f.tenant, movement(MovementType::Sale, batch.id, 4), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invariant(_)));

        assert_eq!(f.batches.get(&f.tenant, batch.id).await.unwrap().quantity, Decimal::from(3));
        assert_eq!(f.movements.list(&f.tenant, PageRequest::default()).await.unwrap().total_elements, 0);
    }

    #[tokio::test]
    async fn transfer_needs_known_destination() {
        let f = fixture().await;
        let batch = f.batches.create(&f.tenant, batch_req(f.product.id, 3)).await.unwrap();
        let mut req = movement(MovementType::Transfer, batch.id, 3);
        req.destination_warehouse_id = Some(WarehouseId::new());
        let err = f.movements.create(&f.tenant, req, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "Warehouse", .. }));
    }

    #[tokio::test]
    async fn quantity_update_and_date_range() {
        let f = fixture().await;
        let batch = f.batches.create(&f.tenant, batch_req(f.product.id, 3)).await.unwrap();
        let depleted = f.batches.update_quantity(&f.tenant, batch.id, Decimal::ZERO).await.unwrap();
        assert_eq!(depleted.status, BatchStatus::Depleted);
        let restocked = f.batches.update_quantity(&f.tenant, batch.id, Decimal::from(8)).await.unwrap();
        assert_eq!(restocked.status, BatchStatus::Active);

        let err = f
            .batches
            .update_quantity(&f.tenant, batch.id, Decimal::from(-1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invariant(_)));

        let before = Utc::now() - chrono::Duration::seconds(1);
        f.movements
            .create(&f.tenant, movement(MovementType::Adjustment, batch.id, -2), None)
            .await
            .unwrap();
        let after = Utc::now() + chrono::Duration::seconds(1);
        let page = f
            .movements
            .by_date_range(&f.tenant, before, after, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_elements, 1);
        assert!(f.movements.by_date_range(&f.tenant, after, before, PageRequest::default()).await.is_err());
    }
}
