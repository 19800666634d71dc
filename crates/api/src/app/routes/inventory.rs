use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    routing::{get, put},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use demeter_auth::Access;
use demeter_core::Page;
use demeter_infra::Services;
use demeter_inventory::{
    BatchStatus, CreateStockBatchRequest, CreateStockMovementRequest, MovementType, StockBatch, StockBatchId,
    StockMovement, StockMovementId, UpdateStockBatchRequest,
};
use demeter_locations::WarehouseId;
use demeter_products::ProductId;

use crate::app::errors::ApiError;
use crate::app::extract::{Body, PageParams, Params, parse_id};
use crate::authz::require;
use crate::context::{PrincipalContext, TenantContext};

pub fn batch_router() -> Router {
    Router::new()
        .route("/", get(list_batches).post(create_batch))
        .route("/by-product/:product_id", get(batches_by_product))
        .route("/by-warehouse/:warehouse_id", get(batches_by_warehouse))
        .route("/by-status/:status", get(batches_by_status))
        .route("/:id", get(get_batch).put(update_batch).delete(delete_batch))
        .route("/:id/quantity", put(update_batch_quantity))
}

pub fn movement_router() -> Router {
    Router::new()
        .route("/", get(list_movements).post(create_movement))
        .route("/by-type/:movement_type", get(movements_by_type))
        .route("/by-date-range", get(movements_by_date_range))
        .route("/by-reference/:reference_id", get(movements_by_reference))
        .route("/:id", get(get_movement))
}

#[derive(Debug, Deserialize)]
pub struct QuantityUpdate {
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

pub async fn list_batches(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<StockBatch>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    Ok(Json(services.batches.list(tenant.tenant_id(), page.request()?).await?))
}

pub async fn batches_by_product(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(product_id): Path<String>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<StockBatch>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let product_id: ProductId = parse_id(&product_id)?;
    Ok(Json(
        services
            .batches
            .by_product(tenant.tenant_id(), product_id, page.request()?)
            .await?,
    ))
}

pub async fn batches_by_warehouse(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(warehouse_id): Path<String>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<StockBatch>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let warehouse_id: WarehouseId = parse_id(&warehouse_id)?;
    Ok(Json(
        services
            .batches
            .by_warehouse(tenant.tenant_id(), warehouse_id, page.request()?)
            .await?,
    ))
}

pub async fn batches_by_status(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(status): Path<String>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<StockBatch>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let status: BatchStatus = parse_id(&status)?;
    Ok(Json(
        services
            .batches
            .by_status(tenant.tenant_id(), status, page.request()?)
            .await?,
    ))
}

pub async fn get_batch(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<StockBatch>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: StockBatchId = parse_id(&id)?;
    Ok(Json(services.batches.get(tenant.tenant_id(), id).await?))
}

pub async fn create_batch(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Body(body): Body<CreateStockBatchRequest>,
) -> Result<(StatusCode, Json<StockBatch>), ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let batch = services.batches.create(tenant.tenant_id(), body).await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

pub async fn update_batch(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<UpdateStockBatchRequest>,
) -> Result<Json<StockBatch>, ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let id: StockBatchId = parse_id(&id)?;
    Ok(Json(services.batches.update(tenant.tenant_id(), id, body).await?))
}

pub async fn update_batch_quantity(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<QuantityUpdate>,
) -> Result<Json<StockBatch>, ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let id: StockBatchId = parse_id(&id)?;
    Ok(Json(
        services
            .batches
            .update_quantity(tenant.tenant_id(), id, body.quantity)
            .await?,
    ))
}

pub async fn delete_batch(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require(&tenant, &principal, Access::Delete)?;
    let id: StockBatchId = parse_id(&id)?;
    services.batches.delete(tenant.tenant_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_movements(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<StockMovement>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    Ok(Json(services.movements.list(tenant.tenant_id(), page.request()?).await?))
}

pub async fn get_movement(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<StockMovement>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: StockMovementId = parse_id(&id)?;
    Ok(Json(services.movements.get(tenant.tenant_id(), id).await?))
}

pub async fn movements_by_type(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(movement_type): Path<String>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<StockMovement>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let movement_type: MovementType = parse_id(&movement_type)?;
    Ok(Json(
        services
            .movements
            .by_type(tenant.tenant_id(), movement_type, page.request()?)
            .await?,
    ))
}

pub async fn movements_by_date_range(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Params(range): Params<DateRange>,
) -> Result<Json<Page<StockMovement>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let page = PageParams {
        page: range.page,
        size: range.size,
    };
    Ok(Json(
        services
            .movements
            .by_date_range(tenant.tenant_id(), range.from, range.to, page.request()?)
            .await?,
    ))
}

pub async fn movements_by_reference(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(reference_id): Path<String>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<StockMovement>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let reference_id: Uuid = reference_id
        .parse()
        .map_err(|e| ApiError::bad_request(format!("referenceId: {e}")))?;
    Ok(Json(
        services
            .movements
            .by_reference(tenant.tenant_id(), reference_id, page.request()?)
            .await?,
    ))
}

/// Record a movement and apply it to its batch.
pub async fn create_movement(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Body(body): Body<CreateStockMovementRequest>,
) -> Result<(StatusCode, Json<StockMovement>), ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let movement = services
        .movements
        .create(tenant.tenant_id(), body, Some(principal.user_id().to_string()))
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}
