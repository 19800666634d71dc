use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    routing::get,
};

use demeter_auth::Access;
use demeter_core::Page;
use demeter_infra::Services;
use demeter_locations::{
    CreateBinRequest, CreateWarehouseRequest, StorageBin, StorageBinId, UpdateBinRequest, UpdateWarehouseRequest,
    Warehouse, WarehouseId,
};

use crate::app::errors::ApiError;
use crate::app::extract::{Body, PageParams, Params, parse_id};
use crate::authz::require;
use crate::context::{PrincipalContext, TenantContext};

pub fn warehouse_router() -> Router {
    Router::new()
        .route("/", get(list_warehouses).post(create_warehouse))
        .route("/:id", get(get_warehouse).put(update_warehouse).delete(delete_warehouse))
        .route("/:id/bins", get(list_bins).post(create_bin))
}

pub fn bin_router() -> Router {
    Router::new().route("/:id", get(get_bin).put(update_bin).delete(delete_bin))
}

pub async fn list_warehouses(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<Warehouse>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    Ok(Json(
        services
            .locations
            .list_warehouses(tenant.tenant_id(), page.request()?)
            .await?,
    ))
}

pub async fn get_warehouse(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Warehouse>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: WarehouseId = parse_id(&id)?;
    Ok(Json(services.locations.get_warehouse(tenant.tenant_id(), id).await?))
}

pub async fn create_warehouse(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Body(body): Body<CreateWarehouseRequest>,
) -> Result<(StatusCode, Json<Warehouse>), ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let warehouse = services.locations.create_warehouse(tenant.tenant_id(), body).await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}

pub async fn update_warehouse(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<UpdateWarehouseRequest>,
) -> Result<Json<Warehouse>, ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let id: WarehouseId = parse_id(&id)?;
    Ok(Json(
        services
            .locations
            .update_warehouse(tenant.tenant_id(), id, body)
            .await?,
    ))
}

pub async fn delete_warehouse(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require(&tenant, &principal, Access::Delete)?;
    let id: WarehouseId = parse_id(&id)?;
    services.locations.delete_warehouse(tenant.tenant_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_bins(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(warehouse_id): Path<String>,
) -> Result<Json<Vec<StorageBin>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let warehouse_id: WarehouseId = parse_id(&warehouse_id)?;
    Ok(Json(services.locations.list_bins(tenant.tenant_id(), warehouse_id).await?))
}

pub async fn create_bin(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(warehouse_id): Path<String>,
    Body(body): Body<CreateBinRequest>,
) -> Result<(StatusCode, Json<StorageBin>), ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let warehouse_id: WarehouseId = parse_id(&warehouse_id)?;
    let bin = services
        .locations
        .create_bin(tenant.tenant_id(), warehouse_id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(bin)))
}

pub async fn get_bin(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<StorageBin>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: StorageBinId = parse_id(&id)?;
    Ok(Json(services.locations.get_bin(tenant.tenant_id(), id).await?))
}

pub async fn update_bin(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<UpdateBinRequest>,
) -> Result<Json<StorageBin>, ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let id: StorageBinId = parse_id(&id)?;
    Ok(Json(services.locations.update_bin(tenant.tenant_id(), id, body).await?))
}

pub async fn delete_bin(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require(&tenant, &principal, Access::Delete)?;
    let id: StorageBinId = parse_id(&id)?;
    services.locations.delete_bin(tenant.tenant_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
