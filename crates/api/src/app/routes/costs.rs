use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    routing::get,
};

use demeter_auth::Access;
use demeter_core::Page;
use demeter_costs::{Cost, CostId, CreateCostRequest, UpdateCostRequest};
use demeter_infra::Services;
use demeter_inventory::StockBatchId;
use demeter_products::ProductId;

use crate::app::errors::ApiError;
use crate::app::extract::{Body, PageParams, Params, parse_id};
use crate::authz::require;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_costs).post(create_cost))
        .route("/product/:product_id", get(costs_by_product))
        .route("/batch/:batch_id", get(costs_by_batch))
        .route("/:id", get(get_cost).put(update_cost).delete(delete_cost))
}

pub async fn list_costs(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<Cost>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    Ok(Json(services.costs.list(tenant.tenant_id(), page.request()?).await?))
}

pub async fn costs_by_product(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(product_id): Path<String>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<Cost>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let product_id: ProductId = parse_id(&product_id)?;
    Ok(Json(
        services
            .costs
            .by_product(tenant.tenant_id(), product_id, page.request()?)
            .await?,
    ))
}

pub async fn costs_by_batch(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(batch_id): Path<String>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<Cost>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let batch_id: StockBatchId = parse_id(&batch_id)?;
    Ok(Json(
        services
            .costs
            .by_batch(tenant.tenant_id(), batch_id, page.request()?)
            .await?,
    ))
}

pub async fn get_cost(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Cost>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: CostId = parse_id(&id)?;
    Ok(Json(services.costs.get(tenant.tenant_id(), id).await?))
}

pub async fn create_cost(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Body(body): Body<CreateCostRequest>,
) -> Result<(StatusCode, Json<Cost>), ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let cost = services.costs.create(tenant.tenant_id(), body).await?;
    Ok((StatusCode::CREATED, Json(cost)))
}

pub async fn update_cost(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<UpdateCostRequest>,
) -> Result<Json<Cost>, ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let id: CostId = parse_id(&id)?;
    Ok(Json(services.costs.update(tenant.tenant_id(), id, body).await?))
}

pub async fn delete_cost(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require(&tenant, &principal, Access::Delete)?;
    let id: CostId = parse_id(&id)?;
    services.costs.delete(tenant.tenant_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
