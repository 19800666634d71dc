use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    routing::{get, post},
};

use demeter_auth::Access;
use demeter_core::Page;
use demeter_infra::Services;
use demeter_sales::{CreateSaleRequest, Sale, SaleId};

use crate::app::errors::ApiError;
use crate::app::extract::{Body, PageParams, Params, parse_id};
use crate::authz::require;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route("/:id", get(get_sale).delete(delete_sale))
        .route("/:id/complete", post(complete_sale))
        .route("/:id/cancel", post(cancel_sale))
}

pub async fn list_sales(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<Sale>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    Ok(Json(services.sales.list(tenant.tenant_id(), page.request()?).await?))
}

pub async fn get_sale(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Sale>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: SaleId = parse_id(&id)?;
    Ok(Json(services.sales.get(tenant.tenant_id(), id).await?))
}

pub async fn create_sale(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Body(body): Body<CreateSaleRequest>,
) -> Result<(StatusCode, Json<Sale>), ApiError> {
    require(&tenant, &principal, Access::Operate)?;
    let sale = services
        .sales
        .create(tenant.tenant_id(), body, Some(principal.user_id().to_string()))
        .await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// Draw stock FEFO and close the sale. All-or-nothing.
pub async fn complete_sale(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Sale>, ApiError> {
    require(&tenant, &principal, Access::Operate)?;
    let id: SaleId = parse_id(&id)?;
    let sale = services
        .sales
        .complete(tenant.tenant_id(), id, Some(principal.user_id().to_string()))
        .await?;
    Ok(Json(sale))
}

pub async fn cancel_sale(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Sale>, ApiError> {
    require(&tenant, &principal, Access::Operate)?;
    let id: SaleId = parse_id(&id)?;
    Ok(Json(services.sales.cancel(tenant.tenant_id(), id).await?))
}

pub async fn delete_sale(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require(&tenant, &principal, Access::Delete)?;
    let id: SaleId = parse_id(&id)?;
    services.sales.delete(tenant.tenant_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
