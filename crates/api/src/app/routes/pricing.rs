use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    routing::get,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use demeter_auth::Access;
use demeter_core::Page;
use demeter_infra::Services;
use demeter_pricing::{CreatePriceListRequest, PriceList, PriceListId, ResolvedPrice, UpdatePriceListRequest};
use demeter_products::ProductId;

use crate::app::errors::ApiError;
use crate::app::extract::{Body, PageParams, Params, parse_id};
use crate::authz::require;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_price_lists).post(create_price_list))
        .route("/:id", get(get_price_list).put(update_price_list).delete(delete_price_list))
}

pub fn resolve_router() -> Router {
    Router::new().route("/resolve", get(resolve_price))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveParams {
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub date: Option<NaiveDate>,
}

pub async fn list_price_lists(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<PriceList>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    Ok(Json(services.pricing.list(tenant.tenant_id(), page.request()?).await?))
}

pub async fn get_price_list(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<PriceList>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: PriceListId = parse_id(&id)?;
    Ok(Json(services.pricing.get(tenant.tenant_id(), id).await?))
}

pub async fn create_price_list(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Body(body): Body<CreatePriceListRequest>,
) -> Result<(StatusCode, Json<PriceList>), ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let list = services.pricing.create(tenant.tenant_id(), body).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

pub async fn update_price_list(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<UpdatePriceListRequest>,
) -> Result<Json<PriceList>, ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let id: PriceListId = parse_id(&id)?;
    Ok(Json(services.pricing.update(tenant.tenant_id(), id, body).await?))
}

pub async fn delete_price_list(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require(&tenant, &principal, Access::Delete)?;
    let id: PriceListId = parse_id(&id)?;
    services.pricing.delete(tenant.tenant_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /prices/resolve?productId=&quantity=&date=`
pub async fn resolve_price(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Params(params): Params<ResolveParams>,
) -> Result<Json<ResolvedPrice>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    Ok(Json(
        services
            .pricing
            .resolve(tenant.tenant_id(), params.product_id, params.quantity, params.date)
            .await?,
    ))
}
