use std::sync::Arc;

use axum::{Extension, Json, Router, routing::get};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use demeter_analytics::{CostSummary, DEFAULT_EXPIRY_WINDOW_DAYS, ExpiringBatch, SalesSummary, StockSummary};
use demeter_auth::Access;
use demeter_infra::Services;

use crate::app::errors::ApiError;
use crate::app::extract::Params;
use crate::authz::require;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/stock", get(stock))
        .route("/expiring", get(expiring))
        .route("/sales", get(sales))
        .route("/costs", get(costs))
}

#[derive(Debug, Deserialize)]
pub struct ExpiringParams {
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SalesParams {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub async fn stock(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<StockSummary>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    Ok(Json(services.analytics.stock(tenant.tenant_id()).await?))
}

/// `GET /analytics/expiring?days=N` (default 30)
pub async fn expiring(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Params(params): Params<ExpiringParams>,
) -> Result<Json<Vec<ExpiringBatch>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let days = params.days.unwrap_or(DEFAULT_EXPIRY_WINDOW_DAYS);
    Ok(Json(services.analytics.expiring(tenant.tenant_id(), days).await?))
}

pub async fn sales(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Params(params): Params<SalesParams>,
) -> Result<Json<SalesSummary>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    Ok(Json(
        services
            .analytics
            .sales(tenant.tenant_id(), params.from, params.to)
            .await?,
    ))
}

pub async fn costs(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<CostSummary>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    Ok(Json(services.analytics.costs(tenant.tenant_id()).await?))
}
