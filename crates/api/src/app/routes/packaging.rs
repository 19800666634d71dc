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
use demeter_packaging::{CreatePackagingRequest, Packaging, PackagingId, UpdatePackagingRequest};

use crate::app::errors::ApiError;
use crate::app::extract::{Body, PageParams, Params, parse_id};
use crate::authz::require;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_packaging).post(create_packaging))
        .route("/:id", get(get_packaging).put(update_packaging).delete(delete_packaging))
}

pub async fn list_packaging(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<Packaging>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    Ok(Json(services.packaging.list(tenant.tenant_id(), page.request()?).await?))
}

pub async fn get_packaging(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Packaging>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: PackagingId = parse_id(&id)?;
    Ok(Json(services.packaging.get(tenant.tenant_id(), id).await?))
}

pub async fn create_packaging(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Body(body): Body<CreatePackagingRequest>,
) -> Result<(StatusCode, Json<Packaging>), ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let packaging = services.packaging.create(tenant.tenant_id(), body).await?;
    Ok((StatusCode::CREATED, Json(packaging)))
}

pub async fn update_packaging(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<UpdatePackagingRequest>,
) -> Result<Json<Packaging>, ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let id: PackagingId = parse_id(&id)?;
    Ok(Json(services.packaging.update(tenant.tenant_id(), id, body).await?))
}

pub async fn delete_packaging(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require(&tenant, &principal, Access::Delete)?;
    let id: PackagingId = parse_id(&id)?;
    services.packaging.delete(tenant.tenant_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
