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
use demeter_users::{CreateUserRequest, UpdateUserRequest, User, UserId};

use crate::app::errors::ApiError;
use crate::app::extract::{Body, PageParams, Params, parse_id};
use crate::authz::require;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me", get(me))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

/// The caller's own profile, provisioned on first call.
pub async fn me(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<User>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    Ok(Json(services.users.me(principal.principal()).await?))
}

pub async fn list_users(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<User>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    Ok(Json(services.users.list(tenant.tenant_id(), page.request()?).await?))
}

pub async fn get_user(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: UserId = parse_id(&id)?;
    Ok(Json(services.users.get(tenant.tenant_id(), id).await?))
}

pub async fn create_user(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Body(body): Body<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let user = services.users.create(tenant.tenant_id(), body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let id: UserId = parse_id(&id)?;
    Ok(Json(services.users.update(tenant.tenant_id(), id, body).await?))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require(&tenant, &principal, Access::Delete)?;
    let id: UserId = parse_id(&id)?;
    services.users.delete(tenant.tenant_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
