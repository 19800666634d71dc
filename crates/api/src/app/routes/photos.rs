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
use demeter_photos::{
    Classification, CreateImageRequest, CreateSessionRequest, Detection, Estimation, Image, ImageId,
    ImageResultsRequest, PhotoSession, PhotoSessionId, RecordedResults, SessionProgress,
};

use crate::app::errors::ApiError;
use crate::app::extract::{Body, PageParams, Params, parse_id};
use crate::authz::require;
use crate::context::{PrincipalContext, TenantContext};

pub fn session_router() -> Router {
    Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route("/:id", get(get_session).delete(delete_session))
        .route("/:id/status", get(session_status))
        .route("/:id/images", get(list_images).post(upload_image))
        .route("/:id/estimations", get(estimations))
}

pub fn image_router() -> Router {
    Router::new()
        .route("/:id", get(get_image))
        .route("/:id/detections", get(detections))
        .route("/:id/classifications", get(classifications))
        .route("/:id/results", post(record_results))
}

pub async fn list_sessions(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<PhotoSession>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    Ok(Json(
        services
            .photos
            .list_sessions(tenant.tenant_id(), page.request()?)
            .await?,
    ))
}

pub async fn get_session(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<PhotoSession>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: PhotoSessionId = parse_id(&id)?;
    Ok(Json(services.photos.get_session(tenant.tenant_id(), id).await?))
}

pub async fn session_status(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<SessionProgress>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: PhotoSessionId = parse_id(&id)?;
    Ok(Json(services.photos.progress(tenant.tenant_id(), id).await?))
}

pub async fn create_session(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Body(body): Body<CreateSessionRequest>,
) -> Result<(StatusCode, Json<PhotoSession>), ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let session = services
        .photos
        .create_session(tenant.tenant_id(), body, Some(principal.user_id().to_string()))
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn delete_session(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require(&tenant, &principal, Access::Delete)?;
    let id: PhotoSessionId = parse_id(&id)?;
    services.photos.delete_session(tenant.tenant_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_images(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Image>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: PhotoSessionId = parse_id(&id)?;
    Ok(Json(services.photos.list_images(tenant.tenant_id(), id).await?))
}

/// Register an uploaded image and queue it for processing.
pub async fn upload_image(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<CreateImageRequest>,
) -> Result<(StatusCode, Json<Image>), ApiError> {
    require(&tenant, &principal, Access::Operate)?;
    let id: PhotoSessionId = parse_id(&id)?;
    let image = services.photos.add_image(tenant.tenant_id(), id, body).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

pub async fn estimations(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Estimation>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: PhotoSessionId = parse_id(&id)?;
    Ok(Json(services.photos.estimations(tenant.tenant_id(), id).await?))
}

pub async fn get_image(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Image>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: ImageId = parse_id(&id)?;
    Ok(Json(services.photos.get_image(tenant.tenant_id(), id).await?))
}

pub async fn detections(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Detection>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: ImageId = parse_id(&id)?;
    Ok(Json(services.photos.detections(tenant.tenant_id(), id).await?))
}

pub async fn classifications(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Classification>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: ImageId = parse_id(&id)?;
    Ok(Json(services.photos.classifications(tenant.tenant_id(), id).await?))
}

/// Results callback from the ML worker.
pub async fn record_results(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<ImageResultsRequest>,
) -> Result<Json<RecordedResults>, ApiError> {
    require(&tenant, &principal, Access::Operate)?;
    let id: ImageId = parse_id(&id)?;
    Ok(Json(services.photos.record_results(tenant.tenant_id(), id, body).await?))
}
