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
use demeter_products::{
    Category, CategoryId, CreateCategoryRequest, CreateProductRequest, Product, ProductId, UpdateCategoryRequest,
    UpdateProductRequest,
};

use crate::app::errors::ApiError;
use crate::app::extract::{Body, PageParams, Params, parse_id};
use crate::authz::require;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/sku/:sku", get(get_product_by_sku))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
}

pub fn category_router() -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:id", get(get_category).put(update_category).delete(delete_category))
}

pub async fn list_products(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<Product>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    Ok(Json(services.products.list(tenant.tenant_id(), page.request()?).await?))
}

pub async fn get_product(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: ProductId = parse_id(&id)?;
    Ok(Json(services.products.get(tenant.tenant_id(), id).await?))
}

pub async fn get_product_by_sku(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(sku): Path<String>,
) -> Result<Json<Product>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    Ok(Json(services.products.get_by_sku(tenant.tenant_id(), &sku).await?))
}

pub async fn create_product(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Body(body): Body<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let product = services.products.create(tenant.tenant_id(), body).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<UpdateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let id: ProductId = parse_id(&id)?;
    Ok(Json(services.products.update(tenant.tenant_id(), id, body).await?))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require(&tenant, &principal, Access::Delete)?;
    let id: ProductId = parse_id(&id)?;
    services.products.delete(tenant.tenant_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_categories(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<Category>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    Ok(Json(services.categories.list(tenant.tenant_id(), page.request()?).await?))
}

pub async fn get_category(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Category>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: CategoryId = parse_id(&id)?;
    Ok(Json(services.categories.get(tenant.tenant_id(), id).await?))
}

pub async fn create_category(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Body(body): Body<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let category = services.categories.create(tenant.tenant_id(), body).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<UpdateCategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    require(&tenant, &principal, Access::Write)?;
    let id: CategoryId = parse_id(&id)?;
    Ok(Json(services.categories.update(tenant.tenant_id(), id, body).await?))
}

pub async fn delete_category(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require(&tenant, &principal, Access::Delete)?;
    let id: CategoryId = parse_id(&id)?;
    services.categories.delete(tenant.tenant_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
