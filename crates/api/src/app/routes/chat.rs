use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    routing::get,
};

use demeter_auth::Access;
use demeter_chatbot::{
    ChatMessage, ChatSession, ChatSessionId, CreateChatSessionRequest, PostMessageRequest, UpdateChatSessionRequest,
};
use demeter_core::Page;
use demeter_infra::Services;
use demeter_infra::services::ChatExchange;

use crate::app::errors::ApiError;
use crate::app::extract::{Body, PageParams, Params, parse_id};
use crate::authz::require;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/:id", get(get_session).put(rename_session).delete(delete_session))
        .route("/sessions/:id/messages", get(list_messages).post(post_message))
}

pub async fn list_sessions(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Params(page): Params<PageParams>,
) -> Result<Json<Page<ChatSession>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    Ok(Json(
        services
            .chat
            .list_own(principal.principal(), page.request()?)
            .await?,
    ))
}

pub async fn create_session(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    body: Option<Body<CreateChatSessionRequest>>,
) -> Result<(StatusCode, Json<ChatSession>), ApiError> {
    require(&tenant, &principal, Access::Operate)?;
    let req = body.map(|Body(req)| req).unwrap_or_default();
    let session = services.chat.create(principal.principal(), req).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn get_session(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<ChatSession>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: ChatSessionId = parse_id(&id)?;
    Ok(Json(services.chat.get(principal.principal(), id).await?))
}

pub async fn rename_session(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<UpdateChatSessionRequest>,
) -> Result<Json<ChatSession>, ApiError> {
    require(&tenant, &principal, Access::Operate)?;
    let id: ChatSessionId = parse_id(&id)?;
    Ok(Json(services.chat.rename(principal.principal(), id, body).await?))
}

pub async fn delete_session(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require(&tenant, &principal, Access::Operate)?;
    let id: ChatSessionId = parse_id(&id)?;
    services.chat.delete(principal.principal(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_messages(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    require(&tenant, &principal, Access::Read)?;
    let id: ChatSessionId = parse_id(&id)?;
    Ok(Json(services.chat.messages(principal.principal(), id).await?))
}

/// Post a message and get the assistant's answer back.
pub async fn post_message(
    Extension(services): Extension<Arc<Services>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<PostMessageRequest>,
) -> Result<(StatusCode, Json<ChatExchange>), ApiError> {
    require(&tenant, &principal, Access::Operate)?;
    let id: ChatSessionId = parse_id(&id)?;
    let exchange = services.chat.post(principal.principal(), id, body).await?;
    Ok((StatusCode::CREATED, Json(exchange)))
}
