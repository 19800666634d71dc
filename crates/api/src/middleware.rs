use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use demeter_auth::{JwtValidator, Principal, Role};
use demeter_core::{Module, TenantId};
use demeter_infra::TenantRegistry;

use crate::app::errors::ApiError;
use crate::context::{PrincipalContext, TenantContext};

pub const TENANT_HEADER: &str = "x-tenant-id";

#[derive(Clone)]
pub struct AuthState {
    /// `None` disables authentication: the tenant comes from `X-Tenant-ID`
    /// and every request runs as the development principal.
    pub jwt: Option<Arc<dyn JwtValidator>>,
    pub dev_roles: Vec<Role>,
}

/// Resolve the tenant and principal of a request.
///
/// With authentication on, the token's `tenant_id` claim is authoritative and
/// an `X-Tenant-ID` header naming another tenant is refused.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let requested = tenant_header(req.headers())?;

    let principal = match &state.jwt {
        Some(jwt) => {
            let token = extract_bearer(req.headers())?;
            let claims = jwt
                .validate(token, Utc::now())
                .map_err(|e| ApiError::unauthorized(e.to_string()))?;
            let principal = Principal::from_claims(&claims);
            if requested.as_ref().is_some_and(|t| t != &principal.tenant_id) {
                tracing::warn!(
                    token_tenant = %principal.tenant_id,
                    "X-Tenant-ID header does not match the token tenant"
                );
                return Err(ApiError::forbidden("X-Tenant-ID does not match the authenticated tenant"));
            }
            principal
        }
        None => {
            let tenant = requested.ok_or_else(|| ApiError::bad_request("X-Tenant-ID header is required"))?;
            Principal::development(tenant, state.dev_roles.clone())
        }
    };

    req.extensions_mut()
        .insert(TenantContext::new(principal.tenant_id.clone()));
    req.extensions_mut().insert(PrincipalContext::new(principal));

    Ok(next.run(req).await)
}

fn tenant_header(headers: &HeaderMap) -> Result<Option<TenantId>, ApiError> {
    let Some(value) = headers.get(TENANT_HEADER) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::bad_request("X-Tenant-ID is not valid text"))?;
    TenantId::parse(value.trim()).map(Some).map_err(ApiError::from)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;

    let header = header
        .to_str()
        .map_err(|_| ApiError::unauthorized("malformed authorization header"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("authorization scheme must be Bearer"))?
        .trim();
    if token.is_empty() {
        return Err(ApiError::unauthorized("missing bearer token"));
    }

    Ok(token)
}

/// Per-route-group gate on the tenant's licensed modules.
#[derive(Clone)]
pub struct ModuleGate {
    pub module: Module,
    pub tenants: TenantRegistry,
}

pub async fn module_gate(State(gate): State<ModuleGate>, req: Request, next: Next) -> Result<Response, ApiError> {
    let tenant = req
        .extensions()
        .get::<TenantContext>()
        .ok_or_else(|| ApiError::unauthorized("missing tenant context"))?;
    if !gate.tenants.is_enabled(tenant.tenant_id(), gate.module) {
        return Err(ApiError::forbidden(format!(
            "module '{}' is not enabled for this tenant",
            gate.module
        )));
    }
    Ok(next.run(req).await)
}
