//! Access checks at the handler boundary, before any service call.

use demeter_auth::{Access, authorize};

use crate::app::errors::ApiError;
use crate::context::{PrincipalContext, TenantContext};

/// Require `access` for the current principal within the request tenant.
pub fn require(tenant: &TenantContext, principal: &PrincipalContext, access: Access) -> Result<(), ApiError> {
    authorize(principal.principal(), tenant.tenant_id(), access).map_err(ApiError::from)
}
