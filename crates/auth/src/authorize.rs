use serde::Serialize;
use thiserror::Error;

use demeter_core::TenantId;

use crate::{Principal, Role};

/// Access level required by an operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// Queries.
    Read,
    /// Day-to-day floor operations: recording sales, uploading photos, chatting.
    Operate,
    /// Creating and changing master data.
    Write,
    /// Removing records.
    Delete,
}

impl Access {
    pub fn allowed_roles(self) -> &'static [Role] {
        match self {
            Access::Read => &[Role::Admin, Role::Supervisor, Role::Worker, Role::Viewer],
            Access::Operate => &[Role::Admin, Role::Supervisor, Role::Worker],
            Access::Write => &[Role::Admin, Role::Supervisor],
            Access::Delete => &[Role::Admin],
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: {0:?} access requires one of {1:?}")]
    Forbidden(Access, &'static [Role]),
}

/// Authorize a principal for an access level within the request tenant.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, tenant: &TenantId, access: Access) -> Result<(), AuthzError> {
    if &principal.tenant_id != tenant {
        return Err(AuthzError::TenantMismatch);
    }

    let allowed = access.allowed_roles();
    if principal.roles.iter().any(|r| allowed.contains(r)) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(access, allowed))
    }
}
