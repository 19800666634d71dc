use serde::Serialize;

use demeter_core::TenantId;

use crate::{JwtClaims, Role};

/// The authenticated caller of a request ("current user").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Identity-provider subject.
    pub user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub tenant_id: TenantId,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn from_claims(claims: &JwtClaims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            email: claims.email.clone(),
            name: claims.name.clone(),
            tenant_id: claims.tenant_id.clone(),
            roles: claims.roles(),
        }
    }

    /// Principal used when authentication is disabled (local development).
    pub fn development(tenant_id: TenantId, roles: Vec<Role>) -> Self {
        Self {
            user_id: "dev-user".to_string(),
            email: Some("dev@localhost".to_string()),
            name: Some("Development User".to_string()),
            tenant_id,
            roles,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Most privileged role held, if any.
    pub fn highest_role(&self) -> Option<Role> {
        self.roles.iter().min().copied()
    }
}
