//! Configured tenants and their licensed modules.

use std::collections::HashMap;
use std::sync::Arc;

use demeter_core::{Module, TenantConfig, TenantId};

/// Read-only lookup of [`TenantConfig`] by id.
///
/// Tenants without an entry are unrestricted: every module is enabled and the
/// default photo pipeline applies.
#[derive(Debug, Clone, Default)]
pub struct TenantRegistry {
    tenants: Arc<HashMap<TenantId, TenantConfig>>,
}

impl TenantRegistry {
    pub fn new(configs: impl IntoIterator<Item = TenantConfig>) -> Self {
        let tenants = configs.into_iter().map(|c| (c.id.clone(), c)).collect();
        Self {
            tenants: Arc::new(tenants),
        }
    }

    pub fn get(&self, tenant: &TenantId) -> Option<&TenantConfig> {
        self.tenants.get(tenant)
    }

    pub fn is_enabled(&self, tenant: &TenantId, module: Module) -> bool {
        self.get(tenant).is_none_or(|c| c.is_enabled(module))
    }

    pub fn pipeline(&self, tenant: &TenantId) -> Option<&str> {
        self.get(tenant).and_then(|c| c.pipeline.as_deref())
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}
