//! Tenant configuration: which modules a tenant has licensed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::TenantId;

/// Functional module of the application, gated per tenant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Products,
    Inventory,
    Sales,
    Costs,
    Users,
    Locations,
    Packaging,
    Pricing,
    Analytics,
    Photos,
    Chatbot,
}

impl Module {
    pub const ALL: [Module; 11] = [
        Module::Products,
        Module::Inventory,
        Module::Sales,
        Module::Costs,
        Module::Users,
        Module::Locations,
        Module::Packaging,
        Module::Pricing,
        Module::Analytics,
        Module::Photos,
        Module::Chatbot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Products => "products",
            Module::Inventory => "inventory",
            Module::Sales => "sales",
            Module::Costs => "costs",
            Module::Users => "users",
            Module::Locations => "locations",
            Module::Packaging => "packaging",
            Module::Pricing => "pricing",
            Module::Analytics => "analytics",
            Module::Photos => "photos",
            Module::Chatbot => "chatbot",
        }
    }
}

impl core::fmt::Display for Module {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Module {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown module '{s}'")))
    }
}

/// Per-tenant configuration loaded from application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantConfig {
    pub id: TenantId,
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default = "all_modules")]
    pub enabled_modules: BTreeSet<Module>,
    /// Photo processing pipeline override (e.g. `FULL_PIPELINE`).
    #[serde(default)]
    pub pipeline: Option<String>,
}

fn all_modules() -> BTreeSet<Module> {
    Module::ALL.into_iter().collect()
}

impl TenantConfig {
    pub fn is_enabled(&self, module: Module) -> bool {
        self.enabled_modules.contains(&module)
    }
}
