//! Application settings.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `config/default.{toml,yaml,json}`
//! 3. `config/{DEMETER_ENV}` (`development` when unset)
//! 4. `config/local`
//! 5. environment variables `DEMETER__SECTION__KEY` (e.g. `DEMETER__SERVER__PORT=9000`)
//!
//! All files are optional.

use std::collections::BTreeSet;
use std::env;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use demeter_auth::Role;
use demeter_core::{Module, TenantConfig, TenantId};
use demeter_observability::{LogFormat, LoggingOptions};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub logging: LoggingOptions,
    pub photos: PhotoSettings,
    #[serde(default)]
    pub tenants: Vec<TenantSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Postgres URL; the in-memory store is used when absent.
    #[serde(default)]
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// When false, requests are trusted and the tenant comes from `X-Tenant-ID`.
    pub enabled: bool,
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    /// Roles of the development principal used while auth is disabled.
    #[serde(default = "default_dev_roles")]
    pub dev_roles: Vec<Role>,
}

fn default_dev_roles() -> Vec<Role> {
    vec![Role::Admin]
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSettings {
    /// Base URL of the ML worker; dispatch is disabled when absent.
    #[serde(default)]
    pub worker_url: Option<String>,
    #[serde(default)]
    pub worker_token: Option<String>,
    pub default_pipeline: String,
}

/// Tenant entry as written in configuration files (snake_case keys).
#[derive(Debug, Clone, Deserialize)]
pub struct TenantSettings {
    pub id: TenantId,
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub enabled_modules: Option<BTreeSet<Module>>,
    #[serde(default)]
    pub pipeline: Option<String>,
}

impl From<TenantSettings> for TenantConfig {
    fn from(value: TenantSettings) -> Self {
        TenantConfig {
            id: value.id,
            name: value.name,
            industry: value.industry,
            enabled_modules: value
                .enabled_modules
                .unwrap_or_else(|| Module::ALL.into_iter().collect()),
            pipeline: value.pipeline,
        }
    }
}

impl Settings {
    /// Load from files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let environment = env::var("DEMETER_ENV").unwrap_or_else(|_| "development".to_string());

        Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("DEMETER").prefix_separator("__").separator("__"))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.max_connections", 10)?
            .set_default("auth.enabled", true)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("photos.default_pipeline", demeter_photos::DEFAULT_PIPELINE)
    }

    /// Tenant registry built from the `tenants` section.
    pub fn tenant_configs(&self) -> Vec<TenantConfig> {
        self.tenants.iter().cloned().map(TenantConfig::from).collect()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Settings {
    /// Development settings: in-memory store, auth disabled, pretty logs.
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseSettings {
                url: None,
                max_connections: 10,
            },
            auth: AuthSettings {
                enabled: false,
                jwt_secret: None,
                issuer: None,
                audience: None,
                dev_roles: default_dev_roles(),
            },
            logging: LoggingOptions {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
            photos: PhotoSettings {
                worker_url: None,
                worker_token: None,
                default_pipeline: demeter_photos::DEFAULT_PIPELINE.to_string(),
            },
            tenants: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Settings {
        Settings::defaults()
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let settings = from_toml("");
        assert_eq!(settings.bind_address(), "0.0.0.0:8080");
        assert!(settings.database.url.is_none());
        assert!(settings.auth.enabled);
        assert_eq!(settings.auth.dev_roles, vec![Role::Admin]);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.photos.default_pipeline, "DETECTION");
        assert!(settings.tenants.is_empty());
    }

    #[test]
    fn tenants_and_overrides_are_read() {
        let settings = from_toml(
            r#"
            [server]
            port = 9000

            [database]
            url = "postgres://demeter@localhost/demeter"

            [auth]
            enabled = false
            dev_roles = ["WORKER"]

            [[tenants]]
            id = "tenant-alpha"
            name = "Alpha Nursery"
            enabled_modules = ["products", "inventory"]
            pipeline = "FULL_PIPELINE"

            [[tenants]]
            id = "tenant-beta"
            name = "Beta Farms"
            "#,
        );
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.database.url.as_deref(), Some("postgres://demeter@localhost/demeter"));
        assert_eq!(settings.auth.dev_roles, vec![Role::Worker]);

        let tenants = settings.tenant_configs();
        assert_eq!(tenants.len(), 2);
        assert!(tenants[0].is_enabled(Module::Inventory));
        assert!(!tenants[0].is_enabled(Module::Photos));
        assert_eq!(tenants[0].pipeline.as_deref(), Some("FULL_PIPELINE"));
        assert!(Module::ALL.iter().all(|m| tenants[1].is_enabled(*m)));
    }

    #[test]
    fn development_default_has_auth_disabled() {
        let settings = Settings::default();
        assert!(!settings.auth.enabled);
        assert!(settings.database.url.is_none());
    }
}
