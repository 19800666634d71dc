//! Infrastructure layer: storage backends, configuration, tenant registry,
//! the ML task client, and the application services built on them.

pub mod config;
pub mod services;
pub mod store;
pub mod tasks;
pub mod tenants;

pub use config::Settings;
pub use services::{ServiceError, ServiceResult, Services};
pub use store::{InMemoryStore, PgStore, Store, StoreError, StoreResult, Tx};
pub use tasks::{DispatchError, HttpTaskDispatcher, InMemoryTaskDispatcher, NoopTaskDispatcher, TaskDispatcher};
pub use tenants::TenantRegistry;
