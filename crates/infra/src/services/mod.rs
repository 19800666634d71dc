//! Application services.
//!
//! Each public operation opens one tenant-scoped [`Tx`](crate::store::Tx), runs
//! domain logic against the loaded records, writes the results, and commits.
//! Any error before the commit drops the transaction, which discards every
//! change made so far.

pub mod analytics;
pub mod chat;
pub mod costs;
pub mod inventory;
pub mod locations;
pub mod packaging;
pub mod photos;
pub mod pricing;
pub mod products;
pub mod sales;
pub mod users;

use std::sync::Arc;

use thiserror::Error;

use demeter_core::DomainError;

use crate::store::{Store, StoreError};
use crate::tasks::TaskDispatcher;
use crate::tenants::TenantRegistry;

pub use analytics::AnalyticsService;
pub use chat::{ChatExchange, ChatService};
pub use costs::CostService;
pub use inventory::{StockBatchService, StockMovementService};
pub use locations::LocationService;
pub use packaging::PackagingService;
pub use photos::PhotoService;
pub use pricing::PricingService;
pub use products::{CategoryService, ProductService};
pub use sales::SaleService;
pub use users::UserService;

/// Application-layer error.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("forbidden")]
    Forbidden,

    #[error(transparent)]
    Store(StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::InvariantViolation(msg) => ServiceError::Invariant(msg),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Store(other),
        }
    }
}

/// Every service, sharing one store.
#[derive(Clone)]
pub struct Services {
    pub products: ProductService,
    pub categories: CategoryService,
    pub batches: StockBatchService,
    pub movements: StockMovementService,
    pub sales: SaleService,
    pub costs: CostService,
    pub users: UserService,
    pub locations: LocationService,
    pub packaging: PackagingService,
    pub pricing: PricingService,
    pub analytics: AnalyticsService,
    pub photos: PhotoService,
    pub chat: ChatService,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, dispatcher: Arc<dyn TaskDispatcher>, tenants: TenantRegistry) -> Self {
        Self {
            products: ProductService::new(store.clone()),
            categories: CategoryService::new(store.clone()),
            batches: StockBatchService::new(store.clone()),
            movements: StockMovementService::new(store.clone()),
            sales: SaleService::new(store.clone()),
            costs: CostService::new(store.clone()),
            users: UserService::new(store.clone()),
            locations: LocationService::new(store.clone()),
            packaging: PackagingService::new(store.clone()),
            pricing: PricingService::new(store.clone()),
            analytics: AnalyticsService::new(store.clone()),
            photos: PhotoService::new(store.clone(), dispatcher, tenants),
            chat: ChatService::new(store),
        }
    }
}
