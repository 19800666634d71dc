//! Tenant-scoped document store.
//!
//! Records are stored as JSON documents partitioned by `(tenant, kind)`. Every
//! service operation runs inside one [`Tx`]; nothing is visible to other
//! transactions until [`Tx::commit`], and dropping a `Tx` rolls it back.
//!
//! Two backends implement [`Store`]:
//! - [`InMemoryStore`] for development and tests (transactions are serialized)
//! - [`PgStore`] for PostgreSQL (transaction-local tenant setting plus RLS)

pub mod memory;
pub mod postgres;
mod query;
mod tx;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use demeter_core::TenantId;

pub use memory::InMemoryStore;
pub use postgres::PgStore;
pub use query::{Filter, Query};
pub use tx::Tx;

/// Unique field groups of a record kind (see `Record::UNIQUE`).
pub type UniqueKeys = &'static [&'static [&'static str]];

/// Store operation error.
///
/// These are infrastructure errors; domain failures never reach the store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One open transaction, bound to a single tenant.
///
/// Object-safe so backends can be swapped at runtime; typed access goes
/// through [`Tx`].
#[async_trait]
pub trait Session: Send {
    async fn get(&mut self, kind: &'static str, id: Uuid) -> StoreResult<Option<Value>>;

    /// Insert a new document. Fails with `Conflict` on a duplicate id or unique key.
    async fn insert(&mut self, kind: &'static str, id: Uuid, unique: UniqueKeys, data: Value) -> StoreResult<()>;

    /// Replace an existing document. Fails with `NotFound` when absent.
    async fn update(&mut self, kind: &'static str, id: Uuid, unique: UniqueKeys, data: Value) -> StoreResult<()>;

    /// Returns whether a document was removed.
    async fn delete(&mut self, kind: &'static str, id: Uuid) -> StoreResult<bool>;

    /// Matching documents in insertion order.
    async fn find(&mut self, kind: &'static str, query: &Query) -> StoreResult<Vec<Value>>;

    async fn count(&mut self, kind: &'static str, filters: &[Filter]) -> StoreResult<u64>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Open a transaction scoped to `tenant`.
    async fn begin(&self, tenant: &TenantId) -> StoreResult<Tx>;

    /// Readiness probe.
    async fn ping(&self) -> StoreResult<()>;

    fn backend(&self) -> &'static str;
}

/// `kind` and filter fields are spliced into SQL, so both must be plain identifiers.
pub(crate) fn check_identifier(name: &str) -> StoreResult<()> {
    let ok = !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidQuery(format!("'{name}' is not a valid identifier")))
    }
}
