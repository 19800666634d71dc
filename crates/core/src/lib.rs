//! `demeter-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, pagination, record metadata, and
//! tenant configuration.

pub mod error;
pub mod id;
pub mod page;
pub mod record;
pub mod tenant;
pub mod validate;

pub use error::{DomainError, DomainResult};
pub use id::TenantId;
pub use page::{Page, PageRequest};
pub use record::Record;
pub use tenant::{Module, TenantConfig};
