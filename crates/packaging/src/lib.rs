//! Packaging catalog.

pub mod packaging;

pub use packaging::{CreatePackagingRequest, Packaging, PackagingId, PackagingType, UpdatePackagingRequest};
