//! Record trait: identity + storage metadata for tenant-owned entities.

use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

/// A persisted, tenant-owned entity.
///
/// Records never carry their tenant: the store partitions by tenant and the
/// tenant of a record is whatever tenant the enclosing transaction runs under.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Strongly-typed record identifier.
    type Id: Copy + Eq + core::fmt::Display + core::fmt::Debug + Into<Uuid> + Send + Sync;

    /// Storage collection (table) name.
    const KIND: &'static str;

    /// Human-readable entity name used in error messages.
    const ENTITY: &'static str;

    /// Field sets that must be unique within a tenant.
    ///
    /// Field names are the serialized (camelCase) names. A set whose fields
    /// are all non-null may not repeat; a null member disables the check,
    /// matching SQL unique-index semantics.
    const UNIQUE: &'static [&'static [&'static str]] = &[];

    /// Returns the record identifier.
    fn id(&self) -> Self::Id;
}
