use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use demeter_core::{DomainResult, Record, uuid_id, validate};

use crate::WarehouseId;

uuid_id!(StorageBinId, "StorageBinId");

/// A storage position (bin, bench, shelf) inside a warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageBin {
    pub id: StorageBinId,
    pub warehouse_id: WarehouseId,
    pub code: String,
    pub description: Option<String>,
    pub capacity: Option<Decimal>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for StorageBin {
    type Id = StorageBinId;
    const KIND: &'static str = "storage_bins";
    const ENTITY: &'static str = "StorageBin";
    const UNIQUE: &'static [&'static [&'static str]] = &[&["warehouseId", "code"]];

    fn id(&self) -> StorageBinId {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBinRequest {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub capacity: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBinRequest {
    pub code: Option<String>,
    pub description: Option<String>,
    pub capacity: Option<Decimal>,
    pub active: Option<bool>,
}

impl StorageBin {
    pub fn create(warehouse_id: WarehouseId, req: CreateBinRequest, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: StorageBinId::new(),
            warehouse_id,
            code: validate::required_text("code", &req.code, 40)?,
            description: validate::optional_text("description", req.description.as_deref(), 500)?,
            capacity: req.capacity.map(|c| validate::positive("capacity", c)).transpose()?,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, req: UpdateBinRequest, now: DateTime<Utc>) -> DomainResult<()> {
        let code = req
            .code
            .as_deref()
            .map(|c| validate::required_text("code", c, 40))
            .transpose()?;
        let capacity = req.capacity.map(|c| validate::positive("capacity", c)).transpose()?;
        let description = match req.description.as_deref() {
            Some(d) => Some(validate::optional_text("description", Some(d), 500)?),
            None => None,
        };

        if let Some(code) = code {
            self.code = code;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if capacity.is_some() {
            self.capacity = capacity;
        }
        if let Some(active) = req.active {
            self.active = active;
        }
        self.updated_at = now;
        Ok(())
    }
}
