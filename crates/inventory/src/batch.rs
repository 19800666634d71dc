use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use demeter_core::{DomainError, DomainResult, Record, uuid_id, validate};
use demeter_locations::{StorageBinId, WarehouseId};
use demeter_products::ProductId;

uuid_id!(StockBatchId, "StockBatchId");

/// Batch lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Active,
    Depleted,
    Expired,
    Quarantine,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Active => "ACTIVE",
            BatchStatus::Depleted => "DEPLETED",
            BatchStatus::Expired => "EXPIRED",
            BatchStatus::Quarantine => "QUARANTINE",
        }
    }
}

impl core::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for BatchStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(BatchStatus::Active),
            "DEPLETED" => Ok(BatchStatus::Depleted),
            "EXPIRED" => Ok(BatchStatus::Expired),
            "QUARANTINE" => Ok(BatchStatus::Quarantine),
            other => Err(DomainError::validation(format!("unknown batch status '{other}'"))),
        }
    }
}

/// A quantity of one product received together and tracked as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockBatch {
    pub id: StockBatchId,
    pub product_id: ProductId,
    pub batch_code: String,
    pub quantity: Decimal,
    pub unit: String,
    pub warehouse_id: Option<WarehouseId>,
    pub bin_id: Option<StorageBinId>,
    pub status: BatchStatus,
    pub custom_attributes: Option<serde_json::Value>,
    pub entry_date: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for StockBatch {
    type Id = StockBatchId;
    const KIND: &'static str = "stock_batches";
    const ENTITY: &'static str = "StockBatch";
    const UNIQUE: &'static [&'static [&'static str]] = &[&["productId", "batchCode"]];

    fn id(&self) -> StockBatchId {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStockBatchRequest {
    pub product_id: ProductId,
    pub batch_code: String,
    pub quantity: Decimal,
    pub unit: String,
    #[serde(default)]
    pub warehouse_id: Option<WarehouseId>,
    #[serde(default)]
    pub bin_id: Option<StorageBinId>,
    #[serde(default)]
    pub custom_attributes: Option<serde_json::Value>,
    #[serde(default)]
    pub entry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
}

/// Partial update; quantity changes go through stock movements instead.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStockBatchRequest {
    pub unit: Option<String>,
    pub warehouse_id: Option<WarehouseId>,
    pub bin_id: Option<StorageBinId>,
    /// Parsed leniently so a bad value is a validation error, not a decode error.
    pub status: Option<String>,
    pub custom_attributes: Option<serde_json::Value>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl StockBatch {
    pub fn create(req: CreateStockBatchRequest, now: DateTime<Utc>) -> DomainResult<Self> {
        let quantity = validate::non_negative("quantity", req.quantity)?;
        let entry_date = req.entry_date.unwrap_or(now);
        if let Some(expiry) = req.expiry_date {
            if expiry < entry_date {
                return Err(DomainError::validation("expiryDate cannot precede entryDate"));
            }
        }
        if req.bin_id.is_some() && req.warehouse_id.is_none() {
            return Err(DomainError::validation("binId requires warehouseId"));
        }

        Ok(Self {
            id: StockBatchId::new(),
            product_id: req.product_id,
            batch_code: validate::required_text("batchCode", &req.batch_code, 64)?,
            quantity,
            unit: validate::required_text("unit", &req.unit, 20)?,
            warehouse_id: req.warehouse_id,
            bin_id: req.bin_id,
            status: if quantity.is_zero() {
                BatchStatus::Depleted
            } else {
                BatchStatus::Active
            },
            custom_attributes: validate::attributes(req.custom_attributes)?,
            entry_date,
            expiry_date: req.expiry_date,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, req: UpdateStockBatchRequest, now: DateTime<Utc>) -> DomainResult<()> {
        let unit = req
            .unit
            .as_deref()
            .map(|u| validate::required_text("unit", u, 20))
            .transpose()?;
        let status = req.status.as_deref().map(str::parse::<BatchStatus>).transpose()?;
        let attributes = match req.custom_attributes {
            Some(a) => Some(validate::attributes(Some(a))?),
            None => None,
        };
        if let Some(expiry) = req.expiry_date {
            if expiry < self.entry_date {
                return Err(DomainError::validation("expiryDate cannot precede entryDate"));
            }
        }

        if let Some(unit) = unit {
            self.unit = unit;
        }
        if let Some(warehouse_id) = req.warehouse_id {
            if self.warehouse_id != Some(warehouse_id) {
                // A bin belongs to one warehouse; moving warehouses drops it.
                self.bin_id = None;
            }
            self.warehouse_id = Some(warehouse_id);
        }
        if let Some(bin_id) = req.bin_id {
            self.bin_id = Some(bin_id);
        }
        if let Some(status) = status {
            self.status = status;
        }
        if let Some(attributes) = attributes {
            self.custom_attributes = attributes;
        }
        if req.expiry_date.is_some() {
            self.expiry_date = req.expiry_date;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Overwrite the on-hand quantity.
    ///
    /// A batch at zero is `DEPLETED`; restocking a depleted batch reactivates it.
    pub fn set_quantity(&mut self, quantity: Decimal, now: DateTime<Utc>) -> DomainResult<()> {
        if quantity < Decimal::ZERO {
            return Err(DomainError::invariant(format!(
                "batch {} quantity cannot go negative",
                self.batch_code
            )));
        }
        self.quantity = quantity;
        if quantity.is_zero() {
            self.status = BatchStatus::Depleted;
        } else if self.status == BatchStatus::Depleted {
            self.status = BatchStatus::Active;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Apply a signed quantity change. Outflows require an active batch.
    pub fn apply_delta(&mut self, delta: Decimal, now: DateTime<Utc>) -> DomainResult<Decimal> {
        if delta < Decimal::ZERO && self.status != BatchStatus::Active {
            return Err(DomainError::invariant(format!(
                "batch {} is {} and cannot release stock",
                self.batch_code, self.status
            )));
        }
        let next = self.quantity.checked_add(delta).ok_or_else(|| {
            DomainError::invariant(format!(
                "batch {} cannot hold {} more: quantity out of range",
                self.batch_code, delta
            ))
        })?;
        if next < Decimal::ZERO {
            return Err(DomainError::invariant(format!(
                "insufficient stock in batch {}: on hand {}, requested {}",
                self.batch_code,
                self.quantity,
                -delta
            )));
        }
        self.set_quantity(next, now)?;
        Ok(next)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date.is_some_and(|e| e <= now)
    }

    /// Can stock be drawn from this batch right now?
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.status == BatchStatus::Active && !self.is_expired(now) && self.quantity > Decimal::ZERO
    }
}
