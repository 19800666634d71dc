use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use demeter_core::{DomainError, DomainResult, Record, uuid_id, validate};
use demeter_locations::{StorageBinId, WarehouseId};
use demeter_products::ProductId;

use crate::batch::{StockBatch, StockBatchId};

uuid_id!(StockMovementId, "StockMovementId");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Entry,
    Sale,
    Loss,
    Adjustment,
    Transfer,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entry => "ENTRY",
            MovementType::Sale => "SALE",
            MovementType::Loss => "LOSS",
            MovementType::Adjustment => "ADJUSTMENT",
            MovementType::Transfer => "TRANSFER",
        }
    }

    /// Signed change to on-hand stock for a movement of `quantity`.
    ///
    /// `ENTRY`, `SALE`, `LOSS` take a positive magnitude; `ADJUSTMENT` takes the
    /// signed correction itself. `TRANSFER` relocates stock and changes nothing.
    pub fn signed_delta(&self, quantity: Decimal) -> DomainResult<Decimal> {
        match self {
            MovementType::Entry => validate::positive("quantity", quantity),
            MovementType::Sale | MovementType::Loss => Ok(-validate::positive("quantity", quantity)?),
            MovementType::Adjustment => {
                if quantity.is_zero() {
                    Err(DomainError::validation("adjustment quantity cannot be zero"))
                } else {
                    Ok(quantity)
                }
            }
            MovementType::Transfer => {
                validate::positive("quantity", quantity)?;
                Ok(Decimal::ZERO)
            }
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ENTRY" => Ok(MovementType::Entry),
            "SALE" => Ok(MovementType::Sale),
            "LOSS" => Ok(MovementType::Loss),
            "ADJUSTMENT" => Ok(MovementType::Adjustment),
            "TRANSFER" => Ok(MovementType::Transfer),
            other => Err(DomainError::validation(format!("unknown movement type '{other}'"))),
        }
    }
}

/// Immutable record of one change to a batch.
///
/// `quantity` is the signed delta applied to the batch, except for `TRANSFER`
/// where it is the relocated amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: StockMovementId,
    pub movement_type: MovementType,
    pub product_id: ProductId,
    pub batch_id: StockBatchId,
    pub quantity: Decimal,
    pub balance_after: Decimal,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub from_warehouse_id: Option<WarehouseId>,
    pub to_warehouse_id: Option<WarehouseId>,
    pub performed_by: Option<String>,
    pub performed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Record for StockMovement {
    type Id = StockMovementId;
    const KIND: &'static str = "stock_movements";
    const ENTITY: &'static str = "StockMovement";

    fn id(&self) -> StockMovementId {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStockMovementRequest {
    pub movement_type: MovementType,
    pub batch_id: StockBatchId,
    pub quantity: Decimal,
    #[serde(default)]
    pub reference_id: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub performed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub destination_warehouse_id: Option<WarehouseId>,
    #[serde(default)]
    pub destination_bin_id: Option<StorageBinId>,
}

impl StockMovement {
    /// Apply a movement to `batch` and return the record describing it.
    ///
    /// The batch is only mutated when every check passes. Callers must verify
    /// that a destination bin belongs to the destination warehouse.
    pub fn record(
        batch: &mut StockBatch,
        req: CreateStockMovementRequest,
        performed_by: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if req.batch_id != batch.id {
            return Err(DomainError::validation("movement does not target this batch"));
        }
        let notes = validate::optional_text("notes", req.notes.as_deref(), 1000)?;
        let delta = req.movement_type.signed_delta(req.quantity)?;
        let from_warehouse_id = batch.warehouse_id;

        let (quantity, to_warehouse_id) = if req.movement_type == MovementType::Transfer {
            let Some(destination) = req.destination_warehouse_id else {
                return Err(DomainError::validation("transfer requires destinationWarehouseId"));
            };
            if req.quantity != batch.quantity {
                return Err(DomainError::invariant(format!(
                    "transfer must move the whole batch ({} {})",
                    batch.quantity, batch.unit
                )));
            }
            if batch.warehouse_id == Some(destination) && batch.bin_id == req.destination_bin_id {
                return Err(DomainError::validation("transfer destination equals current location"));
            }
            batch.warehouse_id = Some(destination);
            batch.bin_id = req.destination_bin_id;
            batch.updated_at = now;
            (req.quantity, Some(destination))
        } else {
            batch.apply_delta(delta, now)?;
            (delta, None)
        };

        Ok(Self {
            id: StockMovementId::new(),
            movement_type: req.movement_type,
            product_id: batch.product_id,
            batch_id: batch.id,
            quantity,
            balance_after: batch.quantity,
            reference_id: req.reference_id,
            notes,
            from_warehouse_id,
            to_warehouse_id,
            performed_by,
            performed_at: req.performed_at.unwrap_or(now),
            created_at: now,
        })
    }
}
