use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use demeter_core::{DomainError, DomainResult};
use demeter_products::ProductId;

use crate::batch::{StockBatch, StockBatchId};

/// Quantity to draw from one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub batch_id: StockBatchId,
    pub quantity: Decimal,
}

/// First-expired-first-out allocation of `requested` units of `product_id`.
///
/// Only active, unexpired batches with stock take part. Batches are drained in
/// expiry order (batches without expiry last), ties broken by entry date.
pub fn allocate_fefo(
    batches: &[StockBatch],
    product_id: ProductId,
    requested: Decimal,
    now: DateTime<Utc>,
) -> DomainResult<Vec<Allocation>> {
    if requested <= Decimal::ZERO {
        return Err(DomainError::validation("requested quantity must be positive"));
    }

    let mut eligible: Vec<&StockBatch> = batches
        .iter()
        .filter(|b| b.product_id == product_id && b.is_available(now))
        .collect();
    eligible.sort_by_key(|b| (b.expiry_date.is_none(), b.expiry_date, b.entry_date, b.id));

    // Saturating: a total past Decimal::MAX already covers any request.
    let available = eligible
        .iter()
        .fold(Decimal::ZERO, |acc, b| acc.saturating_add(b.quantity));
    if available < requested {
        return Err(DomainError::invariant(format!(
            "insufficient stock for product {product_id}: requested {requested}, available {available}"
        )));
    }

    let mut remaining = requested;
    let mut allocations = Vec::new();
    for batch in eligible {
        if remaining.is_zero() {
            break;
        }
        let take = remaining.min(batch.quantity);
        allocations.push(Allocation {
            batch_id: batch.id,
            quantity: take,
        });
        remaining -= take;
    }
    Ok(allocations)
}
