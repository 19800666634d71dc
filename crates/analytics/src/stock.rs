use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use demeter_core::DomainResult;
use demeter_inventory::{BatchStatus, StockBatch, StockBatchId};
use demeter_products::{Product, ProductId};

use crate::accumulate;

pub const DEFAULT_EXPIRY_WINDOW_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStock {
    pub product_id: ProductId,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub active_quantity: Decimal,
    pub batch_count: u64,
    pub active_batch_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSummary {
    pub total_products: u64,
    pub total_batches: u64,
    pub active_batches: u64,
    pub total_active_quantity: Decimal,
    pub products: Vec<ProductStock>,
}

/// Stock levels per product.
///
/// "Active" quantity only counts `ACTIVE`, unexpired batches, which is what can
/// actually be sold. Products without batches are listed with zero stock.
pub fn stock_summary(products: &[Product], batches: &[StockBatch], now: DateTime<Utc>) -> DomainResult<StockSummary> {
    let mut per_product: BTreeMap<ProductId, ProductStock> = products
        .iter()
        .map(|p| {
            (
                p.id,
                ProductStock {
                    product_id: p.id,
                    sku: Some(p.sku.clone()),
                    name: Some(p.name.clone()),
                    active_quantity: Decimal::ZERO,
                    batch_count: 0,
                    active_batch_count: 0,
                },
            )
        })
        .collect();

    let mut active_batches = 0;
    let mut total_active_quantity = Decimal::ZERO;
    for batch in batches {
        let entry = per_product.entry(batch.product_id).or_insert_with(|| ProductStock {
            product_id: batch.product_id,
            sku: None,
            name: None,
            active_quantity: Decimal::ZERO,
            batch_count: 0,
            active_batch_count: 0,
        });
        entry.batch_count += 1;
        if batch.status == BatchStatus::Active && !batch.is_expired(now) {
            entry.active_batch_count += 1;
            accumulate(&mut entry.active_quantity, batch.quantity, "active quantity")?;
            active_batches += 1;
            accumulate(&mut total_active_quantity, batch.quantity, "active quantity")?;
        }
    }

    Ok(StockSummary {
        total_products: products.len() as u64,
        total_batches: batches.len() as u64,
        active_batches,
        total_active_quantity,
        products: per_product.into_values().collect(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringBatch {
    pub batch_id: StockBatchId,
    pub product_id: ProductId,
    pub batch_code: String,
    pub quantity: Decimal,
    pub unit: String,
    pub expiry_date: DateTime<Utc>,
    pub days_until_expiry: i64,
}

/// Active batches with stock that expire within `days` from `now`, soonest first.
pub fn expiring_batches(batches: &[StockBatch], now: DateTime<Utc>, days: u32) -> Vec<ExpiringBatch> {
    let horizon = now + Duration::days(i64::from(days));
    let mut out: Vec<ExpiringBatch> = batches
        .iter()
        .filter(|b| b.status == BatchStatus::Active && b.quantity > Decimal::ZERO)
        .filter_map(|b| {
            let expiry = b.expiry_date?;
            (expiry > now && expiry <= horizon).then(|| ExpiringBatch {
                batch_id: b.id,
                product_id: b.product_id,
                batch_code: b.batch_code.clone(),
                quantity: b.quantity,
                unit: b.unit.clone(),
                expiry_date: expiry,
                days_until_expiry: (expiry - now).num_days(),
            })
        })
        .collect();
    out.sort_by_key(|e| (e.expiry_date, e.batch_id));
    out
}
