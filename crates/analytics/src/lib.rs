//! Read-only aggregates over tenant data.
//!
//! Everything here is a pure function of the records passed in; services load
//! the records inside one transaction and call these.

use demeter_core::{DomainError, DomainResult};
use rust_decimal::Decimal;

pub mod costs;
pub mod sales;
pub mod stock;

pub use costs::{CostSummary, CostTotal, cost_summary};
pub use sales::{ProductRevenue, SalesSummary, sales_summary};
pub use stock::{
    DEFAULT_EXPIRY_WINDOW_DAYS, ExpiringBatch, ProductStock, StockSummary, expiring_batches,
    stock_summary,
};

/// Stored amounts are individually bounded but their totals are not.
fn accumulate(total: &mut Decimal, amount: Decimal, field: &str) -> DomainResult<()> {
    *total = total
        .checked_add(amount)
        .ok_or_else(|| DomainError::invariant(format!("{field} total is out of range")))?;
    Ok(())
}
