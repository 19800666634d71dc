use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::instrument;

use demeter_analytics::{
    CostSummary, ExpiringBatch, SalesSummary, StockSummary, cost_summary, expiring_batches, sales_summary,
    stock_summary,
};
use demeter_core::TenantId;
use demeter_costs::Cost;
use demeter_inventory::{BatchStatus, StockBatch};
use demeter_products::Product;
use demeter_sales::Sale;

use super::{ServiceError, ServiceResult};
use crate::store::{Filter, Store, Tx};

/// Upper bound of the expiry look-ahead window.
pub const MAX_EXPIRY_WINDOW_DAYS: u32 = 365;

/// Read-only reports. Each one reads a consistent snapshot in one transaction.
#[derive(Clone)]
pub struct AnalyticsService {
    store: Arc<dyn Store>,
}

fn check_window(days: u32) -> ServiceResult<()> {
    if days == 0 || days > MAX_EXPIRY_WINDOW_DAYS {
        return Err(ServiceError::Validation(format!(
            "days must be between 1 and {MAX_EXPIRY_WINDOW_DAYS}"
        )));
    }
    Ok(())
}

pub(crate) async fn load_stock(tx: &mut Tx, now: DateTime<Utc>) -> ServiceResult<StockSummary> {
    let products = tx.find_all::<Product>(Vec::new()).await?;
    let batches = tx.find_all::<StockBatch>(Vec::new()).await?;
    Ok(stock_summary(&products, &batches, now)?)
}

pub(crate) async fn load_expiring(tx: &mut Tx, now: DateTime<Utc>, days: u32) -> ServiceResult<Vec<ExpiringBatch>> {
    let active = tx
        .find_all::<StockBatch>(vec![Filter::eq("status", BatchStatus::Active.as_str())])
        .await?;
    Ok(expiring_batches(&active, now, days))
}

pub(crate) async fn load_sales(
    tx: &mut Tx,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> ServiceResult<SalesSummary> {
    let mut filters = Vec::new();
    if let Some(from) = from {
        filters.push(Filter::on_or_after("saleDate", from));
    }
    if let Some(to) = to {
        filters.push(Filter::before("saleDate", to));
    }
    let sales = tx.find_all::<Sale>(filters).await?;
    Ok(sales_summary(&sales, from, to)?)
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    pub async fn stock(&self, tenant: &TenantId) -> ServiceResult<StockSummary> {
        let mut tx = self.store.begin(tenant).await?;
        load_stock(&mut tx, Utc::now()).await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    pub async fn expiring(&self, tenant: &TenantId, days: u32) -> ServiceResult<Vec<ExpiringBatch>> {
        check_window(days)?;
        let mut tx = self.store.begin(tenant).await?;
        load_expiring(&mut tx, Utc::now(), days).await
    }

    /// Sales in `[from, to)`; either bound may be open.
    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    pub async fn sales(
        &self,
        tenant: &TenantId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ServiceResult<SalesSummary> {
        if let (Some(from), Some(to)) = (from, to) {
            if to <= from {
                return Err(ServiceError::Validation("'to' must be after 'from'".to_string()));
            }
        }
        let mut tx = self.store.begin(tenant).await?;
        load_sales(&mut tx, from, to).await
    }

    /// Sales of the last `days` days.
    pub async fn recent_sales(&self, tenant: &TenantId, days: i64) -> ServiceResult<SalesSummary> {
        self.sales(tenant, Some(Utc::now() - Duration::days(days)), None).await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    pub async fn costs(&self, tenant: &TenantId) -> ServiceResult<CostSummary> {
        let mut tx = self.store.begin(tenant).await?;
        let costs = tx.find_all::<Cost>(Vec::new()).await?;
        Ok(cost_summary(&costs)?)
    }
}
