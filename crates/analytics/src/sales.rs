use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use demeter_core::DomainResult;
use demeter_products::ProductId;
use demeter_sales::{Sale, SaleStatus};

use crate::accumulate;

const TOP_PRODUCTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRevenue {
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub total_sales: u64,
    pub completed: u64,
    pub pending: u64,
    pub cancelled: u64,
    /// Sum of completed sale totals.
    pub revenue: Decimal,
    pub average_ticket: Decimal,
    pub top_products: Vec<ProductRevenue>,
}

/// Summarize sales whose `sale_date` falls in `[from, to)`; open bounds are unbounded.
pub fn sales_summary(sales: &[Sale], from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> DomainResult<SalesSummary> {
    let in_range = sales.iter().filter(|s| {
        from.is_none_or(|f| s.sale_date >= f) && to.is_none_or(|t| s.sale_date < t)
    });

    let mut summary = SalesSummary {
        from,
        to,
        total_sales: 0,
        completed: 0,
        pending: 0,
        cancelled: 0,
        revenue: Decimal::ZERO,
        average_ticket: Decimal::ZERO,
        top_products: Vec::new(),
    };
    let mut per_product: HashMap<ProductId, ProductRevenue> = HashMap::new();

    for sale in in_range {
        summary.total_sales += 1;
        match sale.status {
            SaleStatus::Pending => summary.pending += 1,
            SaleStatus::Cancelled => summary.cancelled += 1,
            SaleStatus::Completed => {
                summary.completed += 1;
                accumulate(&mut summary.revenue, sale.total, "revenue")?;
                for item in &sale.items {
                    let entry = per_product.entry(item.product_id).or_insert(ProductRevenue {
                        product_id: item.product_id,
                        quantity: Decimal::ZERO,
                        revenue: Decimal::ZERO,
                    });
                    accumulate(&mut entry.quantity, item.quantity, "quantity")?;
                    accumulate(&mut entry.revenue, item.subtotal, "revenue")?;
                }
            }
        }
    }

    if summary.completed > 0 {
        summary.average_ticket = (summary.revenue / Decimal::from(summary.completed)).round_dp(2);
    }
    let mut top: Vec<ProductRevenue> = per_product.into_values().collect();
    top.sort_by(|a, b| b.revenue.cmp(&a.revenue).then(a.product_id.cmp(&b.product_id)));
    top.truncate(TOP_PRODUCTS);
    summary.top_products = top;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use demeter_sales::{CreateSaleItemRequest, CreateSaleRequest};

    fn sale(product_id: ProductId, qty: i64, price: i64, days_ago: i64) -> Sale {
        let now = Utc::now();
        Sale::create(
            CreateSaleRequest {
                customer_name: None,
                items: vec![CreateSaleItemRequest {
                    product_id,
                    quantity: Decimal::from(qty),
                    unit_price: Decimal::from(price),
                }],
                currency: None,
                notes: None,
                sale_date: Some(now - Duration::days(days_ago)),
            },
            None,
            now,
        )
        .unwrap()
    }

    #[test]
    fn revenue_counts_completed_sales_only() {
        let a = ProductId::new();
        let b = ProductId::new();
        let mut s1 = sale(a, 2, 10, 1);
        s1.complete(Utc::now()).unwrap();
        let mut s2 = sale(b, 1, 5, 2);
        s2.complete(Utc::now()).unwrap();
        let pending = sale(a, 100, 100, 1);
        let mut cancelled = sale(b, 1, 1, 1);
        cancelled.cancel(Utc::now()).unwrap();

        let summary = sales_summary(&[s1, s2, pending, cancelled], None, None).unwrap();
        assert_eq!(summary.total_sales, 4);
        assert_eq!((summary.completed, summary.pending, summary.cancelled), (2, 1, 1));
        assert_eq!(summary.revenue, Decimal::from(25));
        assert_eq!(summary.average_ticket, "12.5".parse::<Decimal>().unwrap());
        assert_eq!(summary.top_products[0].product_id, a);
        assert_eq!(summary.top_products[0].quantity, Decimal::from(2));
    }

    #[test]
    fn range_is_half_open() {
        let p = ProductId::new();
        let recent = sale(p, 1, 1, 1);
        let old = sale(p, 1, 1, 40);
        let from = Utc::now() - Duration::days(30);
        let summary = sales_summary(&[recent.clone(), old], Some(from), None).unwrap();
        assert_eq!(summary.total_sales, 1);

        let to = recent.sale_date;
        assert_eq!(sales_summary(&[recent], None, Some(to)).unwrap().total_sales, 0);
    }

    #[test]
    fn empty_summary_has_zero_average() {
        let summary = sales_summary(&[], None, None).unwrap();
        assert_eq!(summary.average_ticket, Decimal::ZERO);
        assert!(summary.top_products.is_empty());
    }

    #[test]
    fn revenue_past_decimal_range_is_an_error() {
        let p = ProductId::new();
        let mut big = sale(p, 1, 1, 1);
        big.complete(Utc::now()).unwrap();
        big.total = Decimal::MAX;
        let other = big.clone();

        let err = sales_summary(&[big, other], None, None).unwrap_err();
        assert!(matches!(err, demeter_core::DomainError::InvariantViolation(msg) if msg.starts_with("revenue")));
    }
}
