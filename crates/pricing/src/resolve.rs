use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use demeter_core::{DomainResult, validate};
use demeter_products::ProductId;

use crate::price_list::{PriceList, PriceListId};

/// Outcome of a price lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPrice {
    pub price_list_id: PriceListId,
    pub price_list_name: String,
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub min_quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub currency: String,
}

/// Resolve the unit price of `quantity` units of `product_id` on `date`.
///
/// Among active lists valid on `date` that carry an applicable tier, the one
/// with the latest `valid_from` wins (ties go to the most recently created).
/// Within it, the highest applicable tier applies.
pub fn resolve_price(
    lists: &[PriceList],
    product_id: ProductId,
    quantity: Decimal,
    date: NaiveDate,
) -> DomainResult<Option<ResolvedPrice>> {
    let Some((list, tier)) = lists
        .iter()
        .filter(|l| l.is_valid_on(date))
        .filter_map(|l| l.best_tier(product_id, quantity).map(|tier| (l, tier)))
        .max_by_key(|(l, _)| (l.valid_from, l.created_at, l.id))
    else {
        return Ok(None);
    };
    Ok(Some(ResolvedPrice {
        price_list_id: list.id,
        price_list_name: list.name.clone(),
        product_id,
        quantity,
        min_quantity: tier.min_quantity,
        unit_price: tier.unit_price,
        total: validate::checked_mul("total", tier.unit_price, quantity)?,
        currency: list.currency.clone(),
    }))
}
