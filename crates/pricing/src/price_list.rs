use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use demeter_core::{DomainError, DomainResult, Record, uuid_id, validate};
use demeter_products::ProductId;

uuid_id!(PriceListId, "PriceListId");

/// One quantity tier: from `min_quantity` units upward, each unit costs `unit_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEntry {
    pub product_id: ProductId,
    pub min_quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceList {
    pub id: PriceListId,
    pub name: String,
    pub currency: String,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
    pub active: bool,
    pub entries: Vec<PriceEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for PriceList {
    type Id = PriceListId;
    const KIND: &'static str = "price_lists";
    const ENTITY: &'static str = "PriceList";
    const UNIQUE: &'static [&'static [&'static str]] = &[&["name"]];

    fn id(&self) -> PriceListId {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePriceListRequest {
    pub name: String,
    #[serde(default)]
    pub currency: Option<String>,
    pub valid_from: NaiveDate,
    #[serde(default)]
    pub valid_to: Option<NaiveDate>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub entries: Vec<PriceEntry>,
}

/// Partial update. `entries`, when given, replaces the whole tier table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePriceListRequest {
    pub name: Option<String>,
    pub currency: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    pub active: Option<bool>,
    pub entries: Option<Vec<PriceEntry>>,
}

fn validate_entries(entries: Vec<PriceEntry>) -> DomainResult<Vec<PriceEntry>> {
    let mut seen = HashSet::new();
    for entry in &entries {
        validate::non_negative("minQuantity", entry.min_quantity)?;
        validate::non_negative("unitPrice", entry.unit_price)?;
        if !seen.insert((entry.product_id, entry.min_quantity.normalize())) {
            return Err(DomainError::validation(format!(
                "duplicate tier for product {} at minQuantity {}",
                entry.product_id, entry.min_quantity
            )));
        }
    }
    Ok(entries)
}

fn validate_window(from: NaiveDate, to: Option<NaiveDate>) -> DomainResult<()> {
    match to {
        Some(to) if to < from => Err(DomainError::validation("validTo cannot precede validFrom")),
        _ => Ok(()),
    }
}

impl PriceList {
    pub fn create(req: CreatePriceListRequest, now: DateTime<Utc>) -> DomainResult<Self> {
        validate_window(req.valid_from, req.valid_to)?;
        Ok(Self {
            id: PriceListId::new(),
            name: validate::required_text("name", &req.name, 120)?,
            currency: validate::currency(req.currency.as_deref())?,
            valid_from: req.valid_from,
            valid_to: req.valid_to,
            active: req.active.unwrap_or(true),
            entries: validate_entries(req.entries)?,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, req: UpdatePriceListRequest, now: DateTime<Utc>) -> DomainResult<()> {
        let name = req
            .name
            .as_deref()
            .map(|n| validate::required_text("name", n, 120))
            .transpose()?;
        let currency = req
            .currency
            .as_deref()
            .map(|c| validate::currency(Some(c)))
            .transpose()?;
        let valid_from = req.valid_from.unwrap_or(self.valid_from);
        let valid_to = req.valid_to.or(self.valid_to);
        validate_window(valid_from, valid_to)?;
        let entries = req.entries.map(validate_entries).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(currency) = currency {
            self.currency = currency;
        }
        self.valid_from = valid_from;
        self.valid_to = valid_to;
        if let Some(active) = req.active {
            self.active = active;
        }
        if let Some(entries) = entries {
            self.entries = entries;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Inclusive on both ends; an open `valid_to` never expires.
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.active && self.valid_from <= date && self.valid_to.is_none_or(|to| date <= to)
    }

    /// Highest tier for `product_id` whose `min_quantity` does not exceed `quantity`.
    pub fn best_tier(&self, product_id: ProductId, quantity: Decimal) -> Option<&PriceEntry> {
        self.entries
            .iter()
            .filter(|e| e.product_id == product_id && e.min_quantity <= quantity)
            .max_by_key(|e| e.min_quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(product_id: ProductId, min: i64, price: i64) -> PriceEntry {
        PriceEntry {
            product_id,
            min_quantity: Decimal::from(min),
            unit_price: Decimal::from(price),
        }
    }

    fn req(entries: Vec<PriceEntry>) -> CreatePriceListRequest {
        CreatePriceListRequest {
            name: "Wholesale 2024".into(),
            currency: None,
            valid_from: date(2024, 1, 1),
            valid_to: Some(date(2024, 12, 31)),
            active: None,
            entries,
        }
    }

    #[test]
    fn duplicate_tiers_rejected() {
        let p = ProductId::new();
        let err = PriceList::create(req(vec![entry(p, 10, 5), entry(p, 10, 4)]), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn inverted_window_rejected() {
        let mut r = req(vec![]);
        r.valid_to = Some(date(2023, 12, 31));
        assert!(PriceList::create(r, Utc::now()).is_err());

        let mut list = PriceList::create(req(vec![]), Utc::now()).unwrap();
        let res = list.apply_update(
            UpdatePriceListRequest {
                valid_from: Some(date(2025, 1, 1)),
                ..Default::default()
            },
            Utc::now(),
        );
        assert!(res.is_err());
        assert_eq!(list.valid_from, date(2024, 1, 1));
    }

    #[test]
    fn validity_is_inclusive() {
        let list = PriceList::create(req(vec![]), Utc::now()).unwrap();
        assert!(list.is_valid_on(date(2024, 1, 1)));
        assert!(list.is_valid_on(date(2024, 12, 31)));
        assert!(!list.is_valid_on(date(2025, 1, 1)));
    }

    #[test]
    fn best_tier_picks_highest_applicable() {
        let p = ProductId::new();
        let list = PriceList::create(req(vec![entry(p, 0, 10), entry(p, 10, 8), entry(p, 50, 6)]), Utc::now()).unwrap();
        assert_eq!(list.best_tier(p, Decimal::from(9)).unwrap().unit_price, Decimal::from(10));
        assert_eq!(list.best_tier(p, Decimal::from(10)).unwrap().unit_price, Decimal::from(8));
        assert_eq!(list.best_tier(p, Decimal::from(500)).unwrap().unit_price, Decimal::from(6));
        assert!(list.best_tier(ProductId::new(), Decimal::from(500)).is_none());
    }
}
