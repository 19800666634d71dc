use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use demeter_core::{DomainError, DomainResult, Record, uuid_id, validate};
use demeter_products::ProductId;

uuid_id!(SaleId, "SaleId");
uuid_id!(SaleItemId, "SaleItemId");

/// Sale status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Pending,
    Completed,
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "PENDING",
            SaleStatus::Completed => "COMPLETED",
            SaleStatus::Cancelled => "CANCELLED",
        }
    }
}

impl core::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sale line: product, quantity, unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: SaleItemId,
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: SaleId,
    pub sale_number: String,
    pub customer_name: Option<String>,
    pub status: SaleStatus,
    pub items: Vec<SaleItem>,
    pub total: Decimal,
    pub currency: String,
    pub notes: Option<String>,
    pub sold_by: Option<String>,
    pub sale_date: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Sale {
    type Id = SaleId;
    const KIND: &'static str = "sales";
    const ENTITY: &'static str = "Sale";
    const UNIQUE: &'static [&'static [&'static str]] = &[&["saleNumber"]];

    fn id(&self) -> SaleId {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleItemRequest {
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    #[serde(default)]
    pub customer_name: Option<String>,
    pub items: Vec<CreateSaleItemRequest>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub sale_date: Option<DateTime<Utc>>,
}

/// Human-readable sale number: `S-YYYYMMDD-XXXXXXXX`.
///
/// The suffix is the first eight hex digits of the id, so numbers are unique
/// whenever ids are.
pub fn sale_number(id: SaleId, sale_date: DateTime<Utc>) -> String {
    let hex = id.as_uuid().simple().to_string().to_ascii_uppercase();
    format!("S-{}-{}", sale_date.format("%Y%m%d"), &hex[..8])
}

impl Sale {
    pub fn create(req: CreateSaleRequest, sold_by: Option<String>, now: DateTime<Utc>) -> DomainResult<Self> {
        if req.items.is_empty() {
            return Err(DomainError::validation("a sale needs at least one item"));
        }

        let mut items = Vec::with_capacity(req.items.len());
        for item in req.items {
            let quantity = validate::positive("quantity", item.quantity)?;
            let unit_price = validate::non_negative("unitPrice", item.unit_price)?;
            items.push(SaleItem {
                id: SaleItemId::new(),
                product_id: item.product_id,
                quantity,
                unit_price,
                subtotal: validate::checked_mul("subtotal", quantity, unit_price)?,
            });
        }
        let total = validate::checked_sum("total", items.iter().map(|i| i.subtotal))?;

        let id = SaleId::new();
        let sale_date = req.sale_date.unwrap_or(now);
        Ok(Self {
            id,
            sale_number: sale_number(id, sale_date),
            customer_name: validate::optional_text("customerName", req.customer_name.as_deref(), 255)?,
            status: SaleStatus::Pending,
            items,
            total,
            currency: validate::currency(req.currency.as_deref())?,
            notes: validate::optional_text("notes", req.notes.as_deref(), 1000)?,
            sold_by,
            sale_date,
            completed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Total quantity per product across all lines.
    pub fn demand_by_product(&self) -> DomainResult<BTreeMap<ProductId, Decimal>> {
        let mut demand = BTreeMap::new();
        for item in &self.items {
            let entry = demand.entry(item.product_id).or_insert(Decimal::ZERO);
            *entry = validate::checked_add("quantity", *entry, item.quantity)?;
        }
        Ok(demand)
    }

    fn ensure_pending(&self, action: &str) -> DomainResult<()> {
        if self.status != SaleStatus::Pending {
            return Err(DomainError::conflict(format!(
                "cannot {action} sale {}: status is {}",
                self.sale_number, self.status
            )));
        }
        Ok(())
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending("complete")?;
        self.status = SaleStatus::Completed;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending("cancel")?;
        self.status = SaleStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    /// Completed sales moved stock and are kept for the record.
    pub fn ensure_deletable(&self) -> DomainResult<()> {
        if self.status == SaleStatus::Completed {
            return Err(DomainError::conflict(format!(
                "sale {} is completed and cannot be deleted",
                self.sale_number
            )));
        }
        Ok(())
    }
}
