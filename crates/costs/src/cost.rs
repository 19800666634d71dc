use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use demeter_core::{DomainError, DomainResult, Record, uuid_id, validate};
use demeter_inventory::StockBatchId;
use demeter_products::ProductId;

uuid_id!(CostId, "CostId");

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostType {
    Material,
    Labor,
    Transport,
    Packaging,
    Overhead,
    Other,
}

impl CostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostType::Material => "MATERIAL",
            CostType::Labor => "LABOR",
            CostType::Transport => "TRANSPORT",
            CostType::Packaging => "PACKAGING",
            CostType::Overhead => "OVERHEAD",
            CostType::Other => "OTHER",
        }
    }
}

impl core::str::FromStr for CostType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MATERIAL" => Ok(CostType::Material),
            "LABOR" => Ok(CostType::Labor),
            "TRANSPORT" => Ok(CostType::Transport),
            "PACKAGING" => Ok(CostType::Packaging),
            "OVERHEAD" => Ok(CostType::Overhead),
            "OTHER" => Ok(CostType::Other),
            other => Err(DomainError::validation(format!("unknown cost type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cost {
    pub id: CostId,
    pub product_id: Option<ProductId>,
    pub batch_id: Option<StockBatchId>,
    pub cost_type: CostType,
    pub amount: Decimal,
    pub currency: String,
    pub description: Option<String>,
    pub effective_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Cost {
    type Id = CostId;
    const KIND: &'static str = "costs";
    const ENTITY: &'static str = "Cost";

    fn id(&self) -> CostId {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCostRequest {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub batch_id: Option<StockBatchId>,
    pub cost_type: CostType,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCostRequest {
    pub product_id: Option<ProductId>,
    pub batch_id: Option<StockBatchId>,
    pub cost_type: Option<CostType>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub effective_date: Option<NaiveDate>,
}

impl Cost {
    pub fn create(req: CreateCostRequest, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: CostId::new(),
            product_id: req.product_id,
            batch_id: req.batch_id,
            cost_type: req.cost_type,
            amount: validate::non_negative("amount", req.amount)?,
            currency: validate::currency(req.currency.as_deref())?,
            description: validate::optional_text("description", req.description.as_deref(), 1000)?,
            effective_date: req.effective_date,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, req: UpdateCostRequest, now: DateTime<Utc>) -> DomainResult<()> {
        let amount = req.amount.map(|a| validate::non_negative("amount", a)).transpose()?;
        let currency = req
            .currency
            .as_deref()
            .map(|c| validate::currency(Some(c)))
            .transpose()?;
        let description = match req.description.as_deref() {
            Some(d) => Some(validate::optional_text("description", Some(d), 1000)?),
            None => None,
        };

        if let Some(product_id) = req.product_id {
            self.product_id = Some(product_id);
        }
        if let Some(batch_id) = req.batch_id {
            self.batch_id = Some(batch_id);
        }
        if let Some(cost_type) = req.cost_type {
            self.cost_type = cost_type;
        }
        if let Some(amount) = amount {
            self.amount = amount;
        }
        if let Some(currency) = currency {
            self.currency = currency;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if req.effective_date.is_some() {
            self.effective_date = req.effective_date;
        }
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(amount: &str) -> CreateCostRequest {
        CreateCostRequest {
            product_id: None,
            batch_id: None,
            cost_type: CostType::Labor,
            amount: amount.parse().unwrap(),
            currency: None,
            description: Some("potting".into()),
            effective_date: NaiveDate::from_ymd_opt(2024, 3, 1),
        }
    }

    #[test]
    fn currency_defaults_to_usd() {
        let cost = Cost::create(req("12.30"), Utc::now()).unwrap();
        assert_eq!(cost.currency, "USD");
        assert_eq!(cost.cost_type, CostType::Labor);
    }

    #[test]
    fn negative_amount_rejected() {
        assert!(matches!(
            Cost::create(req("-0.01"), Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn update_changes_only_given_fields() {
        let mut cost = Cost::create(req("5"), Utc::now()).unwrap();
        cost.apply_update(
            UpdateCostRequest {
                currency: Some("eur".into()),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(cost.currency, "EUR");
        assert_eq!(cost.amount, Decimal::from(5));
        assert_eq!(cost.description.as_deref(), Some("potting"));
    }

    #[test]
    fn effective_date_serializes_as_plain_date() {
        let cost = Cost::create(req("5"), Utc::now()).unwrap();
        let json = serde_json::to_value(&cost).unwrap();
        assert_eq!(json["effectiveDate"], "2024-03-01");
        assert_eq!(json["costType"], "LABOR");
    }
}
