use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use demeter_core::DomainResult;
use demeter_costs::{Cost, CostType};

use crate::accumulate;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostTotal {
    pub cost_type: CostType,
    pub currency: String,
    pub total: Decimal,
    pub entries: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostSummary {
    pub total_entries: u64,
    pub by_type: Vec<CostTotal>,
    /// Amounts are never added across currencies.
    pub by_currency: BTreeMap<String, Decimal>,
}

pub fn cost_summary(costs: &[Cost]) -> DomainResult<CostSummary> {
    let mut by_type: BTreeMap<(CostType, String), CostTotal> = BTreeMap::new();
    let mut by_currency: BTreeMap<String, Decimal> = BTreeMap::new();

    for cost in costs {
        let entry = by_type
            .entry((cost.cost_type, cost.currency.clone()))
            .or_insert_with(|| CostTotal {
                cost_type: cost.cost_type,
                currency: cost.currency.clone(),
                total: Decimal::ZERO,
                entries: 0,
            });
        accumulate(&mut entry.total, cost.amount, "cost")?;
        entry.entries += 1;
        accumulate(by_currency.entry(cost.currency.clone()).or_insert(Decimal::ZERO), cost.amount, "cost")?;
    }

    Ok(CostSummary {
        total_entries: costs.len() as u64,
        by_type: by_type.into_values().collect(),
        by_currency,
    })
}
