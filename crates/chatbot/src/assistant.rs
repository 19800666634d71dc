use std::fmt::Write as _;

use rust_decimal::Decimal;

use demeter_analytics::{ExpiringBatch, SalesSummary, StockSummary};

const LISTED_ITEMS: usize = 5;

/// Look-back window of the sales figures in [`AssistantContext::sales`].
pub const SALES_WINDOW_DAYS: i64 = 30;

/// What the user is asking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Stock,
    Expiring,
    Sales,
    Help,
}

/// Analytics snapshot the assistant answers from.
#[derive(Debug, Clone)]
pub struct AssistantContext {
    pub stock: StockSummary,
    pub expiring: Vec<ExpiringBatch>,
    pub expiry_window_days: u32,
    pub sales: SalesSummary,
}

const EXPIRING_KEYWORDS: &[&str] = &["expir", "venc", "caduc", "fefo", "spoil"];
const SALES_KEYWORDS: &[&str] = &["sale", "sold", "revenue", "venta", "vend", "ingreso"];
const STOCK_KEYWORDS: &[&str] = &["stock", "inventor", "inventar", "quantity", "how many", "existencia", "cantidad", "cuánto", "cuanto"];
const HELP_KEYWORDS: &[&str] = &["help", "ayuda", "what can you"];

/// Keyword intent detection (English and Spanish).
///
/// Expiry is checked before stock so "which stock expires soon" is an expiry
/// question.
pub fn detect_intent(message: &str) -> Intent {
    let text = message.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| text.contains(w));
    if has(HELP_KEYWORDS) {
        Intent::Help
    } else if has(EXPIRING_KEYWORDS) {
        Intent::Expiring
    } else if has(SALES_KEYWORDS) {
        Intent::Sales
    } else if has(STOCK_KEYWORDS) {
        Intent::Stock
    } else {
        Intent::Help
    }
}

pub fn reply(context: &AssistantContext, message: &str) -> String {
    match detect_intent(message) {
        Intent::Stock => stock_reply(&context.stock),
        Intent::Expiring => expiring_reply(&context.expiring, context.expiry_window_days),
        Intent::Sales => sales_reply(&context.sales),
        Intent::Help => help_reply(),
    }
}

fn stock_reply(stock: &StockSummary) -> String {
    if stock.total_batches == 0 {
        return "There is no stock recorded yet.".to_string();
    }
    let mut out = format!(
        "You have {} units available across {} active batches ({} products).",
        stock.total_active_quantity.normalize(),
        stock.active_batches,
        stock.total_products
    );
    let mut top: Vec<_> = stock
        .products
        .iter()
        .filter(|p| p.active_quantity > Decimal::ZERO)
        .collect();
    top.sort_by(|a, b| b.active_quantity.cmp(&a.active_quantity));
    for p in top.into_iter().take(LISTED_ITEMS) {
        let label = p.sku.as_deref().unwrap_or("unknown product");
        let _ = write!(out, "\n- {label}: {}", p.active_quantity.normalize());
    }
    out
}

fn expiring_reply(expiring: &[ExpiringBatch], days: u32) -> String {
    if expiring.is_empty() {
        return format!("No batches expire in the next {days} days.");
    }
    let mut out = format!("{} batches expire in the next {days} days:", expiring.len());
    for b in expiring.iter().take(LISTED_ITEMS) {
        let _ = write!(
            out,
            "\n- {} ({} {}) expires {} (in {} days)",
            b.batch_code,
            b.quantity.normalize(),
            b.unit,
            b.expiry_date.format("%Y-%m-%d"),
            b.days_until_expiry
        );
    }
    out
}

fn sales_reply(sales: &SalesSummary) -> String {
    if sales.total_sales == 0 {
        return format!("No sales were recorded in the last {SALES_WINDOW_DAYS} days.");
    }
    format!(
        "In the last {SALES_WINDOW_DAYS} days: {} sales ({} completed, {} pending, {} cancelled). Revenue {} with an average ticket of {}.",
        sales.total_sales,
        sales.completed,
        sales.pending,
        sales.cancelled,
        sales.revenue.normalize(),
        sales.average_ticket.normalize()
    )
}

fn help_reply() -> String {
    "I can answer questions about current stock levels, batches that are about to expire, \
     and recent sales. Try \"how much stock do we have?\" or \"¿qué lotes vencen pronto?\"."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use demeter_analytics::{expiring_batches, sales_summary, stock_summary};
    use demeter_inventory::{CreateStockBatchRequest, StockBatch};
    use demeter_products::{CreateProductRequest, Product};

    fn context() -> AssistantContext {
        let now = Utc::now();
        let product = Product::create(
            CreateProductRequest {
                sku: "FERN-12".into(),
                name: "Boston fern".into(),
                description: None,
                category_id: None,
                state: None,
                custom_attributes: None,
            },
            now,
        )
        .unwrap();
        let batch = StockBatch::create(
            CreateStockBatchRequest {
                product_id: product.id,
                batch_code: "LOT-7".into(),
                quantity: Decimal::from(12),
                unit: "pots".into(),
                warehouse_id: None,
                bin_id: None,
                custom_attributes: None,
                entry_date: None,
                expiry_date: Some(now + Duration::days(5)),
            },
            now,
        )
        .unwrap();
        let batches = vec![batch];
        AssistantContext {
            stock: stock_summary(&[product], &batches, now).unwrap(),
            expiring: expiring_batches(&batches, now, 30),
            expiry_window_days: 30,
            sales: sales_summary(&[], Some(now - Duration::days(SALES_WINDOW_DAYS)), None).unwrap(),
        }
    }

    #[test]
    fn detects_english_and_spanish_intents() {
        assert_eq!(detect_intent("How much stock is left?"), Intent::Stock);
        assert_eq!(detect_intent("¿Cuánto inventario tenemos?"), Intent::Stock);
        assert_eq!(detect_intent("Which batches expire soon?"), Intent::Expiring);
        assert_eq!(detect_intent("¿Qué lotes vencen esta semana?"), Intent::Expiring);
        assert_eq!(detect_intent("Show me last month's revenue"), Intent::Sales);
        assert_eq!(detect_intent("ventas del mes"), Intent::Sales);
        assert_eq!(detect_intent("ayuda"), Intent::Help);
        assert_eq!(detect_intent("good morning"), Intent::Help);
    }

    #[test]
    fn stock_reply_lists_products() {
        let text = reply(&context(), "what's in stock?");
        assert!(text.contains("12 units"), "{text}");
        assert!(text.contains("FERN-12"), "{text}");
    }

    #[test]
    fn expiring_reply_names_batches() {
        let text = reply(&context(), "anything expiring?");
        assert!(text.contains("LOT-7"), "{text}");
    }

    #[test]
    fn sales_reply_handles_empty_period() {
        let text = reply(&context(), "sales?");
        assert!(text.contains("No sales"), "{text}");
    }
}
