use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::instrument;

use demeter_core::{Page, PageRequest, Record, TenantId};
use demeter_pricing::{
    CreatePriceListRequest, PriceEntry, PriceList, PriceListId, ResolvedPrice, UpdatePriceListRequest,
    resolve_price,
};
use demeter_products::{Product, ProductId};

use super::{ServiceError, ServiceResult};
use crate::store::{Filter, Store, Tx};

#[derive(Clone)]
pub struct PricingService {
    store: Arc<dyn Store>,
}

async fn check_products(tx: &mut Tx, entries: &[PriceEntry]) -> ServiceResult<()> {
    let mut seen = Vec::new();
    for entry in entries {
        if !seen.contains(&entry.product_id) {
            tx.require::<Product>(entry.product_id).await?;
            seen.push(entry.product_id);
        }
    }
    Ok(())
}

impl PricingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, tenant: &TenantId, page: PageRequest) -> ServiceResult<Page<PriceList>> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.page::<PriceList>(Vec::new(), page).await?)
    }

    pub async fn get(&self, tenant: &TenantId, id: PriceListId) -> ServiceResult<PriceList> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.require::<PriceList>(id).await?)
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant, entries = req.entries.len()), err)]
    pub async fn create(&self, tenant: &TenantId, req: CreatePriceListRequest) -> ServiceResult<PriceList> {
        let mut tx = self.store.begin(tenant).await?;
        check_products(&mut tx, &req.entries).await?;
        let list = PriceList::create(req, Utc::now())?;
        tx.insert(&list).await?;
        tx.commit().await?;
        Ok(list)
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant), err)]
    pub async fn update(&self, tenant: &TenantId, id: PriceListId, req: UpdatePriceListRequest) -> ServiceResult<PriceList> {
        let mut tx = self.store.begin(tenant).await?;
        let mut list = tx.require::<PriceList>(id).await?;
        if let Some(entries) = &req.entries {
            check_products(&mut tx, entries).await?;
        }
        list.apply_update(req, Utc::now())?;
        tx.update(&list).await?;
        tx.commit().await?;
        Ok(list)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    pub async fn delete(&self, tenant: &TenantId, id: PriceListId) -> ServiceResult<()> {
        let mut tx = self.store.begin(tenant).await?;
        if !tx.delete::<PriceList>(id).await? {
            return Err(ServiceError::not_found(PriceList::ENTITY, id));
        }
        tx.commit().await?;
        Ok(())
    }

    /// Unit price of `quantity` units of a product on `date` (today when absent).
    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    pub async fn resolve(
        &self,
        tenant: &TenantId,
        product_id: ProductId,
        quantity: Decimal,
        date: Option<NaiveDate>,
    ) -> ServiceResult<ResolvedPrice> {
        if quantity <= Decimal::ZERO {
            return Err(ServiceError::Validation("quantity must be positive".to_string()));
        }
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        let mut tx = self.store.begin(tenant).await?;
        tx.require::<Product>(product_id).await?;
        let lists = tx.find_all::<PriceList>(vec![Filter::eq("active", true)]).await?;
        resolve_price(&lists, product_id, quantity, date)?
            .ok_or_else(|| ServiceError::not_found("Price", format!("product {product_id} x {quantity} on {date}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{store, tenant};
    use crate::services::ProductService;
    use demeter_products::CreateProductRequest;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn list(name: &str, from: &str, entries: Vec<PriceEntry>) -> CreatePriceListRequest {
        CreatePriceListRequest {
            name: name.into(),
            currency: None,
            valid_from: d(from),
            valid_to: None,
            active: None,
            entries,
        }
    }

    fn tier(product_id: ProductId, min: i64, price: i64) -> PriceEntry {
        PriceEntry {
            product_id,
            min_quantity: Decimal::from(min),
            unit_price: Decimal::from(price),
        }
    }

    #[tokio::test]
    async fn resolves_latest_list_and_highest_tier() {
        let shared = store();
        let t = tenant("tenant-alpha");
        let product = ProductService::new(shared.clone())
            .create(
                &t,
                CreateProductRequest {
                    sku: "BONSAI".into(),
                    name: "Bonsai".into(),
                    description: None,
                    category_id: None,
                    state: None,
                    custom_attributes: None,
                },
            )
            .await
            .unwrap();
        let pricing = PricingService::new(shared);

        pricing
            .create(&t, list("Base", "2026-01-01", vec![tier(product.id, 0, 30), tier(product.id, 10, 25)]))
            .await
            .unwrap();
        let spring = pricing
            .create(&t, list("Spring", "2026-03-01", vec![tier(product.id, 0, 28), tier(product.id, 5, 24)]))
            .await
            .unwrap();

        let price = pricing
            .resolve(&t, product.id, Decimal::from(6), Some(d("2026-04-01")))
            .await
            .unwrap();
        assert_eq!(price.price_list_id, spring.id);
        assert_eq!(price.unit_price, Decimal::from(24));

        let winter = pricing
            .resolve(&t, product.id, Decimal::from(12), Some(d("2026-02-01")))
            .await
            .unwrap();
        assert_eq!(winter.unit_price, Decimal::from(25));

        pricing
            .update(
                &t,
                spring.id,
                UpdatePriceListRequest {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let fallback = pricing
            .resolve(&t, product.id, Decimal::from(6), Some(d("2026-04-01")))
            .await
            .unwrap();
        assert_eq!(fallback.unit_price, Decimal::from(30));

        let none = pricing
            .resolve(&t, product.id, Decimal::from(1), Some(d("2025-06-01")))
            .await
            .unwrap_err();
        assert!(matches!(none, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn entries_must_reference_products() {
        let pricing = PricingService::new(store());
        let err = pricing
            .create(&tenant("tenant-alpha"), list("Base", "2026-01-01", vec![tier(ProductId::new(), 0, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "Product", .. }));
    }
}
