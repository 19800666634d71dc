use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use demeter_core::{Page, PageRequest, Record, TenantId};
use demeter_inventory::StockBatch;
use demeter_products::{
    Category, CategoryId, CreateCategoryRequest, CreateProductRequest, Product, ProductId,
    UpdateCategoryRequest, UpdateProductRequest, would_create_cycle,
};

use super::{ServiceError, ServiceResult};
use crate::store::{Filter, Store, Tx};

/// Product catalog.
#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn Store>,
}

impl ProductService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    #[instrument(skip(self), fields(tenant_id = %tenant))]
    pub async fn list(&self, tenant: &TenantId, page: PageRequest) -> ServiceResult<Page<Product>> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.page::<Product>(Vec::new(), page).await?)
    }

    pub async fn get(&self, tenant: &TenantId, id: ProductId) -> ServiceResult<Product> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.require::<Product>(id).await?)
    }

    pub async fn get_by_sku(&self, tenant: &TenantId, sku: &str) -> ServiceResult<Product> {
        let mut tx = self.store.begin(tenant).await?;
        tx.find_one::<Product>(vec![Filter::eq("sku", sku.trim())])
            .await?
            .ok_or_else(|| ServiceError::not_found(Product::ENTITY, sku))
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant, sku = %req.sku), err)]
    pub async fn create(&self, tenant: &TenantId, req: CreateProductRequest) -> ServiceResult<Product> {
        let mut tx = self.store.begin(tenant).await?;
        if let Some(category_id) = req.category_id {
            tx.require::<Category>(category_id).await?;
        }
        let product = Product::create(req, Utc::now())?;
        tx.insert(&product).await?;
        tx.commit().await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant), err)]
    pub async fn update(&self, tenant: &TenantId, id: ProductId, req: UpdateProductRequest) -> ServiceResult<Product> {
        let mut tx = self.store.begin(tenant).await?;
        let mut product = tx.require::<Product>(id).await?;
        if let Some(category_id) = req.category_id {
            tx.require::<Category>(category_id).await?;
        }
        product.apply_update(req, Utc::now())?;
        tx.update(&product).await?;
        tx.commit().await?;
        Ok(product)
    }

    /// Refused while stock batches of the product exist.
    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    pub async fn delete(&self, tenant: &TenantId, id: ProductId) -> ServiceResult<()> {
        let mut tx = self.store.begin(tenant).await?;
        tx.require::<Product>(id).await?;
        if tx.exists::<StockBatch>(&[Filter::eq("productId", id)]).await? {
            return Err(ServiceError::Conflict(format!("product {id} still has stock batches")));
        }
        tx.delete::<Product>(id).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Product categories (a forest via `parentId`).
#[derive(Clone)]
pub struct CategoryService {
    store: Arc<dyn Store>,
}

impl CategoryService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, tenant: &TenantId, page: PageRequest) -> ServiceResult<Page<Category>> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.page::<Category>(Vec::new(), page).await?)
    }

    pub async fn get(&self, tenant: &TenantId, id: CategoryId) -> ServiceResult<Category> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.require::<Category>(id).await?)
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant), err)]
    pub async fn create(&self, tenant: &TenantId, req: CreateCategoryRequest) -> ServiceResult<Category> {
        let mut tx = self.store.begin(tenant).await?;
        if let Some(parent_id) = req.parent_id {
            tx.require::<Category>(parent_id).await?;
        }
        let category = Category::create(req, Utc::now())?;
        tx.insert(&category).await?;
        tx.commit().await?;
        Ok(category)
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant), err)]
    pub async fn update(&self, tenant: &TenantId, id: CategoryId, req: UpdateCategoryRequest) -> ServiceResult<Category> {
        let mut tx = self.store.begin(tenant).await?;
        let mut category = tx.require::<Category>(id).await?;
        if let Some(parent_id) = req.parent_id {
            ensure_acyclic(&mut tx, id, parent_id).await?;
        }
        category.apply_update(req, Utc::now())?;
        tx.update(&category).await?;
        tx.commit().await?;
        Ok(category)
    }

    /// Refused while products or child categories reference the category.
    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    pub async fn delete(&self, tenant: &TenantId, id: CategoryId) -> ServiceResult<()> {
        let mut tx = self.store.begin(tenant).await?;
        tx.require::<Category>(id).await?;
        if tx.exists::<Product>(&[Filter::eq("categoryId", id)]).await? {
            return Err(ServiceError::Conflict(format!("category {id} is assigned to products")));
        }
        if tx.exists::<Category>(&[Filter::eq("parentId", id)]).await? {
            return Err(ServiceError::Conflict(format!("category {id} has child categories")));
        }
        tx.delete::<Category>(id).await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn ensure_acyclic(tx: &mut Tx, id: CategoryId, parent_id: CategoryId) -> ServiceResult<()> {
    tx.require::<Category>(parent_id).await?;
    let all = tx.find_all::<Category>(Vec::new()).await?;
    if would_create_cycle(&all, id, parent_id) {
        return Err(ServiceError::Validation(format!(
            "category {parent_id} cannot be the parent of {id}: it would create a cycle"
        )));
    }
    Ok(())
}
