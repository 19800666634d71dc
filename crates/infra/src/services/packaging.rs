use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use demeter_core::{Page, PageRequest, Record, TenantId};
use demeter_packaging::{CreatePackagingRequest, Packaging, PackagingId, UpdatePackagingRequest};

use super::{ServiceError, ServiceResult};
use crate::store::Store;

#[derive(Clone)]
pub struct PackagingService {
    store: Arc<dyn Store>,
}

impl PackagingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, tenant: &TenantId, page: PageRequest) -> ServiceResult<Page<Packaging>> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.page::<Packaging>(Vec::new(), page).await?)
    }

    pub async fn get(&self, tenant: &TenantId, id: PackagingId) -> ServiceResult<Packaging> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.require::<Packaging>(id).await?)
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant), err)]
    pub async fn create(&self, tenant: &TenantId, req: CreatePackagingRequest) -> ServiceResult<Packaging> {
        let mut tx = self.store.begin(tenant).await?;
        let packaging = Packaging::create(req, Utc::now())?;
        tx.insert(&packaging).await?;
        tx.commit().await?;
        Ok(packaging)
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant), err)]
    pub async fn update(&self, tenant: &TenantId, id: PackagingId, req: UpdatePackagingRequest) -> ServiceResult<Packaging> {
        let mut tx = self.store.begin(tenant).await?;
        let mut packaging = tx.require::<Packaging>(id).await?;
        packaging.apply_update(req, Utc::now())?;
        tx.update(&packaging).await?;
        tx.commit().await?;
        Ok(packaging)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    pub async fn delete(&self, tenant: &TenantId, id: PackagingId) -> ServiceResult<()> {
        let mut tx = self.store.begin(tenant).await?;
        if !tx.delete::<Packaging>(id).await? {
            return Err(ServiceError::not_found(Packaging::ENTITY, id));
        }
        tx.commit().await?;
        Ok(())
    }
}
