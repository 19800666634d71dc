use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use demeter_auth::Principal;
use demeter_core::{Page, PageRequest, Record, TenantId};
use demeter_users::{CreateUserRequest, UpdateUserRequest, User, UserId};

use super::{ServiceError, ServiceResult};
use crate::store::{Filter, Store};

/// Tenant user directory.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, tenant: &TenantId, page: PageRequest) -> ServiceResult<Page<User>> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.page::<User>(Vec::new(), page).await?)
    }

    pub async fn get(&self, tenant: &TenantId, id: UserId) -> ServiceResult<User> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.require::<User>(id).await?)
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant), err)]
    pub async fn create(&self, tenant: &TenantId, req: CreateUserRequest) -> ServiceResult<User> {
        let mut tx = self.store.begin(tenant).await?;
        let user = User::create(req, Utc::now())?;
        tx.insert(&user).await?;
        tx.commit().await?;
        Ok(user)
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant), err)]
    pub async fn update(&self, tenant: &TenantId, id: UserId, req: UpdateUserRequest) -> ServiceResult<User> {
        let mut tx = self.store.begin(tenant).await?;
        let mut user = tx.require::<User>(id).await?;
        user.apply_update(req, Utc::now())?;
        tx.update(&user).await?;
        tx.commit().await?;
        Ok(user)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    pub async fn delete(&self, tenant: &TenantId, id: UserId) -> ServiceResult<()> {
        let mut tx = self.store.begin(tenant).await?;
        if !tx.delete::<User>(id).await? {
            return Err(ServiceError::not_found(User::ENTITY, id));
        }
        tx.commit().await?;
        Ok(())
    }

    /// The caller's profile, created on first sight. Every call records a login.
    #[instrument(skip(self, principal), fields(tenant_id = %principal.tenant_id, user_id = %principal.user_id), err)]
    pub async fn me(&self, principal: &Principal) -> ServiceResult<User> {
        let now = Utc::now();
        let mut tx = self.store.begin(&principal.tenant_id).await?;
        let existing = tx
            .find_one::<User>(vec![Filter::eq("externalId", &principal.user_id)])
            .await?;
        let user = match existing {
            Some(mut user) => {
                if !user.active {
                    return Err(ServiceError::Forbidden);
                }
                user.record_login(now);
                tx.update(&user).await?;
                user
            }
            None => {
                let user = User::provision(principal, now)?;
                tx.insert(&user).await?;
                tracing::info!(user_id = %user.id, role = %user.role, "user provisioned on first login");
                user
            }
        };
        tx.commit().await?;
        Ok(user)
    }
}
