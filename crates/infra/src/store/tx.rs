use serde_json::Value;
use tracing::instrument;

use demeter_core::{Page, PageRequest, Record, TenantId};

use super::{Filter, Query, Session, StoreError, StoreResult};

/// Typed view over a [`Session`].
///
/// Dropping a `Tx` without calling [`Tx::commit`] discards its changes.
pub struct Tx {
    tenant: TenantId,
    session: Box<dyn Session>,
}

impl std::fmt::Debug for Tx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tx").field("tenant", &self.tenant).finish_non_exhaustive()
    }
}

fn encode<T: Record>(record: &T) -> StoreResult<Value> {
    serde_json::to_value(record).map_err(|e| StoreError::Serialization(format!("{}: {e}", T::ENTITY)))
}

fn decode<T: Record>(data: Value) -> StoreResult<T> {
    serde_json::from_value(data).map_err(|e| StoreError::Serialization(format!("{}: {e}", T::ENTITY)))
}

impl Tx {
    pub fn new(tenant: TenantId, session: Box<dyn Session>) -> Self {
        Self { tenant, session }
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    pub async fn get<T: Record>(&mut self, id: T::Id) -> StoreResult<Option<T>> {
        match self.session.get(T::KIND, id.into()).await? {
            Some(data) => Ok(Some(decode(data)?)),
            None => Ok(None),
        }
    }

    /// Like [`Tx::get`] but absence is an error.
    pub async fn require<T: Record>(&mut self, id: T::Id) -> StoreResult<T> {
        self.get::<T>(id).await?.ok_or_else(|| StoreError::NotFound {
            entity: T::ENTITY,
            id: id.to_string(),
        })
    }

    pub async fn insert<T: Record>(&mut self, record: &T) -> StoreResult<()> {
        let data = encode(record)?;
        self.session.insert(T::KIND, record.id().into(), T::UNIQUE, data).await
    }

    pub async fn update<T: Record>(&mut self, record: &T) -> StoreResult<()> {
        let data = encode(record)?;
        match self.session.update(T::KIND, record.id().into(), T::UNIQUE, data).await {
            Err(StoreError::NotFound { .. }) => Err(StoreError::NotFound {
                entity: T::ENTITY,
                id: record.id().to_string(),
            }),
            other => other,
        }
    }

    pub async fn delete<T: Record>(&mut self, id: T::Id) -> StoreResult<bool> {
        self.session.delete(T::KIND, id.into()).await
    }

    pub async fn find<T: Record>(&mut self, query: &Query) -> StoreResult<Vec<T>> {
        self.session
            .find(T::KIND, query)
            .await?
            .into_iter()
            .map(decode::<T>)
            .collect()
    }

    pub async fn find_all<T: Record>(&mut self, filters: Vec<Filter>) -> StoreResult<Vec<T>> {
        self.find(&Query::filtered(filters)).await
    }

    /// First match in insertion order.
    pub async fn find_one<T: Record>(&mut self, filters: Vec<Filter>) -> StoreResult<Option<T>> {
        let query = Query::filtered(filters).window(0, 1);
        Ok(self.find::<T>(&query).await?.into_iter().next())
    }

    pub async fn count<T: Record>(&mut self, filters: &[Filter]) -> StoreResult<u64> {
        self.session.count(T::KIND, filters).await
    }

    pub async fn exists<T: Record>(&mut self, filters: &[Filter]) -> StoreResult<bool> {
        Ok(self.count::<T>(filters).await? > 0)
    }

    #[instrument(skip(self, filters), fields(tenant_id = %self.tenant, kind = T::KIND), err)]
    pub async fn page<T: Record>(&mut self, filters: Vec<Filter>, request: PageRequest) -> StoreResult<Page<T>> {
        let total = self.count::<T>(&filters).await?;
        let query = Query::filtered(filters).window(request.offset(), u64::from(request.size()));
        let content = self.find::<T>(&query).await?;
        Ok(Page::of(content, request, total))
    }

    pub async fn commit(self) -> StoreResult<()> {
        self.session.commit().await
    }
}
