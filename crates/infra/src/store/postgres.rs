//! Postgres-backed document store.
//!
//! Each record kind has its own table `(id, tenant_id, data JSONB, created_at,
//! updated_at)`; see `migrations/0001_init.sql`.
//!
//! ## Tenant Isolation
//!
//! Every statement carries an explicit `tenant_id = $n` predicate. On top of
//! that, each transaction sets `app.current_tenant` with `set_config(.., true)`
//! and the tables enforce row level security on it. The setting is
//! transaction-local, so a pooled connection never carries a tenant into the
//! next transaction.
//!
//! ## Error Mapping
//!
//! | SQLx error | Code | StoreError |
//! |------------|------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any | `Database` |
//! | PoolClosed, IO, TLS, ... | n/a | `Database` |

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::{Span, instrument};
use uuid::Uuid;

use demeter_core::TenantId;

use super::{Filter, Query, Session, Store, StoreError, StoreResult, Tx, UniqueKeys, check_identifier};

/// Postgres document store.
///
/// Cheap to clone; the pool is shared.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(url), err)]
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn begin(&self, tenant: &TenantId) -> StoreResult<Tx> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query("SELECT set_config('app.current_tenant', $1, true)")
            .bind(tenant.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_tenant", e))?;

        let session = PgSession {
            tenant: tenant.clone(),
            tx,
        };
        Ok(Tx::new(tenant.clone(), Box::new(session)))
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ping", e))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

struct PgSession {
    tenant: TenantId,
    tx: Transaction<'static, Postgres>,
}

/// `WHERE tenant_id = $1 [AND <filter>]...` for `kind`.
fn push_where<'a>(qb: &mut QueryBuilder<'a, Postgres>, tenant: &TenantId, filters: &'a [Filter]) -> StoreResult<()> {
    qb.push(" WHERE tenant_id = ");
    qb.push_bind(tenant.as_str().to_string());
    for filter in filters {
        filter.validate()?;
        match filter {
            Filter::Eq { field, value } => {
                qb.push(format!(" AND data->>'{field}' = "));
                qb.push_bind(value.as_str());
            }
            Filter::OnOrAfter { field, at } => {
                qb.push(format!(" AND (data->>'{field}')::timestamptz >= "));
                qb.push_bind(*at);
            }
            Filter::Before { field, at } => {
                qb.push(format!(" AND (data->>'{field}')::timestamptz < "));
                qb.push_bind(*at);
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Session for PgSession {
    #[instrument(skip(self), fields(tenant_id = %self.tenant), err)]
    async fn get(&mut self, kind: &'static str, id: Uuid) -> StoreResult<Option<Value>> {
        check_identifier(kind)?;
        let row = sqlx::query(&format!("SELECT data FROM {kind} WHERE tenant_id = $1 AND id = $2"))
            .bind(self.tenant.as_str())
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;

        row.map(|r| {
            r.try_get::<Json<Value>, _>("data")
                .map(|j| j.0)
                .map_err(|e| StoreError::Serialization(format!("failed to read {kind} row: {e}")))
        })
        .transpose()
    }

    /// Uniqueness is enforced by the schema's unique indexes.
    #[instrument(skip(self, _unique, data), fields(tenant_id = %self.tenant), err)]
    async fn insert(&mut self, kind: &'static str, id: Uuid, _unique: UniqueKeys, data: Value) -> StoreResult<()> {
        check_identifier(kind)?;
        sqlx::query(&format!("INSERT INTO {kind} (id, tenant_id, data) VALUES ($1, $2, $3)"))
            .bind(id)
            .bind(self.tenant.as_str())
            .bind(Json(data))
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(&format!("insert {kind}"), e))?;
        Ok(())
    }

    #[instrument(skip(self, _unique, data), fields(tenant_id = %self.tenant), err)]
    async fn update(&mut self, kind: &'static str, id: Uuid, _unique: UniqueKeys, data: Value) -> StoreResult<()> {
        check_identifier(kind)?;
        let result = sqlx::query(&format!(
            "UPDATE {kind} SET data = $3, updated_at = now() WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(self.tenant.as_str())
        .bind(id)
        .bind(Json(data))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error(&format!("update {kind}"), e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: kind,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self), fields(tenant_id = %self.tenant), err)]
    async fn delete(&mut self, kind: &'static str, id: Uuid) -> StoreResult<bool> {
        check_identifier(kind)?;
        let result = sqlx::query(&format!("DELETE FROM {kind} WHERE tenant_id = $1 AND id = $2"))
            .bind(self.tenant.as_str())
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(&format!("delete {kind}"), e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, query), fields(tenant_id = %self.tenant, rows), err)]
    async fn find(&mut self, kind: &'static str, query: &Query) -> StoreResult<Vec<Value>> {
        check_identifier(kind)?;
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT data FROM {kind}"));
        push_where(&mut qb, &self.tenant, &query.filters)?;
        qb.push(" ORDER BY created_at, id");
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ");
            qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if query.offset > 0 {
            qb.push(" OFFSET ");
            qb.push_bind(i64::try_from(query.offset).unwrap_or(i64::MAX));
        }

        let rows = qb
            .build()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(&format!("find {kind}"), e))?;

        Span::current().record("rows", rows.len());
        rows.into_iter()
            .map(|r| {
                r.try_get::<Json<Value>, _>("data")
                    .map(|j| j.0)
                    .map_err(|e| StoreError::Serialization(format!("failed to read {kind} row: {e}")))
            })
            .collect()
    }

    #[instrument(skip(self, filters), fields(tenant_id = %self.tenant), err)]
    async fn count(&mut self, kind: &'static str, filters: &[Filter]) -> StoreResult<u64> {
        check_identifier(kind)?;
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) AS total FROM {kind}"));
        push_where(&mut qb, &self.tenant, filters)?;
        let row = qb
            .build()
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(&format!("count {kind}"), e))?;
        let total: i64 = row
            .try_get("total")
            .map_err(|e| StoreError::Database(format!("failed to read count: {e}")))?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Database(format!("connection pool closed in {operation}")),
        other => StoreError::Database(format!("sqlx error in {operation}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use demeter_core::Record;
    use demeter_products::{CreateProductRequest, Product};

    const SCHEMA: &str = include_str!("../../../../migrations/0001_init.sql");

    async fn store() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let store = PgStore::connect(&url, 5).await.unwrap();
        sqlx::raw_sql(SCHEMA).execute(store.pool()).await.unwrap();
        store
    }

    fn product(sku: &str) -> Product {
        Product::create(
            CreateProductRequest {
                sku: sku.into(),
                name: "Pg test".into(),
                description: None,
                category_id: None,
                state: None,
                custom_attributes: None,
            },
            chrono::Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires database connection"]
    async fn rows_are_tenant_scoped() {
        let store = store().await;
        let alpha = TenantId::parse(format!("pg-alpha-{}", Uuid::now_v7().simple())).unwrap();
        let beta = TenantId::parse(format!("pg-beta-{}", Uuid::now_v7().simple())).unwrap();
        let p = product("PG-ISO-1");

        let mut tx = store.begin(&alpha).await.unwrap();
        tx.insert(&p).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin(&beta).await.unwrap();
        assert!(tx.get::<Product>(p.id).await.unwrap().is_none());
        tx.insert(&product("PG-ISO-1")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin(&alpha).await.unwrap();
        let err = tx.insert(&product("PG-ISO-1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    #[ignore = "requires database connection"]
    async fn uncommitted_changes_are_discarded() {
        let store = store().await;
        let tenant = TenantId::parse(format!("pg-rb-{}", Uuid::now_v7().simple())).unwrap();
        let p = product("PG-RB-1");
        {
            let mut tx = store.begin(&tenant).await.unwrap();
            tx.insert(&p).await.unwrap();
        }
        let mut tx = store.begin(&tenant).await.unwrap();
        assert!(tx.get::<Product>(p.id).await.unwrap().is_none());
        assert_eq!(tx.count::<Product>(&[Filter::eq("sku", "PG-RB-1")]).await.unwrap(), 0);
        assert_eq!(Product::KIND, "products");
    }

    #[tokio::test]
    #[ignore = "requires database connection"]
    async fn ping_succeeds() {
        store().await.ping().await.unwrap();
    }
}
