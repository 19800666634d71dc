use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use demeter_core::TenantId;

use super::query::field_text;
use super::{Filter, Query, Session, Store, StoreError, StoreResult, Tx, UniqueKeys};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TableKey {
    tenant: TenantId,
    kind: &'static str,
}

#[derive(Debug, Clone)]
struct Row {
    seq: u64,
    data: Value,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<TableKey, HashMap<Uuid, Row>>,
    next_seq: u64,
}

/// In-memory document store for development and tests.
///
/// Transactions are serialized through one async mutex. Writes go straight to
/// the shared state and are undone on drop unless committed, so a failed
/// operation never leaves partial changes behind.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self, tenant: &TenantId) -> StoreResult<Tx> {
        let guard = self.state.clone().lock_owned().await;
        let session = MemorySession {
            tenant: tenant.clone(),
            state: guard,
            undo: Vec::new(),
            committed: false,
        };
        Ok(Tx::new(tenant.clone(), Box::new(session)))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Previous value of a row touched by the transaction (`None` = did not exist).
struct Undo {
    kind: &'static str,
    id: Uuid,
    previous: Option<Row>,
}

struct MemorySession {
    tenant: TenantId,
    state: OwnedMutexGuard<State>,
    undo: Vec<Undo>,
    committed: bool,
}

impl MemorySession {
    fn key(&self, kind: &'static str) -> TableKey {
        TableKey {
            tenant: self.tenant.clone(),
            kind,
        }
    }

    fn table(&self, kind: &'static str) -> Option<&HashMap<Uuid, Row>> {
        self.state.tables.get(&self.key(kind))
    }

    /// Matching rows of this tenant in insertion order.
    fn scan(&self, kind: &'static str, filters: &[Filter]) -> Vec<&Row> {
        let mut rows: Vec<&Row> = self
            .table(kind)
            .map(|t| {
                t.values()
                    .filter(|r| filters.iter().all(|f| f.matches(&r.data)))
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by_key(|r| r.seq);
        rows
    }

    fn check_unique(&self, kind: &'static str, id: Uuid, unique: UniqueKeys, data: &Value) -> StoreResult<()> {
        let Some(table) = self.table(kind) else {
            return Ok(());
        };
        for fields in unique {
            let Some(values) = fields
                .iter()
                .map(|f| data.get(*f).and_then(field_text))
                .collect::<Option<Vec<_>>>()
            else {
                // A null member never collides, as in a SQL unique index.
                continue;
            };
            let clash = table.iter().any(|(other_id, row)| {
                *other_id != id
                    && fields
                        .iter()
                        .zip(&values)
                        .all(|(f, v)| row.data.get(*f).and_then(field_text).as_ref() == Some(v))
            });
            if clash {
                return Err(StoreError::Conflict(format!(
                    "{kind}: duplicate {} '{}'",
                    fields.join("+"),
                    values.join("+")
                )));
            }
        }
        Ok(())
    }

    fn write(&mut self, kind: &'static str, id: Uuid, row: Option<Row>) -> Option<Row> {
        let key = self.key(kind);
        let table = self.state.tables.entry(key).or_default();
        let previous = match row {
            Some(row) => table.insert(id, row),
            None => table.remove(&id),
        };
        self.undo.push(Undo {
            kind,
            id,
            previous: previous.clone(),
        });
        previous
    }

    fn rollback(&mut self) {
        while let Some(undo) = self.undo.pop() {
            let key = self.key(undo.kind);
            let table = self.state.tables.entry(key).or_default();
            match undo.previous {
                Some(row) => {
                    table.insert(undo.id, row);
                }
                None => {
                    table.remove(&undo.id);
                }
            }
        }
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn get(&mut self, kind: &'static str, id: Uuid) -> StoreResult<Option<Value>> {
        Ok(self.table(kind).and_then(|t| t.get(&id)).map(|r| r.data.clone()))
    }

    async fn insert(&mut self, kind: &'static str, id: Uuid, unique: UniqueKeys, data: Value) -> StoreResult<()> {
        if self.table(kind).is_some_and(|t| t.contains_key(&id)) {
            return Err(StoreError::Conflict(format!("{kind}: duplicate id {id}")));
        }
        self.check_unique(kind, id, unique, &data)?;
        let seq = self.state.next_seq;
        self.state.next_seq += 1;
        self.write(kind, id, Some(Row { seq, data }));
        Ok(())
    }

    async fn update(&mut self, kind: &'static str, id: Uuid, unique: UniqueKeys, data: Value) -> StoreResult<()> {
        let Some(seq) = self.table(kind).and_then(|t| t.get(&id)).map(|r| r.seq) else {
            return Err(StoreError::NotFound {
                entity: kind,
                id: id.to_string(),
            });
        };
        self.check_unique(kind, id, unique, &data)?;
        self.write(kind, id, Some(Row { seq, data }));
        Ok(())
    }

    async fn delete(&mut self, kind: &'static str, id: Uuid) -> StoreResult<bool> {
        if !self.table(kind).is_some_and(|t| t.contains_key(&id)) {
            return Ok(false);
        }
        self.write(kind, id, None);
        Ok(true)
    }

    async fn find(&mut self, kind: &'static str, query: &Query) -> StoreResult<Vec<Value>> {
        query.validate()?;
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(self
            .scan(kind, &query.filters)
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|r| r.data.clone())
            .collect())
    }

    async fn count(&mut self, kind: &'static str, filters: &[Filter]) -> StoreResult<u64> {
        filters.iter().try_for_each(Filter::validate)?;
        Ok(self.scan(kind, filters).len() as u64)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut this = self;
        this.committed = true;
        this.undo.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SKU: UniqueKeys = &[&["sku"]];

    fn tenant(name: &str) -> TenantId {
        TenantId::parse(name).unwrap()
    }

    async fn session(store: &InMemoryStore, t: &str) -> Box<MemorySession> {
        let guard = store.state.clone().lock_owned().await;
        Box::new(MemorySession {
            tenant: tenant(t),
            state: guard,
            undo: Vec::new(),
            committed: false,
        })
    }

    #[tokio::test]
    async fn tenants_do_not_see_each_other() {
        let store = InMemoryStore::new();
        let id = Uuid::now_v7();

        let mut a = session(&store, "tenant-alpha").await;
        a.insert("products", id, SKU, json!({"sku": "ISO-001"})).await.unwrap();
        a.commit().await.unwrap();

        let mut b = session(&store, "tenant-beta").await;
        assert!(b.get("products", id).await.unwrap().is_none());
        assert_eq!(b.count("products", &[]).await.unwrap(), 0);
        // Same SKU is fine in another tenant.
        b.insert("products", Uuid::now_v7(), SKU, json!({"sku": "ISO-001"})).await.unwrap();
    }

    #[tokio::test]
    async fn unique_keys_conflict_within_tenant() {
        let store = InMemoryStore::new();
        let mut s = session(&store, "tenant-alpha").await;
        s.insert("products", Uuid::now_v7(), SKU, json!({"sku": "A"})).await.unwrap();
        let err = s.insert("products", Uuid::now_v7(), SKU, json!({"sku": "A"})).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        // Null keys never collide.
        s.insert("products", Uuid::now_v7(), SKU, json!({"sku": null})).await.unwrap();
        s.insert("products", Uuid::now_v7(), SKU, json!({"sku": null})).await.unwrap();
    }

    #[tokio::test]
    async fn dropped_session_rolls_back() {
        let store = InMemoryStore::new();
        let id = Uuid::now_v7();
        {
            let mut s = session(&store, "tenant-alpha").await;
            s.insert("products", id, SKU, json!({"sku": "A"})).await.unwrap();
            s.commit().await.unwrap();
        }
        {
            let mut s = session(&store, "tenant-alpha").await;
            s.update("products", id, SKU, json!({"sku": "B"})).await.unwrap();
            s.insert("products", Uuid::now_v7(), SKU, json!({"sku": "C"})).await.unwrap();
            assert!(s.delete("products", id).await.unwrap());
        }
        let mut s = session(&store, "tenant-alpha").await;
        assert_eq!(s.get("products", id).await.unwrap(), Some(json!({"sku": "A"})));
        assert_eq!(s.count("products", &[]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn find_keeps_insertion_order_and_windows() {
        let store = InMemoryStore::new();
        let mut s = session(&store, "tenant-alpha").await;
        for i in 0..5 {
            s.insert("costs", Uuid::now_v7(), &[], json!({"n": i, "type": if i % 2 == 0 { "EVEN" } else { "ODD" }}))
                .await
                .unwrap();
        }
        let evens = s
            .find("costs", &Query::filtered(vec![Filter::eq("type", "EVEN")]))
            .await
            .unwrap();
        assert_eq!(evens.iter().map(|d| d["n"].as_i64().unwrap()).collect::<Vec<_>>(), vec![0, 2, 4]);

        let window = s.find("costs", &Query::all().window(1, 2)).await.unwrap();
        assert_eq!(window.iter().map(|d| d["n"].as_i64().unwrap()).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let store = InMemoryStore::new();
        let mut s = session(&store, "tenant-alpha").await;
        let err = s.update("products", Uuid::now_v7(), SKU, json!({})).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
