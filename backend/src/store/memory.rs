//! In-memory store implementation, used by tests and local tooling

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::query::{compare_on, matches};
use super::{Direction, Entity, Query, Store, StoreResult};

type Table = HashMap<Uuid, Value>;

/// A table-scoped in-memory store over serialized records
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<&'static str, Table>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held for an entity's table
    pub async fn count<T: Entity>(&self) -> usize {
        let tables = self.tables.read().await;
        tables.get(T::TABLE).map(|t| t.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_all<T: Entity>(&self, query: Query) -> StoreResult<Vec<T>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Value> = tables
            .get(T::TABLE)
            .map(|table| {
                table
                    .values()
                    .filter(|row| matches(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        match &query.order_by {
            Some(field) => rows.sort_by(|a, b| {
                let ord = compare_on(a, b, field);
                match query.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            }),
            // Deterministic fallback order for unordered scans
            None => rows.sort_by(|a, b| compare_on(a, b, "created_at").then(compare_on(a, b, "id"))),
        }

        let rows: Vec<Value> = match query.limit {
            Some(limit) => rows
                .into_iter()
                .skip(query.page * limit)
                .take(limit)
                .collect(),
            None => rows,
        };

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(Into::into))
            .collect()
    }

    async fn get_by_id<T: Entity>(&self, id: Uuid) -> StoreResult<Option<T>> {
        let tables = self.tables.read().await;
        match tables.get(T::TABLE).and_then(|table| table.get(&id)) {
            Some(row) => Ok(Some(serde_json::from_value(row.clone())?)),
            None => Ok(None),
        }
    }

    async fn create<T: Entity>(&self, record: T) -> StoreResult<T> {
        let row = serde_json::to_value(&record)?;
        let mut tables = self.tables.write().await;
        tables.entry(T::TABLE).or_default().insert(record.id(), row);
        Ok(record)
    }

    async fn update<T: Entity>(&self, record: T) -> StoreResult<Option<T>> {
        let row = serde_json::to_value(&record)?;
        let mut tables = self.tables.write().await;
        let table = tables.entry(T::TABLE).or_default();
        if !table.contains_key(&record.id()) {
            return Ok(None);
        }
        table.insert(record.id(), row);
        Ok(Some(record))
    }

    async fn delete<T: Entity>(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(table) = tables.get_mut(T::TABLE) {
            table.remove(&id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::models::{MarketSupplier, SupplierLabel};

    fn supplier(name: &str) -> MarketSupplier {
        MarketSupplier {
            id: Uuid::new_v4(),
            name: name.to_string(),
            label: SupplierLabel::Food,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_get_update_delete_roundtrip() {
        let store = MemoryStore::new();
        let s = store.create(supplier("Metro")).await.unwrap();

        let loaded: Option<MarketSupplier> = store.get_by_id(s.id).await.unwrap();
        assert_eq!(loaded.unwrap().name, "Metro");

        let mut renamed = s.clone();
        renamed.name = "Metro France".to_string();
        assert!(store.update(renamed).await.unwrap().is_some());

        store.delete::<MarketSupplier>(s.id).await.unwrap();
        let gone: Option<MarketSupplier> = store.get_by_id(s.id).await.unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn update_missing_row_returns_none() {
        let store = MemoryStore::new();
        let absent = store.update(supplier("Ghost")).await.unwrap();
        assert!(absent.is_none());
    }

    #[tokio::test]
    async fn filters_ordering_and_pagination() {
        let store = MemoryStore::new();
        for name in ["B", "A", "C"] {
            store.create(supplier(name)).await.unwrap();
        }
        let all: Vec<MarketSupplier> = store
            .get_all(Query::new().order_by("name", Direction::Asc))
            .await
            .unwrap();
        let names: Vec<_> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);

        let second_page: Vec<MarketSupplier> = store
            .get_all(
                Query::new()
                    .order_by("name", Direction::Asc)
                    .limit(2)
                    .page(1),
            )
            .await
            .unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].name, "C");

        let filtered: Vec<MarketSupplier> = store
            .get_all(Query::new().neq("name", "B"))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 2);
    }
}
