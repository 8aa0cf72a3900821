//! PostgreSQL store implementation.
//!
//! Records live in a single `records(table_name, id, data jsonb)` table;
//! filters compile to `data->>'field'` comparisons on the text form. The
//! engine only range-filters ISO-formatted dates, which compare correctly
//! as text.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::query::FilterOp;
use super::{Direction, Entity, Query, Store, StoreResult};

/// Store backed by PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn operator(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => "=",
        FilterOp::Neq => "<>",
        FilterOp::Gte => ">=",
        FilterOp::Lte => "<=",
        FilterOp::Like => "LIKE",
    }
}

/// Text form bound for a `data->>'field'` comparison
fn bind_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_all<T: Entity>(&self, query: Query) -> StoreResult<Vec<T>> {
        let mut sql = String::from("SELECT data FROM records WHERE table_name = $1");
        let mut binds: Vec<String> = Vec::new();

        for filter in &query.filters {
            if filter.value.is_null() {
                match filter.op {
                    FilterOp::Neq => {
                        sql.push_str(&format!(" AND data->>'{}' IS NOT NULL", filter.field))
                    }
                    _ => sql.push_str(&format!(" AND data->>'{}' IS NULL", filter.field)),
                }
                continue;
            }
            binds.push(bind_text(&filter.value));
            sql.push_str(&format!(
                " AND data->>'{}' {} ${}",
                filter.field,
                operator(filter.op),
                binds.len() + 1
            ));
        }

        if let Some(field) = &query.order_by {
            let dir = match query.direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            sql.push_str(&format!(" ORDER BY data->>'{}' {}", field, dir));
        } else {
            sql.push_str(" ORDER BY data->>'created_at' ASC, id ASC");
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, query.page * limit));
        }

        let mut q = sqlx::query(&sql).bind(T::TABLE);
        for bind in &binds {
            q = q.bind(bind);
        }
        let rows = q.fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|row| {
                let data: Value = row.get("data");
                serde_json::from_value(data).map_err(Into::into)
            })
            .collect()
    }

    async fn get_by_id<T: Entity>(&self, id: Uuid) -> StoreResult<Option<T>> {
        let row = sqlx::query("SELECT data FROM records WHERE table_name = $1 AND id = $2")
            .bind(T::TABLE)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let data: Value = row.get("data");
                Ok(Some(serde_json::from_value(data)?))
            }
            None => Ok(None),
        }
    }

    async fn create<T: Entity>(&self, record: T) -> StoreResult<T> {
        let data = serde_json::to_value(&record)?;
        sqlx::query("INSERT INTO records (table_name, id, data) VALUES ($1, $2, $3)")
            .bind(T::TABLE)
            .bind(record.id())
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(record)
    }

    async fn update<T: Entity>(&self, record: T) -> StoreResult<Option<T>> {
        let data = serde_json::to_value(&record)?;
        let result = sqlx::query("UPDATE records SET data = $3 WHERE table_name = $1 AND id = $2")
            .bind(T::TABLE)
            .bind(record.id())
            .bind(data)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn delete<T: Entity>(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM records WHERE table_name = $1 AND id = $2")
            .bind(T::TABLE)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
