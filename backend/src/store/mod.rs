//! Persistence collaborator: a table-scoped store exposing filtered
//! get-all, get-by-id, create, update and delete per logical table.
//!
//! The engine is written against the [`Store`] trait; [`MemoryStore`] backs
//! every test and [`PgStore`] backs the job-runner binary. Records travel as
//! their typed entities and are matched against filters in serialized form,
//! so both implementations share one query vocabulary.

mod entities;
pub mod memory;
pub mod postgres;
pub mod query;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use query::{Direction, Filter, FilterOp, Query};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Store-boundary errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A persisted record type bound to one logical table
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const TABLE: &'static str;

    fn id(&self) -> Uuid;
}

/// The persistence collaborator contract.
///
/// `update` replaces the whole record and returns `None` when no row with
/// that id exists; `delete` acknowledges removal whether or not the row was
/// present.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn get_all<T: Entity>(&self, query: Query) -> StoreResult<Vec<T>>;

    async fn get_by_id<T: Entity>(&self, id: Uuid) -> StoreResult<Option<T>>;

    async fn create<T: Entity>(&self, record: T) -> StoreResult<T>;

    async fn update<T: Entity>(&self, record: T) -> StoreResult<Option<T>>;

    async fn delete<T: Entity>(&self, id: Uuid) -> StoreResult<()>;
}
