//! Storage layer for flow definitions and execution records.
//!
//! Provides an abstraction over different storage backends:
//! - `MemStore`: in-memory storage for tests and embedding
//! - `PostgresStore`: PostgreSQL for durable persistence
//!
//! Every write replaces a whole row in one operation, so a reader never sees
//! a record whose fields come from two different updates.

pub mod data;
mod db;
pub mod query;
mod store;

use std::error::Error;

use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use crate::{FlowError, Result};

use query::*;

pub use db::{MemStore, PostgresStore};
pub use store::Store;

/// Maps database errors to FlowError.
pub(crate) fn map_db_err(err: impl Error) -> FlowError {
    FlowError::Store(err.to_string())
}

/// Identifiers for the storage collections.
#[derive(Debug, Clone, AsRefStr, PartialEq, Hash, Eq)]
pub enum StoreIden {
    /// Flow definitions.
    #[strum(serialize = "flows")]
    Flows,
    /// Execution records.
    #[strum(serialize = "executions")]
    Executions,
}

/// Paginated query result.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PageData<T> {
    /// Total number of matching records.
    pub count: usize,
    /// Current page number (1-based).
    pub page_num: usize,
    /// Total number of pages.
    pub page_count: usize,
    /// Number of records per page.
    pub page_size: usize,
    /// Records in the current page.
    pub rows: Vec<T>,
}

impl<T> PageData<T> {
    pub(crate) fn new(
        q: &Query,
        count: usize,
        rows: Vec<T>,
    ) -> Self {
        Self {
            count,
            page_num: q.offset() / q.limit() + 1,
            page_count: count.div_ceil(q.limit()),
            page_size: q.limit(),
            rows,
        }
    }

    /// Converts every row, failing on the first row that does not convert.
    pub fn try_map<U>(
        self,
        f: impl FnMut(T) -> Result<U>,
    ) -> Result<PageData<U>> {
        Ok(PageData {
            count: self.count,
            page_num: self.page_num,
            page_count: self.page_count,
            page_size: self.page_size,
            rows: self.rows.into_iter().map(f).collect::<Result<Vec<_>>>()?,
        })
    }
}

/// Trait for types that can identify their storage collection.
pub trait DbCollectionIden {
    /// Returns the collection identifier for this type.
    fn iden() -> StoreIden;
}

/// Trait for database collection operations.
pub trait DbCollection: Send + Sync {
    /// The type of items stored in this collection.
    type Item;

    /// Checks if a record with the given ID exists.
    fn exists(
        &self,
        id: &str,
    ) -> Result<bool>;

    /// Finds a record by ID.
    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item>;

    /// Queries records with pagination and filtering.
    fn query(
        &self,
        query: &Query,
    ) -> Result<PageData<Self::Item>>;

    /// Creates a new record.
    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Replaces an existing record.
    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Deletes a record by ID.
    fn delete(
        &self,
        id: &str,
    ) -> Result<bool>;
}

/// Trait for database store initialization.
pub trait DbStore {
    /// Initializes the database and registers collections with the store.
    fn init(
        &self,
        s: &Store,
    ) -> Result<()>;
}
