use sqlx::{Error as DbError, postgres::PgRow};

use crate::Result;

mod collection;
mod database;
mod synclient;

pub use database::PostgresStore;

pub trait DbRow {
    fn id(&self) -> &str;
    fn from_row(row: &PgRow) -> std::result::Result<Self, DbError>
    where
        Self: Sized;
}

pub trait DbInit {
    /// Creates the table and its indexes if missing.
    fn init(&self) -> Result<()>;
}
