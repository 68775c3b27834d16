//! Blocking facade over a `sqlx` pool, so collections stay synchronous.

use std::{sync::Arc, time::Duration};

use sqlx::{
    Database, Error, IntoArguments, PgPool, Postgres,
    postgres::{PgPoolOptions, PgRow},
};
use tokio::{
    runtime::{Handle, Runtime},
    task::block_in_place,
};

use crate::{Result, store::map_db_err};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_CONNECTIONS: u32 = 200;

#[derive(Debug, Clone)]
pub struct SynClient {
    pool: PgPool,

    runtime: Arc<Runtime>,
}

impl SynClient {
    pub fn connect(
        db_url: &str,
        runtime: Arc<Runtime>,
    ) -> Result<Self> {
        let pool = block_on(&runtime, async move { PgPoolOptions::new().acquire_timeout(ACQUIRE_TIMEOUT).max_connections(MAX_CONNECTIONS).connect(db_url).await })
            .map_err(map_db_err)?;

        Ok(Self {
            pool,
            runtime,
        })
    }

    pub fn query_one<'q, A>(
        &self,
        sql: &'q str,
        params: A,
    ) -> std::result::Result<PgRow, Error>
    where
        A: IntoArguments<'q, Postgres> + 'q,
    {
        block_on(&self.runtime, async move {
            let mut conn = self.pool.acquire().await?;
            sqlx::query_with(sql, params).fetch_one(&mut *conn).await
        })
    }

    pub fn query<'q, A>(
        &self,
        sql: &'q str,
        params: A,
    ) -> std::result::Result<Vec<PgRow>, Error>
    where
        A: IntoArguments<'q, Postgres> + 'q,
    {
        block_on(&self.runtime, async move {
            let mut conn = self.pool.acquire().await?;
            sqlx::query_with(sql, params).fetch_all(&mut *conn).await
        })
    }

    pub fn execute<'q, A>(
        &self,
        sql: &'q str,
        params: A,
    ) -> std::result::Result<<Postgres as Database>::QueryResult, Error>
    where
        A: IntoArguments<'q, Postgres> + 'q,
    {
        block_on(&self.runtime, async move {
            let mut conn = self.pool.acquire().await?;
            sqlx::query_with(sql, params).execute(&mut *conn).await
        })
    }

    /// Runs the statements in one transaction.
    pub fn batch_execute(
        &self,
        sqls: &[String],
    ) -> std::result::Result<(), Error> {
        block_on(&self.runtime, async move {
            let mut tx = self.pool.begin().await?;
            for sql in sqls {
                sqlx::query(sql).execute(&mut *tx).await?;
            }
            tx.commit().await
        })
    }
}

/// Drives `fut` to completion, stepping out of the worker first when called from async code.
fn block_on<F: Future>(
    runtime: &Runtime,
    fut: F,
) -> F::Output {
    if Handle::try_current().is_ok() {
        block_in_place(|| runtime.block_on(fut))
    } else {
        runtime.block_on(fut)
    }
}
