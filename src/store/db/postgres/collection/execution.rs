use sea_query::{
    Alias as SeaAlias, ColumnDef, Expr as SeaExpr, Func as SeaFunc, Iden, Index, Order as SeaOrder, PostgresQueryBuilder, Query as SeaQuery, Table,
};
use sea_query_binder::SqlxBinder;
use sqlx::{Error as DbError, Row, postgres::PgRow};

use crate::{
    Result,
    store::{
        DbCollection, PageData, data,
        db::postgres::{DbInit, DbRow},
        query,
    },
};

use super::{DbConnection, into_query, map_db_err};

#[derive(Debug)]
pub struct ExecutionCollection {
    conn: DbConnection,
}

#[derive(Iden)]
#[iden = "executions"]
enum CollectionIden {
    Table,

    Id,
    FlowId,
    Status,
    CreatedAt,
    StartedAt,
    EndedAt,
    DurationMs,
    NodeResults,
    Logs,
    Error,
    ErrorNodeId,
}

const COLUMNS: [CollectionIden; 11] = [
    CollectionIden::Id,
    CollectionIden::FlowId,
    CollectionIden::Status,
    CollectionIden::CreatedAt,
    CollectionIden::StartedAt,
    CollectionIden::EndedAt,
    CollectionIden::DurationMs,
    CollectionIden::NodeResults,
    CollectionIden::Logs,
    CollectionIden::Error,
    CollectionIden::ErrorNodeId,
];

impl DbCollection for ExecutionCollection {
    type Item = data::Execution;

    fn exists(
        &self,
        id: &str,
    ) -> Result<bool> {
        let (sql, values) = SeaQuery::select()
            .from(CollectionIden::Table)
            .expr(SeaFunc::count(SeaExpr::col(CollectionIden::Id)))
            .and_where(SeaExpr::col(CollectionIden::Id).eq(id))
            .build_sqlx(PostgresQueryBuilder);

        let count = self.conn.query_one(sql.as_str(), values).map(|row| row.get::<i64, usize>(0)).map_err(map_db_err)?;

        Ok(count > 0)
    }

    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item> {
        let (sql, values) =
            SeaQuery::select().from(CollectionIden::Table).columns(COLUMNS).and_where(SeaExpr::col(CollectionIden::Id).eq(id)).build_sqlx(PostgresQueryBuilder);

        let row = self.conn.query_one(&sql, values).map_err(map_db_err)?;
        Self::Item::from_row(&row).map_err(map_db_err)
    }

    fn query(
        &self,
        q: &query::Query,
    ) -> Result<PageData<Self::Item>> {
        let filter = into_query(q);

        let mut count_query = SeaQuery::select();
        count_query.from(CollectionIden::Table).expr(SeaFunc::count(SeaExpr::col(CollectionIden::Id)));

        let mut query = SeaQuery::select();
        query.columns(COLUMNS).from(CollectionIden::Table);

        if !filter.is_empty() {
            count_query.cond_where(filter.clone());
            query.cond_where(filter);
        }

        for (order, rev) in q.order_by().iter() {
            query.order_by(
                SeaAlias::new(order),
                if *rev {
                    SeaOrder::Desc
                } else {
                    SeaOrder::Asc
                },
            );
        }
        let (sql, values) = query.limit(q.limit() as u64).offset(q.offset() as u64).build_sqlx(PostgresQueryBuilder);

        let (count_sql, count_values) = count_query.build_sqlx(PostgresQueryBuilder);
        let count = self.conn.query_one(count_sql.as_str(), count_values).map_err(map_db_err)?.get::<i64, usize>(0) as usize;
        let rows = self.conn.query(&sql, values).map_err(map_db_err)?.iter().map(Self::Item::from_row).collect::<std::result::Result<Vec<_>, _>>().map_err(map_db_err)?;

        Ok(PageData::new(q, count, rows))
    }

    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        let data = data.clone();
        let (sql, sql_values) = SeaQuery::insert()
            .into_table(CollectionIden::Table)
            .columns(COLUMNS)
            .values([
                data.id.into(),
                data.flow_id.into(),
                data.status.into(),
                data.created_at.into(),
                data.started_at.into(),
                data.ended_at.into(),
                data.duration_ms.into(),
                data.node_results.into(),
                data.logs.into(),
                data.error.into(),
                data.error_node_id.into(),
            ])
            .map_err(map_db_err)?
            .build_sqlx(PostgresQueryBuilder);

        let result = self.conn.execute(sql.as_str(), sql_values).map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }

    /// Rewrites every mutable column in a single statement.
    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        let model = data.clone();
        let (sql, sql_values) = SeaQuery::update()
            .table(CollectionIden::Table)
            .values([
                (CollectionIden::FlowId, model.flow_id.into()),
                (CollectionIden::Status, model.status.into()),
                (CollectionIden::CreatedAt, model.created_at.into()),
                (CollectionIden::StartedAt, model.started_at.into()),
                (CollectionIden::EndedAt, model.ended_at.into()),
                (CollectionIden::DurationMs, model.duration_ms.into()),
                (CollectionIden::NodeResults, model.node_results.into()),
                (CollectionIden::Logs, model.logs.into()),
                (CollectionIden::Error, model.error.into()),
                (CollectionIden::ErrorNodeId, model.error_node_id.into()),
            ])
            .and_where(SeaExpr::col(CollectionIden::Id).eq(data.id()))
            .build_sqlx(PostgresQueryBuilder);

        let result = self.conn.execute(sql.as_str(), sql_values).map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }

    fn delete(
        &self,
        id: &str,
    ) -> Result<bool> {
        let (sql, values) =
            SeaQuery::delete().from_table(CollectionIden::Table).and_where(SeaExpr::col(CollectionIden::Id).eq(id)).build_sqlx(PostgresQueryBuilder);

        let result = self.conn.execute(sql.as_str(), values).map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }
}

impl DbRow for data::Execution {
    fn id(&self) -> &str {
        &self.id
    }

    fn from_row(row: &PgRow) -> std::result::Result<Self, DbError>
    where
        Self: Sized,
    {
        Ok(Self {
            id: row.try_get("id")?,
            flow_id: row.try_get("flow_id")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            started_at: row.try_get("started_at")?,
            ended_at: row.try_get("ended_at")?,
            duration_ms: row.try_get("duration_ms")?,
            node_results: row.try_get("node_results")?,
            logs: row.try_get("logs")?,
            error: row.try_get("error")?,
            error_node_id: row.try_get("error_node_id")?,
        })
    }
}

impl DbInit for ExecutionCollection {
    fn init(&self) -> Result<()> {
        let sql = [
            Table::create()
                .table(CollectionIden::Table)
                .if_not_exists()
                .col(ColumnDef::new(CollectionIden::Id).string().not_null().primary_key())
                .col(ColumnDef::new(CollectionIden::FlowId).string().not_null())
                .col(ColumnDef::new(CollectionIden::Status).string().not_null())
                .col(ColumnDef::new(CollectionIden::CreatedAt).big_integer().not_null().default(0))
                .col(ColumnDef::new(CollectionIden::StartedAt).big_integer())
                .col(ColumnDef::new(CollectionIden::EndedAt).big_integer())
                .col(ColumnDef::new(CollectionIden::DurationMs).big_integer())
                .col(ColumnDef::new(CollectionIden::NodeResults).text().not_null().default("{}"))
                .col(ColumnDef::new(CollectionIden::Logs).text().not_null().default("[]"))
                .col(ColumnDef::new(CollectionIden::Error).text())
                .col(ColumnDef::new(CollectionIden::ErrorNodeId).string())
                .build(PostgresQueryBuilder),
            Index::create().name("idx_executions_flow_id").if_not_exists().table(CollectionIden::Table).col(CollectionIden::FlowId).build(PostgresQueryBuilder),
            Index::create().name("idx_executions_status").if_not_exists().table(CollectionIden::Table).col(CollectionIden::Status).build(PostgresQueryBuilder),
        ];

        self.conn.batch_execute(&sql).map_err(map_db_err)
    }
}

impl ExecutionCollection {
    pub fn new(conn: &DbConnection) -> Self {
        Self {
            conn: conn.clone(),
        }
    }
}
