//! A generated statement and the ways to run it.

use std::sync::OnceLock;

use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

use crate::client::{GenericClient, RowStream, StreamingClient};
use crate::error::KycResult;
use crate::qb::builder::QueryBuilder;
use crate::qb::param::ParamList;
use crate::row::FromRow;
use crate::trace::SqlTrace;

fn sql_trace() -> &'static SqlTrace {
    static TRACE: OnceLock<SqlTrace> = OnceLock::new();
    TRACE.get_or_init(SqlTrace::default)
}

/// Output of [`QueryBuilder::generate_sql`]: numbered SQL, its parameters in
/// binding order and a short human-readable description for logs and errors.
#[derive(Debug, Clone)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: ParamList,
    pub description: String,
}

impl BuiltQuery {
    pub fn new(sql: String, params: ParamList, description: String) -> Self {
        Self {
            sql,
            params,
            description,
        }
    }

    /// Get parameters as references for tokio-postgres.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.as_refs()
    }

    /// `Debug` renderings of the bound values, in `$n` order.
    pub fn param_reprs(&self) -> Vec<&str> {
        self.params.reprs()
    }

    fn trace(&self) {
        sql_trace().emit(&self.description, &self.sql, self.params.len());
    }

    /// Execute and return all rows.
    pub async fn query(&self, conn: &impl GenericClient) -> KycResult<Vec<Row>> {
        self.trace();
        let params = self.params_ref();
        conn.query(&self.sql, &params)
            .await
            .map_err(|e| e.context(&self.description))
    }

    /// Execute and map all rows to `T`.
    pub async fn fetch_all<T: FromRow>(&self, conn: &impl GenericClient) -> KycResult<Vec<T>> {
        let rows = self.query(conn).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Execute and map the first row; zero rows is `NotFound`.
    pub async fn fetch_one<T: FromRow>(&self, conn: &impl GenericClient) -> KycResult<T> {
        self.trace();
        let params = self.params_ref();
        let row = conn
            .query_one(&self.sql, &params)
            .await
            .map_err(|e| e.context(&self.description))?;
        T::from_row(&row)
    }

    /// Execute and map exactly one row; more than one is `TooManyRows`.
    pub async fn fetch_one_strict<T: FromRow>(&self, conn: &impl GenericClient) -> KycResult<T> {
        self.trace();
        let params = self.params_ref();
        let row = conn
            .query_one_strict(&self.sql, &params)
            .await
            .map_err(|e| e.context(&self.description))?;
        T::from_row(&row)
    }

    /// Execute and map at most one row.
    pub async fn fetch_opt<T: FromRow>(&self, conn: &impl GenericClient) -> KycResult<Option<T>> {
        self.trace();
        let params = self.params_ref();
        let row = conn
            .query_opt(&self.sql, &params)
            .await
            .map_err(|e| e.context(&self.description))?;
        row.as_ref().map(T::from_row).transpose()
    }

    /// Execute and return the affected row count.
    pub async fn execute(&self, conn: &impl GenericClient) -> KycResult<u64> {
        self.trace();
        let params = self.params_ref();
        conn.execute(&self.sql, &params)
            .await
            .map_err(|e| e.context(&self.description))
    }

    /// Execute and stream rows as they arrive.
    pub async fn stream(&self, conn: &impl StreamingClient) -> KycResult<RowStream> {
        self.trace();
        let params = self.params_ref();
        conn.query_stream(&self.sql, &params)
            .await
            .map_err(|e| e.context(&self.description))
    }
}

impl QueryBuilder {
    fn ready(&self) -> KycResult<BuiltQuery> {
        self.validate()?;
        self.generate_sql()
    }

    pub async fn fetch_all<T: FromRow>(&self, conn: &impl GenericClient) -> KycResult<Vec<T>> {
        self.ready()?.fetch_all(conn).await
    }

    pub async fn fetch_one<T: FromRow>(&self, conn: &impl GenericClient) -> KycResult<T> {
        self.ready()?.fetch_one(conn).await
    }

    pub async fn fetch_one_strict<T: FromRow>(&self, conn: &impl GenericClient) -> KycResult<T> {
        self.ready()?.fetch_one_strict(conn).await
    }

    pub async fn fetch_opt<T: FromRow>(&self, conn: &impl GenericClient) -> KycResult<Option<T>> {
        self.ready()?.fetch_opt(conn).await
    }

    pub async fn execute(&self, conn: &impl GenericClient) -> KycResult<u64> {
        self.ready()?.execute(conn).await
    }

    pub async fn stream(&self, conn: &impl StreamingClient) -> KycResult<RowStream> {
        self.ready()?.stream(conn).await
    }
}
