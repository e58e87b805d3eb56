//! In-memory client that records statements instead of running them.

use std::sync::{Arc, Mutex};

use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

use crate::client::{GenericClient, RowStream, StreamingClient};
use crate::error::{KycError, KycResult};

#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub sql: String,
    pub param_count: usize,
}

/// Every `query` and `query_stream` returns no rows and every `execute` reports `affected` rows.
/// With `fail_at(n)` the n-th statement (1-based) fails with a unique violation.
#[derive(Clone, Default)]
pub(crate) struct RecordingClient {
    log: Arc<Mutex<Vec<Recorded>>>,
    fail_at: Option<usize>,
    affected: u64,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self {
            affected: 1,
            ..Self::default()
        }
    }

    pub fn fail_at(mut self, statement: usize) -> Self {
        self.fail_at = Some(statement);
        self
    }

    pub fn affected(mut self, rows: u64) -> Self {
        self.affected = rows;
        self
    }

    pub fn statements(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn sql(&self) -> Vec<String> {
        self.statements().into_iter().map(|r| r.sql).collect()
    }

    fn record(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> KycResult<()> {
        let mut log = self.log.lock().unwrap();
        log.push(Recorded {
            sql: sql.to_string(),
            param_count: params.len(),
        });
        if self.fail_at == Some(log.len()) {
            return Err(KycError::UniqueViolation(format!(
                "forced failure on statement {}",
                log.len()
            )));
        }
        Ok(())
    }
}

impl GenericClient for RecordingClient {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> KycResult<Vec<Row>> {
        self.record(sql, params)?;
        Ok(vec![])
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> KycResult<u64> {
        self.record(sql, params)?;
        Ok(self.affected)
    }
}

impl StreamingClient for RecordingClient {
    async fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> KycResult<RowStream> {
        self.record(sql, params)?;
        Ok(RowStream::new(futures_util::stream::empty()))
    }
}
