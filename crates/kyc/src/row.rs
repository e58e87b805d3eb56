//! Row mapping traits and utilities

use crate::error::{KycError, KycResult};
use tokio_postgres::Row;

/// Trait for converting a database row into a record.
///
/// Each entity has exactly one implementation, used by every statement that reads
/// or returns that entity's table.
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> KycResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning KycError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> KycResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>;

    /// Read a text column and parse it with `FromStr`.
    fn try_parse_column<T>(&self, column: &str) -> KycResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> KycResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| KycError::decode(column, e.to_string()))
    }

    fn try_parse_column<T>(&self, column: &str) -> KycResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let raw: String = self.try_get_column(column)?;
        raw.parse()
            .map_err(|e: T::Err| KycError::decode(column, e.to_string()))
    }
}
