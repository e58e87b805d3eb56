//! `tracing` output for executed statements.

use tracing::Level;

/// Emits one event per executed statement on target `kyc.sql`.
#[derive(Debug, Clone)]
pub struct SqlTrace {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlTrace {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl SqlTrace {
    pub fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    pub fn emit(&self, description: &str, sql: &str, param_count: usize) {
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.truncate_sql(sql);
        emit_at_level!(
            self.level,
            target: "kyc.sql",
            description,
            param_count,
            sql = %sql,
        );
    }
}

/// Cut at `max` bytes without splitting a UTF-8 character.
fn truncate_sql_bytes(sql: &str, max: usize) -> &str {
    if sql.len() <= max {
        return sql;
    }
    let mut end = max;
    while !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_sql() {
        let trace = SqlTrace {
            max_sql_length: Some(10),
            ..SqlTrace::default()
        };
        assert_eq!(trace.truncate_sql("SELECT * FROM contacts"), "SELECT * F...");
        assert_eq!(trace.truncate_sql("SELECT 1"), "SELECT 1");
    }

    #[test]
    fn never_splits_a_character() {
        assert_eq!(truncate_sql_bytes("ééé", 3), "é");
    }
}
