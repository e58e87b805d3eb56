//! Rewrites unnumbered `?` markers into PostgreSQL `$n` parameters.

use crate::error::{KycError, KycResult};

/// Number every `?` marker left to right, starting at `$1`.
///
/// Markers inside single-quoted literals and double-quoted identifiers are left
/// alone. Returns the rewritten SQL and the number of markers seen.
pub fn number_placeholders(sql: &str) -> (String, usize) {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut count = 0usize;
    let mut in_literal = false;
    let mut in_ident = false;

    for ch in sql.chars() {
        match ch {
            '\'' if !in_ident => {
                in_literal = !in_literal;
                out.push(ch);
            }
            '"' if !in_literal => {
                in_ident = !in_ident;
                out.push(ch);
            }
            '?' if !in_literal && !in_ident => {
                count += 1;
                out.push('$');
                out.push_str(&count.to_string());
            }
            _ => out.push(ch),
        }
    }

    (out, count)
}

/// Like [`number_placeholders`], but fails unless exactly `expected` markers exist.
pub fn number_placeholders_checked(sql: &str, expected: usize) -> KycResult<String> {
    let (out, count) = number_placeholders(sql);
    if count != expected {
        return Err(KycError::validation(format!(
            "statement has {count} placeholders but {expected} bound values"
        )));
    }
    Ok(out)
}
