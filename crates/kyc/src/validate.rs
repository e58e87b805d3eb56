//! Precondition checks run before any SQL is built.
//!
//! Every check returns [`KycError::Validation`], which the service layer reports as
//! an invalid-argument error without opening a transaction.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::OnceLock;

use uuid::Uuid;

use crate::error::{KycError, KycResult};

pub const NOTHING_TO_UPDATE: &str = "cannot update without new value";

/// Best-effort email validation.
///
/// This is intentionally not fully RFC-compliant.
pub fn is_email(s: &str) -> bool {
    static EMAIL_RE: OnceLock<regex::Regex> = OnceLock::new();
    EMAIL_RE
        .get_or_init(|| {
            regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid built-in email regex")
        })
        .is_match(s)
}

/// Digits with optional leading `+` and common separators.
pub fn is_phone(s: &str) -> bool {
    static PHONE_RE: OnceLock<regex::Regex> = OnceLock::new();
    PHONE_RE
        .get_or_init(|| {
            regex::Regex::new(r"^\+?[0-9][0-9 ().-]{3,}$").expect("invalid built-in phone regex")
        })
        .is_match(s)
}

/// ISO 4217 style code, e.g. `EUR`.
pub fn is_currency_code(s: &str) -> bool {
    s.len() == 3 && s.bytes().all(|b| b.is_ascii_uppercase())
}

/// ISO 3166-1 alpha-2 style code, e.g. `FR`.
pub fn is_country_code(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_uppercase())
}

pub fn require_text(field: &str, value: &str) -> KycResult<()> {
    if value.trim().is_empty() {
        return Err(KycError::validation(format!("missing {field}")));
    }
    Ok(())
}

pub fn require_id(field: &str, id: Uuid) -> KycResult<()> {
    if id.is_nil() {
        return Err(KycError::validation(format!("missing {field}")));
    }
    Ok(())
}

pub fn require_items<T>(field: &str, items: &[T]) -> KycResult<()> {
    if items.is_empty() {
        return Err(KycError::validation(format!("at least one {field} is required")));
    }
    Ok(())
}

/// One-of selection: rejected iff no variant is populated.
pub fn require_one_of<'a, T>(field: &str, value: &'a Option<T>) -> KycResult<&'a T> {
    value
        .as_ref()
        .ok_or_else(|| KycError::validation(format!("exactly one {field} variant must be set")))
}

/// Rejects a builder or request that would change nothing.
pub fn require_change(has_change: bool) -> KycResult<()> {
    if !has_change {
        return Err(KycError::validation(NOTHING_TO_UPDATE));
    }
    Ok(())
}

/// Rejects a batch in which the same key appears twice.
pub fn reject_duplicates<'a, K, I>(field: &str, keys: I) -> KycResult<()>
where
    K: Eq + Hash + std::fmt::Display + 'a,
    I: IntoIterator<Item = &'a K>,
{
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(KycError::validation(format!("duplicate {field} '{key}' in request")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_and_phone() {
        assert!(is_email("ada@example.org"));
        assert!(!is_email("ada@example"));
        assert!(is_phone("+33 1 23 45 67 89"));
        assert!(!is_phone("call me"));
    }

    #[test]
    fn codes() {
        assert!(is_currency_code("EUR"));
        assert!(!is_currency_code("eur"));
        assert!(is_country_code("FR"));
        assert!(!is_country_code("FRA"));
    }

    #[test]
    fn required_values() {
        assert!(require_text("label", "  ").is_err());
        assert!(require_text("label", "home").is_ok());
        assert!(require_id("user id", Uuid::nil()).is_err());
        assert!(require_items::<u8>("contact", &[]).is_err());
    }

    #[test]
    fn one_of_rejects_only_when_absent() {
        let none: Option<u8> = None;
        let err = require_one_of("amount", &none).unwrap_err();
        assert!(err.to_string().contains("exactly one amount variant must be set"));
        assert_eq!(*require_one_of("amount", &Some(3u8)).unwrap(), 3);
    }

    #[test]
    fn nothing_to_update() {
        let err = require_change(false).unwrap_err();
        assert!(err.to_string().contains(NOTHING_TO_UPDATE));
    }

    #[test]
    fn duplicates() {
        let labels = ["home".to_string(), "work".to_string(), "home".to_string()];
        let err = reject_duplicates("label", labels.iter()).unwrap_err();
        assert!(err.to_string().contains("duplicate label 'home'"));
        assert!(reject_duplicates("label", labels[..2].iter()).is_ok());
    }
}
