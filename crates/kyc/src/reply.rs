//! Response envelope returned by every service operation.
//!
//! Business failures never escape as a bare `Err`: they are folded into
//! [`Reply::Error`] with a code from a closed set, the package that produced them
//! and a human-readable text.

use std::fmt;

use serde::Serialize;

use crate::error::{KycError, KycResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    #[default]
    Unspecified,
    InvalidArgument,
    NotFound,
    MultipleValuesFound,
    DbError,
    DbFieldScanError,
    StreamingError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::MultipleValuesFound => "multiple_values_found",
            Self::DbError => "db_error",
            Self::DbFieldScanError => "db_field_scan_error",
            Self::StreamingError => "streaming_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&KycError> for ErrorCode {
    fn from(err: &KycError) -> Self {
        match err {
            KycError::Validation(_) => Self::InvalidArgument,
            KycError::NotFound(_) => Self::NotFound,
            KycError::TooManyRows { .. } => Self::MultipleValuesFound,
            KycError::Decode { .. } => Self::DbFieldScanError,
            KycError::Streaming(_) => Self::StreamingError,
            KycError::Connection(_)
            | KycError::Query(_)
            | KycError::UniqueViolation(_)
            | KycError::ForeignKeyViolation(_)
            | KycError::CheckViolation(_)
            | KycError::SerializationFailure(_)
            | KycError::Timeout(_)
            | KycError::Other(_) => Self::DbError,
            #[cfg(feature = "pool")]
            KycError::Pool(_) => Self::DbError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceError {
    pub code: ErrorCode,
    pub package: &'static str,
    pub text: String,
}

impl ServiceError {
    pub fn new(code: ErrorCode, package: &'static str, text: impl Into<String>) -> Self {
        Self {
            code,
            package,
            text: text.into(),
        }
    }

    /// Classify `err` and log it on target `kyc.service`.
    pub fn from_error(package: &'static str, err: &KycError) -> Self {
        let code = ErrorCode::from(err);
        tracing::error!(
            target: "kyc.service",
            code = %code,
            package,
            error = %err,
            "request failed"
        );
        Self::new(code, package, err.to_string())
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.package, self.text)
    }
}

impl std::error::Error for ServiceError {}

/// Success payload or structured error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "payload")]
pub enum Reply<T> {
    Success(T),
    Error(ServiceError),
}

impl<T> Reply<T> {
    pub fn from_result(package: &'static str, result: KycResult<T>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => Self::Error(ServiceError::from_error(package, &err)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ServiceError> {
        match self {
            Self::Success(_) => None,
            Self::Error(err) => Some(err),
        }
    }

    /// Code of the embedded error, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        self.error().map(|e| e.code)
    }

    pub fn into_result(self) -> Result<T, ServiceError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Error(err) => Err(err),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        match self {
            Self::Success(value) => Reply::Success(f(value)),
            Self::Error(err) => Reply::Error(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes() {
        assert_eq!(
            ErrorCode::from(&KycError::validation("missing label")),
            ErrorCode::InvalidArgument
        );
        assert_eq!(ErrorCode::from(&KycError::not_found("user")), ErrorCode::NotFound);
        assert_eq!(
            ErrorCode::from(&KycError::too_many_rows(1, 2)),
            ErrorCode::MultipleValuesFound
        );
        assert_eq!(
            ErrorCode::from(&KycError::decode("status", "unknown status 'x'")),
            ErrorCode::DbFieldScanError
        );
        assert_eq!(
            ErrorCode::from(&KycError::Streaming("row 3".into())),
            ErrorCode::StreamingError
        );
        assert_eq!(
            ErrorCode::from(&KycError::UniqueViolation("users_contacts_pkey".into())),
            ErrorCode::DbError
        );
    }

    #[test]
    fn reply_carries_package() {
        let reply: Reply<u8> =
            Reply::from_result("kyc.contacts", Err(KycError::validation("missing contact id")));
        let err = reply.error().unwrap();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
        assert_eq!(err.package, "kyc.contacts");
        assert!(err.text.contains("missing contact id"));
        assert_eq!(reply.code(), Some(ErrorCode::InvalidArgument));
    }

    #[test]
    fn reply_serializes_as_tagged_union() {
        let ok: Reply<u8> = Reply::Success(7);
        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"{"outcome":"success","payload":7}"#
        );

        let err: Reply<u8> = Reply::Error(ServiceError::new(
            ErrorCode::NotFound,
            "kyc.user_ids",
            "user 1",
        ));
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            r#"{"outcome":"error","payload":{"code":"not_found","package":"kyc.user_ids","text":"user 1"}}"#
        );
    }
}
