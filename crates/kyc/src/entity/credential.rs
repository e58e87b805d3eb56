use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::entity::{ListFilter, Repository, Status};
use crate::error::{KycError, KycResult};
use crate::qb::{Param, QueryBuilder};
use crate::row::{FromRow, RowExt};
use crate::validate;

/// Identity as stated on an official document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub nationality: String,
    pub status: Status,
}

impl FromRow for Credential {
    fn from_row(row: &Row) -> KycResult<Self> {
        Ok(Self {
            id: row.try_get_column("id")?,
            first_name: row.try_get_column("first_name")?,
            last_name: row.try_get_column("last_name")?,
            birth_date: row.try_get_column("birth_date")?,
            nationality: row.try_get_column("nationality")?,
            status: row.try_parse_column("status")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCredential {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub nationality: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialUpdate {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialFilter {
    #[serde(flatten)]
    pub list: ListFilter,
}

fn check_nationality(code: &str) -> KycResult<()> {
    if !validate::is_country_code(code) {
        return Err(KycError::validation(format!("invalid nationality '{code}'")));
    }
    Ok(())
}

pub struct CredentialRepo;

impl Repository for CredentialRepo {
    type Record = Credential;
    type Create = NewCredential;
    type Update = CredentialUpdate;
    type Filter = CredentialFilter;

    const TABLE: &'static str = "credentials";
    const ENTITY: &'static str = "credential";
    const PACKAGE: &'static str = "kyc.credentials";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "first_name",
        "last_name",
        "birth_date",
        "nationality",
        "status",
    ];

    fn validate_create(req: &NewCredential) -> KycResult<()> {
        validate::require_text("first name", &req.first_name)?;
        validate::require_text("last name", &req.last_name)?;
        check_nationality(&req.nationality)
    }

    fn validate_update(req: &CredentialUpdate) -> KycResult<()> {
        if let Some(first_name) = &req.first_name {
            validate::require_text("first name", first_name)?;
        }
        if let Some(last_name) = &req.last_name {
            validate::require_text("last name", last_name)?;
        }
        req.nationality.as_deref().map_or(Ok(()), check_nationality)
    }

    fn insert_values(req: &NewCredential) -> Vec<Param> {
        vec![
            Param::new(req.first_name.clone()),
            Param::new(req.last_name.clone()),
            Param::new(req.birth_date),
            Param::new(req.nationality.clone()),
        ]
    }

    fn update_id(req: &CredentialUpdate) -> Uuid {
        req.id
    }

    fn apply_update(qb: QueryBuilder, req: &CredentialUpdate) -> QueryBuilder {
        qb.set_update_opt("first_name", req.first_name.clone())
            .set_update_opt("last_name", req.last_name.clone())
            .set_update_opt("birth_date", req.birth_date)
            .set_update_opt("nationality", req.nationality.clone())
            .set_update_opt("status", req.status.map(Status::as_str))
    }

    fn apply_filter(qb: QueryBuilder, filter: &CredentialFilter) -> QueryBuilder {
        filter.list.apply(qb)
    }

    fn record_id(record: &Credential) -> Uuid {
        record.id
    }

    fn record_status(record: &Credential) -> Status {
        record.status
    }
}
