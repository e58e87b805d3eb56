use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::entity::{ListFilter, Repository, Status};
use crate::error::KycResult;
use crate::qb::{Param, QueryBuilder};
use crate::row::{FromRow, RowExt};
use crate::validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Social {
    pub id: Uuid,
    pub marital_status: String,
    pub occupation: Option<String>,
    pub employer: Option<String>,
    pub status: Status,
}

impl FromRow for Social {
    fn from_row(row: &Row) -> KycResult<Self> {
        Ok(Self {
            id: row.try_get_column("id")?,
            marital_status: row.try_get_column("marital_status")?,
            occupation: row.try_get_column("occupation")?,
            employer: row.try_get_column("employer")?,
            status: row.try_parse_column("status")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSocial {
    pub marital_status: String,
    pub occupation: Option<String>,
    pub employer: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialUpdate {
    pub id: Uuid,
    pub marital_status: Option<String>,
    pub occupation: Option<String>,
    pub employer: Option<String>,
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialFilter {
    #[serde(flatten)]
    pub list: ListFilter,
}

pub struct SocialRepo;

impl Repository for SocialRepo {
    type Record = Social;
    type Create = NewSocial;
    type Update = SocialUpdate;
    type Filter = SocialFilter;

    const TABLE: &'static str = "socials";
    const ENTITY: &'static str = "social";
    const PACKAGE: &'static str = "kyc.socials";
    const COLUMNS: &'static [&'static str] =
        &["id", "marital_status", "occupation", "employer", "status"];

    fn validate_create(req: &NewSocial) -> KycResult<()> {
        validate::require_text("marital status", &req.marital_status)
    }

    fn validate_update(req: &SocialUpdate) -> KycResult<()> {
        match &req.marital_status {
            Some(status) => validate::require_text("marital status", status),
            None => Ok(()),
        }
    }

    fn insert_values(req: &NewSocial) -> Vec<Param> {
        vec![
            Param::new(req.marital_status.clone()),
            Param::new(req.occupation.clone()),
            Param::new(req.employer.clone()),
        ]
    }

    fn update_id(req: &SocialUpdate) -> Uuid {
        req.id
    }

    fn apply_update(qb: QueryBuilder, req: &SocialUpdate) -> QueryBuilder {
        qb.set_update_opt("marital_status", req.marital_status.clone())
            .set_update_opt("occupation", req.occupation.clone())
            .set_update_opt("employer", req.employer.clone())
            .set_update_opt("status", req.status.map(Status::as_str))
    }

    fn apply_filter(qb: QueryBuilder, filter: &SocialFilter) -> QueryBuilder {
        filter.list.apply(qb)
    }

    fn record_id(record: &Social) -> Uuid {
        record.id
    }

    fn record_status(record: &Social) -> Status {
        record.status
    }
}
