use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::entity::{ListFilter, Repository, Status};
use crate::error::KycResult;
use crate::qb::{Param, QueryBuilder};
use crate::row::{FromRow, RowExt};
use crate::validate;

/// Aggregate root: ties an external user record to its sub-profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserId {
    pub id: Uuid,
    pub external_user_id: String,
    pub credential_id: Option<Uuid>,
    pub physique_id: Option<Uuid>,
    pub social_id: Option<Uuid>,
    pub status: Status,
}

impl FromRow for UserId {
    fn from_row(row: &Row) -> KycResult<Self> {
        Ok(Self {
            id: row.try_get_column("id")?,
            external_user_id: row.try_get_column("external_user_id")?,
            credential_id: row.try_get_column("credential_id")?,
            physique_id: row.try_get_column("physique_id")?,
            social_id: row.try_get_column("social_id")?,
            status: row.try_parse_column("status")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUserId {
    pub external_user_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserIdUpdate {
    pub id: Uuid,
    pub external_user_id: Option<String>,
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserIdFilter {
    #[serde(flatten)]
    pub list: ListFilter,
    #[serde(default)]
    pub external_user_ids: Vec<String>,
}

pub struct UserIdRepo;

impl UserIdRepo {
    /// Locks a live user row for the rest of the transaction.
    pub fn build_lock_live(id: Uuid) -> QueryBuilder {
        QueryBuilder::select(Self::TABLE)
            .fields(Self::COLUMNS)
            .filter_eq("id", id)
            .filter_not_in("status", Status::terminal_values())
            .for_update()
    }

    /// Points one sub-profile foreign key of the user at `target`.
    pub fn build_set_reference(id: Uuid, column: &str, target: Uuid) -> QueryBuilder {
        QueryBuilder::update(Self::TABLE)
            .set_update(column, target)
            .filter_eq("id", id)
            .returning(Self::COLUMNS)
    }
}

impl Repository for UserIdRepo {
    type Record = UserId;
    type Create = NewUserId;
    type Update = UserIdUpdate;
    type Filter = UserIdFilter;

    const TABLE: &'static str = "user_ids";
    const ENTITY: &'static str = "user";
    const PACKAGE: &'static str = "kyc.user_ids";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "external_user_id",
        "credential_id",
        "physique_id",
        "social_id",
        "status",
    ];

    fn validate_create(req: &NewUserId) -> KycResult<()> {
        validate::require_text("external user id", &req.external_user_id)
    }

    fn validate_update(req: &UserIdUpdate) -> KycResult<()> {
        match &req.external_user_id {
            Some(external) => validate::require_text("external user id", external),
            None => Ok(()),
        }
    }

    /// Sub-profiles are attached later, through the aggregate operations.
    fn insert_values(req: &NewUserId) -> Vec<Param> {
        vec![
            Param::new(req.external_user_id.clone()),
            Param::new(None::<Uuid>),
            Param::new(None::<Uuid>),
            Param::new(None::<Uuid>),
        ]
    }

    fn update_id(req: &UserIdUpdate) -> Uuid {
        req.id
    }

    fn apply_update(qb: QueryBuilder, req: &UserIdUpdate) -> QueryBuilder {
        qb.set_update_opt("external_user_id", req.external_user_id.clone())
            .set_update_opt("status", req.status.map(Status::as_str))
    }

    fn apply_filter(qb: QueryBuilder, filter: &UserIdFilter) -> QueryBuilder {
        filter
            .list
            .apply(qb)
            .filter_in("external_user_id", filter.external_user_ids.clone())
    }

    fn record_id(record: &UserId) -> Uuid {
        record.id
    }

    fn record_status(record: &UserId) -> Status {
        record.status
    }
}
