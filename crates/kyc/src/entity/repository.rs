//! Statement construction shared by every entity table.

use std::fmt::Debug;

use tokio_postgres::Row;
use uuid::Uuid;

use crate::entity::Status;
use crate::error::{KycError, KycResult};
use crate::qb::{Param, QueryBuilder};
use crate::row::FromRow;
use crate::validate;

/// One table of the profile graph.
///
/// Implementors describe their columns and how requests map onto them; the
/// provided methods turn that description into ready-to-run builders. Nothing here
/// touches the database.
pub trait Repository: Send + Sync + 'static {
    type Record: FromRow + Clone + Debug + Send + Sync;
    type Create: Debug + Send + Sync;
    type Update: Debug + Send + Sync;
    type Filter: Debug + Default + Send + Sync;

    const TABLE: &'static str;
    /// Singular noun used in error messages.
    const ENTITY: &'static str;
    /// Reported as the originating package of service errors.
    const PACKAGE: &'static str;
    /// Every column, `id` first and `status` last. Used for inserts, selects and
    /// RETURNING.
    const COLUMNS: &'static [&'static str];

    fn validate_create(req: &Self::Create) -> KycResult<()>;

    /// The checks of [`Self::validate_create`], applied to the fields present in `req`.
    fn validate_update(req: &Self::Update) -> KycResult<()>;

    /// Values for the columns between `id` and `status`, in [`Self::COLUMNS`] order.
    fn insert_values(req: &Self::Create) -> Vec<Param>;

    fn update_id(req: &Self::Update) -> Uuid;

    /// Add a SET assignment for every field present in `req`.
    fn apply_update(qb: QueryBuilder, req: &Self::Update) -> QueryBuilder;

    fn apply_filter(qb: QueryBuilder, filter: &Self::Filter) -> QueryBuilder;

    fn record_id(record: &Self::Record) -> Uuid;

    fn record_status(record: &Self::Record) -> Status;

    /// Columns holding entity data, i.e. without `id` and `status`.
    fn data_columns() -> &'static [&'static str] {
        &Self::COLUMNS[1..Self::COLUMNS.len() - 1]
    }

    /// Full row for a new record: id, data, initial status.
    fn insert_row(id: Uuid, req: &Self::Create) -> Vec<Param> {
        let mut row = Vec::with_capacity(Self::COLUMNS.len());
        row.push(Param::new(id));
        row.extend(Self::insert_values(req));
        row.push(Param::new(Status::Active.as_str()));
        row
    }

    /// INSERT for one new record under a freshly generated id.
    fn build_insert(req: &Self::Create) -> KycResult<(Uuid, QueryBuilder)> {
        let id = Uuid::new_v4();
        let qb = Self::build_insert_many(&[(id, req)])?;
        Ok((id, qb))
    }

    /// Multi-row INSERT; ids are chosen by the caller.
    fn build_insert_many(items: &[(Uuid, &Self::Create)]) -> KycResult<QueryBuilder> {
        validate::require_items(Self::ENTITY, items)?;
        let mut qb = QueryBuilder::insert(Self::TABLE).set_insert_fields(Self::COLUMNS)?;
        for (id, req) in items {
            Self::validate_create(req)?;
            qb = qb.push_insert_values(Self::insert_row(*id, req))?;
        }
        Ok(qb.returning(Self::COLUMNS))
    }

    /// UPDATE of the present fields; fails before any SQL is rendered when the
    /// request has no id, changes nothing or carries an invalid value.
    fn build_update(req: &Self::Update) -> KycResult<QueryBuilder> {
        let id = Self::update_id(req);
        validate::require_id(&format!("{} id", Self::ENTITY), id)?;
        Self::validate_update(req)?;
        let qb = Self::apply_update(QueryBuilder::update(Self::TABLE), req);
        validate::require_change(qb.is_updatable())?;
        Ok(qb.filter_eq("id", id).returning(Self::COLUMNS))
    }

    /// Assign every data column from `req`, as when a record is overwritten.
    fn apply_replace(mut qb: QueryBuilder, req: &Self::Create) -> KycResult<QueryBuilder> {
        Self::validate_create(req)?;
        for (column, value) in Self::data_columns().iter().zip(Self::insert_values(req)) {
            qb = qb.set_update_param(column, value);
        }
        Ok(qb)
    }

    fn build_get_one(id: Uuid) -> QueryBuilder {
        QueryBuilder::select(Self::TABLE)
            .fields(Self::COLUMNS)
            .filter_eq("id", id)
    }

    fn build_get_many(ids: Vec<Uuid>) -> QueryBuilder {
        QueryBuilder::select(Self::TABLE)
            .fields(Self::COLUMNS)
            .filter("id = ANY(?)", vec![Param::new(ids)])
    }

    /// SELECT narrowed by the non-empty parts of `filter`; an empty filter lists
    /// the whole table.
    fn build_get_list(filter: &Self::Filter) -> QueryBuilder {
        let qb = QueryBuilder::select(Self::TABLE).fields(Self::COLUMNS);
        Self::apply_filter(qb, filter).order_by("id")
    }

    /// Soft delete: the regular update path with a terminal status. Rows already
    /// in a terminal status are left untouched and not returned.
    fn build_delete(id: Uuid) -> KycResult<QueryBuilder> {
        validate::require_id(&format!("{} id", Self::ENTITY), id)?;
        Ok(QueryBuilder::update(Self::TABLE)
            .set_update("status", Status::Canceled.as_str())
            .filter_eq("id", id)
            .filter_not_in("status", Status::terminal_values())
            .returning(Self::COLUMNS))
    }

    fn scan_one(row: &Row) -> KycResult<Self::Record> {
        Self::Record::from_row(row)
    }

    fn scan_many(rows: &[Row]) -> KycResult<Vec<Self::Record>> {
        rows.iter().map(Self::scan_one).collect()
    }

    fn not_found(id: Uuid) -> KycError {
        KycError::not_found(format!("{} {id}", Self::ENTITY))
    }
}

/// `id IN (...)` and `status IN (...)`, the part every list filter has.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ListFilter {
    #[serde(default)]
    pub ids: Vec<Uuid>,
    #[serde(default)]
    pub statuses: Vec<Status>,
}

impl ListFilter {
    pub fn apply(&self, qb: QueryBuilder) -> QueryBuilder {
        qb.filter_in("id", self.ids.clone()).filter_in(
            "status",
            self.statuses.iter().map(|s| s.as_str()).collect(),
        )
    }
}
