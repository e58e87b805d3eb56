//! The statement builder shared by every repository.

use std::fmt::Debug;

use tokio_postgres::types::ToSql;

use crate::error::{KycError, KycResult};
use crate::qb::built::BuiltQuery;
use crate::qb::fragment::{FilterBracket, InsertBracket, UpdateBracket, UpdateValue};
use crate::qb::param::{Param, ParamList};
use crate::qb::placeholder::number_placeholders_checked;

/// SQL dialect of the target database.
///
/// Only UPSERT differs: CockroachDB has a native `UPSERT INTO`, PostgreSQL needs
/// `INSERT ... ON CONFLICT`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    #[default]
    Postgres,
    Cockroach,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
    Upsert,
}

impl QueryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Upsert => "UPSERT",
        }
    }

    fn is_mutation(self) -> bool {
        !matches!(self, Self::Select)
    }
}

/// Assembles one parameterized statement from chained calls.
///
/// A builder is created per logical operation, configured, turned into a
/// [`BuiltQuery`] by [`QueryBuilder::generate_sql`], then dropped.
///
/// Predicates and expressions use `?` for bound values; the final statement is
/// numbered `$1, $2, ...` in the order the markers appear, which is also the order
/// values are bound:
///
/// ```ignore
/// let built = QueryBuilder::update("contacts")
///     .set_update("value", "a@b.c")
///     .filter_eq("id", id)
///     .generate_sql()?;
/// assert_eq!(built.sql, "UPDATE contacts SET value = $1 WHERE id = $2 RETURNING *");
/// ```
#[derive(Clone, Debug)]
pub struct QueryBuilder {
    kind: QueryKind,
    table: String,
    dialect: Dialect,
    select_fields: Vec<String>,
    joins: Vec<String>,
    filter: FilterBracket,
    update: UpdateBracket,
    insert: InsertBracket,
    conflict_keys: Vec<String>,
    returning: Vec<String>,
    group_by: Vec<String>,
    order_by: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    for_update: bool,
}

impl QueryBuilder {
    fn new(kind: QueryKind, table: &str) -> Self {
        Self {
            kind,
            table: table.to_string(),
            dialect: Dialect::default(),
            select_fields: Vec::new(),
            joins: Vec::new(),
            filter: FilterBracket::default(),
            update: UpdateBracket::default(),
            insert: InsertBracket::default(),
            conflict_keys: Vec::new(),
            returning: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            for_update: false,
        }
    }

    pub fn select(table: &str) -> Self {
        Self::new(QueryKind::Select, table)
    }

    pub fn insert(table: &str) -> Self {
        Self::new(QueryKind::Insert, table)
    }

    pub fn update(table: &str) -> Self {
        Self::new(QueryKind::Update, table)
    }

    /// DELETE without any filter renders `WHERE 1=0`.
    pub fn delete(table: &str) -> Self {
        Self::new(QueryKind::Delete, table)
    }

    pub fn upsert(table: &str) -> Self {
        Self::new(QueryKind::Upsert, table)
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    // ==================== SELECT clauses ====================

    /// Columns to select; `*` when never called.
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.select_fields.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    /// Append a join clause verbatim, e.g. `JOIN contacts c ON c.id = l.contact_id`.
    pub fn join(mut self, clause: &str) -> Self {
        self.joins.push(clause.to_string());
        self
    }

    pub fn group_by(mut self, expr: &str) -> Self {
        self.group_by.push(expr.to_string());
        self
    }

    pub fn order_by(mut self, expr: &str) -> Self {
        self.order_by.push(expr.to_string());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Lock the selected rows until the surrounding transaction ends.
    pub fn for_update(mut self) -> Self {
        self.for_update = true;
        self
    }

    // ==================== WHERE ====================

    /// AND a predicate using `?` markers. An empty predicate is a no-op.
    pub fn filter(mut self, predicate: &str, args: Vec<Param>) -> Self {
        self.filter.add(predicate, args);
        self
    }

    /// AND `column = ?`.
    pub fn filter_eq<T: ToSql + Debug + Send + Sync + 'static>(self, column: &str, value: T) -> Self {
        let predicate = format!("{column} = ?");
        self.filter(&predicate, vec![Param::new(value)])
    }

    /// AND `column IN (?, ...)`; an empty list adds no predicate at all.
    pub fn filter_in<T: ToSql + Debug + Send + Sync + 'static>(
        self,
        column: &str,
        values: Vec<T>,
    ) -> Self {
        self.filter_list(column, "IN", values)
    }

    /// AND `column NOT IN (?, ...)`; an empty list adds no predicate at all.
    pub fn filter_not_in<T: ToSql + Debug + Send + Sync + 'static>(
        self,
        column: &str,
        values: Vec<T>,
    ) -> Self {
        self.filter_list(column, "NOT IN", values)
    }

    fn filter_list<T: ToSql + Debug + Send + Sync + 'static>(
        self,
        column: &str,
        op: &str,
        values: Vec<T>,
    ) -> Self {
        if values.is_empty() {
            return self;
        }
        let markers = vec!["?"; values.len()].join(", ");
        let predicate = format!("{column} {op} ({markers})");
        self.filter(&predicate, values.into_iter().map(Param::new).collect())
    }

    pub fn has_filter(&self) -> bool {
        !self.filter.is_empty()
    }

    // ==================== INSERT ====================

    /// Declare insert columns. Must precede every [`Self::push_insert_values`].
    pub fn set_insert_fields(mut self, names: &[&str]) -> KycResult<Self> {
        self.insert.add_fields(names)?;
        Ok(self)
    }

    /// Append one row; fails immediately when its length differs from the field count.
    pub fn push_insert_values(mut self, values: Vec<Param>) -> KycResult<Self> {
        self.insert.push_row(values)?;
        Ok(self)
    }

    pub fn insert_row_count(&self) -> usize {
        self.insert.row_count()
    }

    /// Conflict target for `ON CONFLICT (keys)`. With SET assignments the statement
    /// becomes `DO UPDATE`, otherwise `DO NOTHING`.
    pub fn on_conflict(mut self, keys: &[&str]) -> Self {
        self.conflict_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    // ==================== UPDATE ====================

    pub fn set_update<T: ToSql + Debug + Send + Sync + 'static>(mut self, field: &str, value: T) -> Self {
        self.update.set(field, UpdateValue::Bind(Param::new(value)));
        self
    }

    /// Assign only when the value is present.
    pub fn set_update_opt<T: ToSql + Debug + Send + Sync + 'static>(
        self,
        field: &str,
        value: Option<T>,
    ) -> Self {
        match value {
            Some(v) => self.set_update(field, v),
            None => self,
        }
    }

    pub fn set_update_param(mut self, field: &str, param: Param) -> Self {
        self.update.set(field, UpdateValue::Bind(param));
        self
    }

    /// `field = excluded.field`
    pub fn set_update_excluded(mut self, field: &str) -> Self {
        self.update.set(field, UpdateValue::Excluded);
        self
    }

    pub fn set_update_raw(mut self, field: &str, expr: &str) -> Self {
        self.update.set(field, UpdateValue::Raw(expr.to_string()));
        self
    }

    /// `UPDATE ... SET ... FROM <source> WHERE ...`
    pub fn update_from(mut self, source: &str) -> Self {
        self.update.set_from(source);
        self
    }

    /// True iff at least one SET assignment was added.
    pub fn is_updatable(&self) -> bool {
        self.update.is_updatable()
    }

    // ==================== RETURNING ====================

    /// Columns returned by a mutation; `*` when never called.
    pub fn returning(mut self, fields: &[&str]) -> Self {
        self.returning = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    // ==================== Build ====================

    /// Checks that do not need the database. Execution helpers run this first.
    pub fn validate(&self) -> KycResult<()> {
        match self.kind {
            QueryKind::Update if !self.is_updatable() => Err(KycError::validation(format!(
                "UPDATE {}: no fields to update",
                self.table
            ))),
            QueryKind::Insert | QueryKind::Upsert if self.insert.is_empty() => Err(
                KycError::validation(format!("{} {}: no values", self.kind.as_str(), self.table)),
            ),
            QueryKind::Upsert if self.dialect == Dialect::Postgres && self.conflict_keys.is_empty() => {
                Err(KycError::validation(format!(
                    "UPSERT {}: PostgreSQL needs conflict keys",
                    self.table
                )))
            }
            _ => Ok(()),
        }
    }

    /// Render the statement, bind values in marker order and describe it.
    ///
    /// An UPDATE without assignments still renders (as SQL the database rejects);
    /// callers are expected to check [`Self::is_updatable`] first.
    pub fn generate_sql(&self) -> KycResult<BuiltQuery> {
        let mut params = ParamList::new();
        let sql = match self.kind {
            QueryKind::Select => self.render_select(&mut params),
            QueryKind::Insert => self.render_insert(&mut params, false)?,
            QueryKind::Upsert => self.render_upsert(&mut params)?,
            QueryKind::Update => self.render_update(&mut params),
            QueryKind::Delete => self.render_delete(&mut params),
        };
        let sql = number_placeholders_checked(&sql, params.len())?;
        let description = self.describe(params.len());
        Ok(BuiltQuery::new(sql, params, description))
    }

    fn render_where(&self, sql: &mut String, params: &mut ParamList) {
        if let Some((predicates, args)) = self.filter.render() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicates);
            params.extend_params(args);
        }
    }

    fn render_returning(&self, sql: &mut String) {
        sql.push_str(" RETURNING ");
        if self.returning.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.returning.join(", "));
        }
    }

    fn render_select(&self, params: &mut ParamList) -> String {
        let fields = if self.select_fields.is_empty() {
            "*".to_string()
        } else {
            self.select_fields.join(", ")
        };
        let mut sql = format!("SELECT {fields} FROM {}", self.table);
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        self.render_where(&mut sql, params);
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        if self.for_update {
            sql.push_str(" FOR UPDATE");
        }
        sql
    }

    fn render_insert(&self, params: &mut ParamList, native_upsert: bool) -> KycResult<String> {
        if self.insert.is_empty() {
            return Err(KycError::validation(format!(
                "{} {}: no values",
                self.kind.as_str(),
                self.table
            )));
        }
        let verb = if native_upsert { "UPSERT" } else { "INSERT" };
        let (tuples, values) = self.insert.render_tuples();
        let mut sql = format!(
            "{verb} INTO {} ({}) VALUES {tuples}",
            self.table,
            self.insert.fields().join(", ")
        );
        params.extend_params(values);

        if !native_upsert && !self.conflict_keys.is_empty() {
            sql.push_str(&format!(" ON CONFLICT ({})", self.conflict_keys.join(", ")));
            if self.update.is_updatable() {
                let (assignments, args) = self.update.render();
                sql.push_str(" DO UPDATE SET ");
                sql.push_str(&assignments);
                params.extend_params(&args);
            } else {
                sql.push_str(" DO NOTHING");
            }
        }

        self.render_returning(&mut sql);
        Ok(sql)
    }

    fn render_upsert(&self, params: &mut ParamList) -> KycResult<String> {
        match self.dialect {
            Dialect::Cockroach => self.render_insert(params, true),
            Dialect::Postgres => {
                if self.conflict_keys.is_empty() {
                    return Err(KycError::validation(format!(
                        "UPSERT {}: PostgreSQL needs conflict keys",
                        self.table
                    )));
                }
                // Non-key columns take the incoming row unless assigned explicitly.
                let mut merged = UpdateBracket::default();
                for field in self.insert.fields() {
                    if !self.conflict_keys.contains(field) && !self.update.has_field(field) {
                        merged.set(field, UpdateValue::Excluded);
                    }
                }
                for (field, value) in self.update.assignments() {
                    merged.set(field, value.clone());
                }
                let expanded = QueryBuilder {
                    update: merged,
                    ..self.clone()
                };
                expanded.render_insert(params, false)
            }
        }
    }

    fn render_update(&self, params: &mut ParamList) -> String {
        let (assignments, args) = self.update.render();
        let mut sql = format!("UPDATE {} SET {assignments}", self.table);
        params.extend_params(&args);
        if let Some(source) = self.update.from_source() {
            sql.push_str(" FROM ");
            sql.push_str(source);
        }
        self.render_where(&mut sql, params);
        self.render_returning(&mut sql);
        sql
    }

    fn render_delete(&self, params: &mut ParamList) -> String {
        let mut sql = format!("DELETE FROM {}", self.table);
        if self.filter.is_empty() {
            sql.push_str(" WHERE 1=0");
        } else {
            self.render_where(&mut sql, params);
        }
        self.render_returning(&mut sql);
        sql
    }

    fn describe(&self, param_count: usize) -> String {
        let mut parts = Vec::new();
        match self.kind {
            QueryKind::Insert | QueryKind::Upsert => {
                parts.push(format!("{} row(s)", self.insert.row_count()));
            }
            QueryKind::Update => {
                parts.push(format!("{} field(s)", self.update.fields().count()));
            }
            _ => {}
        }
        if !self.filter.is_empty() {
            parts.push(format!("{} predicate(s)", self.filter.len()));
        }
        parts.push(format!("{param_count} param(s)"));
        let target = if self.kind.is_mutation() { "on" } else { "from" };
        format!("{} {target} {}: {}", self.kind.as_str(), self.table, parts.join(", "))
    }
}
