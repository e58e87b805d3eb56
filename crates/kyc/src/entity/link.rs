//! Linking tables keyed by `(user_id, label)`.

use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::entity::{AddressRepo, ContactRepo, IncomeRepo, Labeled, Repository, Status};
use crate::error::{KycError, KycResult};
use crate::qb::{Dialect, Param, QueryBuilder};
use crate::row::{FromRow, RowExt};

/// One row of a linking table. The target column is always read back as
/// `target_id`, whatever its name in the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRow {
    pub user_id: Uuid,
    pub target_id: Uuid,
    pub label: String,
    pub status: Status,
}

impl FromRow for LinkRow {
    fn from_row(row: &Row) -> KycResult<Self> {
        Ok(Self {
            user_id: row.try_get_column("user_id")?,
            target_id: row.try_get_column("target_id")?,
            label: row.try_get_column("label")?,
            status: row.try_parse_column("status")?,
        })
    }
}

/// A relation from users to one entity table.
pub trait LinkKind: Send + Sync + 'static {
    type Target: Repository;

    const LINK_TABLE: &'static str;
    /// Column of [`Self::LINK_TABLE`] referencing the target table.
    const TARGET_COLUMN: &'static str;
    /// `user_id, <target> AS target_id, label, status`
    const LINK_COLUMNS: &'static [&'static str];

    /// Live links of one user.
    fn build_live_links(user_id: Uuid) -> QueryBuilder {
        QueryBuilder::select(Self::LINK_TABLE)
            .fields(Self::LINK_COLUMNS)
            .filter_eq("user_id", user_id)
            .filter_not_in("status", Status::terminal_values())
            .order_by("label")
    }

    /// Upsert links as active. A label that was removed earlier still owns its
    /// row, so the conflict on `(user_id, label)` revives it in place.
    fn build_insert_links(
        dialect: Dialect,
        user_id: Uuid,
        links: &[(&str, Uuid)],
    ) -> KycResult<QueryBuilder> {
        let mut qb = QueryBuilder::upsert(Self::LINK_TABLE)
            .dialect(dialect)
            .set_insert_fields(&["user_id", Self::TARGET_COLUMN, "label", "status"])?;
        for (label, target) in links {
            qb = qb.push_insert_values(vec![
                Param::new(user_id),
                Param::new(*target),
                Param::new(label.to_string()),
                Param::new(Status::Active.as_str()),
            ])?;
        }
        Ok(qb
            .on_conflict(&["user_id", "label"])
            .returning(Self::LINK_COLUMNS))
    }

    /// Change the target and/or status of one live link.
    fn build_update_link(
        user_id: Uuid,
        label: &str,
        target: Option<Uuid>,
        status: Option<Status>,
    ) -> QueryBuilder {
        QueryBuilder::update(Self::LINK_TABLE)
            .set_update_opt(Self::TARGET_COLUMN, target)
            .set_update_opt("status", status.map(Status::as_str))
            .filter_eq("user_id", user_id)
            .filter_eq("label", label.to_string())
            .filter_not_in("status", Status::terminal_values())
            .returning(Self::LINK_COLUMNS)
    }

    /// Soft-delete the live links with the given labels.
    fn build_remove_links(user_id: Uuid, labels: Vec<String>) -> QueryBuilder {
        QueryBuilder::update(Self::LINK_TABLE)
            .set_update("status", Status::Canceled.as_str())
            .filter_eq("user_id", user_id)
            .filter_in("label", labels)
            .filter_not_in("status", Status::terminal_values())
            .returning(Self::LINK_COLUMNS)
    }

    /// Live links of one user joined with their targets.
    fn build_get_labeled(user_id: Uuid) -> QueryBuilder {
        let target = <Self::Target as Repository>::TABLE;
        let mut columns = vec!["l.label".to_string(), "l.status AS link_status".to_string()];
        columns.extend(
            <Self::Target as Repository>::COLUMNS
                .iter()
                .map(|c| format!("t.{c}")),
        );
        let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
        QueryBuilder::select(&format!("{} l", Self::LINK_TABLE))
            .fields(&columns)
            .join(&format!("JOIN {target} t ON t.id = l.{}", Self::TARGET_COLUMN))
            .filter_eq("l.user_id", user_id)
            .filter_not_in("l.status", Status::terminal_values())
            .order_by("l.label")
    }

    fn scan_labeled(row: &Row) -> KycResult<Labeled<<Self::Target as Repository>::Record>> {
        Ok(Labeled {
            label: row.try_get_column("label")?,
            status: row.try_parse_column("link_status")?,
            item: <Self::Target as Repository>::scan_one(row)?,
        })
    }

    fn label_not_found(label: &str) -> KycError {
        KycError::not_found(format!(
            "no live {} labeled '{label}'",
            <Self::Target as Repository>::ENTITY
        ))
    }
}

pub struct ContactLinks;

impl LinkKind for ContactLinks {
    type Target = ContactRepo;

    const LINK_TABLE: &'static str = "users_contacts";
    const TARGET_COLUMN: &'static str = "contact_id";
    const LINK_COLUMNS: &'static [&'static str] =
        &["user_id", "contact_id AS target_id", "label", "status"];
}

pub struct IncomeLinks;

impl LinkKind for IncomeLinks {
    type Target = IncomeRepo;

    const LINK_TABLE: &'static str = "users_incomes";
    const TARGET_COLUMN: &'static str = "income_id";
    const LINK_COLUMNS: &'static [&'static str] =
        &["user_id", "income_id AS target_id", "label", "status"];
}

pub struct AddressLinks;

impl LinkKind for AddressLinks {
    type Target = AddressRepo;

    const LINK_TABLE: &'static str = "users_addresses";
    const TARGET_COLUMN: &'static str = "address_id";
    const LINK_COLUMNS: &'static [&'static str] =
        &["user_id", "address_id AS target_id", "label", "status"];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_links_revives_removed_labels() {
        let user = Uuid::new_v4();
        let built = ContactLinks::build_insert_links(Dialect::Postgres, user, &[("home", Uuid::new_v4())])
            .unwrap()
            .generate_sql()
            .unwrap();
        assert_eq!(
            built.sql,
            "INSERT INTO users_contacts (user_id, contact_id, label, status) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, label) DO UPDATE SET contact_id = excluded.contact_id, \
             status = excluded.status RETURNING user_id, contact_id AS target_id, label, status"
        );
    }

    #[test]
    fn cockroach_links_use_native_upsert() {
        let built = ContactLinks::build_insert_links(
            Dialect::Cockroach,
            Uuid::new_v4(),
            &[("home", Uuid::new_v4()), ("work", Uuid::new_v4())],
        )
        .unwrap()
        .generate_sql()
        .unwrap();
        assert_eq!(
            built.sql,
            "UPSERT INTO users_contacts (user_id, contact_id, label, status) \
             VALUES ($1, $2, $3, $4), ($5, $6, $7, $8) \
             RETURNING user_id, contact_id AS target_id, label, status"
        );
    }

    #[test]
    fn empty_link_batch_is_rejected() {
        let qb = AddressLinks::build_insert_links(Dialect::Postgres, Uuid::new_v4(), &[]).unwrap();
        assert!(qb.validate().is_err());
        assert!(qb.generate_sql().is_err());
    }

    #[test]
    fn update_link_binds_set_before_where() {
        let target = Uuid::new_v4();
        let built = IncomeLinks::build_update_link(Uuid::new_v4(), "salary", Some(target), None)
            .generate_sql()
            .unwrap();
        assert_eq!(
            built.sql,
            "UPDATE users_incomes SET income_id = $1 WHERE user_id = $2 AND label = $3 \
             AND status NOT IN ($4, $5) RETURNING user_id, income_id AS target_id, label, status"
        );
        assert_eq!(built.param_reprs()[0], format!("{target:?}"));
        assert_eq!(built.param_reprs()[2], "\"salary\"");
    }

    #[test]
    fn update_link_without_change_is_not_updatable() {
        let qb = ContactLinks::build_update_link(Uuid::new_v4(), "home", None, None);
        assert!(!qb.is_updatable());
        assert!(qb.validate().is_err());
    }

    #[test]
    fn remove_links_cancels_by_label() {
        let built = ContactLinks::build_remove_links(
            Uuid::new_v4(),
            vec!["home".into(), "work".into()],
        )
        .generate_sql()
        .unwrap();
        assert!(built.sql.starts_with(
            "UPDATE users_contacts SET status = $1 WHERE user_id = $2 AND label IN ($3, $4)"
        ));
        assert_eq!(built.param_reprs()[0], "\"canceled\"");
    }

    #[test]
    fn labeled_select_joins_target() {
        let built = AddressLinks::build_get_labeled(Uuid::new_v4()).generate_sql().unwrap();
        assert!(built.sql.starts_with(
            "SELECT l.label, l.status AS link_status, t.id, t.country, t.city"
        ));
        assert!(built.sql.contains(
            "FROM users_addresses l JOIN addresses t ON t.id = l.address_id WHERE l.user_id = $1"
        ));
        assert!(built.sql.ends_with("ORDER BY l.label"));
    }
}
