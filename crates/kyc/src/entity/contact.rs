use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::entity::{ListFilter, Repository, Status};
use crate::error::{KycError, KycResult};
use crate::qb::{Param, QueryBuilder};
use crate::row::{FromRow, RowExt};
use crate::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactType {
    Email,
    Phone,
    Messenger,
}

impl ContactType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Messenger => "messenger",
        }
    }

    /// Format check for a value of this type.
    pub fn check(self, value: &str) -> KycResult<()> {
        let ok = match self {
            Self::Email => validate::is_email(value),
            Self::Phone => validate::is_phone(value),
            Self::Messenger => !value.trim().is_empty(),
        };
        if !ok {
            return Err(KycError::validation(format!("invalid {} '{value}'", self.as_str())));
        }
        Ok(())
    }
}

impl fmt::Display for ContactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            "messenger" => Ok(Self::Messenger),
            other => Err(format!("unknown contact type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub contact_type: ContactType,
    pub value: String,
    pub status: Status,
}

impl FromRow for Contact {
    fn from_row(row: &Row) -> KycResult<Self> {
        Ok(Self {
            id: row.try_get_column("id")?,
            contact_type: row.try_parse_column("contact_type")?,
            value: row.try_get_column("value")?,
            status: row.try_parse_column("status")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContact {
    pub contact_type: ContactType,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactUpdate {
    pub id: Uuid,
    pub contact_type: Option<ContactType>,
    pub value: Option<String>,
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactFilter {
    #[serde(flatten)]
    pub list: ListFilter,
    #[serde(default)]
    pub contact_types: Vec<ContactType>,
}

pub struct ContactRepo;

impl Repository for ContactRepo {
    type Record = Contact;
    type Create = NewContact;
    type Update = ContactUpdate;
    type Filter = ContactFilter;

    const TABLE: &'static str = "contacts";
    const ENTITY: &'static str = "contact";
    const PACKAGE: &'static str = "kyc.contacts";
    const COLUMNS: &'static [&'static str] = &["id", "contact_type", "value", "status"];

    fn validate_create(req: &NewContact) -> KycResult<()> {
        validate::require_text("contact value", &req.value)?;
        req.contact_type.check(&req.value)
    }

    fn validate_update(req: &ContactUpdate) -> KycResult<()> {
        let Some(value) = &req.value else {
            return Ok(());
        };
        validate::require_text("contact value", value)?;
        match req.contact_type {
            Some(contact_type) => contact_type.check(value),
            None => Ok(()),
        }
    }

    fn insert_values(req: &NewContact) -> Vec<Param> {
        vec![
            Param::new(req.contact_type.as_str()),
            Param::new(req.value.clone()),
        ]
    }

    fn update_id(req: &ContactUpdate) -> Uuid {
        req.id
    }

    fn apply_update(qb: QueryBuilder, req: &ContactUpdate) -> QueryBuilder {
        qb.set_update_opt("contact_type", req.contact_type.map(ContactType::as_str))
            .set_update_opt("value", req.value.clone())
            .set_update_opt("status", req.status.map(Status::as_str))
    }

    fn apply_filter(qb: QueryBuilder, filter: &ContactFilter) -> QueryBuilder {
        filter.list.apply(qb).filter_in(
            "contact_type",
            filter.contact_types.iter().map(|t| t.as_str()).collect(),
        )
    }

    fn record_id(record: &Contact) -> Uuid {
        record.id
    }

    fn record_status(record: &Contact) -> Status {
        record.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(value: &str) -> NewContact {
        NewContact {
            contact_type: ContactType::Email,
            value: value.to_string(),
        }
    }

    #[test]
    fn insert_many_binds_every_column() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (first, second) = (email("a@example.org"), email("b@example.org"));
        let built = ContactRepo::build_insert_many(&[(a, &first), (b, &second)])
            .unwrap()
            .generate_sql()
            .unwrap();
        assert_eq!(
            built.sql,
            "INSERT INTO contacts (id, contact_type, value, status) \
             VALUES ($1, $2, $3, $4), ($5, $6, $7, $8) \
             RETURNING id, contact_type, value, status"
        );
        assert_eq!(built.params.len(), 2 * ContactRepo::COLUMNS.len());
        assert_eq!(built.param_reprs()[0], format!("{a:?}"));
        assert_eq!(built.param_reprs()[3], "\"active\"");
    }

    #[test]
    fn insert_rejects_malformed_value() {
        let err = ContactRepo::build_insert(&email("not-an-email")).unwrap_err();
        assert!(err.to_string().contains("invalid email"));
    }

    #[test]
    fn update_without_fields_fails_before_sql() {
        let req = ContactUpdate {
            id: Uuid::new_v4(),
            ..Default::default()
        };
        let err = ContactRepo::build_update(&req).unwrap_err();
        assert!(matches!(err, KycError::Validation(_)));
        assert!(err.to_string().contains("cannot update without new value"));
    }

    #[test]
    fn update_without_id_fails() {
        let req = ContactUpdate {
            value: Some("x@example.org".into()),
            ..Default::default()
        };
        let err = ContactRepo::build_update(&req).unwrap_err();
        assert!(err.to_string().contains("missing contact id"));
    }

    #[test]
    fn update_applies_create_checks_to_present_fields() {
        let blank = ContactUpdate {
            id: Uuid::new_v4(),
            value: Some("  ".into()),
            ..Default::default()
        };
        let err = ContactRepo::build_update(&blank).unwrap_err();
        assert!(matches!(err, KycError::Validation(_)));

        let mismatched = ContactUpdate {
            id: Uuid::new_v4(),
            contact_type: Some(ContactType::Email),
            value: Some("+441234567890".into()),
            ..Default::default()
        };
        let err = ContactRepo::build_update(&mismatched).unwrap_err();
        assert!(err.to_string().contains("invalid email"));
    }

    #[test]
    fn update_sets_only_present_fields() {
        let req = ContactUpdate {
            id: Uuid::new_v4(),
            value: Some("x@example.org".into()),
            ..Default::default()
        };
        let built = ContactRepo::build_update(&req).unwrap().generate_sql().unwrap();
        assert_eq!(
            built.sql,
            "UPDATE contacts SET value = $1 WHERE id = $2 \
             RETURNING id, contact_type, value, status"
        );
    }

    #[test]
    fn empty_status_filter_adds_no_clause() {
        let built = ContactRepo::build_get_list(&ContactFilter::default())
            .generate_sql()
            .unwrap();
        assert_eq!(
            built.sql,
            "SELECT id, contact_type, value, status FROM contacts ORDER BY id"
        );
        assert!(!built.sql.contains("status IN"));
    }

    #[test]
    fn list_filter_uses_non_empty_lists() {
        let filter = ContactFilter {
            list: ListFilter {
                ids: vec![],
                statuses: vec![Status::Active, Status::Validated],
            },
            contact_types: vec![ContactType::Phone],
        };
        let built = ContactRepo::build_get_list(&filter).generate_sql().unwrap();
        assert!(built.sql.contains("WHERE status IN ($1, $2) AND contact_type IN ($3)"));
        assert!(!built.sql.contains("id IN"));
    }

    #[test]
    fn delete_is_a_status_update() {
        let built = ContactRepo::build_delete(Uuid::new_v4())
            .unwrap()
            .generate_sql()
            .unwrap();
        assert_eq!(
            built.sql,
            "UPDATE contacts SET status = $1 WHERE id = $2 AND status NOT IN ($3, $4) \
             RETURNING id, contact_type, value, status"
        );
        assert_eq!(built.param_reprs()[0], "\"canceled\"");
    }

    #[test]
    fn replace_overwrites_data_columns() {
        let qb = ContactRepo::apply_replace(QueryBuilder::update("contacts"), &email("c@example.org"))
            .unwrap()
            .filter_eq("id", Uuid::new_v4());
        let built = qb.generate_sql().unwrap();
        assert!(built.sql.starts_with("UPDATE contacts SET contact_type = $1, value = $2 WHERE id = $3"));
    }
}
