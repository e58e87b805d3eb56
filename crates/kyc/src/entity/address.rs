use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::entity::{ListFilter, Repository, Status};
use crate::error::{KycError, KycResult};
use crate::qb::{Param, QueryBuilder};
use crate::row::{FromRow, RowExt};
use crate::validate;

/// Where inside the city mail is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressLocation {
    Street { street: String, number: String },
    PostBox { po_box: String },
}

impl AddressLocation {
    pub const COLUMNS: [&'static str; 3] = ["street", "street_number", "po_box"];

    pub fn to_columns(&self) -> [Option<String>; 3] {
        match self {
            Self::Street { street, number } => [Some(street.clone()), Some(number.clone()), None],
            Self::PostBox { po_box } => [None, None, Some(po_box.clone())],
        }
    }

    pub fn from_columns(columns: [Option<String>; 3]) -> Option<Self> {
        match columns {
            [Some(street), Some(number), None] => Some(Self::Street { street, number }),
            [None, None, Some(po_box)] => Some(Self::PostBox { po_box }),
            _ => None,
        }
    }

    fn check(&self) -> KycResult<()> {
        match self {
            Self::Street { street, number } => {
                validate::require_text("street", street)?;
                validate::require_text("street number", number)
            }
            Self::PostBox { po_box } => validate::require_text("po box", po_box),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub country: String,
    pub city: String,
    pub postal_code: String,
    pub location: AddressLocation,
    pub status: Status,
}

impl FromRow for Address {
    fn from_row(row: &Row) -> KycResult<Self> {
        let columns = [
            row.try_get_column::<Option<String>>("street")?,
            row.try_get_column::<Option<String>>("street_number")?,
            row.try_get_column::<Option<String>>("po_box")?,
        ];
        let location = AddressLocation::from_columns(columns).ok_or_else(|| {
            KycError::decode("location", "expected street and street_number, or po_box")
        })?;
        Ok(Self {
            id: row.try_get_column("id")?,
            country: row.try_get_column("country")?,
            city: row.try_get_column("city")?,
            postal_code: row.try_get_column("postal_code")?,
            location,
            status: row.try_parse_column("status")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAddress {
    pub country: String,
    pub city: String,
    pub postal_code: String,
    pub location: Option<AddressLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressUpdate {
    pub id: Uuid,
    pub country: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub location: Option<AddressLocation>,
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressFilter {
    #[serde(flatten)]
    pub list: ListFilter,
    #[serde(default)]
    pub countries: Vec<String>,
}

fn check_country(code: &str) -> KycResult<()> {
    if !validate::is_country_code(code) {
        return Err(KycError::validation(format!("invalid country '{code}'")));
    }
    Ok(())
}

pub struct AddressRepo;

impl Repository for AddressRepo {
    type Record = Address;
    type Create = NewAddress;
    type Update = AddressUpdate;
    type Filter = AddressFilter;

    const TABLE: &'static str = "addresses";
    const ENTITY: &'static str = "address";
    const PACKAGE: &'static str = "kyc.addresses";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "country",
        "city",
        "postal_code",
        "street",
        "street_number",
        "po_box",
        "status",
    ];

    fn validate_create(req: &NewAddress) -> KycResult<()> {
        check_country(&req.country)?;
        validate::require_text("city", &req.city)?;
        validate::require_text("postal code", &req.postal_code)?;
        validate::require_one_of("location", &req.location)?.check()
    }

    fn validate_update(req: &AddressUpdate) -> KycResult<()> {
        if let Some(country) = &req.country {
            check_country(country)?;
        }
        if let Some(city) = &req.city {
            validate::require_text("city", city)?;
        }
        if let Some(postal_code) = &req.postal_code {
            validate::require_text("postal code", postal_code)?;
        }
        req.location.as_ref().map_or(Ok(()), AddressLocation::check)
    }

    fn insert_values(req: &NewAddress) -> Vec<Param> {
        let location = req
            .location
            .as_ref()
            .map(AddressLocation::to_columns)
            .unwrap_or_default();
        let mut values = vec![
            Param::new(req.country.clone()),
            Param::new(req.city.clone()),
            Param::new(req.postal_code.clone()),
        ];
        values.extend(location.into_iter().map(Param::new));
        values
    }

    fn update_id(req: &AddressUpdate) -> Uuid {
        req.id
    }

    fn apply_update(mut qb: QueryBuilder, req: &AddressUpdate) -> QueryBuilder {
        qb = qb
            .set_update_opt("country", req.country.clone())
            .set_update_opt("city", req.city.clone())
            .set_update_opt("postal_code", req.postal_code.clone());
        if let Some(location) = &req.location {
            for (column, value) in AddressLocation::COLUMNS.iter().zip(location.to_columns()) {
                qb = qb.set_update(column, value);
            }
        }
        qb.set_update_opt("status", req.status.map(Status::as_str))
    }

    fn apply_filter(qb: QueryBuilder, filter: &AddressFilter) -> QueryBuilder {
        filter.list.apply(qb).filter_in("country", filter.countries.clone())
    }

    fn record_id(record: &Address) -> Uuid {
        record.id
    }

    fn record_status(record: &Address) -> Status {
        record.status
    }
}
