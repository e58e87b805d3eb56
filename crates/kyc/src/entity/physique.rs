use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::entity::{ListFilter, Repository, Status};
use crate::error::{KycError, KycResult};
use crate::qb::{Param, QueryBuilder};
use crate::row::{FromRow, RowExt};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Physique {
    pub id: Uuid,
    pub height_cm: i32,
    pub weight_kg: i32,
    pub eye_color: Option<String>,
    pub hair_color: Option<String>,
    pub status: Status,
}

impl FromRow for Physique {
    fn from_row(row: &Row) -> KycResult<Self> {
        Ok(Self {
            id: row.try_get_column("id")?,
            height_cm: row.try_get_column("height_cm")?,
            weight_kg: row.try_get_column("weight_kg")?,
            eye_color: row.try_get_column("eye_color")?,
            hair_color: row.try_get_column("hair_color")?,
            status: row.try_parse_column("status")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPhysique {
    pub height_cm: i32,
    pub weight_kg: i32,
    pub eye_color: Option<String>,
    pub hair_color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysiqueUpdate {
    pub id: Uuid,
    pub height_cm: Option<i32>,
    pub weight_kg: Option<i32>,
    pub eye_color: Option<String>,
    pub hair_color: Option<String>,
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysiqueFilter {
    #[serde(flatten)]
    pub list: ListFilter,
}

fn check_measure(field: &str, value: i32, max: i32) -> KycResult<()> {
    if !(1..=max).contains(&value) {
        return Err(KycError::validation(format!("{field} out of range: {value}")));
    }
    Ok(())
}

pub struct PhysiqueRepo;

impl Repository for PhysiqueRepo {
    type Record = Physique;
    type Create = NewPhysique;
    type Update = PhysiqueUpdate;
    type Filter = PhysiqueFilter;

    const TABLE: &'static str = "physiques";
    const ENTITY: &'static str = "physique";
    const PACKAGE: &'static str = "kyc.physiques";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "height_cm",
        "weight_kg",
        "eye_color",
        "hair_color",
        "status",
    ];

    fn validate_create(req: &NewPhysique) -> KycResult<()> {
        check_measure("height_cm", req.height_cm, 300)?;
        check_measure("weight_kg", req.weight_kg, 700)
    }

    fn validate_update(req: &PhysiqueUpdate) -> KycResult<()> {
        if let Some(height) = req.height_cm {
            check_measure("height_cm", height, 300)?;
        }
        req.weight_kg.map_or(Ok(()), |w| check_measure("weight_kg", w, 700))
    }

    fn insert_values(req: &NewPhysique) -> Vec<Param> {
        vec![
            Param::new(req.height_cm),
            Param::new(req.weight_kg),
            Param::new(req.eye_color.clone()),
            Param::new(req.hair_color.clone()),
        ]
    }

    fn update_id(req: &PhysiqueUpdate) -> Uuid {
        req.id
    }

    fn apply_update(qb: QueryBuilder, req: &PhysiqueUpdate) -> QueryBuilder {
        qb.set_update_opt("height_cm", req.height_cm)
            .set_update_opt("weight_kg", req.weight_kg)
            .set_update_opt("eye_color", req.eye_color.clone())
            .set_update_opt("hair_color", req.hair_color.clone())
            .set_update_opt("status", req.status.map(Status::as_str))
    }

    fn apply_filter(qb: QueryBuilder, filter: &PhysiqueFilter) -> QueryBuilder {
        filter.list.apply(qb)
    }

    fn record_id(record: &Physique) -> Uuid {
        record.id
    }

    fn record_status(record: &Physique) -> Status {
        record.status
    }
}
