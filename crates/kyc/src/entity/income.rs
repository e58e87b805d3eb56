use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::entity::{ListFilter, Repository, Status};
use crate::error::{KycError, KycResult};
use crate::qb::{Param, QueryBuilder};
use crate::row::{FromRow, RowExt};
use crate::validate;

/// An income amount in minor currency units, per period. Exactly one period is
/// stored; the other amount columns are NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeAmount {
    Year(i64),
    Month(i64),
    Hour(i64),
}

impl IncomeAmount {
    /// Amount columns, one per variant.
    pub const COLUMNS: [&'static str; 3] = ["amount_year", "amount_month", "amount_hour"];

    fn slot(self) -> (usize, i64) {
        match self {
            Self::Year(v) => (0, v),
            Self::Month(v) => (1, v),
            Self::Hour(v) => (2, v),
        }
    }

    /// Value for each of [`Self::COLUMNS`].
    pub fn to_columns(self) -> [Option<i64>; 3] {
        let (slot, value) = self.slot();
        let mut out = [None; 3];
        out[slot] = Some(value);
        out
    }

    pub fn from_columns(columns: [Option<i64>; 3]) -> Option<Self> {
        match columns {
            [Some(v), None, None] => Some(Self::Year(v)),
            [None, Some(v), None] => Some(Self::Month(v)),
            [None, None, Some(v)] => Some(Self::Hour(v)),
            _ => None,
        }
    }

    pub fn value(self) -> i64 {
        self.slot().1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Income {
    pub id: Uuid,
    pub currency: String,
    pub amount: IncomeAmount,
    pub status: Status,
}

impl FromRow for Income {
    fn from_row(row: &Row) -> KycResult<Self> {
        let mut columns = [None; 3];
        for (slot, column) in IncomeAmount::COLUMNS.iter().enumerate() {
            columns[slot] = row.try_get_column::<Option<i64>>(column)?;
        }
        let amount = IncomeAmount::from_columns(columns).ok_or_else(|| {
            KycError::decode("amount", "expected exactly one of amount_year, amount_month, amount_hour")
        })?;
        Ok(Self {
            id: row.try_get_column("id")?,
            currency: row.try_get_column("currency")?,
            amount,
            status: row.try_parse_column("status")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIncome {
    pub currency: String,
    pub amount: Option<IncomeAmount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeUpdate {
    pub id: Uuid,
    pub currency: Option<String>,
    pub amount: Option<IncomeAmount>,
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeFilter {
    #[serde(flatten)]
    pub list: ListFilter,
    #[serde(default)]
    pub currencies: Vec<String>,
}

fn check_amount(amount: IncomeAmount) -> KycResult<()> {
    if amount.value() < 0 {
        return Err(KycError::validation("income amount must not be negative"));
    }
    Ok(())
}

fn check_currency(currency: &str) -> KycResult<()> {
    if !validate::is_currency_code(currency) {
        return Err(KycError::validation(format!("invalid currency '{currency}'")));
    }
    Ok(())
}

pub struct IncomeRepo;

impl Repository for IncomeRepo {
    type Record = Income;
    type Create = NewIncome;
    type Update = IncomeUpdate;
    type Filter = IncomeFilter;

    const TABLE: &'static str = "incomes";
    const ENTITY: &'static str = "income";
    const PACKAGE: &'static str = "kyc.incomes";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "currency",
        "amount_year",
        "amount_month",
        "amount_hour",
        "status",
    ];

    fn validate_create(req: &NewIncome) -> KycResult<()> {
        check_currency(&req.currency)?;
        check_amount(*validate::require_one_of("amount", &req.amount)?)
    }

    fn validate_update(req: &IncomeUpdate) -> KycResult<()> {
        if let Some(currency) = &req.currency {
            check_currency(currency)?;
        }
        req.amount.map_or(Ok(()), check_amount)
    }

    fn insert_values(req: &NewIncome) -> Vec<Param> {
        let amounts = req.amount.map(IncomeAmount::to_columns).unwrap_or([None; 3]);
        let mut values = vec![Param::new(req.currency.clone())];
        values.extend(amounts.into_iter().map(Param::new));
        values
    }

    fn update_id(req: &IncomeUpdate) -> Uuid {
        req.id
    }

    fn apply_update(mut qb: QueryBuilder, req: &IncomeUpdate) -> QueryBuilder {
        qb = qb.set_update_opt("currency", req.currency.clone());
        if let Some(amount) = req.amount {
            // Clear the other periods so the row keeps a single amount.
            for (column, value) in IncomeAmount::COLUMNS.iter().zip(amount.to_columns()) {
                qb = qb.set_update(column, value);
            }
        }
        qb.set_update_opt("status", req.status.map(Status::as_str))
    }

    fn apply_filter(qb: QueryBuilder, filter: &IncomeFilter) -> QueryBuilder {
        filter.list.apply(qb).filter_in("currency", filter.currencies.clone())
    }

    fn record_id(record: &Income) -> Uuid {
        record.id
    }

    fn record_status(record: &Income) -> Status {
        record.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_maps_to_one_column() {
        assert_eq!(IncomeAmount::Month(4200).to_columns(), [None, Some(4200), None]);
        assert_eq!(
            IncomeAmount::from_columns([None, None, Some(15)]),
            Some(IncomeAmount::Hour(15))
        );
        assert_eq!(IncomeAmount::from_columns([Some(1), Some(2), None]), None);
        assert_eq!(IncomeAmount::from_columns([None; 3]), None);
    }

    #[test]
    fn create_requires_an_amount() {
        let req = NewIncome {
            currency: "EUR".into(),
            amount: None,
        };
        let err = IncomeRepo::build_insert(&req).unwrap_err();
        assert!(matches!(err, KycError::Validation(_)));
        assert!(err.to_string().contains("exactly one amount variant"));
    }

    #[test]
    fn create_with_one_amount_is_accepted() {
        let req = NewIncome {
            currency: "EUR".into(),
            amount: Some(IncomeAmount::Year(5_200_000)),
        };
        let (_, qb) = IncomeRepo::build_insert(&req).unwrap();
        let built = qb.generate_sql().unwrap();
        assert_eq!(built.params.len(), IncomeRepo::COLUMNS.len());
        assert_eq!(&built.param_reprs()[1..5], &["\"EUR\"", "Some(5200000)", "None", "None"]);
    }

    #[test]
    fn create_rejects_lowercase_currency() {
        let req = NewIncome {
            currency: "eur".into(),
            amount: Some(IncomeAmount::Month(1)),
        };
        assert!(IncomeRepo::build_insert(&req).is_err());
    }

    #[test]
    fn amount_update_rewrites_all_periods() {
        let req = IncomeUpdate {
            id: Uuid::new_v4(),
            amount: Some(IncomeAmount::Hour(30)),
            ..Default::default()
        };
        let built = IncomeRepo::build_update(&req).unwrap().generate_sql().unwrap();
        assert!(built.sql.starts_with(
            "UPDATE incomes SET amount_year = $1, amount_month = $2, amount_hour = $3 WHERE id = $4"
        ));
        assert_eq!(&built.param_reprs()[..3], &["None", "None", "Some(30)"]);
    }

    #[test]
    fn update_rejects_values_create_would_reject() {
        let currency = IncomeUpdate {
            id: Uuid::new_v4(),
            currency: Some("eur".into()),
            ..Default::default()
        };
        let err = IncomeRepo::build_update(&currency).unwrap_err();
        assert!(err.to_string().contains("invalid currency 'eur'"));

        let negative = IncomeUpdate {
            id: Uuid::new_v4(),
            amount: Some(IncomeAmount::Year(-5)),
            ..Default::default()
        };
        let err = IncomeRepo::build_update(&negative).unwrap_err();
        assert!(err.to_string().contains("must not be negative"));
    }

    #[test]
    fn update_with_nothing_set_is_rejected() {
        let req = IncomeUpdate {
            id: Uuid::new_v4(),
            ..Default::default()
        };
        let err = IncomeRepo::build_update(&req).unwrap_err();
        assert!(err.to_string().contains("cannot update without new value"));
    }
}
