//! The three sub-assemblers a [`QueryBuilder`](super::QueryBuilder) is composed of.
//!
//! Fragments render SQL with unnumbered `?` markers and keep their bound values in
//! the same left-to-right order. Numbering happens once, over the finished
//! statement (see [`super::placeholder`]).

use crate::error::{KycError, KycResult};
use crate::qb::param::Param;

/// Conjunctive predicate list: `p1 AND p2 AND ...`.
#[derive(Clone, Debug, Default)]
pub struct FilterBracket {
    predicates: Vec<String>,
    args: Vec<Param>,
}

impl FilterBracket {
    /// Add one predicate with its bound values. An empty predicate is ignored.
    pub fn add(&mut self, predicate: &str, args: Vec<Param>) {
        let predicate = predicate.trim();
        if predicate.is_empty() {
            return;
        }
        self.predicates.push(predicate.to_string());
        self.args.extend(args);
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// `None` when no predicate was added.
    pub fn render(&self) -> Option<(String, &[Param])> {
        if self.predicates.is_empty() {
            return None;
        }
        let sql = self
            .predicates
            .iter()
            .map(|p| {
                if self.predicates.len() > 1 && has_or(p) {
                    format!("({p})")
                } else {
                    p.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        Some((sql, &self.args))
    }
}

/// True when `OR` appears as a word anywhere in `predicate`, whatever surrounds it.
fn has_or(predicate: &str) -> bool {
    predicate
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|word| word.eq_ignore_ascii_case("or"))
}

/// Right-hand side of one SET assignment.
#[derive(Clone, Debug)]
pub enum UpdateValue {
    /// Bound parameter.
    Bind(Param),
    /// `field = excluded.field`, for `ON CONFLICT ... DO UPDATE`.
    Excluded,
    /// Raw SQL expression without parameters (e.g. `now()`).
    Raw(String),
}

/// SET-clause list, with an optional `FROM` source.
#[derive(Clone, Debug, Default)]
pub struct UpdateBracket {
    assignments: Vec<(String, UpdateValue)>,
    from: Option<String>,
}

impl UpdateBracket {
    pub fn set(&mut self, field: &str, value: UpdateValue) {
        self.assignments.push((field.to_string(), value));
    }

    pub fn set_from(&mut self, source: &str) {
        self.from = Some(source.to_string());
    }

    /// True iff at least one assignment exists.
    pub fn is_updatable(&self) -> bool {
        !self.assignments.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.assignments.iter().map(|(f, _)| f.as_str())
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.assignments.iter().any(|(f, _)| f == field)
    }

    pub fn assignments(&self) -> &[(String, UpdateValue)] {
        &self.assignments
    }

    pub fn from_source(&self) -> Option<&str> {
        self.from.as_deref()
    }

    /// Renders `a = ?, b = excluded.b` and the values bound by it.
    pub fn render(&self) -> (String, Vec<Param>) {
        let mut args = Vec::new();
        let parts: Vec<String> = self
            .assignments
            .iter()
            .map(|(field, value)| match value {
                UpdateValue::Bind(p) => {
                    args.push(p.clone());
                    format!("{field} = ?")
                }
                UpdateValue::Excluded => format!("{field} = excluded.{field}"),
                UpdateValue::Raw(expr) => format!("{field} = {expr}"),
            })
            .collect();
        (parts.join(", "), args)
    }
}

/// Ordered field list plus flattened value tuples.
#[derive(Clone, Debug, Default)]
pub struct InsertBracket {
    fields: Vec<String>,
    values: Vec<Param>,
}

impl InsertBracket {
    /// Declare more fields. Fails once a row has been added, since earlier tuples
    /// would no longer line up with the field list.
    pub fn add_fields(&mut self, names: &[&str]) -> KycResult<()> {
        if !self.values.is_empty() {
            return Err(KycError::validation(
                "insert fields cannot change after values were added",
            ));
        }
        self.fields.extend(names.iter().map(|n| n.to_string()));
        Ok(())
    }

    /// Append one value tuple; its length must equal the declared field count.
    pub fn push_row(&mut self, values: Vec<Param>) -> KycResult<()> {
        if self.fields.is_empty() {
            return Err(KycError::validation("insert values given before any field"));
        }
        if values.len() != self.fields.len() {
            return Err(KycError::validation(format!(
                "insert expects {} values per row, got {}",
                self.fields.len(),
                values.len()
            )));
        }
        self.values.extend(values);
        Ok(())
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn row_count(&self) -> usize {
        if self.fields.is_empty() {
            0
        } else {
            self.values.len() / self.fields.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Renders `(?, ?), (?, ?)` and the flattened values.
    pub fn render_tuples(&self) -> (String, &[Param]) {
        let tuple = format!("({})", vec!["?"; self.fields.len()].join(", "));
        let sql = vec![tuple; self.row_count()].join(", ");
        (sql, &self.values)
    }
}
