//! Parameter storage using Arc for clone-friendly query builders.

use std::fmt::Debug;
use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// A clone-friendly bound value.
///
/// Besides the `ToSql` value it keeps a `Debug` rendering, so built statements can be
/// logged and asserted on without going through the database.
#[derive(Clone)]
pub struct Param {
    value: Arc<dyn ToSql + Send + Sync>,
    repr: Arc<str>,
}

impl Param {
    /// Create a new parameter from any ToSql value.
    pub fn new<T: ToSql + Debug + Send + Sync + 'static>(value: T) -> Self {
        let repr: Arc<str> = format!("{value:?}").into();
        Param {
            value: Arc::new(value),
            repr,
        }
    }

    /// Get a reference to the inner value as a ToSql trait object.
    pub fn as_sql(&self) -> &(dyn ToSql + Sync) {
        &*self.value as &(dyn ToSql + Sync)
    }

    /// `Debug` rendering of the bound value.
    pub fn repr(&self) -> &str {
        &self.repr
    }
}

impl Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.repr)
    }
}

/// Ordered parameters of one statement; index `i` binds to `$(i + 1)`.
#[derive(Clone, Debug, Default)]
pub struct ParamList {
    params: Vec<Param>,
}

impl ParamList {
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a pre-wrapped Param and return its 1-based index.
    pub fn push_param(&mut self, param: Param) -> usize {
        self.params.push(param);
        self.params.len()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Get all parameters as references for tokio-postgres.
    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(Param::as_sql).collect()
    }

    /// Extend this list with parameters from an iterator.
    pub fn extend_params<'a>(&mut self, params: impl IntoIterator<Item = &'a Param>) {
        self.params.extend(params.into_iter().cloned());
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    /// `Debug` renderings of every parameter, in binding order.
    pub fn reprs(&self) -> Vec<&str> {
        self.params.iter().map(Param::repr).collect()
    }
}
