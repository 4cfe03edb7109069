//! Filter, sort and value types for storage engine requests.

use rusqlite::types::Value;

/// A typed column of an entity schema.
pub trait Field: Copy {
    fn column(self) -> &'static str;
}

/// Value bound into a filter or assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Bool(bool),
}

impl FieldValue {
    pub(crate) fn into_sql(self) -> Value {
        match self {
            Self::Text(value) => Value::Text(value),
            Self::Integer(value) => Value::Integer(value),
            Self::Bool(value) => Value::Integer(i64::from(value)),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Row predicate over fields of one entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter<F> {
    /// Matches every row.
    All,
    Eq(F, FieldValue),
    /// Logical AND of every sub-filter. Empty matches every row.
    And(Vec<Filter<F>>),
}

impl<F: Field> Filter<F> {
    pub fn equals(field: F, value: impl Into<FieldValue>) -> Self {
        Self::Eq(field, value.into())
    }

    /// Combines two filters with AND, flattening nested conjunctions.
    pub fn and(self, other: Filter<F>) -> Self {
        match (self, other) {
            (Self::All, other) => other,
            (this, Self::All) => this,
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), other) => {
                left.push(other);
                Self::And(left)
            }
            (this, other) => Self::And(vec![this, other]),
        }
    }

    /// Renders the predicate with `?` placeholders, pushing bound values in
    /// placeholder order.
    pub(crate) fn to_sql(&self, binds: &mut Vec<Value>) -> String {
        match self {
            Self::All => "1 = 1".to_string(),
            Self::Eq(field, value) => {
                binds.push(value.clone().into_sql());
                format!("{} = ?", field.column())
            }
            Self::And(filters) if filters.is_empty() => "1 = 1".to_string(),
            Self::And(filters) => filters
                .iter()
                .map(|filter| format!("({})", filter.to_sql(binds)))
                .collect::<Vec<_>>()
                .join(" AND "),
        }
    }
}

/// One ordering term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey<F> {
    pub field: F,
    pub ascending: bool,
}

impl<F: Field> SortKey<F> {
    pub fn asc(field: F) -> Self {
        Self {
            field,
            ascending: true,
        }
    }

    pub fn desc(field: F) -> Self {
        Self {
            field,
            ascending: false,
        }
    }

    fn to_sql(self) -> String {
        let direction = if self.ascending { "ASC" } else { "DESC" };
        format!("{} {direction}", self.field.column())
    }
}

/// Multi-row fetch request: optional filter, sort terms applied in order,
/// optional row limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest<F> {
    pub filter: Filter<F>,
    pub sort: Vec<SortKey<F>>,
    pub limit: Option<u32>,
}

impl<F: Field> FetchRequest<F> {
    /// Fetches every row in store-defined order.
    pub fn all() -> Self {
        Self {
            filter: Filter::All,
            sort: Vec::new(),
            limit: None,
        }
    }

    pub fn filtered(filter: Filter<F>) -> Self {
        Self {
            filter,
            ..Self::all()
        }
    }

    pub fn sorted_by(mut self, key: SortKey<F>) -> Self {
        self.sort.push(key);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn order_by_sql(&self) -> Option<String> {
        if self.sort.is_empty() {
            return None;
        }
        Some(
            self.sort
                .iter()
                .map(|key| key.to_sql())
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}
