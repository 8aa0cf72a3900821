//! Query vocabulary for the table-scoped store: equality / range / pattern
//! filters, ordering, and bounded pagination.

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

/// Filter comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gte,
    Lte,
    Like,
}

/// One field filter applied to the serialized form of a record
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// A `get_all` query: filters, optional ordering, limit and page
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<String>,
    pub direction: Direction,
    pub limit: Option<usize>,
    pub page: usize,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, field: &str, op: FilterOp, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).expect("filter value serializes");
        self.filters.push(Filter {
            field: field.to_string(),
            op,
            value,
        });
        self
    }

    pub fn eq(self, field: &str, value: impl Serialize) -> Self {
        self.push(field, FilterOp::Eq, value)
    }

    pub fn neq(self, field: &str, value: impl Serialize) -> Self {
        self.push(field, FilterOp::Neq, value)
    }

    pub fn gte(self, field: &str, value: impl Serialize) -> Self {
        self.push(field, FilterOp::Gte, value)
    }

    pub fn lte(self, field: &str, value: impl Serialize) -> Self {
        self.push(field, FilterOp::Lte, value)
    }

    pub fn like(self, field: &str, pattern: &str) -> Self {
        self.push(field, FilterOp::Like, pattern)
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(field.to_string());
        self.direction = direction;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }
}

/// Whether a serialized record satisfies every filter
pub(crate) fn matches(record: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| {
        let field = record.get(&f.field).unwrap_or(&Value::Null);
        match f.op {
            FilterOp::Eq => field == &f.value,
            FilterOp::Neq => field != &f.value,
            FilterOp::Gte => {
                matches!(compare(field, &f.value), Some(Ordering::Greater | Ordering::Equal))
            }
            FilterOp::Lte => {
                matches!(compare(field, &f.value), Some(Ordering::Less | Ordering::Equal))
            }
            FilterOp::Like => match (field.as_str(), f.value.as_str()) {
                (Some(text), Some(pattern)) => like_match(text, pattern),
                _ => false,
            },
        }
    })
}

/// Compare two record fields for ordering purposes. Numeric-looking strings
/// (serialized decimals) compare numerically; everything else falls back to
/// the string form, which keeps ISO dates chronological.
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64().partial_cmp(&y.as_f64()),
        (Value::String(x), Value::String(y)) => {
            match (Decimal::from_str(x), Decimal::from_str(y)) {
                (Ok(dx), Ok(dy)) => Some(dx.cmp(&dy)),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        _ => None,
    }
}

/// Compare two records on a named field
pub(crate) fn compare_on(a: &Value, b: &Value, field: &str) -> Ordering {
    let fa = a.get(field).unwrap_or(&Value::Null);
    let fb = b.get(field).unwrap_or(&Value::Null);
    compare(fa, fb).unwrap_or(Ordering::Equal)
}

/// SQL-style LIKE with `%` wildcards
pub(crate) fn like_match(text: &str, pattern: &str) -> bool {
    let mut segments = pattern.split('%');
    let first = segments.next().unwrap_or("");
    if !text.starts_with(first) {
        return false;
    }
    let mut pos = first.len();
    let mut rest: Vec<&str> = segments.collect();
    let last = rest.pop();
    for segment in rest {
        if segment.is_empty() {
            continue;
        }
        match text[pos..].find(segment) {
            Some(found) => pos += found + segment.len(),
            None => return false,
        }
    }
    match last {
        // No '%' in the pattern at all: exact match required
        None => pos == text.len(),
        Some("") => true,
        Some(segment) => text[pos..].ends_with(segment),
    }
}
