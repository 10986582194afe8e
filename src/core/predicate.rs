//! Composable select queries and the numeric predicate builder
//!
//! A [`SelectQuery`] is a value: every builder method consumes the query and
//! returns a new one, so partially built queries can be shared and extended
//! independently. The same query can be rendered to parameterised SQL
//! ([`SelectQuery::to_sql`]) or evaluated against JSON rows
//! ([`SelectQuery::execute`]), which is what the in-memory store does.
//!
//! # Example
//!
//! ```rust
//! use monetize::core::predicate::{NumericBounds, SelectQuery};
//!
//! let bounds = NumericBounds::new().with_gte(10.0).with_lt(100.0);
//! let query = SelectQuery::from_table("packages").filter_by_number("price", &bounds);
//!
//! let (sql, params) = query.to_sql();
//! assert_eq!(sql, r#"SELECT * FROM "packages" WHERE "price" >= $1 AND "price" < $2"#);
//! assert_eq!(params.len(), 2);
//! ```

use crate::core::query::SortOrder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// How bounds equal to `0` are treated
///
/// `DropFalsy` keeps compatibility with clients that relied on zero bounds
/// being ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroBoundPolicy {
    /// A `0` bound is a real bound
    #[default]
    Keep,
    /// A `0` bound is treated as absent
    DropFalsy,
}

/// Optional numeric thresholds for a single column
///
/// Every bound is independent. Contradictory bounds (e.g. `gt: 10, lt: 5`)
/// are not rejected; they simply match nothing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NumericBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eq: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<f64>,
}

impl NumericBounds {
    /// Bounds with nothing set
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_eq(mut self, value: f64) -> Self {
        self.eq = Some(value);
        self
    }

    pub fn with_gt(mut self, value: f64) -> Self {
        self.gt = Some(value);
        self
    }

    pub fn with_gte(mut self, value: f64) -> Self {
        self.gte = Some(value);
        self
    }

    pub fn with_lt(mut self, value: f64) -> Self {
        self.lt = Some(value);
        self
    }

    pub fn with_lte(mut self, value: f64) -> Self {
        self.lte = Some(value);
        self
    }

    /// Set the bound matching `op`
    ///
    /// `CompareOp::In` has no numeric bound and is ignored.
    pub fn with_bound(self, op: CompareOp, value: f64) -> Self {
        match op {
            CompareOp::Eq => self.with_eq(value),
            CompareOp::Gt => self.with_gt(value),
            CompareOp::Gte => self.with_gte(value),
            CompareOp::Lt => self.with_lt(value),
            CompareOp::Lte => self.with_lte(value),
            CompareOp::In => self,
        }
    }

    /// True when no bound is present
    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }

    /// Present bounds in `eq, gt, gte, lt, lte` order
    pub fn present(&self) -> impl Iterator<Item = (CompareOp, f64)> + '_ {
        [
            (CompareOp::Eq, self.eq),
            (CompareOp::Gt, self.gt),
            (CompareOp::Gte, self.gte),
            (CompareOp::Lt, self.lt),
            (CompareOp::Lte, self.lte),
        ]
        .into_iter()
        .filter_map(|(op, value)| value.map(|v| (op, v)))
    }

    /// Apply a [`ZeroBoundPolicy`]
    pub fn with_policy(self, policy: ZeroBoundPolicy) -> Self {
        match policy {
            ZeroBoundPolicy::Keep => self,
            ZeroBoundPolicy::DropFalsy => {
                let truthy = |v: Option<f64>| v.filter(|n| *n != 0.0 && !n.is_nan());
                Self {
                    eq: truthy(self.eq),
                    gt: truthy(self.gt),
                    gte: truthy(self.gte),
                    lt: truthy(self.lt),
                    lte: truthy(self.lte),
                }
            }
        }
    }
}

/// Comparison operator of a [`Predicate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl CompareOp {
    /// SQL operator text
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::In => "IN",
        }
    }

    /// Split a filter key such as `price>=` into its column and operator
    ///
    /// Keys without an operator suffix return `None` for the operator.
    pub fn split_filter_key(key: &str) -> (&str, Option<CompareOp>) {
        // Two-character suffixes first so `>=` is not read as `>`.
        const SUFFIXES: [(&str, CompareOp); 4] = [
            (">=", CompareOp::Gte),
            ("<=", CompareOp::Lte),
            (">", CompareOp::Gt),
            ("<", CompareOp::Lt),
        ];

        for (suffix, op) in SUFFIXES {
            if let Some(column) = key.strip_suffix(suffix) {
                if !column.is_empty() {
                    return (column, Some(op));
                }
            }
        }
        (key, None)
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Gte => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
            CompareOp::In => false,
        }
    }
}

/// A single `column <op> value` condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub column: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Predicate {
    pub fn new(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Evaluate the predicate against a JSON row
    ///
    /// A missing or `null` column never matches.
    pub fn matches(&self, row: &Value) -> bool {
        let Some(field) = row.get(&self.column).filter(|v| !v.is_null()) else {
            return false;
        };

        match self.op {
            CompareOp::Eq => loosely_equal(field, &self.value),
            CompareOp::In => self
                .value
                .as_array()
                .is_some_and(|values| values.iter().any(|v| loosely_equal(field, v))),
            op => compare_values(field, &self.value).is_some_and(|ordering| op.accepts(ordering)),
        }
    }
}

/// A composable `SELECT` over a single table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectQuery {
    table: String,
    predicates: Vec<Predicate>,
    order_by: Option<(String, SortOrder)>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl SelectQuery {
    /// Start a query over `table` with no conditions
    pub fn from_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Conditions, all of which must hold
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn where_cmp(mut self, column: &str, op: CompareOp, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::new(column, op, value));
        self
    }

    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.where_cmp(column, CompareOp::Eq, value)
    }

    pub fn where_in(self, column: &str, values: Vec<Value>) -> Self {
        self.where_cmp(column, CompareOp::In, Value::Array(values))
    }

    /// Append one predicate per present bound
    ///
    /// With no bound present the query is returned unchanged.
    pub fn filter_by_number(self, column: &str, bounds: &NumericBounds) -> Self {
        if bounds.is_empty() {
            return self;
        }

        bounds
            .present()
            .fold(self, |query, (op, value)| query.where_cmp(column, op, value))
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// True when every predicate holds for `row`
    pub fn matches(&self, row: &Value) -> bool {
        self.predicates.iter().all(|p| p.matches(row))
    }

    /// Run the query over in-memory rows
    ///
    /// Returns the selected page and the number of rows that matched before
    /// offset and limit were applied. Sorting is stable; rows missing the
    /// sort column go last regardless of direction.
    pub fn execute(&self, rows: impl IntoIterator<Item = Value>) -> (Vec<Value>, usize) {
        let mut matched: Vec<Value> = rows.into_iter().filter(|row| self.matches(row)).collect();

        if let Some((column, order)) = &self.order_by {
            matched.sort_by(|a, b| {
                let a = a.get(column).filter(|v| !v.is_null());
                let b = b.get(column).filter(|v| !v.is_null());
                match (a, b) {
                    (None, None) => Ordering::Equal,
                    (None, Some(_)) => Ordering::Greater,
                    (Some(_), None) => Ordering::Less,
                    (Some(a), Some(b)) => {
                        let ordering = compare_values(a, b).unwrap_or(Ordering::Equal);
                        match order {
                            SortOrder::Asc => ordering,
                            SortOrder::Desc => ordering.reverse(),
                        }
                    }
                }
            });
        }

        let total = matched.len();
        let page = matched
            .into_iter()
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect();

        (page, total)
    }

    /// Render as a PostgreSQL statement with positional parameters
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut sql = format!("SELECT * FROM {}", quote_ident(&self.table));
        let mut params = Vec::new();

        if !self.predicates.is_empty() {
            let clauses: Vec<String> = self
                .predicates
                .iter()
                .map(|p| render_predicate(p, &mut params))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        if let Some((column, order)) = &self.order_by {
            sql.push_str(&format!(" ORDER BY {} {}", quote_ident(column), order.as_str()));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        (sql, params)
    }
}

fn render_predicate(predicate: &Predicate, params: &mut Vec<Value>) -> String {
    let column = quote_ident(&predicate.column);

    if predicate.op == CompareOp::In {
        let values = predicate.value.as_array().cloned().unwrap_or_default();
        if values.is_empty() {
            return "FALSE".to_string();
        }
        let placeholders: Vec<String> = values
            .into_iter()
            .map(|v| {
                params.push(v);
                format!("${}", params.len())
            })
            .collect();
        return format!("{} IN ({})", column, placeholders.join(", "));
    }

    params.push(predicate.value.clone());
    format!("{} {} ${}", column, predicate.op.as_sql(), params.len())
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Equality across the wire: filter values arrive as strings, so `"true"`
/// equals `true` and `"25"` equals `25`.
fn loosely_equal(field: &Value, expected: &Value) -> bool {
    if field == expected {
        return true;
    }

    match (field, expected) {
        (Value::String(_), Value::String(_)) => false,
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            matches!((as_number(field), as_number(expected)), (Some(a), Some(b)) if a == b)
        }
        _ => matches!((scalar_text(field), scalar_text(expected)), (Some(a), Some(b)) if a == b),
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => as_number(a)?.partial_cmp(&as_number(b)?),
    }
}
