//! List query parameters and their query-string wire format
//!
//! The wire format is shared by the resource client and the REST backend:
//!
//! ```text
//! ?sortOrder=ASC&sortField=name&page=0&perPage=25&status=active&ids=a&ids=b
//! ```
//!
//! - sort is emitted as `sortOrder` then `sortField`
//! - `page` on the wire is 0-indexed while [`Pagination::page`] is 1-indexed
//! - array filters repeat their key once per element, `null` filters are omitted
//!
//! # Example
//!
//! ```rust
//! use monetize::core::query::{ListParams, SortOrder};
//!
//! let params = ListParams::new()
//!     .with_sort("name", SortOrder::Asc)
//!     .with_pagination(1, 25)
//!     .with_filter("isActive", true);
//!
//! assert_eq!(
//!     params.to_query_string().unwrap(),
//!     "?sortOrder=ASC&sortField=name&page=0&perPage=25&isActive=true"
//! );
//! ```

use crate::core::error::QueryError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Page size used when the wire query carries `page` without `perPage`
pub const DEFAULT_PER_PAGE: usize = 25;

/// Query keys carrying sort and pagination, never usable as filters
pub const RESERVED_KEYS: [&str; 4] = ["sortOrder", "sortField", "page", "perPage"];

/// 2^53, above which not every integer is representable as `f64`
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Filter entries in insertion order
pub type Filter = IndexMap<String, Value>;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl SortOrder {
    /// Wire representation (`ASC` / `DESC`)
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ASC") {
            Ok(SortOrder::Asc)
        } else if s.eq_ignore_ascii_case("DESC") {
            Ok(SortOrder::Desc)
        } else {
            Err(QueryError::InvalidSortOrder {
                value: s.to_string(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

/// Caller-facing pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Page number (starts at 1)
    pub page: usize,

    /// Number of items per page
    pub per_page: usize,
}

impl Pagination {
    pub fn new(page: usize, per_page: usize) -> Self {
        Self { page, per_page }
    }

    /// Reject pages below 1 and empty pages
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.page == 0 || self.per_page == 0 {
            return Err(QueryError::InvalidPagination {
                page: self.page,
                per_page: self.per_page,
            });
        }
        Ok(())
    }

    /// Number of rows to skip
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

/// Sort, pagination and filters of a list request
///
/// Built fresh for every list request and discarded once it resolves.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,

    /// Field name to scalar, array of scalars, or `null`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(Sort {
            field: field.into(),
            order,
        });
        self
    }

    pub fn with_pagination(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Some(Pagination::new(page, per_page));
        self
    }

    /// Add (or replace) a filter entry, keeping first-insertion order
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter
            .get_or_insert_with(Filter::new)
            .insert(key.into(), value.into());
        self
    }

    /// Serialize to the backend's query-string convention
    ///
    /// Returns `""` when nothing is emitted, otherwise a string starting
    /// with `?`. Fails before any request is made when a filter value is an
    /// object (or an array holding non-scalars) or the pagination is out of
    /// range.
    pub fn to_query_string(&self) -> Result<String, QueryError> {
        let mut parts: Vec<String> = Vec::new();

        if let Some(sort) = &self.sort {
            parts.push(format!("sortOrder={}", encode(sort.order.as_str())));
            parts.push(format!("sortField={}", encode(&sort.field)));
        }

        if let Some(pagination) = &self.pagination {
            pagination.validate()?;
            parts.push(format!("page={}", pagination.page - 1));
            parts.push(format!("perPage={}", pagination.per_page));
        }

        if let Some(filter) = &self.filter {
            for (key, value) in filter {
                if RESERVED_KEYS.contains(&key.as_str()) {
                    return Err(QueryError::ReservedFilterKey { key: key.clone() });
                }
                match value {
                    Value::Null => {}
                    Value::Array(values) => {
                        for element in values {
                            if element.is_null() {
                                continue;
                            }
                            let text = scalar_text(element)
                                .ok_or_else(|| QueryError::NonScalarFilter { key: key.clone() })?;
                            parts.push(format!("{}={}", encode(key), encode(&text)));
                        }
                    }
                    Value::Object(_) => {
                        return Err(QueryError::NonScalarFilter { key: key.clone() });
                    }
                    scalar => {
                        let text = scalar_text(scalar)
                            .ok_or_else(|| QueryError::NonScalarFilter { key: key.clone() })?;
                        parts.push(format!("{}={}", encode(key), encode(&text)));
                    }
                }
            }
        }

        if parts.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!("?{}", parts.join("&")))
        }
    }

    /// Parse the wire query string back into list parameters
    ///
    /// The leading `?` is optional. `page` is re-incremented to 1-indexed,
    /// repeated keys are regrouped into arrays and every unrecognised key
    /// becomes a string-valued filter entry.
    pub fn from_query_string(query: &str) -> Result<Self, QueryError> {
        let query = query.strip_prefix('?').unwrap_or(query);

        let mut sort_field: Option<String> = None;
        let mut sort_order: Option<SortOrder> = None;
        let mut page: Option<usize> = None;
        let mut per_page: Option<usize> = None;
        let mut filter = Filter::new();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "sortField" => sort_field = Some(value.into_owned()),
                "sortOrder" => sort_order = Some(value.parse()?),
                "page" => page = Some(parse_count("page", &value)?),
                "perPage" => per_page = Some(parse_count("perPage", &value)?),
                _ => push_filter(&mut filter, key.into_owned(), value.into_owned()),
            }
        }

        let sort = sort_field.map(|field| Sort {
            field,
            order: sort_order.unwrap_or_default(),
        });

        let pagination = match (page, per_page) {
            (None, None) => None,
            (page, per_page) => {
                let wire_page = page.unwrap_or(0);
                let page = wire_page
                    .checked_add(1)
                    .ok_or_else(|| QueryError::InvalidNumber {
                        key: "page".to_string(),
                        value: wire_page.to_string(),
                    })?;
                Some(Pagination {
                    page,
                    per_page: per_page.unwrap_or(DEFAULT_PER_PAGE),
                })
            }
        };

        Ok(Self {
            sort,
            pagination,
            filter: (!filter.is_empty()).then_some(filter),
        })
    }
}

fn encode(text: &str) -> String {
    urlencoding::encode(text).into_owned()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_text(n)),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Integral floats lose their fraction (`10.0` is sent as `10`)
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_EXACT_FLOAT => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

fn parse_count(name: &str, value: &str) -> Result<usize, QueryError> {
    value.parse().map_err(|_| QueryError::InvalidNumber {
        key: name.to_string(),
        value: value.to_string(),
    })
}

fn push_filter(filter: &mut Filter, key: String, value: String) {
    let value = Value::String(value);
    match filter.get_mut(&key) {
        Some(Value::Array(values)) => values.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            filter.insert(key, value);
        }
    }
}

/// Paginated response structure
///
/// `total` counts every row matching the filters, not only the returned page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    /// The paginated data
    pub data: Vec<T>,

    /// Total number of items (after filters)
    pub total: usize,

    /// Pagination metadata, present when the request was paginated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: usize,

    /// Number of items per page
    pub per_page: usize,

    /// Total number of pages
    pub total_pages: usize,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Create pagination metadata from calculation
    pub fn new(page: usize, per_page: usize, total: usize) -> Self {
        // Ensure per_page is at least 1 to avoid division by zero
        let per_page = per_page.max(1);
        let page = page.max(1);
        let total_pages = total.div_ceil(per_page);
        let start = (page - 1).saturating_mul(per_page);

        Self {
            page,
            per_page,
            total_pages,
            has_next: start.saturating_add(per_page) < total,
            has_prev: page > 1,
        }
    }
}
