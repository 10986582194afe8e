//! Tests for the list query wire format
//!
//! These cover both directions: what the client emits and what the
//! server recovers from it.

use monetize::prelude::*;
use serde_json::json;

#[test]
fn test_full_query_serialization() {
    let params = ListParams::new()
        .with_sort("name", SortOrder::Asc)
        .with_pagination(1, 25)
        .with_filter("isActive", true);

    assert_eq!(
        params.to_query_string().unwrap(),
        "?sortOrder=ASC&sortField=name&page=0&perPage=25&isActive=true"
    );
}

#[test]
fn test_array_filter_repeats_key() {
    let params = ListParams::new().with_filter("ids", vec!["a", "b"]);
    assert_eq!(params.to_query_string().unwrap(), "?ids=a&ids=b");
}

#[test]
fn test_empty_query_serializes_to_empty_string() {
    assert_eq!(ListParams::new().to_query_string().unwrap(), "");
    assert_eq!(
        ListParams::new()
            .with_filter("status", Value::Null)
            .to_query_string()
            .unwrap(),
        ""
    );
}

#[test]
fn test_nested_object_filter_is_rejected() {
    let params = ListParams::new().with_filter("owner", json!({"id": "org-1"}));
    assert_eq!(
        params.to_query_string(),
        Err(QueryError::NonScalarFilter {
            key: "owner".to_string()
        })
    );

    let nested = ListParams::new().with_filter("tags", json!([["a"], "b"]));
    assert!(matches!(
        nested.to_query_string(),
        Err(QueryError::NonScalarFilter { .. })
    ));
}

#[test]
fn test_filter_order_follows_insertion() {
    let params = ListParams::new()
        .with_filter("status", "active")
        .with_filter("tier", vec![json!(1), json!(2)])
        .with_filter("archived", false);

    assert_eq!(
        params.to_query_string().unwrap(),
        "?status=active&tier=1&tier=2&archived=false"
    );
}

#[test]
fn test_reserved_characters_are_encoded() {
    let params = ListParams::new()
        .with_sort("display name", SortOrder::Desc)
        .with_filter("q", "a&b=c");

    assert_eq!(
        params.to_query_string().unwrap(),
        "?sortOrder=DESC&sortField=display%20name&q=a%26b%3Dc"
    );
}

#[test]
fn test_zero_page_is_rejected() {
    let params = ListParams::new().with_pagination(0, 25);
    assert_eq!(
        params.to_query_string(),
        Err(QueryError::InvalidPagination {
            page: 0,
            per_page: 25
        })
    );
}

#[test]
fn test_parse_recovers_client_params() {
    let params = ListParams::new()
        .with_sort("createdAt", SortOrder::Desc)
        .with_pagination(3, 10)
        .with_filter("status", "active")
        .with_filter("id", vec!["a", "b"]);

    let parsed = ListParams::from_query_string(&params.to_query_string().unwrap()).unwrap();

    assert_eq!(parsed.sort, params.sort);
    assert_eq!(parsed.pagination, Some(Pagination::new(3, 10)));

    let filter = parsed.filter.unwrap();
    assert_eq!(filter["status"], json!("active"));
    assert_eq!(filter["id"], json!(["a", "b"]));
}

#[test]
fn test_parse_rejects_bad_sort_order() {
    assert_eq!(
        ListParams::from_query_string("?sortField=name&sortOrder=sideways"),
        Err(QueryError::InvalidSortOrder {
            value: "sideways".to_string()
        })
    );
}

#[test]
fn test_parse_rejects_non_numeric_page() {
    assert!(matches!(
        ListParams::from_query_string("page=first"),
        Err(QueryError::InvalidNumber { .. })
    ));
}

#[test]
fn test_parse_rejects_page_past_usize() {
    let query = format!("?page={}&perPage=10", usize::MAX);
    assert_eq!(
        ListParams::from_query_string(&query),
        Err(QueryError::InvalidNumber {
            key: "page".to_string(),
            value: usize::MAX.to_string()
        })
    );
}

#[test]
fn test_huge_page_offset_saturates() {
    assert_eq!(Pagination::new(usize::MAX, 100).offset(), usize::MAX);

    let meta = PaginationMeta::new(usize::MAX, 100, 4);
    assert!(!meta.has_next);
    assert!(meta.has_prev);
    assert_eq!(meta.total_pages, 1);
}

#[test]
fn test_reserved_filter_keys_are_rejected() {
    for key in ["page", "perPage", "sortField", "sortOrder"] {
        let params = ListParams::new().with_filter(key, "x");
        assert_eq!(
            params.to_query_string(),
            Err(QueryError::ReservedFilterKey {
                key: key.to_string()
            })
        );
    }

    let params = ListParams::new().with_filter("pageCount", 3);
    let parsed = ListParams::from_query_string(&params.to_query_string().unwrap()).unwrap();
    assert_eq!(parsed.filter.unwrap()["pageCount"], json!("3"));
}

#[test]
fn test_integral_floats_drop_fraction() {
    let params = ListParams::new()
        .with_filter("price", 10.0)
        .with_filter("ratio", 2.5)
        .with_filter("seats", vec![json!(1.0), json!(-3)]);

    assert_eq!(
        params.to_query_string().unwrap(),
        "?price=10&ratio=2.5&seats=1&seats=-3"
    );
}
