//! Tests for numeric bounds folded into select queries

use monetize::prelude::*;
use serde_json::json;

fn packages() -> Vec<Value> {
    vec![
        json!({"id": "free", "price": 0, "seats": 1}),
        json!({"id": "starter", "price": 9, "seats": 3}),
        json!({"id": "team", "price": 49, "seats": 10}),
        json!({"id": "enterprise", "price": 499, "seats": null}),
    ]
}

#[test]
fn test_absent_bounds_leave_query_unchanged() {
    let base = SelectQuery::from_table("packages").where_eq("active", true);
    let filtered = base.clone().filter_by_number("price", &NumericBounds::new());

    assert_eq!(filtered, base);
    assert_eq!(filtered.to_sql(), base.to_sql());
}

#[test]
fn test_one_predicate_per_present_bound() {
    let bounds = NumericBounds::new().with_gte(9.0).with_lt(100.0);
    let query = SelectQuery::from_table("packages").filter_by_number("price", &bounds);

    let ops: Vec<CompareOp> = query.predicates().iter().map(|p| p.op).collect();
    assert_eq!(ops, vec![CompareOp::Gte, CompareOp::Lt]);

    let (sql, params) = query.to_sql();
    assert_eq!(
        sql,
        r#"SELECT * FROM "packages" WHERE "price" >= $1 AND "price" < $2"#
    );
    assert_eq!(params, vec![json!(9.0), json!(100.0)]);
}

#[test]
fn test_bounds_are_anded_in_memory() {
    let bounds = NumericBounds::new().with_gt(0.0).with_lte(49.0);
    let query = SelectQuery::from_table("packages").filter_by_number("price", &bounds);

    let (rows, total) = query.execute(packages());
    let ids: Vec<&str> = rows.iter().filter_map(|r| r["id"].as_str()).collect();
    assert_eq!(ids, vec!["starter", "team"]);
    assert_eq!(total, 2);
}

#[test]
fn test_zero_bound_kept_by_default() {
    let bounds = NumericBounds::new().with_eq(0.0);
    let query = SelectQuery::from_table("packages").filter_by_number("price", &bounds);

    let (rows, _) = query.execute(packages());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "free");
}

#[test]
fn test_drop_falsy_policy_ignores_zero_bounds() {
    let bounds = NumericBounds::new()
        .with_gte(0.0)
        .with_lt(50.0)
        .with_policy(ZeroBoundPolicy::DropFalsy);

    let present: Vec<(CompareOp, f64)> = bounds.present().collect();
    assert_eq!(present, vec![(CompareOp::Lt, 50.0)]);
}

#[test]
fn test_missing_column_never_matches_bound() {
    let query = SelectQuery::from_table("packages")
        .filter_by_number("seats", &NumericBounds::new().with_gte(1.0));

    let (rows, _) = query.execute(packages());
    assert!(rows.iter().all(|r| r["id"] != "enterprise"));
}

#[test]
fn test_sorted_page_reports_full_total() {
    let query = SelectQuery::from_table("packages")
        .order_by("price", SortOrder::Desc)
        .offset(1)
        .limit(2);

    let (rows, total) = query.execute(packages());
    let ids: Vec<&str> = rows.iter().filter_map(|r| r["id"].as_str()).collect();
    assert_eq!(ids, vec!["team", "starter"]);
    assert_eq!(total, 4);

    let (sql, params) = query.to_sql();
    assert_eq!(
        sql,
        r#"SELECT * FROM "packages" ORDER BY "price" DESC LIMIT 2 OFFSET 1"#
    );
    assert!(params.is_empty());
}

#[test]
fn test_in_predicate_rendering() {
    let query = SelectQuery::from_table("licenses").where_in("id", vec![json!("a"), json!("b")]);
    let (sql, params) = query.to_sql();
    assert_eq!(sql, r#"SELECT * FROM "licenses" WHERE "id" IN ($1, $2)"#);
    assert_eq!(params, vec![json!("a"), json!("b")]);

    let empty = SelectQuery::from_table("licenses").where_in("id", Vec::new());
    assert_eq!(
        empty.to_sql().0,
        r#"SELECT * FROM "licenses" WHERE FALSE"#
    );
    assert_eq!(empty.execute(packages()).1, 0);
}
