//! Router builder utilities for resource routes

use crate::server::handlers::{
    ResourceState, get_record, list_records, update_record, update_records,
};
use axum::{Router, routing::get};

/// Build the routes of one resource mounted at `path`
///
/// - GET /{path} - List records
/// - PUT /{path} - Bulk update
/// - GET /{path}/{id} - Get a record
/// - PUT /{path}/{id} - Update a record
pub fn build_resource_routes(path: &str, state: ResourceState) -> Router {
    Router::new()
        .route(path, get(list_records).put(update_records))
        .route(
            &format!("{}/{{id}}", path),
            get(get_record).put(update_record),
        )
        .with_state(state)
}
