//! HTTP handlers for resource operations
//!
//! Every handler works on a single resource whose service is carried in
//! the router state, so the same functions serve every registered resource.

use axum::{
    Json,
    extract::{Path, RawQuery, State},
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::Arc;

use crate::core::error::{ApiError, ResourceError};
use crate::core::query::ListParams;
use crate::core::resource::{BulkUpdateRequest, BulkUpdateResponse, Delta};
use crate::core::service::ResourceService;

/// Header carrying the total number of matching rows of a list request
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// State shared by the routes of one resource
#[derive(Clone)]
pub struct ResourceState {
    pub resource: String,
    pub service: Arc<dyn ResourceService>,
}

/// List records
///
/// GET /{resource}?sortOrder=ASC&sortField=name&page=0&perPage=25&status=active
pub async fn list_records(
    State(state): State<ResourceState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let params = ListParams::from_query_string(query.as_deref().unwrap_or(""))?;
    let page = state.service.list(&params).await?;

    tracing::debug!(
        resource = %state.resource,
        returned = page.data.len(),
        total = page.total,
        "list request"
    );

    let total = HeaderValue::from(page.total);
    let mut response = Json(page).into_response();
    response
        .headers_mut()
        .insert(HeaderName::from_static(TOTAL_COUNT_HEADER), total);
    Ok(response)
}

/// Get a single record
///
/// GET /{resource}/{id}
pub async fn get_record(
    State(state): State<ResourceState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let record = state.service.get(&id).await?;
    record.map(Json).ok_or_else(|| {
        ResourceError::NotFound {
            resource: state.resource.clone(),
            id,
        }
        .into()
    })
}

/// Apply a delta to a single record
///
/// PUT /{resource}/{id}
pub async fn update_record(
    State(state): State<ResourceState>,
    Path(id): Path<String>,
    Json(delta): Json<Delta>,
) -> Result<Json<Value>, ApiError> {
    tracing::debug!(resource = %state.resource, id = %id, fields = delta.len(), "update request");
    let record = state.service.update(&id, &delta).await?;
    Ok(Json(record))
}

/// Apply a delta to many records
///
/// PUT /{resource} with `{ "ids": [...], "data": {...} }`
///
/// Responds `200` even when some ids failed; failures are listed in
/// `errors`.
pub async fn update_records(
    State(state): State<ResourceState>,
    Json(request): Json<BulkUpdateRequest>,
) -> Result<Json<BulkUpdateResponse>, ApiError> {
    tracing::debug!(
        resource = %state.resource,
        ids = request.ids.len(),
        "bulk update request"
    );
    let response = state
        .service
        .update_many(&request.ids, &request.data)
        .await?;
    Ok(Json(response))
}
