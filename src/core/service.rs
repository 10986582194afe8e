//! Service trait for resource storage

use crate::core::query::{ListParams, PaginatedResponse};
use crate::core::resource::{BulkUpdateResponse, Delta, RecordId};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Storage for the records of one resource
///
/// Implementations hold JSON records keyed by their `id` field. The REST
/// layer is agnostic to the underlying storage mechanism. Errors that the
/// caller should see with a specific status are returned as
/// [`ResourceError`](crate::core::error::ResourceError) wrapped in
/// `anyhow::Error`.
#[async_trait]
pub trait ResourceService: Send + Sync {
    /// Get a record by id
    async fn get(&self, id: &str) -> Result<Option<Value>>;

    /// List records matching the sort, pagination and filters
    async fn list(&self, params: &ListParams) -> Result<PaginatedResponse<Value>>;

    /// Insert a record, assigning an id when it has none
    async fn insert(&self, record: Value) -> Result<Value>;

    /// Apply a delta to a single record
    async fn update(&self, id: &str, delta: &Delta) -> Result<Value>;

    /// Apply the same delta to many records
    ///
    /// Ids that fail are reported in the response rather than aborting the
    /// whole batch.
    async fn update_many(&self, ids: &[RecordId], delta: &Delta) -> Result<BulkUpdateResponse>;
}
