//! Per-resource read and update operations
//!
//! [`ResourceHooks`] binds a resource name and API path to a transport and
//! the shared [`QueryCache`]. Reads go through the cache; writes are
//! [mutations](crate::client::mutation) that invalidate the resource and
//! its declared dependents once the server has answered.

use crate::client::cache::{QueryCache, QueryKey};
use crate::client::error::ClientError;
use crate::client::mutation::{UpdateManyMutation, UpdateMutation};
use crate::client::transport::{ApiRequest, Transport};
use crate::core::query::{ListParams, PaginatedResponse};
use crate::core::resource::RecordId;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct ResourceHooks {
    resource: String,
    path: String,
    dependents: Vec<String>,
    transport: Arc<dyn Transport>,
    cache: QueryCache,
}

impl ResourceHooks {
    pub fn new(
        resource: impl Into<String>,
        path: impl Into<String>,
        transport: Arc<dyn Transport>,
        cache: QueryCache,
    ) -> Self {
        Self {
            resource: resource.into(),
            path: path.into(),
            dependents: Vec::new(),
            transport,
            cache,
        }
    }

    /// Declare the resources whose cached reads go stale when this one is
    /// written
    pub fn with_dependents<I, S>(mut self, dependents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependents = dependents.into_iter().map(Into::into).collect();
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn dependents(&self) -> &[String] {
        &self.dependents
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub(crate) fn record_path(&self, id: &str) -> String {
        format!("{}/{}", self.path, urlencoding::encode(id))
    }

    /// Mark the resource and every dependent stale
    pub fn invalidate(&self) -> usize {
        let targets = std::iter::once(self.resource.as_str())
            .chain(self.dependents.iter().map(String::as_str));
        let marked = self.cache.invalidate_resources(targets);

        tracing::debug!(
            resource = %self.resource,
            dependents = ?self.dependents,
            marked,
            "invalidated cached reads"
        );
        marked
    }

    async fn fetch(&self, key: QueryKey, request: ApiRequest) -> Result<Value, ClientError> {
        if let Some(cached) = self.cache.get_fresh(&key) {
            tracing::trace!(resource = %self.resource, scope = ?key.scope, "cache hit");
            return Ok(cached);
        }

        tracing::trace!(resource = %self.resource, scope = ?key.scope, "cache miss");
        let generation = self.cache.generation(&self.resource);
        let data: Value = self.transport.send(request).await?.into_result()?;

        if !self
            .cache
            .insert_fetched(key.clone(), data.clone(), generation)
        {
            tracing::debug!(
                resource = %self.resource,
                scope = ?key.scope,
                "resource written during read, cached result stored stale"
            );
        }
        Ok(data)
    }

    /// Fetch one record
    pub async fn get_one(&self, id: &str) -> Result<Value, ClientError> {
        let key = QueryKey::one(&self.resource, id);
        self.fetch(key, ApiRequest::get(self.record_path(id))).await
    }

    /// Fetch a page of records
    ///
    /// The query is serialized before anything else, so an invalid filter
    /// fails without a request being sent.
    pub async fn get_list(
        &self,
        params: &ListParams,
    ) -> Result<PaginatedResponse<Value>, ClientError> {
        let query = params.to_query_string()?;
        let key = QueryKey::list(&self.resource, &query);
        let data = self
            .fetch(key, ApiRequest::get(format!("{}{}", self.path, query)))
            .await?;

        serde_json::from_value(data).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Fetch several records by id, in the backend's order
    pub async fn get_many(&self, ids: &[RecordId]) -> Result<Vec<Value>, ClientError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let params = ListParams::new().with_filter("id", ids.to_vec());
        let query = params.to_query_string()?;
        let key = QueryKey::many(&self.resource, ids);
        let data = self
            .fetch(key, ApiRequest::get(format!("{}{}", self.path, query)))
            .await?;

        let page: PaginatedResponse<Value> =
            serde_json::from_value(data).map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(page.data)
    }

    /// Update operation for single records
    pub fn update(&self) -> UpdateMutation {
        UpdateMutation::new(self.clone())
    }

    /// Update operation for many records at once
    pub fn update_many(&self) -> UpdateManyMutation {
        UpdateManyMutation::new(self.clone())
    }
}
