//! In-memory implementation of ResourceService for testing and development

use crate::config::QuerySettings;
use crate::core::error::{QueryError, ResourceError};
use crate::core::predicate::{CompareOp, NumericBounds, SelectQuery};
use crate::core::query::{ListParams, PaginatedResponse, PaginationMeta};
use crate::core::resource::{BulkUpdateResponse, Delta, RecordId, record_id};
use crate::core::service::ResourceService;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// In-memory resource service
///
/// Records are kept in insertion order, which is also the order of an
/// unsorted list. Uses RwLock for thread-safe access.
#[derive(Clone)]
pub struct InMemoryResourceService {
    resource: String,
    records: Arc<RwLock<IndexMap<RecordId, Value>>>,
    settings: QuerySettings,
}

impl InMemoryResourceService {
    /// Create an empty service for `resource` with default query settings
    pub fn new(resource: impl Into<String>) -> Self {
        Self::with_settings(resource, QuerySettings::default())
    }

    pub fn with_settings(resource: impl Into<String>, settings: QuerySettings) -> Self {
        Self {
            resource: resource.into(),
            records: Arc::new(RwLock::new(IndexMap::new())),
            settings,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Insert or replace a record, returning its id
    ///
    /// Records without an `id` field get a fresh UUID.
    pub fn add(&self, mut record: Value) -> Result<RecordId> {
        let object = record.as_object_mut().ok_or_else(|| ResourceError::InvalidDelta {
            resource: self.resource.clone(),
            message: "records must be JSON objects".to_string(),
        })?;

        let id = match record_id(&Value::Object(object.clone())) {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                object.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };

        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        records.insert(id.clone(), record);

        Ok(id)
    }

    /// Compile list parameters into a query over this resource
    ///
    /// Keys ending in `>`, `>=`, `<` or `<=` become numeric bounds on the
    /// column they prefix, arrays become `IN` conditions and every other
    /// value an equality.
    pub fn compile(&self, params: &ListParams) -> Result<SelectQuery, QueryError> {
        let mut query = SelectQuery::from_table(&self.resource);
        let mut bounds: IndexMap<String, NumericBounds> = IndexMap::new();

        if let Some(filter) = &params.filter {
            for (key, value) in filter {
                match CompareOp::split_filter_key(key) {
                    (column, Some(op)) => {
                        let threshold = bound_value(key, value)?;
                        let entry = bounds.entry(column.to_string()).or_default();
                        *entry = entry.with_bound(op, threshold);
                    }
                    (column, None) => match value {
                        Value::Null => {}
                        Value::Array(values) => query = query.where_in(column, values.clone()),
                        Value::Object(_) => {
                            return Err(QueryError::NonScalarFilter { key: key.clone() });
                        }
                        scalar => query = query.where_eq(column, scalar.clone()),
                    },
                }
            }
        }

        for (column, bounds) in &bounds {
            let bounds = bounds.with_policy(self.settings.zero_bounds);
            query = query.filter_by_number(column, &bounds);
        }

        if let Some(sort) = &params.sort {
            query = query.order_by(&sort.field, sort.order);
        }

        if let Some(pagination) = &params.pagination {
            pagination.validate()?;
            let per_page = pagination.per_page.min(self.settings.max_per_page);
            query = query
                .offset(pagination.page.saturating_sub(1).saturating_mul(per_page))
                .limit(per_page);
        }

        Ok(query)
    }

    fn apply_delta(
        &self,
        records: &mut IndexMap<RecordId, Value>,
        id: &str,
        delta: &Delta,
    ) -> Result<Value, ResourceError> {
        if let Some(new_id) = delta.get("id") {
            if record_id(&serde_json::json!({ "id": new_id })).as_deref() != Some(id) {
                return Err(ResourceError::InvalidDelta {
                    resource: self.resource.clone(),
                    message: "the id of a record cannot be changed".to_string(),
                });
            }
        }

        let record = records
            .get_mut(id)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| ResourceError::NotFound {
                resource: self.resource.clone(),
                id: id.to_string(),
            })?;

        for (field, value) in delta {
            record.insert(field.clone(), value.clone());
        }

        Ok(Value::Object(record.clone()))
    }
}

fn bound_value(key: &str, value: &Value) -> Result<f64, QueryError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| QueryError::InvalidNumber {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[async_trait]
impl ResourceService for InMemoryResourceService {
    async fn get(&self, id: &str) -> Result<Option<Value>> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(records.get(id).cloned())
    }

    async fn list(&self, params: &ListParams) -> Result<PaginatedResponse<Value>> {
        let query = self.compile(params)?;

        let rows: Vec<Value> = {
            let records = self
                .records
                .read()
                .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
            records.values().cloned().collect()
        };

        let (data, total) = query.execute(rows);
        tracing::debug!(
            resource = %self.resource,
            predicates = query.predicates().len(),
            total,
            "listed records"
        );

        let pagination = params.pagination.map(|p| {
            PaginationMeta::new(p.page, p.per_page.min(self.settings.max_per_page), total)
        });

        Ok(PaginatedResponse {
            data,
            total,
            pagination,
        })
    }

    async fn insert(&self, record: Value) -> Result<Value> {
        let id = self.add(record)?;
        self.get(&id)
            .await?
            .ok_or_else(|| anyhow!("Record {} vanished after insert", id))
    }

    async fn update(&self, id: &str, delta: &Delta) -> Result<Value> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        Ok(self.apply_delta(&mut records, id, delta)?)
    }

    async fn update_many(&self, ids: &[RecordId], delta: &Delta) -> Result<BulkUpdateResponse> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let mut response = BulkUpdateResponse::default();
        for id in ids {
            match self.apply_delta(&mut records, id, delta) {
                Ok(_) => response.data.push(id.clone()),
                Err(e) => {
                    response.errors.insert(id.clone(), e.to_string());
                }
            }
        }

        if response.is_partial_failure() {
            tracing::warn!(
                resource = %self.resource,
                failed = response.errors.len(),
                "bulk update partially failed"
            );
        }

        Ok(response)
    }
}
