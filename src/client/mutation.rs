//! Update mutations with pessimistic cache invalidation
//!
//! A mutation moves `Idle -> Pending -> Success | Error`. Nothing in the
//! cache changes while the request is pending. Once the server has
//! answered, in this order:
//!
//! 1. the resource and its dependents are invalidated (on error too, since
//!    a failed bulk update may still have written some records)
//! 2. the status becomes `Success` or `Error`
//! 3. the caller's `on_success` / `on_error` callback runs
//!
//! ```rust,ignore
//! let update = client.resource("organizations")?.update();
//! let callbacks = MutationCallbacks::new()
//!     .on_success(|record| println!("saved {}", record["id"]))
//!     .on_error(|err| eprintln!("failed: {}", err));
//!
//! update.mutate("org-1", delta, callbacks).await?;
//! ```

use crate::client::error::ClientError;
use crate::client::hooks::ResourceHooks;
use crate::client::transport::ApiRequest;
use crate::core::resource::{BulkUpdateRequest, BulkUpdateResponse, Delta, RecordId};
use serde_json::Value;
use std::future::Future;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

type SuccessCallback<T> = Box<dyn FnOnce(&T) + Send>;
type ErrorCallback = Box<dyn FnOnce(&ClientError) + Send>;

/// Callbacks run after the cache has been invalidated
pub struct MutationCallbacks<T> {
    on_success: Option<SuccessCallback<T>>,
    on_error: Option<ErrorCallback>,
}

impl<T> MutationCallbacks<T> {
    pub fn new() -> Self {
        Self {
            on_success: None,
            on_error: None,
        }
    }

    pub fn on_success(mut self, callback: impl FnOnce(&T) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl FnOnce(&ClientError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }
}

impl<T> Default for MutationCallbacks<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct MutationCore {
    hooks: ResourceHooks,
    status: watch::Sender<MutationStatus>,
}

impl MutationCore {
    fn new(hooks: ResourceHooks) -> Self {
        let (status, _) = watch::channel(MutationStatus::Idle);
        Self { hooks, status }
    }

    async fn run<T, F>(
        &self,
        operation: &'static str,
        request: F,
        callbacks: MutationCallbacks<T>,
    ) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        self.status.send_replace(MutationStatus::Pending);
        let mut pending = PendingGuard {
            status: &self.status,
            armed: true,
        };

        let result = request.await;
        pending.armed = false;
        self.hooks.invalidate();

        match &result {
            Ok(value) => {
                self.status.send_replace(MutationStatus::Success);
                tracing::debug!(resource = %self.hooks.resource(), operation, "mutation succeeded");
                if let Some(callback) = callbacks.on_success {
                    callback(value);
                }
            }
            Err(error) => {
                self.status.send_replace(MutationStatus::Error);
                tracing::warn!(resource = %self.hooks.resource(), operation, %error, "mutation failed");
                if let Some(callback) = callbacks.on_error {
                    callback(error);
                }
            }
        }

        result
    }
}

/// Puts the status back to `Idle` when a pending run is dropped before the
/// server answered
struct PendingGuard<'a> {
    status: &'a watch::Sender<MutationStatus>,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.status.send_if_modified(|status| {
            if *status == MutationStatus::Pending {
                *status = MutationStatus::Idle;
                true
            } else {
                false
            }
        });
    }
}

/// Update a single record with a delta
pub struct UpdateMutation {
    core: MutationCore,
}

impl UpdateMutation {
    pub(crate) fn new(hooks: ResourceHooks) -> Self {
        Self {
            core: MutationCore::new(hooks),
        }
    }

    pub fn status(&self) -> MutationStatus {
        *self.core.status.borrow()
    }

    /// Observe status transitions
    pub fn subscribe(&self) -> watch::Receiver<MutationStatus> {
        self.core.status.subscribe()
    }

    /// Send `delta` for record `id`, resolving to the updated record
    pub async fn mutate(
        &self,
        id: &str,
        delta: Delta,
        callbacks: MutationCallbacks<Value>,
    ) -> Result<Value, ClientError> {
        let hooks = &self.core.hooks;
        let request = async {
            hooks
                .transport()
                .send(ApiRequest::put(hooks.record_path(id), Value::Object(delta)))
                .await?
                .into_result::<Value>()
        };

        self.core.run("update", request, callbacks).await
    }
}

/// Apply one delta to many records
pub struct UpdateManyMutation {
    core: MutationCore,
}

impl UpdateManyMutation {
    pub(crate) fn new(hooks: ResourceHooks) -> Self {
        Self {
            core: MutationCore::new(hooks),
        }
    }

    pub fn status(&self) -> MutationStatus {
        *self.core.status.borrow()
    }

    /// Observe status transitions
    pub fn subscribe(&self) -> watch::Receiver<MutationStatus> {
        self.core.status.subscribe()
    }

    /// Send `delta` for every id, resolving to the updated ids
    ///
    /// Per-id failures reported by the server resolve to
    /// [`ClientError::PartialFailure`].
    pub async fn mutate(
        &self,
        ids: &[RecordId],
        delta: Delta,
        callbacks: MutationCallbacks<Vec<RecordId>>,
    ) -> Result<Vec<RecordId>, ClientError> {
        let hooks = &self.core.hooks;
        let body = BulkUpdateRequest {
            ids: ids.to_vec(),
            data: delta,
        };

        let request = async {
            let body =
                serde_json::to_value(body).map_err(|e| ClientError::Transport(e.to_string()))?;
            let response: BulkUpdateResponse = hooks
                .transport()
                .send(ApiRequest::put(hooks.path(), body))
                .await?
                .into_result()?;

            if response.is_partial_failure() {
                return Err(ClientError::PartialFailure {
                    updated: response.data,
                    errors: response.errors,
                });
            }
            Ok::<_, ClientError>(response.data)
        };

        self.core.run("update_many", request, callbacks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::cache::{QueryCache, QueryKey};
    use crate::client::transport::{ApiResponse, Transport};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    struct FixedTransport {
        response: ApiResponse,
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn send(&self, _request: ApiRequest) -> Result<ApiResponse, ClientError> {
            Ok(self.response.clone())
        }
    }

    fn hooks(status: u16, body: Value, cache: &QueryCache) -> ResourceHooks {
        let transport = Arc::new(FixedTransport {
            response: ApiResponse { status, body },
        });
        ResourceHooks::new("organizations", "/organizations", transport, cache.clone())
            .with_dependents(["memberships"])
    }

    fn seeded_cache() -> QueryCache {
        let cache = QueryCache::new();
        cache.insert(QueryKey::one("organizations", "org-1"), json!({"id": "org-1"}));
        cache.insert(QueryKey::list("memberships", ""), json!({"data": [], "total": 0}));
        cache.insert(QueryKey::list("packages", ""), json!({"data": [], "total": 0}));
        cache
    }

    #[tokio::test]
    async fn test_success_invalidates_before_callback() {
        let cache = seeded_cache();
        let update = hooks(200, json!({"id": "org-1", "name": "Acme"}), &cache).update();
        assert_eq!(update.status(), MutationStatus::Idle);

        let observed = Arc::new(Mutex::new(None));
        let seen = observed.clone();
        let probe = cache.clone();
        let callbacks = MutationCallbacks::new().on_success(move |record: &Value| {
            let org = probe.is_stale(&QueryKey::one("organizations", "org-1"));
            let members = probe.is_stale(&QueryKey::list("memberships", ""));
            *seen.lock().unwrap() = Some((record["name"].clone(), org, members));
        });

        let mut delta = Delta::new();
        delta.insert("name".to_string(), json!("Acme"));
        let record = update.mutate("org-1", delta, callbacks).await.unwrap();

        assert_eq!(record["name"], "Acme");
        assert_eq!(update.status(), MutationStatus::Success);
        assert_eq!(
            observed.lock().unwrap().clone(),
            Some((json!("Acme"), Some(true), Some(true)))
        );
        assert_eq!(cache.is_stale(&QueryKey::list("packages", "")), Some(false));
    }

    #[tokio::test]
    async fn test_error_invalidates_before_callback() {
        let cache = seeded_cache();
        let update = hooks(
            404,
            json!({"code": "RECORD_NOT_FOUND", "message": "gone"}),
            &cache,
        )
        .update();

        let observed = Arc::new(Mutex::new(None));
        let seen = observed.clone();
        let probe = cache.clone();
        let callbacks = MutationCallbacks::new()
            .on_success(|_: &Value| panic!("success callback on failed update"))
            .on_error(move |err| {
                let stale = probe.is_stale(&QueryKey::one("organizations", "org-1"));
                *seen.lock().unwrap() = Some((err.status(), stale));
            });

        let result = update.mutate("org-1", Delta::new(), callbacks).await;

        assert!(matches!(result, Err(ClientError::Server { status: 404, .. })));
        assert_eq!(update.status(), MutationStatus::Error);
        assert_eq!(*observed.lock().unwrap(), Some((Some(404), Some(true))));
    }

    #[tokio::test]
    async fn test_bulk_partial_failure_takes_error_branch() {
        let cache = seeded_cache();
        let update_many = hooks(
            200,
            json!({"data": ["org-1"], "errors": {"org-2": "not found"}}),
            &cache,
        )
        .update_many();

        let failed = Arc::new(Mutex::new(false));
        let flag = failed.clone();
        let callbacks = MutationCallbacks::new().on_error(move |_| *flag.lock().unwrap() = true);

        let ids = vec!["org-1".to_string(), "org-2".to_string()];
        let result = update_many.mutate(&ids, Delta::new(), callbacks).await;

        match result {
            Err(ClientError::PartialFailure { updated, errors }) => {
                assert_eq!(updated, vec!["org-1".to_string()]);
                assert_eq!(errors.get("org-2").map(String::as_str), Some("not found"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(*failed.lock().unwrap());
        assert_eq!(update_many.status(), MutationStatus::Error);
        assert_eq!(
            cache.is_stale(&QueryKey::list("memberships", "")),
            Some(true)
        );
    }

    #[tokio::test]
    async fn test_subscribe_sees_final_status() {
        let cache = QueryCache::new();
        let update_many = hooks(200, json!({"data": ["org-1"]}), &cache).update_many();
        let receiver = update_many.subscribe();

        let updated = update_many
            .mutate(&["org-1".to_string()], Delta::new(), MutationCallbacks::default())
            .await
            .unwrap();

        assert_eq!(updated, vec!["org-1".to_string()]);
        assert_eq!(*receiver.borrow(), MutationStatus::Success);
    }

    struct StalledTransport;

    #[async_trait]
    impl Transport for StalledTransport {
        async fn send(&self, _request: ApiRequest) -> Result<ApiResponse, ClientError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_dropped_mutation_returns_to_idle() {
        let cache = seeded_cache();
        let hooks = ResourceHooks::new(
            "organizations",
            "/organizations",
            Arc::new(StalledTransport),
            cache.clone(),
        );
        let update = hooks.update();
        let receiver = update.subscribe();

        let timed_out = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            update.mutate("org-1", Delta::new(), MutationCallbacks::default()),
        )
        .await;

        assert!(timed_out.is_err());
        assert_eq!(update.status(), MutationStatus::Idle);
        assert_eq!(*receiver.borrow(), MutationStatus::Idle);
        assert_eq!(
            cache.is_stale(&QueryKey::one("organizations", "org-1")),
            Some(false)
        );
    }
}
