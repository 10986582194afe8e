//! Resource client: cached reads and update mutations over a [`Transport`]
//!
//! ```rust,ignore
//! let router = ServerBuilder::new().with_in_memory_resources().build()?;
//! let client = ApiClient::new(
//!     Arc::new(RouterTransport::new(router)),
//!     ApiConfig::default_config(),
//! );
//!
//! let packages = client.resource("packages")?;
//! let page = packages
//!     .get_list(&ListParams::new().with_pagination(1, 10))
//!     .await?;
//! ```

pub mod cache;
pub mod error;
pub mod hooks;
pub mod mutation;
pub mod transport;

pub use cache::{CacheEntry, QueryCache, QueryKey, QueryScope};
pub use error::ClientError;
pub use hooks::ResourceHooks;
pub use mutation::{MutationCallbacks, MutationStatus, UpdateManyMutation, UpdateMutation};
pub use transport::{ApiRequest, ApiResponse, RouterTransport, Transport};

#[cfg(feature = "http-client")]
pub use transport::HttpTransport;

use crate::config::ApiConfig;
use crate::core::query::ListParams;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Entry point of the client side
///
/// Every [`ResourceHooks`] handed out shares the client's transport and
/// cache, so invalidation by one resource is seen by all of them.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    cache: QueryCache,
    config: Arc<ApiConfig>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, config: ApiConfig) -> Self {
        let cache = QueryCache::with_stale_time(config.cache.stale_time());
        Self {
            transport,
            cache,
            config: Arc::new(config),
        }
    }

    /// Client talking to a remote backend over HTTP
    #[cfg(feature = "http-client")]
    pub fn http(base_url: impl Into<String>, config: ApiConfig) -> Self {
        Self::new(Arc::new(HttpTransport::new(base_url)), config)
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Hooks for a configured resource
    pub fn resource(&self, name: &str) -> Result<ResourceHooks, ClientError> {
        let definition = self
            .config
            .find_resource(name)
            .ok_or_else(|| ClientError::UnknownResource(name.to_string()))?;

        Ok(ResourceHooks::new(
            definition.name.clone(),
            definition.api_path(),
            self.transport.clone(),
            self.cache.clone(),
        )
        .with_dependents(definition.dependents.iter().cloned()))
    }

    /// Uncached GET on an arbitrary path with a serialized list query
    pub async fn api_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &ListParams,
    ) -> Result<T, ClientError> {
        let query = params.to_query_string()?;
        self.transport
            .send(ApiRequest::get(format!("{}{}", path, query)))
            .await?
            .into_result()
    }
}
