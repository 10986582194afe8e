//! ServerBuilder for fluent API to build HTTP servers

use super::handlers::ResourceState;
use super::router::build_resource_routes;
use crate::config::{ApiConfig, ResourceDefinition};
use crate::core::error::ResourceError;
use crate::core::service::ResourceService;
use crate::storage::InMemoryResourceService;
use anyhow::Result;
use axum::Router;
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builder for the REST backend
///
/// # Example
///
/// ```ignore
/// let packages = InMemoryResourceService::new("packages");
///
/// let app = ServerBuilder::new()
///     .with_config(ApiConfig::from_yaml_file("api.yaml")?)
///     .register_resource("packages", packages.clone())
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: ApiConfig,
    services: IndexMap<String, Arc<dyn ResourceService>>,
    custom_routes: Vec<Router>,
    cors: Option<CorsLayer>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with an empty configuration
    pub fn new() -> Self {
        Self {
            config: ApiConfig::default(),
            services: IndexMap::new(),
            custom_routes: Vec::new(),
            cors: None,
        }
    }

    /// Use `config` for resource paths and query settings
    ///
    /// Replaces any configuration set before. Resources already registered
    /// but absent from `config` keep their default definition.
    pub fn with_config(mut self, mut config: ApiConfig) -> Self {
        for name in self.services.keys() {
            if config.find_resource(name).is_none() {
                config.resources.push(ResourceDefinition::new(name.clone()));
            }
        }
        self.config = config;
        self
    }

    /// Register the service backing `resource`
    ///
    /// Resources missing from the configuration are added with their
    /// default path.
    pub fn register_resource(
        mut self,
        resource: &str,
        service: impl ResourceService + 'static,
    ) -> Self {
        if self.config.find_resource(resource).is_none() {
            self.config
                .resources
                .push(ResourceDefinition::new(resource));
        }
        self.services
            .insert(resource.to_string(), Arc::new(service));
        self
    }

    /// Back every configured resource without a service by an empty
    /// in-memory store
    pub fn with_in_memory_resources(mut self) -> Self {
        for definition in &self.config.resources {
            if !self.services.contains_key(&definition.name) {
                let service = InMemoryResourceService::with_settings(
                    definition.name.clone(),
                    self.config.query.clone(),
                );
                self.services
                    .insert(definition.name.clone(), Arc::new(service));
            }
        }
        self
    }

    /// Add custom routes to the server
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Answer cross-origin requests according to `cors`
    pub fn with_cors(mut self, cors: CorsLayer) -> Self {
        self.cors = Some(cors);
        self
    }

    /// Build the final REST router
    ///
    /// Fails when the configuration is invalid.
    pub fn build(self) -> Result<Router> {
        self.config.check()?;

        let mut router = Router::new();
        for (name, service) in self.services {
            let definition = self.config.find_resource(&name).ok_or_else(|| {
                ResourceError::UnknownResource {
                    resource: name.clone(),
                }
            })?;
            let path = definition.api_path();

            tracing::debug!(resource = %name, path = %path, "registering resource routes");
            let state = ResourceState {
                resource: name,
                service,
            };
            router = router.merge(build_resource_routes(&path, state));
        }

        for routes in self.custom_routes {
            router = router.merge(routes);
        }

        if let Some(cors) = self.cors {
            router = router.layer(cors);
        }

        Ok(router.layer(TraceLayer::new_for_http()))
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_empty() {
        assert!(ServerBuilder::new().build().is_ok());
    }

    #[test]
    fn test_register_adds_missing_definition() {
        let builder =
            ServerBuilder::new().register_resource("packages", InMemoryResourceService::new("packages"));
        assert!(builder.config.find_resource("packages").is_some());
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_config_after_register_keeps_resource() {
        let builder = ServerBuilder::new()
            .register_resource("invoices", InMemoryResourceService::new("invoices"))
            .with_config(ApiConfig::default_config());

        assert_eq!(
            builder.config.find_resource("invoices").map(|r| r.api_path()),
            Some("/invoices".to_string())
        );
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_config_after_register_uses_configured_path() {
        let config = ApiConfig {
            resources: vec![ResourceDefinition::new("packages").with_path("/v2/packages")],
            ..ApiConfig::default()
        };
        let builder = ServerBuilder::new()
            .register_resource("packages", InMemoryResourceService::new("packages"))
            .with_config(config);

        assert_eq!(builder.config.resources.len(), 1);
        assert_eq!(
            builder.config.find_resource("packages").unwrap().api_path(),
            "/v2/packages"
        );
    }

    #[test]
    fn test_in_memory_resources_cover_config() {
        let builder = ServerBuilder::new()
            .with_config(ApiConfig::default_config())
            .with_in_memory_resources();
        assert_eq!(builder.services.len(), 4);
    }

    #[tokio::test]
    async fn test_cors_headers() {
        use axum::body::Body;
        use axum::http::{Request, header};
        use tower::ServiceExt;

        let app = ServerBuilder::new()
            .register_resource("packages", InMemoryResourceService::new("packages"))
            .with_cors(CorsLayer::permissive())
            .build()
            .unwrap();

        let request = Request::builder()
            .uri("/packages")
            .header(header::ORIGIN, "https://portal.example.com")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert!(
            response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }

    #[test]
    fn test_invalid_config_fails_build() {
        let config = ApiConfig {
            resources: vec![ResourceDefinition::new("packages").with_dependents(["ghosts"])],
            ..ApiConfig::default()
        };
        assert!(ServerBuilder::new().with_config(config).build().is_err());
    }
}
