//! # Monetize
//!
//! Typed resource access layer for a license and organization management
//! backend.
//!
//! ## Features
//!
//! - **List Query Wire Format**: Sort, pagination and filters serialized to
//!   the backend's query-string convention and parsed back on the server
//! - **Predicate Builder**: Optional numeric bounds folded into SQL-style
//!   `WHERE` clauses, usable in memory or rendered with placeholders
//! - **Resource Client**: Cached reads and update mutations that invalidate
//!   the written resource and its dependents
//! - **REST Backend**: axum routes for every configured resource, with
//!   `X-Total-Count` on list responses
//! - **Configuration-Based**: Resources and their dependents declared in YAML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use monetize::prelude::*;
//!
//! let router = ServerBuilder::new()
//!     .with_config(ApiConfig::default_config())
//!     .with_in_memory_resources()
//!     .build()?;
//!
//! let client = ApiClient::new(
//!     Arc::new(RouterTransport::new(router)),
//!     ApiConfig::default_config(),
//! );
//!
//! let organizations = client.resource("organizations")?;
//! let page = organizations
//!     .get_list(
//!         &ListParams::new()
//!             .with_sort("name", SortOrder::Asc)
//!             .with_pagination(1, 25)
//!             .with_filter("status", "active"),
//!     )
//!     .await?;
//!
//! let mut delta = Delta::new();
//! delta.insert("name".into(), "Acme".into());
//! organizations
//!     .update()
//!     .mutate("org-1", delta, MutationCallbacks::default())
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod core;
pub mod logging;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Query Layer ===
    pub use crate::core::{
        predicate::{CompareOp, NumericBounds, Predicate, SelectQuery, ZeroBoundPolicy},
        query::{Filter, ListParams, PaginatedResponse, Pagination, PaginationMeta, Sort, SortOrder},
        resource::{BulkUpdateRequest, BulkUpdateResponse, Delta, RecordId},
        service::ResourceService,
    };

    // === Errors ===
    pub use crate::core::error::{ApiError, ConfigError, QueryError, ResourceError};

    // === Client ===
    pub use crate::client::{
        ApiClient, ClientError, MutationCallbacks, MutationStatus, QueryCache, ResourceHooks,
        RouterTransport, Transport,
    };
    #[cfg(feature = "http-client")]
    pub use crate::client::HttpTransport;

    // === Storage ===
    pub use crate::storage::InMemoryResourceService;

    // === Config ===
    pub use crate::config::{ApiConfig, CacheSettings, QuerySettings, ResourceDefinition};

    // === Server ===
    pub use crate::server::ServerBuilder;

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
    pub use std::sync::Arc;

    // === Axum ===
    pub use axum::Router;
}
