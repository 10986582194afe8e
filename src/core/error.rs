//! Typed error handling for the REST backend and the query layer
//!
//! # Error Categories
//!
//! - [`ResourceError`]: unknown resources, missing records, rejected deltas
//! - [`QueryError`]: list queries that cannot be serialized or parsed
//! - [`ConfigError`]: configuration parsing and validation
//!
//! Every category knows its HTTP status and a stable error code, and
//! [`ApiError`] renders as `{ "code", "message", "details"? }`.
//!
//! # Example
//!
//! ```rust,ignore
//! match result {
//!     Err(ApiError::Resource(ResourceError::NotFound { id, .. })) => {
//!         println!("Record {} not found", id);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//!     Ok(record) => println!("Found: {:?}", record),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level error of the REST backend
#[derive(Debug)]
pub enum ApiError {
    /// Resource-related errors
    Resource(ResourceError),

    /// List query errors
    Query(QueryError),

    /// Configuration errors
    Config(ConfigError),

    /// Internal errors (storage failures and the like)
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Resource(e) => write!(f, "{}", e),
            ApiError::Query(e) => write!(f, "{}", e),
            ApiError::Config(e) => write!(f, "{}", e),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Resource(e) => Some(e),
            ApiError::Query(e) => Some(e),
            ApiError::Config(e) => Some(e),
            ApiError::Internal(_) => None,
        }
    }
}

/// Error body returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Resource(e) => e.status_code(),
            ApiError::Query(_) => StatusCode::BAD_REQUEST,
            ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Resource(e) => e.error_code(),
            ApiError::Query(e) => e.error_code(),
            ApiError::Config(_) => "CONFIG_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::Resource(ResourceError::NotFound { resource, id }) => {
                Some(serde_json::json!({ "resource": resource, "id": id }))
            }
            ApiError::Query(
                QueryError::NonScalarFilter { key } | QueryError::ReservedFilterKey { key },
            ) => {
                Some(serde_json::json!({ "key": key }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), "{}", self);
        }
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ResourceError>() {
            Ok(resource_error) => return ApiError::Resource(resource_error),
            Err(err) => err,
        };
        match err.downcast::<QueryError>() {
            Ok(query_error) => ApiError::Query(query_error),
            Err(err) => ApiError::Internal(err.to_string()),
        }
    }
}

// =============================================================================
// Resource Errors
// =============================================================================

/// Errors related to resource operations
#[derive(Debug)]
pub enum ResourceError {
    /// Record was not found
    NotFound { resource: String, id: String },

    /// Resource is not registered
    UnknownResource { resource: String },

    /// The submitted delta cannot be applied
    InvalidDelta { resource: String, message: String },

    /// Resource operation failed
    OperationFailed {
        resource: String,
        operation: String,
        message: String,
    },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotFound { resource, id } => {
                write!(f, "{} record with id '{}' not found", resource, id)
            }
            ResourceError::UnknownResource { resource } => {
                write!(f, "Unknown resource: {}", resource)
            }
            ResourceError::InvalidDelta { resource, message } => {
                write!(f, "Invalid update for {}: {}", resource, message)
            }
            ResourceError::OperationFailed {
                resource,
                operation,
                message,
            } => write!(f, "Failed to {} {}: {}", operation, resource, message),
        }
    }
}

impl std::error::Error for ResourceError {}

impl ResourceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResourceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ResourceError::UnknownResource { .. } => StatusCode::NOT_FOUND,
            ResourceError::InvalidDelta { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ResourceError::OperationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ResourceError::NotFound { .. } => "RECORD_NOT_FOUND",
            ResourceError::UnknownResource { .. } => "UNKNOWN_RESOURCE",
            ResourceError::InvalidDelta { .. } => "INVALID_DELTA",
            ResourceError::OperationFailed { .. } => "RESOURCE_OPERATION_FAILED",
        }
    }
}

impl From<ResourceError> for ApiError {
    fn from(err: ResourceError) -> Self {
        ApiError::Resource(err)
    }
}

// =============================================================================
// Query Errors
// =============================================================================

/// Errors raised while serializing or parsing list queries
///
/// On the client these are programmer errors, raised before any request is
/// sent. On the backend they become `400 Bad Request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Filter value is an object, or an array holding non-scalars
    NonScalarFilter { key: String },

    /// Page below 1 or empty page size
    InvalidPagination { page: usize, per_page: usize },

    /// Sort order other than `ASC` / `DESC`
    InvalidSortOrder { value: String },

    /// A numeric query parameter could not be parsed
    InvalidNumber { key: String, value: String },

    /// Filter named like a sort or pagination parameter
    ReservedFilterKey { key: String },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::NonScalarFilter { key } => write!(
                f,
                "Filter '{}' must be a scalar or an array of scalars",
                key
            ),
            QueryError::InvalidPagination { page, per_page } => write!(
                f,
                "Invalid pagination: page {} with {} per page (page starts at 1, per page must be positive)",
                page, per_page
            ),
            QueryError::InvalidSortOrder { value } => {
                write!(f, "Invalid sort order '{}': expected ASC or DESC", value)
            }
            QueryError::InvalidNumber { key, value } => {
                write!(f, "Invalid number '{}' for '{}'", value, key)
            }
            QueryError::ReservedFilterKey { key } => write!(
                f,
                "Filter key '{}' is reserved for sorting and pagination",
                key
            ),
        }
    }
}

impl std::error::Error for QueryError {}

impl QueryError {
    pub fn error_code(&self) -> &'static str {
        match self {
            QueryError::NonScalarFilter { .. } => "NON_SCALAR_FILTER",
            QueryError::InvalidPagination { .. } => "INVALID_PAGINATION",
            QueryError::InvalidSortOrder { .. } => "INVALID_SORT_ORDER",
            QueryError::InvalidNumber { .. } => "INVALID_NUMBER",
            QueryError::ReservedFilterKey { .. } => "RESERVED_FILTER_KEY",
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::Query(err)
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to parse configuration file
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// A field failed validation
    InvalidValue { field: String, message: String },

    /// Two resources share a name
    DuplicateResource { name: String },

    /// A dependent resource is not declared
    UnknownDependent { resource: String, dependent: String },

    /// A resource lists itself as dependent
    SelfDependency { resource: String },

    /// IO error while reading configuration
    IoError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::InvalidValue { field, message } => {
                write!(f, "Invalid value for '{}': {}", field, message)
            }
            ConfigError::DuplicateResource { name } => {
                write!(f, "Resource '{}' is declared more than once", name)
            }
            ConfigError::UnknownDependent {
                resource,
                dependent,
            } => write!(
                f,
                "Resource '{}' depends on undeclared resource '{}'",
                resource, dependent
            ),
            ConfigError::SelfDependency { resource } => {
                write!(f, "Resource '{}' cannot depend on itself", resource)
            }
            ConfigError::IoError { message } => write!(f, "IO error: {}", message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::Config(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_error_display() {
        let err = ResourceError::NotFound {
            resource: "organizations".to_string(),
            id: "org-1".to_string(),
        };
        assert!(err.to_string().contains("organizations"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_status_codes() {
        let not_found: ApiError = ResourceError::NotFound {
            resource: "packages".to_string(),
            id: "p".to_string(),
        }
        .into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let bad_query: ApiError = QueryError::NonScalarFilter {
            key: "tag".to_string(),
        }
        .into();
        assert_eq!(bad_query.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(bad_query.error_code(), "NON_SCALAR_FILTER");

        let internal = ApiError::Internal("boom".to_string());
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_to_response_details() {
        let err: ApiError = ResourceError::NotFound {
            resource: "packages".to_string(),
            id: "p-1".to_string(),
        }
        .into();
        let response = err.to_response();
        assert_eq!(response.code, "RECORD_NOT_FOUND");
        let details = response.details.unwrap();
        assert_eq!(details["id"], "p-1");
    }

    #[test]
    fn test_anyhow_downcast_keeps_resource_errors() {
        let err = anyhow::Error::new(ResourceError::UnknownResource {
            resource: "widgets".to_string(),
        });
        let api: ApiError = err.into();
        assert_eq!(api.error_code(), "UNKNOWN_RESOURCE");

        let other: ApiError = anyhow::anyhow!("lock poisoned").into();
        assert_eq!(other.error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnknownDependent {
            resource: "organizations".to_string(),
            dependent: "memberships".to_string(),
        };
        assert!(err.to_string().contains("memberships"));
    }
}
