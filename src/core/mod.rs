//! Core module containing the query layer, error types and service traits

pub mod error;
pub mod predicate;
pub mod query;
pub mod resource;
pub mod service;

pub use error::{ApiError, ConfigError, ErrorResponse, QueryError, ResourceError};
pub use predicate::{CompareOp, NumericBounds, Predicate, SelectQuery, ZeroBoundPolicy};
pub use query::{
    Filter, ListParams, PaginatedResponse, Pagination, PaginationMeta, Sort, SortOrder,
};
pub use resource::{BulkUpdateRequest, BulkUpdateResponse, Delta, RecordId};
pub use service::ResourceService;
