//! REST backend speaking the list-query wire format
//!
//! For every registered resource the [`ServerBuilder`] mounts list, get,
//! update and bulk update routes backed by a
//! [`ResourceService`](crate::core::ResourceService).

pub mod builder;
pub mod handlers;
pub mod router;

pub use builder::ServerBuilder;
pub use handlers::{ResourceState, TOTAL_COUNT_HEADER};
