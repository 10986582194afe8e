//! Errors surfaced by the resource client

use crate::core::error::QueryError;
use crate::core::resource::RecordId;
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The list query could not be serialized; no request was sent
    #[error("invalid list query: {0}")]
    Query(#[from] QueryError),

    #[error("unknown resource '{0}'")]
    UnknownResource(String),

    /// The request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status
    #[error("server responded {status} ({code}): {message}")]
    Server {
        status: u16,
        code: String,
        message: String,
    },

    #[error("failed to decode response: {0}")]
    Decode(String),

    /// A bulk update was only partly applied
    ///
    /// `updated` were written, `errors` maps every failed id to the
    /// server's message.
    #[error("{} of {} records failed to update", .errors.len(), .errors.len() + .updated.len())]
    PartialFailure {
        updated: Vec<RecordId>,
        errors: IndexMap<RecordId, String>,
    },
}

impl ClientError {
    /// HTTP status reported by the backend, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_failure_message() {
        let mut errors = IndexMap::new();
        errors.insert("b".to_string(), "locked".to_string());
        let err = ClientError::PartialFailure {
            updated: vec!["a".to_string(), "c".to_string()],
            errors,
        };
        assert_eq!(err.to_string(), "1 of 3 records failed to update");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_query_error_conversion() {
        let err: ClientError = QueryError::NonScalarFilter {
            key: "tag".to_string(),
        }
        .into();
        assert!(err.to_string().contains("tag"));
    }
}
