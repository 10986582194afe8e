//! Transport seam between the resource client and the backend
//!
//! The client only builds [`ApiRequest`]s and interprets [`ApiResponse`]s;
//! how a request reaches the backend is up to the [`Transport`]. No
//! transport retries: every request is sent exactly once.

use crate::client::error::ClientError;
use crate::core::error::ErrorResponse;
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, header};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower::ServiceExt;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path and query, e.g. `/packages?page=0&perPage=25`
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::PUT,
            path: path.into(),
            body: Some(body),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Decoded JSON body, `Null` when the body was empty
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode a success body, or turn an error status into
    /// [`ClientError::Server`]
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        if !self.is_success() {
            let status = self.status;
            return Err(match serde_json::from_value::<ErrorResponse>(self.body) {
                Ok(error) => ClientError::Server {
                    status,
                    code: error.code,
                    message: error.message,
                },
                Err(_) => ClientError::Server {
                    status,
                    code: "UNKNOWN".to_string(),
                    message: format!("request failed with status {}", status),
                },
            });
        }

        serde_json::from_value(self.body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

fn decode_body(bytes: &[u8]) -> Result<Value, ClientError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Sends requests to a backend
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError>;
}

/// Transport dispatching to an in-process axum router
///
/// Requests go through the full router (extractors, layers, error
/// rendering) without opening a socket.
#[derive(Clone)]
pub struct RouterTransport {
    router: Router,
}

impl RouterTransport {
    pub fn new(router: Router) -> Self {
        Self { router }
    }
}

#[async_trait]
impl Transport for RouterTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let mut builder = Request::builder()
            .method(request.method)
            .uri(request.path.as_str());

        let body = match &request.body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                let bytes =
                    serde_json::to_vec(value).map_err(|e| ClientError::Transport(e.to_string()))?;
                Body::from(bytes)
            }
            None => Body::empty(),
        };

        let http_request = builder
            .body(body)
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let response = self
            .router
            .clone()
            .oneshot(http_request)
            .await
            .unwrap_or_else(|never| match never {});

        let status = response.status().as_u16();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(ApiResponse {
            status,
            body: decode_body(&bytes)?,
        })
    }
}

/// Transport over HTTP using `reqwest`
#[cfg(feature = "http-client")]
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "http-client")]
impl HttpTransport {
    /// `base_url` without trailing path, e.g. `https://api.example.com/v1`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[cfg(feature = "http-client")]
#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method, url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(ApiResponse {
            status,
            body: decode_body(&bytes)?,
        })
    }
}
