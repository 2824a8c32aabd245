//! HTTP transport for GraphQL requests
//!
//! The client only needs "POST this JSON, give me status and body", which is
//! what [`Transport`] expresses. [`HttpTransport`] is the reqwest-backed
//! implementation; tests substitute a scripted one.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::debug;

use crate::{Error, Result};

/// Raw HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..=499).contains(&self.status)
    }
}

/// Sends a JSON body to the GraphQL endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, body: &Value) -> Result<HttpResponse>;
}

/// reqwest-backed transport bound to one endpoint
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    headers: HeaderMap,
}

impl HttpTransport {
    /// Create a transport for `endpoint`, sending `authorization` verbatim
    /// in the `Authorization` header when given
    pub fn new(endpoint: impl Into<String>, authorization: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = authorization {
            let value = HeaderValue::from_str(token)
                .map_err(|e| Error::Http(format!("Invalid authorization header: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            headers,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, body: &Value) -> Result<HttpResponse> {
        debug!(endpoint = %self.endpoint, "POST GraphQL request");

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("GraphQL request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("Failed to read GraphQL response: {}", e)))?;

        Ok(HttpResponse { status, body })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
