//! HTTP transport for the GitLab REST API

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::{Error, Result};

const PRIVATE_TOKEN: HeaderName = HeaderName::from_static("private-token");

/// GET and POST JSON against absolute GitLab API URLs
#[async_trait]
pub trait RestTransport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<Value>;

    async fn post(&self, url: &Url, body: &Value) -> Result<Value>;
}

/// reqwest-backed transport authenticated with a personal access token
pub struct HttpRestTransport {
    client: reqwest::Client,
    headers: HeaderMap,
}

impl HttpRestTransport {
    pub fn new(token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = token {
            let value = HeaderValue::from_str(token)
                .map_err(|e| Error::Http(format!("Invalid GitLab token header: {}", e)))?;
            headers.insert(PRIVATE_TOKEN, value);
        }

        Ok(Self {
            client: reqwest::Client::new(),
            headers,
        })
    }

    async fn read_json(url: &Url, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status.as_u16(), url.as_str(), &body));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Parse(format!("Invalid JSON from {}: {}", url, e)))
    }
}

#[async_trait]
impl RestTransport for HttpRestTransport {
    async fn get(&self, url: &Url) -> Result<Value> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url.clone())
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        Self::read_json(url, response).await
    }

    async fn post(&self, url: &Url, body: &Value) -> Result<Value> {
        debug!(url = %url, "POST");
        let response = self
            .client
            .post(url.clone())
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        Self::read_json(url, response).await
    }
}

impl std::fmt::Debug for HttpRestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRestTransport").finish_non_exhaustive()
    }
}
