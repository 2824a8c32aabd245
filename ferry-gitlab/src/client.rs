//! GitLab REST client
//!
//! Every request URL goes through [`GitLabClient::build_url`]. GET responses
//! are cached by URL for the client's lifetime; POSTs are suppressed when
//! the client runs dry.

use std::collections::HashMap;
use std::sync::Mutex;

use ferry_core::{Config, GitLabConfig, Secrets};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::transport::{HttpRestTransport, RestTransport};
use crate::{Error, Result};

/// Page size requested for collection endpoints; later pages are not read
pub const PER_PAGE: u32 = 100;

/// Top-level API namespace a resource lives under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Projects,
    Groups,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Projects => "projects",
            Scope::Groups => "groups",
        }
    }
}

/// Path and query of an API request
///
/// `projects/:id[/:resource_type/:resource_id][/:sub_resource_type]?params`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOptions {
    scope: Scope,
    scope_id: String,
    resource_type: Option<String>,
    resource_id: Option<String>,
    sub_resource_type: Option<String>,
    params: Vec<(String, String)>,
}

impl UrlOptions {
    /// A project, by numeric id or full path
    pub fn project(id: impl ToString) -> Self {
        Self::scoped(Scope::Projects, id)
    }

    /// A group, by numeric id or full path
    pub fn group(id: impl ToString) -> Self {
        Self::scoped(Scope::Groups, id)
    }

    fn scoped(scope: Scope, id: impl ToString) -> Self {
        Self {
            scope,
            scope_id: id.to_string(),
            resource_type: None,
            resource_id: None,
            sub_resource_type: None,
            params: Vec::new(),
        }
    }

    pub fn resource(mut self, resource_type: &str, id: impl ToString) -> Self {
        self.resource_type = Some(resource_type.to_string());
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn sub_resource(mut self, sub_resource_type: &str) -> Self {
        self.sub_resource_type = Some(sub_resource_type.to_string());
        self
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// First page of a collection
    pub fn paged(self) -> Self {
        self.param("per_page", PER_PAGE)
    }
}

/// GitLab API client
pub struct GitLabClient<T: RestTransport = HttpRestTransport> {
    transport: T,
    api_url: Url,
    host_url: String,
    dry_run: bool,
    cache: Mutex<HashMap<String, Value>>,
}

impl GitLabClient<HttpRestTransport> {
    /// Create a client for the instance in `config`
    pub fn new(config: &GitLabConfig, token: Option<&str>, dry_run: bool) -> Result<Self> {
        Self::with_transport(HttpRestTransport::new(token)?, config, dry_run)
    }

    /// Create a client from configuration and secrets
    ///
    /// Runs dry when the migration is configured as a dry run.
    pub fn from_config(config: &Config, secrets: &Secrets) -> Result<Self> {
        let token = secrets.gitlab_token();
        let client = Self::new(&config.gitlab, token.as_deref(), config.migration.dry_run)?;
        info!(url = %client.host_url, dry_run = client.dry_run, "Created GitLab client");
        Ok(client)
    }
}

impl<T: RestTransport> GitLabClient<T> {
    pub fn with_transport(transport: T, config: &GitLabConfig, dry_run: bool) -> Result<Self> {
        Ok(Self {
            transport,
            api_url: Url::parse(&config.api_url())?,
            host_url: config.host_url().to_string(),
            dry_run,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Instance URL without trailing slash, e.g. `https://gitlab.com`
    pub fn host_url(&self) -> &str {
        &self.host_url
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Absolute API URL for `options`
    ///
    /// Path identifiers are percent-encoded, so `acme/app` becomes
    /// `acme%2Fapp`.
    pub fn build_url(&self, options: &UrlOptions) -> Result<Url> {
        let mut url = self.api_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Url(format!("{} cannot be a base URL", self.api_url)))?;
            segments
                .pop_if_empty()
                .push(options.scope.as_str())
                .push(&options.scope_id);
            if let (Some(kind), Some(id)) = (&options.resource_type, &options.resource_id) {
                segments.push(kind).push(id);
            }
            if let Some(sub) = &options.sub_resource_type {
                segments.push(sub);
            }
        }

        if !options.params.is_empty() {
            url.query_pairs_mut().extend_pairs(options.params.iter());
        }

        Ok(url)
    }

    /// GET `url`, answering repeats from the cache
    pub async fn query_api_cached(&self, url: &Url) -> Result<Value> {
        let key = url.to_string();

        if let Some(hit) = self.cache_get(&key) {
            debug!(url = %key, "GitLab cache hit");
            return Ok(hit);
        }

        let value = self.transport.get(url).await?;
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, value.clone());
        Ok(value)
    }

    /// POST `body` to `url`; `None` without a request when running dry
    pub async fn post(&self, url: &Url, body: &Value) -> Result<Option<Value>> {
        if self.dry_run {
            info!(url = %url, "[DRY RUN] Skipping POST");
            return Ok(None);
        }
        self.transport.post(url, body).await.map(Some)
    }

    /// Display name of a project or group
    pub async fn fetch_name(&self, scope: Scope, id: &str) -> Result<String> {
        let url = self.build_url(&UrlOptions::scoped(scope, id))?;
        let value = self.query_api_cached(&url).await?;
        value["name"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::Parse(format!("No name in response from {}", url)))
    }

    fn cache_get(&self, key: &str) -> Option<Value> {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

impl<T: RestTransport> std::fmt::Debug for GitLabClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabClient")
            .field("api_url", &self.api_url.as_str())
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}
