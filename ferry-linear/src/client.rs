//! GraphQL client with response caching, rate-limit retry, and dry-run

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::Duration;

use ferry_core::text::truncate_chars;
use ferry_core::{Config, Secrets};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::logger::QueryLogger;
use crate::transport::{HttpResponse, HttpTransport, Transport};
use crate::{Error, Result};

/// Attempts made before giving up on a rate-limited request
pub const THROTTLE_RETRIES: u32 = 3;

const RATE_LIMITED_CODE: &str = "RATELIMITED";

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Option<Vec<GraphQLErrorBody>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    extensions: Option<ErrorExtensions>,
}

#[derive(Debug, Deserialize)]
struct ErrorExtensions {
    #[serde(default)]
    code: Option<String>,
}

impl GraphQLErrorBody {
    fn is_rate_limited(&self) -> bool {
        self.extensions
            .as_ref()
            .and_then(|ext| ext.code.as_deref())
            .is_some_and(|code| code == RATE_LIMITED_CODE)
    }
}

/// GraphQL client for the Linear API
///
/// Query responses are cached for the lifetime of the client, keyed by the
/// exact query text and variables. Mutations are never cached and are
/// skipped entirely in dry-run mode.
pub struct GraphqlClient<T: Transport = HttpTransport> {
    transport: T,
    dry_run: bool,
    sleep_duration: Duration,
    cache: Mutex<HashMap<u64, Value>>,
    logger: QueryLogger,
}

impl GraphqlClient<HttpTransport> {
    /// Create a client for `endpoint`
    pub fn new(endpoint: &str, authorization: Option<&str>, dry_run: bool) -> Result<Self> {
        let transport = HttpTransport::new(endpoint, authorization)?;
        Ok(Self::with_transport(transport, dry_run))
    }

    /// Create a client from configuration and secrets
    pub fn from_config(config: &Config, secrets: &Secrets) -> Result<Self> {
        let token = secrets.linear_token();
        let mut client = Self::new(
            &config.linear.endpoint,
            token.as_deref(),
            config.migration.linear_dry_run(),
        )?;
        client.set_sleep_duration(config.linear.retry_sleep);
        Ok(client)
    }
}

impl<T: Transport> GraphqlClient<T> {
    /// Create a client over a custom transport
    pub fn with_transport(transport: T, dry_run: bool) -> Self {
        Self {
            transport,
            dry_run,
            sleep_duration: Duration::from_secs(30),
            cache: Mutex::new(HashMap::new()),
            logger: QueryLogger,
        }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    pub fn sleep_duration(&self) -> Duration {
        self.sleep_duration
    }

    pub fn set_sleep_duration(&mut self, duration: Duration) {
        self.sleep_duration = duration;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of cached query responses
    pub fn cache_len(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Run a query, answering from the cache when the same query text and
    /// variables were seen before
    pub async fn query<V: Serialize + ?Sized>(&self, query: &str, variables: &V) -> Result<Value> {
        let variables = serde_json::to_value(variables)
            .map_err(|e| Error::Parse(format!("Failed to encode variables: {}", e)))?;

        self.logger.log_query(query, &variables);
        let key = cache_key(query, &variables);

        if let Some(cached) = self.cached(key) {
            self.logger.log_cache_hit(key);
            self.logger.log_response(&cached.to_string());
            return Ok(cached);
        }

        let result = self.execute(query, &variables).await?;
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, result.clone());
        Ok(result)
    }

    /// Run a mutation; returns `None` without a network call in dry-run mode
    pub async fn mutation<V: Serialize + ?Sized>(
        &self,
        mutation: &str,
        variables: &V,
    ) -> Result<Option<Value>> {
        let variables = serde_json::to_value(variables)
            .map_err(|e| Error::Parse(format!("Failed to encode variables: {}", e)))?;

        if self.dry_run {
            self.logger.log_dry_run(mutation, &variables);
            return Ok(None);
        }

        self.logger.log_query(mutation, &variables);
        self.execute(mutation, &variables).await.map(Some)
    }

    fn cached(&self, key: u64) -> Option<Value> {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned()
    }

    async fn execute(&self, query: &str, variables: &Value) -> Result<Value> {
        let body = json!({
            "query": query,
            "variables": variables,
        });

        let mut attempts = 0;
        loop {
            let response = self.transport.post_json(&body).await?;
            self.logger.log_response(&response.body);

            let parsed = parse_body(&response)?;
            let envelope = ErrorEnvelope::deserialize(&parsed)
                .map_err(|e| Error::Parse(format!("Unexpected GraphQL error shape: {}", e)))?;
            let errors = envelope.errors.unwrap_or_default();

            if response.is_client_error() && errors.iter().any(GraphQLErrorBody::is_rate_limited)
            {
                attempts += 1;
                if attempts >= THROTTLE_RETRIES {
                    return Err(Error::RateLimitExceeded {
                        retries: THROTTLE_RETRIES,
                    });
                }
                self.logger
                    .log_rate_limited(attempts, self.sleep_duration.as_secs());
                tokio::time::sleep(self.sleep_duration).await;
                continue;
            }

            if !errors.is_empty() {
                let messages = errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.logger.log_error(&messages);
                return Err(Error::GraphQL(messages));
            }

            return Ok(parsed);
        }
    }
}

fn parse_body(response: &HttpResponse) -> Result<Value> {
    let parsed: Value = serde_json::from_str(&response.body).map_err(|e| {
        Error::Http(format!(
            "Invalid JSON response (status {}): {}: {}",
            response.status,
            e,
            truncate_chars(&response.body, 200)
        ))
    })?;

    if !parsed.is_object() {
        return Err(Error::Parse(format!(
            "GraphQL response is not an object (status {})",
            response.status
        )));
    }

    Ok(parsed)
}

fn cache_key(query: &str, variables: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    variables.to_string().hash(&mut hasher);
    hasher.finish()
}

impl<T: Transport> std::fmt::Debug for GraphqlClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphqlClient")
            .field("dry_run", &self.dry_run)
            .field("sleep_duration", &self.sleep_duration)
            .field("cached", &self.cache_len())
            .finish_non_exhaustive()
    }
}
