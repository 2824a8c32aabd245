//! Query logging for the GraphQL client
//!
//! Everything the client sends or receives is rendered through `tracing`
//! under the `ferry::graphql` target, so `RUST_LOG=ferry::graphql=trace`
//! shows full request and response bodies.

use serde_json::Value;
use tracing::{debug, error, info, trace};

/// Renders queries, variables, responses, cache hits, and errors
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryLogger;

impl QueryLogger {
    pub fn log_query(&self, query: &str, variables: &Value) {
        debug!(target: "ferry::graphql", query = %query.trim(), "Query");
        debug!(target: "ferry::graphql", %variables, "Variables");
    }

    pub fn log_response(&self, response: &str) {
        trace!(target: "ferry::graphql", %response, "Response");
    }

    pub fn log_cache_hit(&self, cache_key: u64) {
        debug!(target: "ferry::graphql", cache_key, "Cache hit");
    }

    pub fn log_dry_run(&self, mutation: &str, variables: &Value) {
        info!(target: "ferry::graphql", mutation = %mutation.trim(), %variables, "[DRY RUN] Skipping mutation");
    }

    pub fn log_rate_limited(&self, attempt: u32, sleep_secs: u64) {
        info!(target: "ferry::graphql", attempt, sleep_secs, "Rate limited, backing off");
    }

    pub fn log_error(&self, errors: &str) {
        error!(target: "ferry::graphql", %errors, "GraphQL Error");
    }
}
