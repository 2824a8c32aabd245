//! Configuration management for ferry
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (FERRY_*, IGNORE_LINEAR_DRYRUN)
//! 3. Config file (~/.config/ferry/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default Linear GraphQL endpoint
pub const DEFAULT_LINEAR_ENDPOINT: &str = "https://api.linear.app/graphql";

/// Default GitLab host
pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";

/// Destination (Linear) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LinearConfig {
    /// GraphQL endpoint URL
    pub endpoint: String,

    /// How long to wait before retrying a rate-limited request
    #[serde(with = "humantime_serde")]
    pub retry_sleep: Duration,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_LINEAR_ENDPOINT.to_string(),
            retry_sleep: Duration::from_secs(30),
        }
    }
}

/// Source (GitLab) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitLabConfig {
    /// Host URL, used both for the REST API and for resolving relative links
    pub url: String,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GITLAB_URL.to_string(),
        }
    }
}

impl GitLabConfig {
    /// Host URL without a trailing slash
    pub fn host_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Base URL of the REST API (`<host>/api/v4`)
    pub fn api_url(&self) -> String {
        format!("{}/api/v4", self.host_url())
    }
}

/// Migration behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Source-side dry-run: nothing is written back to GitLab
    pub dry_run: bool,

    /// Destination-side dry-run override; follows `dry_run` when unset
    pub linear_dry_run: Option<bool>,

    /// Prefix of the label that names the destination team (`Team::Backend`)
    pub team_label_prefix: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            linear_dry_run: None,
            team_label_prefix: "Team".to_string(),
        }
    }
}

impl MigrationConfig {
    /// Effective destination-side dry-run switch
    pub fn linear_dry_run(&self) -> bool {
        self.linear_dry_run.unwrap_or(self.dry_run)
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Destination configuration
    pub linear: LinearConfig,

    /// Source configuration
    pub gitlab: GitLabConfig,

    /// Migration behaviour
    pub migration: MigrationConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/ferry/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ferry").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - FERRY_LINEAR_ENDPOINT: GraphQL endpoint
    /// - FERRY_GITLAB_URL: GitLab host
    /// - FERRY_TEAM_LABEL_PREFIX: team label prefix
    /// - FERRY_DRY_RUN: source-side dry-run (`1`/`true`)
    /// - IGNORE_LINEAR_DRYRUN: when set, the destination side runs live
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("FERRY_LINEAR_ENDPOINT") {
            self.linear.endpoint = endpoint;
        }

        if let Ok(url) = std::env::var("FERRY_GITLAB_URL") {
            self.gitlab.url = url;
        }

        if let Ok(prefix) = std::env::var("FERRY_TEAM_LABEL_PREFIX") {
            self.migration.team_label_prefix = prefix;
        }

        if let Ok(value) = std::env::var("FERRY_DRY_RUN") {
            self.migration.dry_run = parse_flag(&value);
        }

        if std::env::var_os("IGNORE_LINEAR_DRYRUN").is_some() {
            self.migration.linear_dry_run = Some(false);
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(
        mut self,
        dry_run: Option<bool>,
        team_label_prefix: Option<String>,
    ) -> Self {
        if let Some(dry_run) = dry_run {
            self.migration.dry_run = dry_run;
        }

        if let Some(prefix) = team_label_prefix {
            self.migration.team_label_prefix = prefix;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(
        path: Option<&Path>,
        dry_run: Option<bool>,
        team_label_prefix: Option<String>,
    ) -> Result<Self> {
        let base = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };

        Ok(base
            .with_env_overrides()
            .with_cli_overrides(dry_run, team_label_prefix))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
