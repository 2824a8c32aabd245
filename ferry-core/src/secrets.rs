//! Secrets management for ferry
//!
//! API tokens are stored separately from configuration to avoid accidental
//! sharing. The secrets file is located at `~/.config/ferry/secrets.toml` and
//! must have restrictive permissions (0600 on Unix).
//!
//! Loading priority:
//! 1. Environment variables (LINEAR_API_TOKEN, GITLAB_API_TOKEN)
//! 2. Secrets file (~/.config/ferry/secrets.toml)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Secrets structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Secrets {
    /// Linear credentials
    pub linear: TokenSecret,

    /// GitLab credentials
    pub gitlab: TokenSecret,
}

/// A single API token
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenSecret {
    /// API token
    pub token: Option<String>,
}

const TEMPLATE: &str = r#"# Ferry Secrets
# Keep this file out of version control; it must stay chmod 600.

[linear]
# Linear personal API key (Settings > API), sent verbatim as Authorization
token = ""

[gitlab]
# GitLab personal access token with the `api` scope
token = ""
"#;

impl Secrets {
    /// Load secrets from the default location, or empty secrets when no
    /// file exists there
    pub fn load() -> Result<Self> {
        match Self::default_secrets_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load secrets from `path`, refusing files readable by group or others
    pub fn load_from_file(path: &Path) -> Result<Self> {
        ensure_private(path)?;

        let contents = std::fs::read_to_string(path)?;
        let mut secrets: Secrets = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse secrets: {}", e)))?;

        secrets.linear.trim();
        secrets.gitlab.trim();
        Ok(secrets)
    }

    /// `~/.config/ferry/secrets.toml` on Unix
    pub fn default_secrets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ferry").join("secrets.toml"))
    }

    /// Linear API token; `LINEAR_API_TOKEN` wins over the file
    pub fn linear_token(&self) -> Option<String> {
        resolve_token("LINEAR_API_TOKEN", self.linear.token.as_deref())
    }

    /// GitLab API token; `GITLAB_API_TOKEN` wins over the file
    pub fn gitlab_token(&self) -> Option<String> {
        resolve_token("GITLAB_API_TOKEN", self.gitlab.token.as_deref())
    }

    /// Write an empty secrets file with mode 0600 at the default location
    ///
    /// Fails if a file is already there.
    pub fn create_template() -> Result<PathBuf> {
        let path = Self::default_secrets_path()
            .ok_or_else(|| Error::Config("Could not determine secrets path".to_string()))?;

        if path.exists() {
            return Err(Error::Config(format!(
                "Secrets file already exists at {}",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, TEMPLATE)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        }

        warn!(path = %path.display(), "Created secrets template, add your tokens to it");
        Ok(path)
    }
}

impl TokenSecret {
    fn trim(&mut self) {
        if let Some(token) = self.token.as_mut() {
            *token = token.trim().to_string();
        }
    }
}

#[cfg(unix)]
fn ensure_private(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)?.permissions().mode() & 0o777;
    if mode & 0o077 != 0 {
        return Err(Error::Config(format!(
            "Secrets file {} has insecure permissions {:o}. Please run: chmod 600 {}",
            path.display(),
            mode,
            path.display()
        )));
    }
    debug!(path = %path.display(), mode = format!("{:o}", mode), "Secrets file permissions OK");
    Ok(())
}

#[cfg(not(unix))]
fn ensure_private(_path: &Path) -> Result<()> {
    Ok(())
}

fn resolve_token(env_var: &str, from_file: Option<&str>) -> Option<String> {
    if let Ok(token) = std::env::var(env_var) {
        let token = token.trim().to_string();
        if !token.is_empty() {
            debug!(env_var, "Using token from environment variable");
            return Some(token);
        }
    }

    match from_file {
        Some(token) if !token.is_empty() => {
            debug!(env_var, "Using token from secrets file");
            Some(token.to_string())
        }
        _ => None,
    }
}
