//! Config command - Show the effective configuration

use std::path::Path;

use clap::Args;
use ferry_core::{Config, Secrets};

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Write a secrets template if none exists
    #[arg(long)]
    pub init_secrets: bool,
}

fn redacted(token: Option<String>) -> &'static str {
    if token.is_some() {
        "(set)"
    } else {
        "(not set)"
    }
}

impl ConfigArgs {
    /// Execute the config command
    pub fn execute(&self, config_path: Option<&Path>) -> anyhow::Result<()> {
        if self.init_secrets {
            match Secrets::create_template() {
                Ok(path) => println!("Created secrets template: {}", path.display()),
                Err(e) => println!("Secrets template not written: {}", e),
            }
            println!();
        }

        let config = Config::load_with_overrides(config_path, None, None)?;
        let secrets = Secrets::load()?;

        println!("Ferry Configuration");
        println!("===================");
        println!();
        println!("Linear:");
        println!("  endpoint: {}", config.linear.endpoint);
        println!("  retry_sleep: {:?}", config.linear.retry_sleep);
        println!("  token: {}", redacted(secrets.linear_token()));
        println!();
        println!("GitLab:");
        println!("  url: {}", config.gitlab.host_url());
        println!("  token: {}", redacted(secrets.gitlab_token()));
        println!();
        println!("Migration:");
        println!("  dry_run: {}", config.migration.dry_run);
        println!("  linear_dry_run: {}", config.migration.linear_dry_run());
        println!("  team_label_prefix: {}", config.migration.team_label_prefix);
        println!();

        let path = config_path
            .map(Path::to_path_buf)
            .or_else(Config::default_config_path);
        if let Some(path) = path {
            println!("Config file: {}", path.display());
            if path.exists() {
                println!("  (exists)");
            } else {
                println!("  (not found - using defaults)");
            }
        }
        if let Some(path) = Secrets::default_secrets_path() {
            println!("Secrets file: {}", path.display());
        }

        Ok(())
    }
}
