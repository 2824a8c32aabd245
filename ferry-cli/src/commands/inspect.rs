//! Inspect command - Show what a migration would read from an issue

use std::path::Path;

use clap::Args;
use ferry_core::{Config, Secrets, SourceItem};
use ferry_gitlab::{GitLabClient, GitLabItem};

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Project holding the issue (numeric id or full path)
    #[arg(long)]
    pub project: String,

    /// Issue iid
    #[arg(long)]
    pub issue: u64,
}

impl InspectArgs {
    /// Execute the inspect command
    pub async fn execute(&self, config_path: Option<&Path>) -> anyhow::Result<()> {
        let config = Config::load_with_overrides(config_path, None, None)?;
        let secrets = Secrets::load()?;
        let gitlab = GitLabClient::from_config(&config, &secrets)?;

        let item = GitLabItem::fetch_issue(&gitlab, &self.project, self.issue).await?;
        let resource = item.resource();

        println!("{}", resource.title);
        println!("  url:    {}", resource.web_url);
        println!("  state:  {:?}", resource.state);
        println!("  labels: {}", resource.labels.join(", "));
        println!(
            "  human discussions: {}",
            item.human_discussions().await?.len()
        );

        match item.epic_url() {
            Some(epic_url) => {
                println!("  epic:   {}", epic_url);
                match item.find_linear_id_in_epic_notes().await? {
                    Some(id) => println!("  epic migrated as Linear issue {}", id),
                    None => println!("  epic not migrated"),
                }
            }
            None => println!("  epic:   (none)"),
        }

        Ok(())
    }
}
