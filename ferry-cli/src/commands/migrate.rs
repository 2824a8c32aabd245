//! Migrate command - Copy GitLab issues or epics into Linear

use std::path::Path;

use clap::{ArgGroup, Args};
use ferry_core::{Config, Secrets, SourceKind};
use ferry_gitlab::{migrate_item, GitLabClient, GitLabItem, MigrateOptions, MigrationOutcome};
use ferry_linear::LinearConnector;

/// Arguments for the migrate command
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["project", "group"])))]
pub struct MigrateArgs {
    /// Project holding the issues (numeric id or full path)
    #[arg(long, requires = "issues")]
    pub project: Option<String>,

    /// Issue iids to migrate
    #[arg(long = "issue", num_args = 1.., requires = "project")]
    pub issues: Vec<u64>,

    /// Group holding the epics (numeric id or full path)
    #[arg(long, requires = "epics")]
    pub group: Option<String>,

    /// Epic iids to migrate
    #[arg(long = "epic", num_args = 1.., requires = "group")]
    pub epics: Vec<u64>,

    /// Dry run - read everything, write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Carry the `S::` workflow label over as the Linear state
    #[arg(long)]
    pub set_state: bool,

    /// Prefix issue titles with the project name
    #[arg(long)]
    pub prepend_project_name: bool,

    /// Prefix of the label naming the Linear team
    #[arg(long, env = "FERRY_TEAM_LABEL_PREFIX")]
    pub team_label_prefix: Option<String>,
}

impl MigrateArgs {
    fn targets(&self) -> Vec<(SourceKind, &str, u64)> {
        let issues = self
            .project
            .as_deref()
            .into_iter()
            .flat_map(|project| self.issues.iter().map(move |iid| (SourceKind::Issue, project, *iid)));
        let epics = self
            .group
            .as_deref()
            .into_iter()
            .flat_map(|group| self.epics.iter().map(move |iid| (SourceKind::Epic, group, *iid)));
        issues.chain(epics).collect()
    }

    /// Execute the migrate command
    ///
    /// Items are migrated one after another. A failing item is reported and
    /// the batch continues; the command fails at the end if any item did.
    pub async fn execute(&self, config_path: Option<&Path>) -> anyhow::Result<()> {
        let config = Config::load_with_overrides(
            config_path,
            self.dry_run.then_some(true),
            self.team_label_prefix.clone(),
        )?;
        let secrets = Secrets::load()?;

        let gitlab = GitLabClient::from_config(&config, &secrets)?;
        let mut connector = LinearConnector::from_config(&config, &secrets)?;
        let options = MigrateOptions {
            set_state: self.set_state,
            prepend_project_name: self.prepend_project_name,
        };

        tracing::info!(
            gitlab_dry_run = connector.options().gitlab_dry_run,
            linear_dry_run = connector.options().linear_dry_run,
            team_label_prefix = %connector.options().team_label_prefix,
            "Starting migration"
        );

        let targets = self.targets();
        println!("Ferry Migration");
        println!("===============");
        println!();
        if config.migration.dry_run {
            println!("[Dry run] GitLab will not be modified");
            println!();
        }

        let mut failed = 0;
        for (kind, scope, iid) in &targets {
            let fetched = match kind {
                SourceKind::Issue => GitLabItem::fetch_issue(&gitlab, scope, *iid).await,
                SourceKind::Epic => GitLabItem::fetch_epic(&gitlab, scope, *iid).await,
            };
            let item = match fetched {
                Ok(item) => item,
                Err(e) => {
                    tracing::error!(kind = %kind, scope = %scope, iid, error = %e, "Failed to fetch item");
                    println!("  FAILED   {}#{}: {}", scope, iid, e);
                    failed += 1;
                    continue;
                }
            };

            match migrate_item(&mut connector, &item, &options).await {
                Ok(MigrationOutcome::Migrated { issue, .. }) => {
                    println!("  migrated {}#{} -> {}", scope, iid, issue.url);
                }
                Ok(MigrationOutcome::Skipped) => {
                    println!("  skipped  {}#{} (Linear dry run)", scope, iid);
                }
                Ok(MigrationOutcome::Failed { error, .. }) => {
                    println!("  FAILED   {}#{}: {}", scope, iid, error);
                    failed += 1;
                }
                Err(e) => {
                    tracing::error!(kind = %kind, scope = %scope, iid, error = %e, "Failed to annotate item");
                    println!("  FAILED   {}#{}: {}", scope, iid, e);
                    failed += 1;
                }
            }
        }

        println!();
        println!(
            "{} item(s) processed, {} migrated, {} failed",
            targets.len(),
            connector.evidence().len(),
            failed
        );

        if failed > 0 {
            anyhow::bail!("{} of {} item(s) failed to migrate", failed, targets.len());
        }

        Ok(())
    }
}
