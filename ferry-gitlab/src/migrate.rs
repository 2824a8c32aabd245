//! One-item migration with write-back to the source tracker

use ferry_core::SourceItem;
use ferry_linear::{CreatedIssue, LinearConnector, Transport};
use tracing::{error, info};

use crate::item::GitLabItem;
use crate::notes::{failure_note, success_note};
use crate::transport::RestTransport;
use crate::Result;

/// Per-run switches of [`migrate_item`]
#[derive(Debug, Clone, Default)]
pub struct MigrateOptions {
    /// Carry open items' `S::` workflow label over as the Linear state
    pub set_state: bool,
    /// Prefix titles with the project (or group) name
    pub prepend_project_name: bool,
}

/// Result of migrating one item
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationOutcome {
    /// Created in Linear; `note` was left on the source item
    Migrated { issue: CreatedIssue, note: String },
    /// Linear ran dry, nothing was created
    Skipped,
    /// The connector failed; `note` was left on the source item
    Failed { error: String, note: String },
}

impl MigrationOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, MigrationOutcome::Failed { .. })
    }

    /// Note to leave on the source item, if any
    pub fn note(&self) -> Option<&str> {
        match self {
            MigrationOutcome::Migrated { note, .. } | MigrationOutcome::Failed { note, .. } => {
                Some(note)
            }
            MigrationOutcome::Skipped => None,
        }
    }
}

/// Migrate `item` and annotate it with the result
///
/// Connector errors become a [`MigrationOutcome::Failed`] with a failure
/// note. Errors reading the project name or posting the note are returned.
pub async fn migrate_item<S: RestTransport, L: Transport>(
    connector: &mut LinearConnector<L>,
    item: &GitLabItem<'_, S>,
    options: &MigrateOptions,
) -> Result<MigrationOutcome> {
    let project_name = if options.prepend_project_name {
        Some(item.container_name().await?)
    } else {
        None
    };

    info!(url = %item.resource().web_url, "Processing issue");

    let outcome = match connector
        .import_issue(item, options.set_state, project_name.as_deref())
        .await
    {
        Ok(Some(issue)) => MigrationOutcome::Migrated {
            note: success_note(&issue),
            issue,
        },
        Ok(None) => MigrationOutcome::Skipped,
        Err(e) => {
            let message = e.to_string();
            error!(url = %item.resource().web_url, error = %message, "Migration failed");
            MigrationOutcome::Failed {
                note: failure_note(
                    item.resource(),
                    project_name.as_deref().unwrap_or_default(),
                    &message,
                ),
                error: message,
            }
        }
    };

    if let Some(note) = outcome.note() {
        item.add_note(note).await?;
    }

    Ok(outcome)
}
