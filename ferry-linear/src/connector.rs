//! Migration of source work items into Linear
//!
//! [`LinearConnector::import_issue`] runs the whole sequence for one item:
//! resolve team, labels, assignee, state and parent; create the issue; copy
//! merge request links and discussions; then leave the migration evidence
//! (summary comment, back link, evidence record, final labels).

use ferry_core::text::strip_html_comments;
use ferry_core::{
    Config, Discussion, DestinationKind, EvidenceRecord, MigrationEvidence, Note, Secrets,
    SourceItem, SourceKind,
};
use tracing::{debug, info};

use crate::client::GraphqlClient;
use crate::interface::{
    AttachmentLinkMergeRequestInput, AttachmentLinkUrlInput, CommentCreateInput, CreatedComment,
    CreatedIssue, IssueCreateInput, LinearInterface, Team, ORIGINAL_ISSUE_PREFIX,
};
use crate::state::linear_state_name;
use crate::transport::{HttpTransport, Transport};
use crate::Result;

pub const MIGRATION_LABEL_NAME: &str = "Migrated from GitLab";
pub const MIGRATION_IN_PROGRESS_LABEL_NAME: &str = "Migrating from GitLab - in progress";
pub const MIGRATION_LABEL_NAME_DRY_RUN: &str = "Migrated from GitLab (DRY-RUN)";
pub const MIGRATION_IN_PROGRESS_LABEL_NAME_DRY_RUN: &str =
    "Migrating from GitLab - in progress (DRY-RUN)";

/// Author name of comments written by the migration itself
const MIGRATION_AUTHOR: &str = "Migration";

const LABEL_SEPARATOR: &str = "::";
const STATE_LABEL_PREFIX: &str = "S::";

/// Switches that shape a migration run
#[derive(Debug, Clone)]
pub struct ConnectorOptions {
    /// Nothing is written back to the source tracker
    pub gitlab_dry_run: bool,
    /// No mutation is sent to Linear
    pub linear_dry_run: bool,
    /// Prefix of the label naming the team, `Team` for `Team::Backend`
    pub team_label_prefix: String,
}

impl Default for ConnectorOptions {
    fn default() -> Self {
        Self {
            gitlab_dry_run: false,
            linear_dry_run: false,
            team_label_prefix: "Team".to_string(),
        }
    }
}

impl ConnectorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            gitlab_dry_run: config.migration.dry_run,
            linear_dry_run: config.migration.linear_dry_run(),
            team_label_prefix: config.migration.team_label_prefix.clone(),
        }
    }

    /// Source side is dry but Linear is live, so marker labels get the
    /// `(DRY-RUN)` variants
    fn uses_dry_run_markers(&self) -> bool {
        self.gitlab_dry_run && !self.linear_dry_run
    }

    fn in_progress_label(&self) -> &'static str {
        if self.uses_dry_run_markers() {
            MIGRATION_IN_PROGRESS_LABEL_NAME_DRY_RUN
        } else {
            MIGRATION_IN_PROGRESS_LABEL_NAME
        }
    }

    fn migrated_label(&self) -> &'static str {
        if self.uses_dry_run_markers() {
            MIGRATION_LABEL_NAME_DRY_RUN
        } else {
            MIGRATION_LABEL_NAME
        }
    }
}

/// Migrates source work items into Linear, one at a time
pub struct LinearConnector<T: Transport = HttpTransport> {
    interface: LinearInterface<T>,
    options: ConnectorOptions,
    evidence: MigrationEvidence,
}

impl LinearConnector<HttpTransport> {
    /// Build the production stack from configuration and secrets
    pub fn from_config(config: &Config, secrets: &Secrets) -> Result<Self> {
        let client = GraphqlClient::from_config(config, secrets)?;
        Ok(Self::new(
            LinearInterface::new(client),
            ConnectorOptions::from_config(config),
        ))
    }
}

impl<T: Transport> LinearConnector<T> {
    /// Create a connector; the client's dry-run switch follows
    /// `options.linear_dry_run`
    pub fn new(mut interface: LinearInterface<T>, options: ConnectorOptions) -> Self {
        interface.client_mut().set_dry_run(options.linear_dry_run);
        Self {
            interface,
            options,
            evidence: MigrationEvidence::new(),
        }
    }

    pub fn options(&self) -> &ConnectorOptions {
        &self.options
    }

    pub fn interface(&self) -> &LinearInterface<T> {
        &self.interface
    }

    /// Items migrated so far in this run
    pub fn evidence(&self) -> &MigrationEvidence {
        &self.evidence
    }

    pub fn set_linear_dry_run(&mut self, dry_run: bool) {
        self.options.linear_dry_run = dry_run;
        self.interface.client_mut().set_dry_run(dry_run);
    }

    pub fn set_gitlab_dry_run(&mut self, dry_run: bool) {
        self.options.gitlab_dry_run = dry_run;
    }

    pub fn set_team_label_prefix(&mut self, prefix: impl Into<String>) {
        self.options.team_label_prefix = prefix.into();
    }

    /// Migrate one item
    ///
    /// Returns `None` when issue creation was suppressed by dry-run; nothing
    /// after the creation step runs in that case.
    pub async fn import_issue<I: SourceItem + ?Sized>(
        &mut self,
        item: &I,
        set_state: bool,
        project_name: Option<&str>,
    ) -> Result<Option<CreatedIssue>> {
        info!(url = %item.resource().web_url, kind = %item.kind(), "Importing item");

        let team = self.fetch_team(item).await?;
        let label_ids = self.label_ids(item.labels(), &team.id).await?;
        let input = self
            .prepare_issue_input(item, label_ids, &team, project_name, set_state)
            .await?;

        let Some(created) = self.interface.create_issue(&input).await? else {
            info!(title = %input.title, "Issue creation skipped");
            return Ok(None);
        };
        info!(id = %created.id, url = %created.url, "Created Linear issue");

        if item.kind().supports_cross_references() {
            self.import_merge_request_links(item, &created.id).await?;
        }

        let discussions = item.discussions().await?;
        self.import_comments(&discussions, &created.id).await?;

        self.handle_post_creation_tasks(item, &created, input.parent_id.as_deref(), input.label_ids)
            .await?;

        Ok(Some(created))
    }

    /// Replay discussion threads as Linear comments
    ///
    /// Only threads with at least one note and no system notes are copied.
    /// Every reply is attached to the thread's first comment, so deeper
    /// reply chains come out one level deep.
    pub async fn import_comments(&self, discussions: &[Discussion], issue_id: &str) -> Result<()> {
        for discussion in discussions.iter().filter(|d| d.is_human()) {
            let Some((root, replies)) = discussion.notes.split_first() else {
                continue;
            };

            let parent = self.create_comment_from_note(root, issue_id, None).await?;
            let parent_id = parent.map(|c| c.id);

            for reply in replies {
                self.create_comment_from_note(reply, issue_id, parent_id.as_deref())
                    .await?;
            }
        }

        Ok(())
    }

    async fn create_comment_from_note(
        &self,
        note: &Note,
        issue_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<CreatedComment>> {
        self.interface
            .create_comment(&CommentCreateInput {
                body: note.body.clone(),
                issue_id: issue_id.to_string(),
                parent_id: parent_id.map(str::to_string),
                create_as_user: Some(note.author.name.clone()),
                created_at: note.created_at,
            })
            .await
    }

    async fn fetch_team<I: SourceItem + ?Sized>(&self, item: &I) -> Result<Team> {
        let team_label = team_label(item.labels(), &self.options.team_label_prefix);
        let team_name = format!(
            "{}: {}",
            self.options.team_label_prefix,
            team_label.unwrap_or_default()
        );
        debug!(team = %team_name, "Resolving team");
        self.interface.get_team_by_name(&team_name).await
    }

    async fn label_ids(&self, labels: &[String], team_id: &str) -> Result<Vec<String>> {
        let mut names = flatten_labels(labels);
        names.push(self.options.in_progress_label().to_string());
        self.interface.list_labels(&names, team_id).await
    }

    async fn prepare_issue_input<I: SourceItem + ?Sized>(
        &self,
        item: &I,
        label_ids: Vec<String>,
        team: &Team,
        project_name: Option<&str>,
        set_state: bool,
    ) -> Result<IssueCreateInput> {
        let resource = item.resource();

        Ok(IssueCreateInput {
            title: format_title(&resource.title, project_name),
            team_id: team.id.clone(),
            description: resource.description.as_deref().map(strip_html_comments),
            create_as_user: resource.author.name.clone(),
            assignee_id: self.determine_assignee_id(item).await?,
            state_id: determine_state_id(item, team, set_state),
            parent_id: self.determine_epic_id(item).await?,
            created_at: resource.created_at,
            label_ids,
            due_date: resource.due_date,
            sort_order: resource.weight.map(|w| w as f64),
        })
    }

    async fn determine_assignee_id<I: SourceItem + ?Sized>(&self, item: &I) -> Result<Option<String>> {
        let Some(assignee) = item.resource().assignees.first() else {
            return Ok(None);
        };
        self.interface
            .get_user_id_by_email(assignee.email.as_deref())
            .await
    }

    /// Linear id of the parent epic: this run's evidence first, then a
    /// search for an issue migrated from the epic's URL
    async fn determine_epic_id<I: SourceItem + ?Sized>(&self, item: &I) -> Result<Option<String>> {
        let Some(epic) = item.resource().epic.as_ref() else {
            return Ok(None);
        };

        if let Some(id) =
            self.evidence
                .find_destination_id(SourceKind::Epic, epic.id, DestinationKind::Issue)
        {
            debug!(epic = epic.id, linear_id = %id, "Parent epic migrated in this run");
            return Ok(Some(id.to_string()));
        }

        match item.epic_url() {
            Some(url) => self.interface.find_issue_by_source_url(&url).await,
            None => Ok(None),
        }
    }

    async fn import_merge_request_links<I: SourceItem + ?Sized>(
        &self,
        item: &I,
        issue_id: &str,
    ) -> Result<()> {
        for mr in item.related_merge_requests().await? {
            self.interface
                .create_merge_request_link(&AttachmentLinkMergeRequestInput {
                    issue_id: issue_id.to_string(),
                    url: mr.web_url,
                    project_path_with_namespace: mr.project_path,
                    number: mr.iid,
                    title: mr.title,
                })
                .await?;
        }
        Ok(())
    }

    async fn handle_post_creation_tasks<I: SourceItem + ?Sized>(
        &mut self,
        item: &I,
        created: &CreatedIssue,
        parent_id: Option<&str>,
        label_ids: Vec<String>,
    ) -> Result<()> {
        let resource = item.resource();

        self.handle_missing_parent_issue(item, &created.id, parent_id)
            .await?;

        self.create_migration_comment(
            &created.id,
            compile_migration_notes(&resource.web_url, item.labels()),
        )
        .await?;

        self.interface
            .create_url_link(&AttachmentLinkUrlInput {
                issue_id: created.id.clone(),
                url: resource.web_url.clone(),
                title: Some(format!("Original issue in GitLab: {}", resource.title)),
            })
            .await?;

        self.evidence.record(EvidenceRecord {
            source_kind: item.kind(),
            source_id: resource.id,
            destination_kind: DestinationKind::Issue,
            destination_id: created.id.clone(),
            source_url: resource.web_url.clone(),
            destination_url: created.url.clone(),
        });

        self.update_linear_labels(&created.id, label_ids).await
    }

    async fn handle_missing_parent_issue<I: SourceItem + ?Sized>(
        &self,
        item: &I,
        issue_id: &str,
        parent_id: Option<&str>,
    ) -> Result<()> {
        let (Some(epic), None) = (item.resource().epic.as_ref(), parent_id) else {
            return Ok(());
        };
        let epic_url = format!("{}{}", item.host_url(), epic.url);

        info!(epic = %epic_url, "Parent epic not migrated");

        self.create_migration_comment(
            issue_id,
            format!(
                "The original issue in GitLab has an epic that was not migrated to Linear. Epic in GitLab: {}",
                epic_url
            ),
        )
        .await?;

        self.interface
            .create_url_link(&AttachmentLinkUrlInput {
                issue_id: issue_id.to_string(),
                url: epic_url,
                title: Some(format!("Epic in GitLab: {}", epic.title)),
            })
            .await?;

        Ok(())
    }

    async fn create_migration_comment(&self, issue_id: &str, body: String) -> Result<()> {
        self.interface
            .create_comment(&CommentCreateInput {
                body,
                issue_id: issue_id.to_string(),
                parent_id: None,
                create_as_user: Some(MIGRATION_AUTHOR.to_string()),
                created_at: None,
            })
            .await?;
        Ok(())
    }

    /// Swap the in-progress marker for the migrated marker
    async fn update_linear_labels(&self, issue_id: &str, mut label_ids: Vec<String>) -> Result<()> {
        if let Some(in_progress) = self
            .interface
            .find_label(self.options.in_progress_label())
            .await?
        {
            label_ids.retain(|id| *id != in_progress);
        }

        if let Some(migrated) = self
            .interface
            .find_label(self.options.migrated_label())
            .await?
        {
            label_ids.push(migrated);
        }

        self.interface.update_labels(issue_id, &label_ids).await?;
        Ok(())
    }
}

fn determine_state_id<I: SourceItem + ?Sized>(item: &I, team: &Team, set_state: bool) -> Option<String> {
    if item.state().is_closed() {
        find_state_id_by_name(team, "Closed")
    } else if set_state {
        state_label(item.labels()).and_then(|label| find_state_id_by_name(team, label))
    } else {
        None
    }
}

/// Id of the team state that `source_state` maps to
fn find_state_id_by_name(team: &Team, source_state: &str) -> Option<String> {
    let name = linear_state_name(source_state)?;
    team.state_id(name).map(str::to_string)
}

/// Value of the first `<prefix>::` label
fn team_label<'a>(labels: &'a [String], prefix: &str) -> Option<&'a str> {
    let prefix = format!("{}{}", prefix, LABEL_SEPARATOR);
    labels
        .iter()
        .find(|label| label.starts_with(&prefix))
        .and_then(|label| label.rsplit(LABEL_SEPARATOR).next())
}

/// Value of the first `S::` label
fn state_label(labels: &[String]) -> Option<&str> {
    labels
        .iter()
        .find(|label| label.starts_with(STATE_LABEL_PREFIX))
        .and_then(|label| label.rsplit(LABEL_SEPARATOR).next())
}

/// `E::Level Easy` becomes `Level Easy`; labels without a namespace stay
fn flatten_labels(labels: &[String]) -> Vec<String> {
    labels
        .iter()
        .map(|label| {
            label
                .rsplit(LABEL_SEPARATOR)
                .next()
                .unwrap_or(label)
                .to_string()
        })
        .collect()
}

fn format_title(title: &str, project_name: Option<&str>) -> String {
    match project_name.filter(|p| !p.is_empty()) {
        Some(project) => format!("{}: {}", project, title),
        None => title.to_string(),
    }
}

fn compile_migration_notes(source_url: &str, labels: &[String]) -> String {
    let labels = labels
        .iter()
        .map(|label| format!("'{}'", label))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "This issue was copied from GitLab by Triage Bot. {}{}\n\nOriginal labels: {}\n",
        ORIGINAL_ISSUE_PREFIX, source_url, labels
    )
}
