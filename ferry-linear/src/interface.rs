//! Typed Linear API
//!
//! One method per operation the migration needs. Each builds its query or
//! mutation text, sends it through [`GraphqlClient`], and unwraps the typed
//! result.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use ferry_core::text::escape_ellipsis;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::client::GraphqlClient;
use crate::mutation::build_mutation;
use crate::transport::{HttpTransport, Transport};
use crate::{Error, Result};

const FIND_LABEL_QUERY: &str = r#"
query($label: String!) {
  issueLabels(
    filter: { name: { eq: $label } }
  ) {
    nodes {
      id
      name
    }
  }
}
"#;

const LIST_LABELS_QUERY: &str = r#"
query($labels: [String!], $teamId: ID) {
  issueLabels(
    filter: {
      name: { in: $labels }
      or: [
        { team: { id: { eq: $teamId } } }
        { team: { null: true } }
      ]
    }
  ) {
    nodes {
      id
      name
    }
  }
}
"#;

const UPDATE_LABELS_MUTATION: &str = r#"
mutation($issueId: String!, $labels: [String!]!) {
  issueUpdate(input: { labelIds: $labels }, id: $issueId) {
    lastSyncId
    success
  }
}
"#;

const GET_USER_ID_BY_EMAIL_QUERY: &str = r#"
query($email: String!) {
  users(filter: { email: { eq: $email } }) {
    nodes {
      id
    }
  }
}
"#;

const GET_TEAM_BY_NAME_QUERY: &str = r#"
query($name: String!) {
  teams(filter: { name: { eq: $name } }) {
    nodes {
      id
      name
      states {
        nodes {
          id
          name
        }
      }
    }
  }
}
"#;

const FIND_ISSUE_BY_COMMENT_QUERY: &str = r#"
query($body: String!) {
  issues(
    filter: { comments: { body: { contains: $body } } }
  ) {
    nodes {
      id
    }
  }
}
"#;

/// Prefix of the migration summary line that names the source URL
pub const ORIGINAL_ISSUE_PREFIX: &str = "Original issue: ";

/// Workflow state of a team
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkflowState {
    pub id: String,
    pub name: String,
}

/// Team with its workflow states in Linear's order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub states: Vec<WorkflowState>,
}

impl Team {
    /// Id of the state named `name`
    pub fn state_id(&self, name: &str) -> Option<&str> {
        self.states
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.id.as_str())
    }
}

/// Issue returned by `issueCreate`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub url: String,
}

/// Comment returned by `commentCreate`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedComment {
    pub id: String,
}

/// Acknowledgment of a mutation without a returned object
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationAck {
    pub success: bool,
    #[serde(default)]
    pub last_sync_id: Option<f64>,
}

/// Input of `issueCreate`
///
/// `None` fields are sent as explicit `null` so Linear leaves them unset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCreateInput {
    pub title: String,
    pub team_id: String,
    pub description: Option<String>,
    pub create_as_user: String,
    pub assignee_id: Option<String>,
    pub state_id: Option<String>,
    pub parent_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub label_ids: Vec<String>,
    pub due_date: Option<NaiveDate>,
    pub sort_order: Option<f64>,
}

/// Input of `commentCreate`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCreateInput {
    pub body: String,
    pub issue_id: String,
    pub parent_id: Option<String>,
    pub create_as_user: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Arguments of `attachmentLinkURL`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentLinkUrlInput {
    pub issue_id: String,
    pub url: String,
    pub title: Option<String>,
}

/// Arguments of `attachmentLinkGitLabMR`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentLinkMergeRequestInput {
    pub issue_id: String,
    pub url: String,
    pub project_path_with_namespace: String,
    pub number: u64,
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<D> {
    data: Option<D>,
}

#[derive(Debug, Deserialize)]
struct Nodes<N> {
    nodes: Vec<N>,
}

#[derive(Debug, Deserialize)]
struct IdNode {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueLabelsData {
    issue_labels: Nodes<IdNode>,
}

#[derive(Debug, Deserialize)]
struct UsersData {
    users: Nodes<IdNode>,
}

#[derive(Debug, Deserialize)]
struct TeamNode {
    id: String,
    name: String,
    states: Nodes<WorkflowState>,
}

#[derive(Debug, Deserialize)]
struct TeamsData {
    teams: Nodes<TeamNode>,
}

#[derive(Debug, Deserialize)]
struct IssuesData {
    issues: Nodes<IdNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueCreateData {
    issue_create: IssueCreatePayload,
}

#[derive(Debug, Deserialize)]
struct IssueCreatePayload {
    issue: Option<CreatedIssue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentCreateData {
    comment_create: CommentCreatePayload,
}

#[derive(Debug, Deserialize)]
struct CommentCreatePayload {
    comment: Option<CreatedComment>,
}

/// Typed façade over the GraphQL client
pub struct LinearInterface<T: Transport = HttpTransport> {
    client: GraphqlClient<T>,
}

impl<T: Transport> LinearInterface<T> {
    pub fn new(client: GraphqlClient<T>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GraphqlClient<T> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut GraphqlClient<T> {
        &mut self.client
    }

    /// Id of the label named exactly `label`, if any
    pub async fn find_label(&self, label: &str) -> Result<Option<String>> {
        let response = self
            .client
            .query(FIND_LABEL_QUERY, &json!({ "label": label }))
            .await?;
        let data: IssueLabelsData = decode(response, "issueLabels")?;
        Ok(data.issue_labels.nodes.into_iter().next().map(|n| n.id))
    }

    /// Ids of labels named in `labels` that belong to `team_id` or to no team
    pub async fn list_labels(&self, labels: &[String], team_id: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .query(
                LIST_LABELS_QUERY,
                &json!({ "labels": labels, "teamId": team_id }),
            )
            .await?;
        let data: IssueLabelsData = decode(response, "issueLabels")?;
        Ok(data.issue_labels.nodes.into_iter().map(|n| n.id).collect())
    }

    /// Replace the labels of an issue
    pub async fn update_labels(
        &self,
        issue_id: &str,
        label_ids: &[String],
    ) -> Result<Option<MutationAck>> {
        let response = self
            .client
            .mutation(
                UPDATE_LABELS_MUTATION,
                &json!({ "issueId": issue_id, "labels": label_ids }),
            )
            .await?;
        response.map(|r| ack(r, "issueUpdate")).transpose()
    }

    /// Id of the user with `email`; no request is made for a missing email
    pub async fn get_user_id_by_email(&self, email: Option<&str>) -> Result<Option<String>> {
        let Some(email) = email.filter(|e| !e.is_empty()) else {
            return Ok(None);
        };

        let response = self
            .client
            .query(GET_USER_ID_BY_EMAIL_QUERY, &json!({ "email": email }))
            .await?;
        let data: UsersData = decode(response, "users")?;
        Ok(data.users.nodes.into_iter().next().map(|n| n.id))
    }

    /// Team named exactly `name`
    pub async fn get_team_by_name(&self, name: &str) -> Result<Team> {
        let response = self
            .client
            .query(GET_TEAM_BY_NAME_QUERY, &json!({ "name": name }))
            .await?;
        let data: TeamsData = decode(response, "teams")?;

        let team = data
            .teams
            .nodes
            .into_iter()
            .next()
            .ok_or_else(|| Error::TeamNotFound(name.to_string()))?;

        debug!(team = %team.name, states = team.states.nodes.len(), "Resolved team");

        Ok(Team {
            id: team.id,
            name: team.name,
            states: team.states.nodes,
        })
    }

    /// Id of an issue migrated from `source_url`, found through its
    /// migration summary comment
    ///
    /// The summary comment ends the URL with a newline, so searching for it
    /// keeps `.../epics/2` from matching the comment of `.../epics/23`.
    pub async fn find_issue_by_source_url(&self, source_url: &str) -> Result<Option<String>> {
        let body = format!("{}{}\n", ORIGINAL_ISSUE_PREFIX, source_url);
        let response = self
            .client
            .query(FIND_ISSUE_BY_COMMENT_QUERY, &json!({ "body": body }))
            .await?;
        let data: IssuesData = decode(response, "issues")?;
        Ok(data.issues.nodes.into_iter().next().map(|n| n.id))
    }

    /// Create an issue; `None` when the mutation was suppressed by dry-run
    pub async fn create_issue(&self, input: &IssueCreateInput) -> Result<Option<CreatedIssue>> {
        let mut input = input.clone();
        input.description = input.description.as_deref().map(escape_ellipsis);

        let mutation = build_mutation(
            "issueCreate",
            &json!({ "input": to_value(&input)? }),
            &["lastSyncId", "success", "issue { id, url }"],
        );

        let Some(response) = self.client.mutation(&mutation, &json!({})).await? else {
            return Ok(None);
        };

        let data: IssueCreateData = decode(response, "issueCreate")?;
        data.issue_create
            .issue
            .map(Some)
            .ok_or_else(|| Error::MissingData("issueCreate.issue".to_string()))
    }

    /// Create a comment; `None` when suppressed by dry-run
    pub async fn create_comment(
        &self,
        input: &CommentCreateInput,
    ) -> Result<Option<CreatedComment>> {
        let mut input = input.clone();
        input.body = escape_ellipsis(&input.body);

        let mutation = build_mutation(
            "commentCreate",
            &json!({ "input": to_value(&input)? }),
            &["lastSyncId", "success", "comment { id }"],
        );

        let Some(response) = self.client.mutation(&mutation, &json!({})).await? else {
            return Ok(None);
        };

        let data: CommentCreateData = decode(response, "commentCreate")?;
        data.comment_create
            .comment
            .map(Some)
            .ok_or_else(|| Error::MissingData("commentCreate.comment".to_string()))
    }

    /// Attach a plain URL link to an issue
    pub async fn create_url_link(
        &self,
        input: &AttachmentLinkUrlInput,
    ) -> Result<Option<MutationAck>> {
        let mutation = build_mutation(
            "attachmentLinkURL",
            &to_value(input)?,
            &["lastSyncId", "success"],
        );
        let response = self.client.mutation(&mutation, &json!({})).await?;
        response.map(|r| ack(r, "attachmentLinkURL")).transpose()
    }

    /// Attach a GitLab merge request link to an issue
    pub async fn create_merge_request_link(
        &self,
        input: &AttachmentLinkMergeRequestInput,
    ) -> Result<Option<MutationAck>> {
        let mutation = build_mutation(
            "attachmentLinkGitLabMR",
            &to_value(input)?,
            &["lastSyncId", "success"],
        );
        let response = self.client.mutation(&mutation, &json!({})).await?;
        response.map(|r| ack(r, "attachmentLinkGitLabMR")).transpose()
    }
}

fn to_value<S: Serialize>(input: &S) -> Result<Value> {
    serde_json::to_value(input).map_err(|e| Error::Parse(format!("Failed to encode input: {}", e)))
}

fn decode<D: DeserializeOwned>(response: Value, operation: &str) -> Result<D> {
    let envelope: Envelope<D> = serde_json::from_value(response)
        .map_err(|e| Error::Parse(format!("Unexpected {} response: {}", operation, e)))?;
    envelope
        .data
        .ok_or_else(|| Error::MissingData(format!("{}: no data", operation)))
}

fn ack(response: Value, field: &str) -> Result<MutationAck> {
    let mut data: HashMap<String, MutationAck> = decode(response, field)?;
    data.remove(field)
        .ok_or_else(|| Error::MissingData(format!("{}: no payload", field)))
}
