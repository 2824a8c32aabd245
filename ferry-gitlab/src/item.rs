//! GitLab issues and epics as source items

use async_trait::async_trait;
use ferry_core::{Discussion, MergeRequestRef, SourceItem, SourceKind, WorkItem};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

use crate::client::{GitLabClient, Scope, UrlOptions};
use crate::notes::linear_id_from_note;
use crate::transport::{HttpRestTransport, RestTransport};
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct NoteBody {
    #[serde(default)]
    body: String,
}

#[derive(Debug, Deserialize)]
struct MergeRequestJson {
    iid: u64,
    title: String,
    web_url: String,
    #[serde(default)]
    references: Option<References>,
}

#[derive(Debug, Deserialize)]
struct References {
    full: String,
}

impl MergeRequestJson {
    /// `acme/app` from `acme/app!3`, or from the web URL when references
    /// are absent
    fn project_path(&self) -> String {
        if let Some(path) = self
            .references
            .as_ref()
            .and_then(|r| r.full.split_once('!'))
            .map(|(path, _)| path)
        {
            return path.to_string();
        }

        Url::parse(&self.web_url)
            .ok()
            .and_then(|url| {
                url.path()
                    .split_once("/-/")
                    .map(|(path, _)| path.trim_start_matches('/').to_string())
            })
            .unwrap_or_default()
    }
}

/// A fetched issue or epic bound to the client it came from
pub struct GitLabItem<'a, T: RestTransport = HttpRestTransport> {
    client: &'a GitLabClient<T>,
    kind: SourceKind,
    resource: WorkItem,
}

impl<'a, T: RestTransport> GitLabItem<'a, T> {
    pub fn new(client: &'a GitLabClient<T>, kind: SourceKind, resource: WorkItem) -> Self {
        Self {
            client,
            kind,
            resource,
        }
    }

    /// Fetch issue `iid` of `project` (numeric id or full path)
    pub async fn fetch_issue(client: &'a GitLabClient<T>, project: &str, iid: u64) -> Result<Self> {
        let url = client.build_url(&UrlOptions::project(project).resource("issues", iid))?;
        Self::fetch(client, SourceKind::Issue, &url).await
    }

    /// Fetch epic `iid` of `group` (numeric id or full path)
    pub async fn fetch_epic(client: &'a GitLabClient<T>, group: &str, iid: u64) -> Result<Self> {
        let url = client.build_url(&UrlOptions::group(group).resource("epics", iid))?;
        Self::fetch(client, SourceKind::Epic, &url).await
    }

    async fn fetch(client: &'a GitLabClient<T>, kind: SourceKind, url: &Url) -> Result<Self> {
        let value = client.query_api_cached(url).await?;
        let resource: WorkItem = serde_json::from_value(value)
            .map_err(|e| Error::Parse(format!("Invalid {} from {}: {}", kind, url, e)))?;
        debug!(kind = %kind, id = resource.id, title = %resource.title, "Fetched source item");
        Ok(Self::new(client, kind, resource))
    }

    /// URL options addressing this item
    ///
    /// Epic sub-resources are addressed by the epic's global id.
    fn item_options(&self) -> Result<UrlOptions> {
        match self.kind {
            SourceKind::Issue => {
                let project = self
                    .resource
                    .project_id
                    .ok_or(Error::MissingField("project_id"))?;
                let iid = self.resource.iid.ok_or(Error::MissingField("iid"))?;
                Ok(UrlOptions::project(project).resource("issues", iid))
            }
            SourceKind::Epic => {
                let group = self
                    .resource
                    .group_id
                    .ok_or(Error::MissingField("group_id"))?;
                Ok(UrlOptions::group(group).resource("epics", self.resource.id))
            }
        }
    }

    async fn fetch_discussions(&self) -> Result<Vec<Discussion>> {
        let mut options = self.item_options()?.sub_resource("discussions");
        if self.kind == SourceKind::Epic {
            options = options.param("system", false);
        }
        let url = self.client.build_url(&options.paged())?;
        let value = self.client.query_api_cached(&url).await?;
        serde_json::from_value(value)
            .map_err(|e| Error::Parse(format!("Invalid discussions from {}: {}", url, e)))
    }

    /// Discussions without the standalone system notes
    pub async fn human_discussions(&self) -> Result<Vec<Discussion>> {
        let discussions = self.fetch_discussions().await?;
        Ok(discussions
            .into_iter()
            .filter(|d| !(d.individual_note && d.notes.first().is_some_and(|n| n.system)))
            .collect())
    }

    /// Linear id recorded by an earlier migration on the parent epic
    pub async fn find_linear_id_in_epic_notes(&self) -> Result<Option<String>> {
        let Some(epic) = self.resource.epic.as_ref() else {
            return Ok(None);
        };

        let url = self.client.build_url(
            &UrlOptions::group(epic.group_id)
                .resource("epics", epic.id)
                .sub_resource("notes")
                .paged(),
        )?;
        let notes: Vec<NoteBody> = serde_json::from_value(self.client.query_api_cached(&url).await?)
            .map_err(|e| Error::Parse(format!("Invalid notes from {}: {}", url, e)))?;

        let found = notes
            .iter()
            .find_map(|note| linear_id_from_note(&note.body))
            .map(str::to_string);
        if let Some(id) = &found {
            info!(epic = epic.id, linear_id = %id, "Parent epic found");
        }
        Ok(found)
    }

    /// Name of the project (issues) or group (epics) holding the item
    pub async fn container_name(&self) -> Result<String> {
        match self.kind {
            SourceKind::Issue => {
                let project = self
                    .resource
                    .project_id
                    .ok_or(Error::MissingField("project_id"))?;
                self.client
                    .fetch_name(Scope::Projects, &project.to_string())
                    .await
            }
            SourceKind::Epic => {
                let group = self
                    .resource
                    .group_id
                    .ok_or(Error::MissingField("group_id"))?;
                self.client
                    .fetch_name(Scope::Groups, &group.to_string())
                    .await
            }
        }
    }

    /// Post a note on the item; `None` when the client runs dry
    pub async fn add_note(&self, body: &str) -> Result<Option<Value>> {
        let url = self
            .client
            .build_url(&self.item_options()?.sub_resource("notes"))?;
        self.client.post(&url, &json!({ "body": body })).await
    }
}

#[async_trait]
impl<T: RestTransport> SourceItem for GitLabItem<'_, T> {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn resource(&self) -> &WorkItem {
        &self.resource
    }

    fn host_url(&self) -> &str {
        self.client.host_url()
    }

    async fn discussions(&self) -> ferry_core::Result<Vec<Discussion>> {
        Ok(self.fetch_discussions().await?)
    }

    async fn related_merge_requests(&self) -> ferry_core::Result<Vec<MergeRequestRef>> {
        if !self.kind.supports_cross_references() {
            return Ok(Vec::new());
        }

        let url = self.client.build_url(
            &self
                .item_options()?
                .sub_resource("related_merge_requests")
                .paged(),
        )?;
        let value = self.client.query_api_cached(&url).await?;
        let merge_requests: Vec<MergeRequestJson> = serde_json::from_value(value)?;

        Ok(merge_requests
            .into_iter()
            .map(|mr| MergeRequestRef {
                project_path: mr.project_path(),
                iid: mr.iid,
                title: mr.title,
                web_url: mr.web_url,
            })
            .collect())
    }
}

impl<T: RestTransport> std::fmt::Debug for GitLabItem<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabItem")
            .field("kind", &self.kind)
            .field("id", &self.resource.id)
            .field("web_url", &self.resource.web_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{client, epic_json, issue_json, MockRest};

    const LINEAR_ID: &str = "b6b31d09-6561-4a77-a265-79e854086557";

    #[tokio::test]
    async fn test_fetch_issue_parses_fields() {
        let mock = MockRest::new().with_get("/api/v4/projects/acme%2Fapp/issues/7", issue_json());
        let client = client(mock, false);

        let item = GitLabItem::fetch_issue(&client, "acme/app", 7).await.unwrap();

        assert_eq!(item.kind(), SourceKind::Issue);
        let resource = item.resource();
        assert_eq!(resource.id, 101);
        assert_eq!(resource.project_id, Some(42));
        assert_eq!(resource.labels, vec!["Team::Backend", "bug"]);
        assert_eq!(resource.author.name, "Ada Lovelace");
        assert_eq!(resource.weight, Some(3));
        assert_eq!(
            item.epic_url().as_deref(),
            Some("https://gitlab.example.com/groups/acme/-/epics/2")
        );
    }

    #[tokio::test]
    async fn test_issue_discussions_drop_system_notes() {
        let mock = MockRest::new()
            .with_get("/api/v4/projects/acme/issues/7", issue_json())
            .with_get(
                "/api/v4/projects/42/issues/7/discussions?per_page=100",
                json!([
                    {
                        "id": "a",
                        "individual_note": true,
                        "notes": [{ "id": 1, "body": "added label", "author": { "name": "Bot" }, "system": true }]
                    },
                    {
                        "id": "b",
                        "individual_note": false,
                        "notes": [
                            { "id": 2, "body": "question", "author": { "name": "Ada" }, "system": false },
                            { "id": 3, "body": "answer", "author": { "name": "Bob" }, "system": false }
                        ]
                    }
                ]),
            );
        let client = client(mock, false);
        let item = GitLabItem::fetch_issue(&client, "acme", 7).await.unwrap();

        assert_eq!(item.discussions().await.unwrap().len(), 2);
        let human = item.human_discussions().await.unwrap();
        assert_eq!(human.len(), 1);
        assert_eq!(human[0].notes[1].body, "answer");
        // cached, so only the item and one discussions request were made
        assert_eq!(client.transport().gets().len(), 2);
    }

    #[tokio::test]
    async fn test_epic_discussions_use_global_id() {
        let mock = MockRest::new()
            .with_get("/api/v4/groups/acme/epics/2", epic_json())
            .with_get(
                "/api/v4/groups/9/epics/5/discussions?system=false&per_page=100",
                json!([]),
            );
        let client = client(mock, false);
        let item = GitLabItem::fetch_epic(&client, "acme", 2).await.unwrap();

        assert_eq!(item.kind(), SourceKind::Epic);
        assert!(item.discussions().await.unwrap().is_empty());
        assert!(item.related_merge_requests().await.unwrap().is_empty());
        assert_eq!(client.transport().gets().len(), 2);
    }

    #[tokio::test]
    async fn test_related_merge_requests() {
        let mock = MockRest::new()
            .with_get("/api/v4/projects/acme/issues/7", issue_json())
            .with_get(
                "/api/v4/projects/42/issues/7/related_merge_requests?per_page=100",
                json!([
                    {
                        "iid": 3,
                        "title": "Fix login",
                        "web_url": "https://gitlab.example.com/acme/app/-/merge_requests/3",
                        "references": { "full": "acme/app!3" }
                    },
                    {
                        "iid": 4,
                        "title": "Other",
                        "web_url": "https://gitlab.example.com/acme/lib/-/merge_requests/4"
                    }
                ]),
            );
        let client = client(mock, false);
        let item = GitLabItem::fetch_issue(&client, "acme", 7).await.unwrap();

        let mrs = item.related_merge_requests().await.unwrap();

        assert_eq!(mrs.len(), 2);
        assert_eq!(mrs[0].project_path, "acme/app");
        assert_eq!(mrs[0].iid, 3);
        assert_eq!(mrs[1].project_path, "acme/lib");
    }

    #[tokio::test]
    async fn test_find_linear_id_in_epic_notes() {
        let mock = MockRest::new()
            .with_get("/api/v4/projects/acme/issues/7", issue_json())
            .with_get(
                "/api/v4/groups/9/epics/5/notes?per_page=100",
                json!([
                    { "body": "Looks good" },
                    { "body": format!("Issue created in Linear: https://linear.app/x\nLinear issue ID: {}\n/close", LINEAR_ID) }
                ]),
            );
        let client = client(mock, false);
        let item = GitLabItem::fetch_issue(&client, "acme", 7).await.unwrap();

        assert_eq!(
            item.find_linear_id_in_epic_notes().await.unwrap().as_deref(),
            Some(LINEAR_ID)
        );
    }

    #[tokio::test]
    async fn test_no_epic_means_no_lookup() {
        let mut issue = issue_json();
        issue["epic"] = Value::Null;
        let mock = MockRest::new().with_get("/api/v4/projects/acme/issues/7", issue);
        let client = client(mock, false);
        let item = GitLabItem::fetch_issue(&client, "acme", 7).await.unwrap();

        assert!(item.find_linear_id_in_epic_notes().await.unwrap().is_none());
        assert_eq!(client.transport().gets().len(), 1);
    }

    #[tokio::test]
    async fn test_add_note_and_container_name() {
        let mock = MockRest::new()
            .with_get("/api/v4/projects/acme/issues/7", issue_json())
            .with_get("/api/v4/projects/42", json!({ "name": "App" }));
        let client = client(mock, false);
        let item = GitLabItem::fetch_issue(&client, "acme", 7).await.unwrap();

        assert_eq!(item.container_name().await.unwrap(), "App");
        item.add_note("hello").await.unwrap();

        let posts = client.transport().posts();
        assert_eq!(posts[0].0, "/api/v4/projects/42/issues/7/notes");
        assert_eq!(posts[0].1["body"], "hello");
    }
}
