//! Test doubles shared by the unit tests of this crate

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ferry_core::{
    Author, Discussion, ItemState, MergeRequestRef, Note, SourceItem, SourceKind, WorkItem,
};
use serde_json::{json, Value};

use crate::transport::{HttpResponse, Transport};
use crate::Result;

type Router = Box<dyn Fn(&Value) -> HttpResponse + Send + Sync>;

/// Transport that records request bodies and answers from a script or a
/// router function
pub struct MockTransport {
    script: Mutex<VecDeque<HttpResponse>>,
    router: Option<Router>,
    requests: Mutex<Vec<Value>>,
}

impl MockTransport {
    /// Answer requests with `responses`, in order
    pub fn scripted(responses: Vec<HttpResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            router: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer requests from an in-memory Linear workspace
    pub fn routed(fake: FakeLinear) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            router: Some(Box::new(move |body| fake.route(body))),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Query texts of all requests containing `needle`
    pub fn queries_containing(&self, needle: &str) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| r["query"].as_str())
            .filter(|q| q.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_json(&self, body: &Value) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(body.clone());

        if let Some(router) = &self.router {
            return Ok(router(body));
        }

        Ok(self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("mock transport ran out of scripted responses"))
    }
}

/// A 400 response carrying Linear's rate-limit error
pub fn rate_limited() -> HttpResponse {
    HttpResponse::new(
        400,
        json!({
            "errors": [{
                "message": "Rate limit exceeded",
                "extensions": { "code": "RATELIMITED" }
            }]
        })
        .to_string(),
    )
}

const ACK_FIELDS: [&str; 3] = ["attachmentLinkURL", "attachmentLinkGitLabMR", "issueUpdate"];

pub const CREATED_ISSUE_ID: &str = "b6b31d09-6561-4a77-a265-79e854086557";
pub const CREATED_ISSUE_URL: &str = "https://linear.app/test/issue/RDT1-35/hello-world-again";
pub const IN_PROGRESS_STATE_ID: &str = "edc1677f-bf96-4d96-b72c-bb4faf41796a";
pub const DONE_STATE_ID: &str = "185103b7-2a74-447f-9828-2da250fdd2e0";

/// Minimal in-memory Linear workspace with one team
pub struct FakeLinear {
    team_name: String,
    labels: Vec<(String, String)>,
    users: HashMap<String, String>,
    comments: AtomicUsize,
    /// `(body, issue id)` of every comment in the workspace
    posted: Mutex<Vec<(String, String)>>,
}

impl FakeLinear {
    pub fn new() -> Self {
        Self {
            team_name: "Team: Team 1".to_string(),
            labels: Vec::new(),
            users: HashMap::new(),
            comments: AtomicUsize::new(0),
            posted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_team_name(mut self, name: &str) -> Self {
        self.team_name = name.to_string();
        self
    }

    pub fn with_label(mut self, name: &str, id: &str) -> Self {
        self.labels.push((name.to_string(), id.to_string()));
        self
    }

    pub fn with_user(mut self, email: &str, id: &str) -> Self {
        self.users.insert(email.to_string(), id.to_string());
        self
    }

    /// Seed an issue carrying the summary comment of a migrated item
    pub fn with_migrated(self, source_url: &str, id: &str) -> Self {
        let body = format!(
            "This issue was copied from GitLab by Triage Bot. Original issue: {}\n\nOriginal labels: \n",
            source_url
        );
        self.posted.lock().unwrap().push((body, id.to_string()));
        self
    }

    fn route(&self, body: &Value) -> HttpResponse {
        let query = body["query"].as_str().unwrap_or_default();
        let vars = &body["variables"];

        let data = if query.contains("issueCreate(") {
            json!({ "issueCreate": {
                "lastSyncId": 2068493908,
                "success": true,
                "issue": { "id": CREATED_ISSUE_ID, "url": CREATED_ISSUE_URL }
            }})
        } else if query.contains("commentCreate(") {
            let n = self.comments.fetch_add(1, Ordering::SeqCst) + 1;
            if let (Some(body), Some(issue_id)) = (
                string_argument(query, "body"),
                string_argument(query, "issueId"),
            ) {
                self.posted.lock().unwrap().push((body, issue_id));
            }
            json!({ "commentCreate": {
                "lastSyncId": 2068493908,
                "success": true,
                "comment": { "id": format!("comment-{}", n) }
            }})
        } else if let Some(field) = ACK_FIELDS
            .iter()
            .find(|f| query.contains(&format!("{}(", f)))
        {
            let mut data = serde_json::Map::new();
            data.insert(
                field.to_string(),
                json!({ "lastSyncId": 2068493908, "success": true }),
            );
            Value::Object(data)
        } else if query.contains("teams(") {
            json!({ "teams": { "nodes": self.teams(vars["name"].as_str()) } })
        } else if query.contains("issueLabels(") {
            json!({ "issueLabels": { "nodes": self.matching_labels(vars) } })
        } else if query.contains("users(") {
            let nodes: Vec<Value> = vars["email"]
                .as_str()
                .and_then(|email| self.users.get(email))
                .map(|id| vec![json!({ "id": id })])
                .unwrap_or_default();
            json!({ "users": { "nodes": nodes } })
        } else if query.contains("issues(") {
            let needle = vars["body"].as_str().unwrap_or_default();
            let nodes: Vec<Value> = self
                .posted
                .lock()
                .unwrap()
                .iter()
                .filter(|(body, _)| body.contains(needle))
                .map(|(_, id)| json!({ "id": id }))
                .take(1)
                .collect();
            json!({ "issues": { "nodes": nodes } })
        } else {
            return HttpResponse::new(
                400,
                json!({ "errors": [{ "message": format!("unknown operation: {}", query) }] })
                    .to_string(),
            );
        };

        HttpResponse::new(200, json!({ "data": data }).to_string())
    }

    fn teams(&self, name: Option<&str>) -> Vec<Value> {
        if name != Some(self.team_name.as_str()) {
            return vec![];
        }
        let states = [
            ("e6704a82-a7a2-44cb-8fc5-224f99a70dd4", "Triage"),
            (IN_PROGRESS_STATE_ID, "In Progress"),
            ("6e027a9b-c6fe-47c9-8432-6f0f4664fddd", "Todo"),
            ("437827c0-e88f-45d0-b2b0-783297e8981e", "Duplicate"),
            ("35feed2f-de1a-4cce-b191-8aad7e9b45f9", "Backlog"),
            ("1e595f67-01b9-4687-9aef-f2189f6c2d41", "In Review"),
            ("18a4c7ff-9966-418b-8fae-3f788e906a44", "Canceled"),
            (DONE_STATE_ID, "Done"),
        ];
        vec![json!({
            "id": "123",
            "name": self.team_name,
            "states": {
                "nodes": states
                    .iter()
                    .map(|(id, name)| json!({ "id": id, "name": name }))
                    .collect::<Vec<_>>()
            }
        })]
    }

    fn matching_labels(&self, vars: &Value) -> Vec<Value> {
        let wanted: Vec<&str> = match vars["label"].as_str() {
            Some(label) => vec![label],
            None => vars["labels"]
                .as_array()
                .map(|a| a.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default(),
        };
        self.labels
            .iter()
            .filter(|(name, _)| wanted.contains(&name.as_str()))
            .map(|(name, id)| json!({ "id": id, "name": name }))
            .collect()
    }
}

/// Decode the string literal written after `key: ` in an inline mutation
fn string_argument(query: &str, key: &str) -> Option<String> {
    let marker = format!("{}: ", key);
    let start = query.find(&marker)? + marker.len();
    serde_json::Deserializer::from_str(&query[start..])
        .into_iter::<String>()
        .next()?
        .ok()
}

/// In-memory source item
pub struct FakeItem {
    pub kind: SourceKind,
    pub item: WorkItem,
    pub discussions: Vec<Discussion>,
    pub merge_requests: Vec<MergeRequestRef>,
}

impl FakeItem {
    pub fn issue(labels: &[&str]) -> Self {
        Self {
            kind: SourceKind::Issue,
            item: WorkItem {
                id: 101,
                iid: Some(7),
                project_id: Some(42),
                group_id: None,
                title: "Example".to_string(),
                description: Some("Example desc.".to_string()),
                author: author("Author Full Name"),
                assignees: vec![],
                labels: labels.iter().map(|l| l.to_string()).collect(),
                state: ItemState::Open,
                epic: None,
                created_at: None,
                due_date: None,
                weight: None,
                web_url: "https://gitlab.example.com/acme/app/-/issues/7".to_string(),
            },
            discussions: vec![],
            merge_requests: vec![],
        }
    }
}

#[async_trait]
impl SourceItem for FakeItem {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn resource(&self) -> &WorkItem {
        &self.item
    }

    fn host_url(&self) -> &str {
        "https://gitlab.example.com"
    }

    async fn discussions(&self) -> ferry_core::Result<Vec<Discussion>> {
        Ok(self.discussions.clone())
    }

    async fn related_merge_requests(&self) -> ferry_core::Result<Vec<MergeRequestRef>> {
        Ok(self.merge_requests.clone())
    }
}

pub fn author(name: &str) -> Author {
    Author {
        name: name.to_string(),
        username: name.to_lowercase().replace(' ', "_"),
    }
}

pub fn note(id: u64, body: &str, author_name: &str, system: bool) -> Note {
    Note {
        id,
        body: body.to_string(),
        author: author(author_name),
        created_at: None,
        system,
    }
}

pub fn discussion(notes: Vec<Note>) -> Discussion {
    Discussion {
        id: format!("d{}", notes.first().map(|n| n.id).unwrap_or_default()),
        individual_note: notes.len() == 1,
        notes,
    }
}
