//! Test doubles shared by the unit tests of this crate

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use ferry_core::GitLabConfig;
use serde_json::{json, Value};
use url::Url;

use crate::client::GitLabClient;
use crate::transport::RestTransport;
use crate::{Error, Result};

pub const LINEAR_ISSUE_ID: &str = "b6b31d09-6561-4a77-a265-79e854086557";

/// REST transport answering GETs from a fixed table keyed by path and query
pub struct MockRest {
    routes: HashMap<String, Value>,
    gets: Mutex<Vec<String>>,
    posts: Mutex<Vec<(String, Value)>>,
}

impl MockRest {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            gets: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_get(mut self, path_and_query: &str, value: Value) -> Self {
        self.routes.insert(path_and_query.to_string(), value);
        self
    }

    pub fn gets(&self) -> Vec<String> {
        self.gets.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<(String, Value)> {
        self.posts.lock().unwrap().clone()
    }
}

fn route_key(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

#[async_trait]
impl RestTransport for MockRest {
    async fn get(&self, url: &Url) -> Result<Value> {
        let key = route_key(url);
        self.gets.lock().unwrap().push(key.clone());
        self.routes
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::NotFound(url.to_string()))
    }

    async fn post(&self, url: &Url, body: &Value) -> Result<Value> {
        self.posts
            .lock()
            .unwrap()
            .push((url.path().to_string(), body.clone()));
        Ok(json!({ "id": 1 }))
    }
}

pub fn client(mock: MockRest, dry_run: bool) -> GitLabClient<MockRest> {
    let config = GitLabConfig {
        url: "https://gitlab.example.com/".to_string(),
    };
    GitLabClient::with_transport(mock, &config, dry_run).unwrap()
}

/// Issue as returned by `GET /projects/:id/issues/:iid`
pub fn issue_json() -> Value {
    json!({
        "id": 101,
        "iid": 7,
        "project_id": 42,
        "title": "Example",
        "description": "Example desc.",
        "state": "opened",
        "created_at": "2024-03-01T10:00:00.000Z",
        "due_date": "2024-04-01",
        "labels": ["Team::Backend", "bug"],
        "author": { "id": 1, "name": "Ada Lovelace", "username": "ada" },
        "assignees": [{ "id": 2, "name": "Bob", "username": "bob" }],
        "weight": 3,
        "web_url": "https://gitlab.example.com/acme/app/-/issues/7",
        "epic": {
            "id": 5,
            "iid": 2,
            "title": "Auth",
            "url": "/groups/acme/-/epics/2",
            "group_id": 9
        }
    })
}

/// Epic as returned by `GET /groups/:id/epics/:iid`
pub fn epic_json() -> Value {
    json!({
        "id": 5,
        "iid": 2,
        "group_id": 9,
        "title": "Auth",
        "description": null,
        "state": "opened",
        "labels": ["Team::Backend"],
        "author": { "id": 1, "name": "Ada Lovelace", "username": "ada" },
        "web_url": "https://gitlab.example.com/groups/acme/-/epics/2"
    })
}

/// Linear GraphQL endpoint with one team and no labels, users or prior
/// migrations
pub struct FakeLinearApi {
    team_name: String,
    requests: Mutex<Vec<Value>>,
}

impl FakeLinearApi {
    pub fn new(team_name: &str) -> Self {
        Self {
            team_name: team_name.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queries_containing(&self, needle: &str) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r["query"].as_str())
            .filter(|q| q.contains(needle))
            .map(str::to_string)
            .collect()
    }

    fn data(&self, body: &Value) -> Value {
        let query = body["query"].as_str().unwrap_or_default();
        let ack = json!({ "lastSyncId": 1, "success": true });

        if query.contains("issueCreate(") {
            json!({ "issueCreate": {
                "success": true,
                "issue": { "id": LINEAR_ISSUE_ID, "url": "https://linear.app/test/issue/T-1" }
            }})
        } else if query.contains("commentCreate(") {
            json!({ "commentCreate": { "success": true, "comment": { "id": "comment-1" } } })
        } else if query.contains("attachmentLinkURL(") {
            json!({ "attachmentLinkURL": ack })
        } else if query.contains("attachmentLinkGitLabMR(") {
            json!({ "attachmentLinkGitLabMR": ack })
        } else if query.contains("issueUpdate(") {
            json!({ "issueUpdate": ack })
        } else if query.contains("teams(") {
            let nodes = if body["variables"]["name"] == self.team_name.as_str() {
                json!([{
                    "id": "team-1",
                    "name": self.team_name,
                    "states": { "nodes": [{ "id": "state-done", "name": "Done" }] }
                }])
            } else {
                json!([])
            };
            json!({ "teams": { "nodes": nodes } })
        } else if query.contains("issueLabels(") {
            json!({ "issueLabels": { "nodes": [] } })
        } else if query.contains("users(") {
            json!({ "users": { "nodes": [] } })
        } else {
            json!({ "issues": { "nodes": [] } })
        }
    }
}

#[async_trait]
impl ferry_linear::Transport for FakeLinearApi {
    async fn post_json(&self, body: &Value) -> ferry_linear::Result<ferry_linear::HttpResponse> {
        self.requests.lock().unwrap().push(body.clone());
        Ok(ferry_linear::HttpResponse::new(
            200,
            json!({ "data": self.data(body) }).to_string(),
        ))
    }
}
