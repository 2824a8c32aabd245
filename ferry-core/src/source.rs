//! Source work items as seen by the migration orchestrator
//!
//! The orchestrator never talks to the source tracker directly. It reads a
//! work item through [`SourceItem`], an adapter the source integration
//! implements over its own client. The plain data types below mirror the
//! fields of the source tracker's JSON that the migration needs.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Kind of source work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Issue,
    Epic,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Issue => "issue",
            SourceKind::Epic => "epic",
        }
    }

    /// Whether items of this kind carry related merge requests
    pub fn supports_cross_references(&self) -> bool {
        matches!(self, SourceKind::Issue)
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work item state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemState {
    #[serde(rename = "opened", alias = "open", alias = "locked")]
    Open,
    #[serde(rename = "closed")]
    Closed,
}

impl ItemState {
    pub fn is_closed(&self) -> bool {
        matches!(self, ItemState::Closed)
    }
}

/// Author of an item or note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Display name
    pub name: String,
    #[serde(default)]
    pub username: String,
}

/// Assignee of an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    #[serde(default)]
    pub username: String,
    /// Only exposed by the source API to privileged tokens
    #[serde(default)]
    pub email: Option<String>,
}

/// Reference from an item to its parent epic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpicRef {
    pub id: u64,
    #[serde(default)]
    pub iid: Option<u64>,
    pub group_id: u64,
    /// Path relative to the host URL
    pub url: String,
    pub title: String,
}

/// Snapshot of a source work item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: u64,
    #[serde(default)]
    pub iid: Option<u64>,
    #[serde(default)]
    pub project_id: Option<u64>,
    #[serde(default)]
    pub group_id: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub author: Author,
    #[serde(default)]
    pub assignees: Vec<Assignee>,
    /// Label names, namespaced with `::` (e.g. `Team::Backend`)
    #[serde(default)]
    pub labels: Vec<String>,
    pub state: ItemState,
    #[serde(default)]
    pub epic: Option<EpicRef>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub weight: Option<i64>,
    pub web_url: String,
}

/// A single comment within a discussion thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: u64,
    pub body: String,
    pub author: Author,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Generated by the tracker (state changes, label events, ...)
    #[serde(default)]
    pub system: bool,
}

/// An ordered discussion thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discussion {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub individual_note: bool,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl Discussion {
    /// True for threads that hold at least one note and no system notes
    pub fn is_human(&self) -> bool {
        !self.notes.is_empty() && self.notes.iter().all(|note| !note.system)
    }
}

/// A merge request related to an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequestRef {
    pub iid: u64,
    pub title: String,
    pub web_url: String,
    /// Full path of the project holding the merge request
    pub project_path: String,
}

/// Read-only view of a source work item
///
/// Implementations hold a reference to the source tracker's client and fetch
/// discussions and cross references on demand.
#[async_trait]
pub trait SourceItem: Send + Sync {
    /// Kind of the item
    fn kind(&self) -> SourceKind;

    /// Snapshot of the item's fields
    fn resource(&self) -> &WorkItem;

    /// Base URL used to resolve relative links such as the epic URL
    fn host_url(&self) -> &str;

    /// All discussion threads of the item, in source order
    async fn discussions(&self) -> Result<Vec<Discussion>>;

    /// Merge requests related to the item; empty for kinds without them
    async fn related_merge_requests(&self) -> Result<Vec<MergeRequestRef>>;

    /// Label names in source order
    fn labels(&self) -> &[String] {
        &self.resource().labels
    }

    fn state(&self) -> ItemState {
        self.resource().state
    }

    /// Absolute URL of the parent epic, if the item has one
    fn epic_url(&self) -> Option<String> {
        self.resource()
            .epic
            .as_ref()
            .map(|epic| format!("{}{}", self.host_url(), epic.url))
    }
}
