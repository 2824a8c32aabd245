//! Ferry Core - Core library for ferry
//!
//! This crate holds what the destination and source integrations share:
//! configuration and secrets, the source work item interface consumed by the
//! migration orchestrator, the in-run migration evidence map, and the text
//! helpers used on bodies sent to the destination.

pub mod config;
pub mod error;
pub mod evidence;
pub mod secrets;
pub mod source;
pub mod text;

pub use config::{Config, GitLabConfig, LinearConfig, MigrationConfig};
pub use error::{Error, Result};
pub use evidence::{DestinationKind, EvidenceRecord, MigrationEvidence};
pub use secrets::Secrets;
pub use source::{
    Assignee, Author, Discussion, EpicRef, ItemState, MergeRequestRef, Note, SourceItem,
    SourceKind, WorkItem,
};
