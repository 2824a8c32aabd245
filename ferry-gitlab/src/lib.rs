//! Ferry GitLab - GitLab source integration for ferry
//!
//! Fetches issues and epics over the GitLab REST API, exposes them to the
//! Linear connector through [`ferry_core::SourceItem`], and writes the
//! migration result back to the source item as a note.

mod client;
mod error;
mod item;
mod migrate;
mod notes;
mod transport;

#[cfg(test)]
mod test_support;

pub use client::{GitLabClient, Scope, UrlOptions, PER_PAGE};
pub use error::{Error, Result};
pub use item::GitLabItem;
pub use migrate::{migrate_item, MigrateOptions, MigrationOutcome};
pub use notes::{
    extract_linear_issue_id, failure_note, linear_id_from_note, success_note, CLOSE_ACTION,
    LABEL_MIGRATED, LABEL_MIGRATION_FAILED, LINEAR_CREATED_MARKER, LINEAR_ID_MARKER,
};
pub use transport::{HttpRestTransport, RestTransport};
