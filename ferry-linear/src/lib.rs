//! Ferry Linear - Linear integration for ferry
//!
//! This crate holds the GraphQL transport (caching, rate-limit retry,
//! dry-run), the typed Linear API built on top of it, and the connector that
//! migrates one source work item at a time into Linear.

mod client;
mod connector;
mod error;
mod interface;
mod logger;
mod mutation;
mod state;
mod transport;

#[cfg(test)]
mod test_support;

pub use client::{GraphqlClient, THROTTLE_RETRIES};
pub use connector::{
    ConnectorOptions, LinearConnector, MIGRATION_IN_PROGRESS_LABEL_NAME,
    MIGRATION_IN_PROGRESS_LABEL_NAME_DRY_RUN, MIGRATION_LABEL_NAME, MIGRATION_LABEL_NAME_DRY_RUN,
};
pub use error::{Error, Result};
pub use interface::{
    AttachmentLinkMergeRequestInput, AttachmentLinkUrlInput, CommentCreateInput, CreatedComment,
    CreatedIssue, IssueCreateInput, LinearInterface, MutationAck, Team, WorkflowState,
};
pub use logger::QueryLogger;
pub use mutation::build_mutation;
pub use state::linear_state_name;
pub use transport::{HttpResponse, HttpTransport, Transport};
