//! Source workflow label to Linear workflow state name

/// Linear workflow state name for a source `S::` label value
///
/// `Inbox` maps explicitly to no state; unknown labels also yield `None`.
pub fn linear_state_name(source_state: &str) -> Option<&'static str> {
    match source_state {
        "Inbox" => None,
        "InProgress" => Some("In Progress"),
        "OnHold" => Some("Blocked"),
        "PendingRelease" => Some("Pending Release"),
        "Planned" => Some("Planned"),
        "Review" => Some("In Review"),
        "Candidate" => Some("Candidate"),
        "Blocked" => Some("Blocked"),
        "Closed" => Some("Done"),
        "Testing" => Some("Testing"),
        "NeedsQA" => Some("Needs QA"),
        "DesignReview" => Some("Design Review"),
        "CodeReview" => Some("Code Review"),
        "ReadyForDev" => Some("Planned"),
        _ => None,
    }
}
