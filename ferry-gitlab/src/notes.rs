//! Notes written back to the source item after a migration attempt
//!
//! The success note doubles as the marker later runs look for on a parent
//! epic, so its first two lines are parsed back by [`linear_id_from_note`].

use ferry_core::text::truncate_chars;
use ferry_core::WorkItem;
use ferry_linear::CreatedIssue;

pub const LINEAR_CREATED_MARKER: &str = "Issue created in Linear:";
pub const LINEAR_ID_MARKER: &str = "Linear issue ID: ";
pub const LABEL_MIGRATED: &str = "/label ~\"Linear::Migrated\"";
pub const LABEL_MIGRATION_FAILED: &str = "/label ~\"Linear::Migration Failed\"";
pub const CLOSE_ACTION: &str = "/close";

const LINEAR_ID_LEN: usize = 36;
const ERROR_EXCERPT_CHARS: usize = 100;

/// Note for a migrated item: link, id, migrated label, close
pub fn success_note(issue: &CreatedIssue) -> String {
    format!(
        "{} {}\n{}{}\n{}\n{}",
        LINEAR_CREATED_MARKER, issue.url, LINEAR_ID_MARKER, issue.id, LABEL_MIGRATED, CLOSE_ACTION
    )
}

/// Note for a failed migration, quoting the start of the error
pub fn failure_note(item: &WorkItem, project_name: &str, message: &str) -> String {
    format!(
        "Issue migration failed for issue #{} in project {} {}\nError:\n{}\n{}",
        item.id,
        project_name,
        item.web_url,
        truncate_chars(message, ERROR_EXCERPT_CHARS),
        LABEL_MIGRATION_FAILED
    )
}

/// The UUID following `Linear issue ID: ` anywhere in `text`
pub fn extract_linear_issue_id(text: &str) -> Option<&str> {
    text.match_indices(LINEAR_ID_MARKER).find_map(|(pos, _)| {
        let candidate = text.get(pos + LINEAR_ID_MARKER.len()..)?.get(..LINEAR_ID_LEN)?;
        candidate
            .chars()
            .all(|c| matches!(c, 'a'..='f' | '0'..='9' | '-'))
            .then_some(candidate)
    })
}

/// Linear id from a success note; other notes yield `None`
pub fn linear_id_from_note(body: &str) -> Option<&str> {
    if !body.starts_with(LINEAR_CREATED_MARKER) {
        return None;
    }
    extract_linear_issue_id(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::issue_json;

    const ID: &str = "b6b31d09-6561-4a77-a265-79e854086557";

    #[test]
    fn test_success_note() {
        let issue = CreatedIssue {
            id: ID.to_string(),
            url: "https://linear.app/test/issue/RDT1-35".to_string(),
        };

        assert_eq!(
            success_note(&issue),
            format!(
                "Issue created in Linear: https://linear.app/test/issue/RDT1-35\nLinear issue ID: {}\n/label ~\"Linear::Migrated\"\n/close",
                ID
            )
        );
    }

    #[test]
    fn test_success_note_parses_back() {
        let issue = CreatedIssue {
            id: ID.to_string(),
            url: "https://linear.app/x".to_string(),
        };
        assert_eq!(linear_id_from_note(&success_note(&issue)), Some(ID));
    }

    #[test]
    fn test_failure_note_truncates_error() {
        let item: WorkItem = serde_json::from_value(issue_json()).unwrap();
        let message = "x".repeat(250);

        let note = failure_note(&item, "App", &message);
        let lines: Vec<&str> = note.lines().collect();

        assert_eq!(
            lines[0],
            "Issue migration failed for issue #101 in project App https://gitlab.example.com/acme/app/-/issues/7"
        );
        assert_eq!(lines[1], "Error:");
        assert_eq!(lines[2].len(), 100);
        assert_eq!(lines[3], LABEL_MIGRATION_FAILED);
    }

    #[test]
    fn test_extract_requires_uuid_shape() {
        assert_eq!(extract_linear_issue_id(&format!("Linear issue ID: {}", ID)), Some(ID));
        assert_eq!(extract_linear_issue_id("Linear issue ID: short"), None);
        assert_eq!(
            extract_linear_issue_id("Linear issue ID: ZZZZZZZZ-6561-4a77-a265-79e854086557"),
            None
        );
        assert_eq!(extract_linear_issue_id("nothing here"), None);
    }

    #[test]
    fn test_note_must_start_with_marker() {
        let quoted = format!("> Issue created in Linear: x\nLinear issue ID: {}", ID);
        assert_eq!(linear_id_from_note(&quoted), None);
    }
}
