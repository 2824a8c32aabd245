//! In-run record of migrated items
//!
//! Every destination issue created during a run is appended here so that
//! items migrated later in the same run can resolve their parent epic
//! without another destination lookup. Nothing is persisted across runs.

use serde::{Deserialize, Serialize};

use crate::SourceKind;

/// Kind of destination object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    Issue,
}

/// One migrated item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub source_kind: SourceKind,
    pub source_id: u64,
    pub destination_kind: DestinationKind,
    pub destination_id: String,
    pub source_url: String,
    pub destination_url: String,
}

/// Ordered, append-only list of migrated items
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationEvidence {
    records: Vec<EvidenceRecord>,
}

impl MigrationEvidence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: EvidenceRecord) {
        self.records.push(record);
    }

    /// Destination id of the first record matching the source item and
    /// destination kind
    pub fn find_destination_id(
        &self,
        source_kind: SourceKind,
        source_id: u64,
        destination_kind: DestinationKind,
    ) -> Option<&str> {
        self.records
            .iter()
            .find(|r| {
                r.source_kind == source_kind
                    && r.source_id == source_id
                    && r.destination_kind == destination_kind
            })
            .map(|r| r.destination_id.as_str())
    }

    pub fn records(&self) -> &[EvidenceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
