//! Audit trail records.

use serde::{Deserialize, Serialize};

use dor_types::Timestamp;

/// One entry in an object's append-only audit trail.
///
/// Records are never removed, including when the datastream or
/// disseminator named by `component_id` is deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    pub process_type: String,
    pub action: String,
    /// Datastream or disseminator the change applied to. Serialized as an
    /// empty element when absent.
    pub component_id: Option<String>,
    pub responsibility: String,
    pub date: Timestamp,
    pub justification: String,
}

impl AuditRecord {
    /// The component ID, or `""` when absent.
    pub fn component_id_or_empty(&self) -> &str {
        self.component_id.as_deref().unwrap_or_default()
    }

    /// Names of required fields that are empty.
    ///
    /// `component_id` and `justification` may legitimately be empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.id.is_empty() {
            missing.push("id");
        }
        if self.process_type.is_empty() {
            missing.push("processType");
        }
        if self.action.is_empty() {
            missing.push("action");
        }
        if self.responsibility.is_empty() {
            missing.push("responsibility");
        }
        missing
    }
}
