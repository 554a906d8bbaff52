use dor_rels::RelsError;
use dor_types::TypeError;

use crate::writer::WriterState;

/// Errors from reader and writer operations.
///
/// None of these leave the object partially mutated: every writer
/// operation validates before it changes anything.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// A datastream, disseminator, or version does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The writer is not in a state that allows the operation.
    #[error("cannot {operation} while writer is {state}")]
    InvalidState {
        state: WriterState,
        operation: &'static str,
    },

    /// A required field is missing or a value breaks the object's structure.
    #[error("structural integrity: {0}")]
    StructuralIntegrity(String),

    /// Malformed URI, or relationship content that could not be read or written.
    #[error("format error: {0}")]
    Format(String),

    /// The commit sink failed. The writer is left as it was.
    #[error("commit failed: {0}")]
    Commit(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RelsError> for AccessError {
    fn from(e: RelsError) -> Self {
        Self::Format(e.to_string())
    }
}

impl From<TypeError> for AccessError {
    fn from(e: TypeError) -> Self {
        Self::Format(e.to_string())
    }
}

impl AccessError {
    pub(crate) fn datastream_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "datastream",
            id: id.to_string(),
        }
    }
}

/// Result alias for access operations.
pub type AccessResult<T> = Result<T, AccessError>;
