use dor_model::DigitalObject;

use crate::error::AccessResult;

/// What a writer hands to its sink on commit.
#[derive(Debug)]
pub struct CommitRequest<'a> {
    /// The object as it should be persisted. The sink may stamp
    /// persistence-owned fields such as the last modification date.
    pub object: &'a mut DigitalObject,
    pub log_message: &'a str,
    /// Delete the object instead of storing it.
    pub pending_removal: bool,
}

/// Persistence collaborator for [`ObjectWriter::commit`].
///
/// A failing sink must not have persisted anything.
///
/// [`ObjectWriter::commit`]: crate::ObjectWriter::commit
pub trait CommitSink {
    fn do_commit(&mut self, request: CommitRequest<'_>) -> AccessResult<()>;
}
