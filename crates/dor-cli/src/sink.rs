use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use dor_access::{AccessError, AccessResult, Clock, CommitRequest, CommitSink};
use dor_foxml::{FoxmlSerializer, SerializeOptions};

/// Commits an object by rewriting a document on disk.
///
/// Removal commits delete the file.
pub struct FileCommitSink {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    options: SerializeOptions,
}

impl FileCommitSink {
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>, options: SerializeOptions) -> Self {
        Self {
            path: path.into(),
            clock,
            options,
        }
    }
}

impl CommitSink for FileCommitSink {
    fn do_commit(&mut self, request: CommitRequest<'_>) -> AccessResult<()> {
        if request.pending_removal {
            std::fs::remove_file(&self.path)?;
            info!(path = %self.path.display(), "document removed");
            return Ok(());
        }
        let now = self.clock.now();
        if request.object.create_date().is_none() {
            request.object.set_create_date(now);
        }
        request.object.set_last_mod_date(now);
        let bytes = FoxmlSerializer::serialize(request.object, &self.options)
            .map_err(|e| AccessError::Commit(e.to_string()))?;
        std::fs::write(&self.path, &bytes)?;
        request.object.set_new(false);
        info!(path = %self.path.display(), bytes = bytes.len(), message = request.log_message, "document written");
        Ok(())
    }
}
