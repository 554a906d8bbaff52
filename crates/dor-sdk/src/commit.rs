use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use tracing::info;

use dor_access::{AccessError, AccessResult, Clock, CommitRequest, CommitSink};
use dor_foxml::{FoxmlError, FoxmlSerializer, SerializeOptions};
use dor_store::ObjectStore;
use dor_types::Pid;

use crate::error::{SdkError, SdkResult};

/// PIDs that currently have a live writer.
pub(crate) type CheckoutSet = Arc<Mutex<BTreeSet<Pid>>>;

/// Exclusive claim on one PID, released on drop or after a commit.
#[derive(Debug)]
pub(crate) struct Checkout {
    pid: Pid,
    held: CheckoutSet,
    released: bool,
}

impl Checkout {
    pub(crate) fn acquire(held: &CheckoutSet, pid: &Pid) -> SdkResult<Self> {
        let mut set = held
            .lock()
            .map_err(|_| SdkError::Internal("checkout lock poisoned".into()))?;
        if !set.insert(pid.clone()) {
            return Err(SdkError::WriterCheckedOut(pid.clone()));
        }
        Ok(Self {
            pid: pid.clone(),
            held: Arc::clone(held),
            released: false,
        })
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        if let Ok(mut set) = self.held.lock() {
            set.remove(&self.pid);
        }
        self.released = true;
    }
}

impl Drop for Checkout {
    fn drop(&mut self) {
        self.release();
    }
}

/// Persists commits as canonical XML in an [`ObjectStore`].
///
/// A removal commit deletes the stored bytes. Any other commit stamps the
/// modification date, serializes with the storage options and overwrites
/// the stored bytes.
pub struct FoxmlCommitSink {
    store: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
    options: SerializeOptions,
    checkout: Checkout,
}

impl FoxmlCommitSink {
    pub(crate) fn new(
        store: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
        options: SerializeOptions,
        checkout: Checkout,
    ) -> Self {
        Self {
            store,
            clock,
            options,
            checkout,
        }
    }
}

impl std::fmt::Debug for FoxmlCommitSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoxmlCommitSink")
            .field("pid", &self.checkout.pid)
            .field("options", &self.options)
            .finish()
    }
}

impl CommitSink for FoxmlCommitSink {
    fn do_commit(&mut self, request: CommitRequest<'_>) -> AccessResult<()> {
        let pid = request
            .object
            .pid()
            .cloned()
            .ok_or_else(|| AccessError::StructuralIntegrity("object must have a pid".into()))?;

        if request.pending_removal {
            let existed = self
                .store
                .delete(&pid)
                .map_err(|e| AccessError::Commit(e.to_string()))?;
            info!(pid = %pid, existed, message = request.log_message, "object purged");
        } else {
            let now = self.clock.now();
            if request.object.create_date().is_none() {
                request.object.set_create_date(now);
            }
            request.object.set_last_mod_date(now);
            let bytes = FoxmlSerializer::serialize(request.object, &self.options).map_err(foxml_error)?;
            self.store
                .write(&pid, &bytes)
                .map_err(|e| AccessError::Commit(e.to_string()))?;
            request.object.set_new(false);
            info!(pid = %pid, bytes = bytes.len(), message = request.log_message, "object stored");
        }

        self.checkout.release();
        Ok(())
    }
}

fn foxml_error(e: FoxmlError) -> AccessError {
    match e {
        FoxmlError::StructuralIntegrity(msg) => AccessError::StructuralIntegrity(msg),
        FoxmlError::Io(e) => AccessError::Io(e),
        other => AccessError::Format(other.to_string()),
    }
}
