use dor_types::Pid;

use crate::error::{StoreError, StoreResult};

/// PID-keyed store of serialized objects.
///
/// Implementations must satisfy:
/// - A write replaces whatever was stored under the PID, atomically.
/// - Concurrent reads are always safe.
/// - The store never interprets object contents.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Read the bytes stored under `pid`. `Ok(None)` if there are none.
    fn read(&self, pid: &Pid) -> StoreResult<Option<Vec<u8>>>;

    /// Store `bytes` under `pid`, replacing any previous value.
    fn write(&self, pid: &Pid, bytes: &[u8]) -> StoreResult<()>;

    fn exists(&self, pid: &Pid) -> StoreResult<bool>;

    /// Delete the bytes under `pid`. Returns `true` if there were any.
    fn delete(&self, pid: &Pid) -> StoreResult<bool>;

    /// Every stored PID, sorted.
    fn pids(&self) -> StoreResult<Vec<Pid>>;

    /// Like [`read`](Self::read), but a missing object is an error.
    fn read_existing(&self, pid: &Pid) -> StoreResult<Vec<u8>> {
        self.read(pid)?.ok_or_else(|| StoreError::NotFound(pid.clone()))
    }
}
