use dor_types::Pid;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No bytes are stored under the PID.
    #[error("object not found: {0}")]
    NotFound(Pid),

    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
