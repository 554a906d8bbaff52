use dor_types::Pid;

/// Errors from structural model operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// The PID was already assigned and cannot change.
    #[error("pid already assigned: {0}")]
    PidAlreadyAssigned(Pid),
}

/// Result alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
