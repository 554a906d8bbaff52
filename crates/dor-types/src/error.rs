use thiserror::Error;

/// Errors produced by type construction and parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid pid {value:?}: {reason}")]
    InvalidPid { value: String, reason: String },

    #[error("invalid state: {0:?}")]
    InvalidState(String),

    #[error("invalid control group: {0:?}")]
    InvalidControlGroup(String),

    #[error("invalid object type: {0:?}")]
    InvalidObjectType(String),

    #[error("invalid checksum type: {0:?}")]
    InvalidChecksumType(String),

    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    #[error("invalid uri {value:?}: {reason}")]
    InvalidUri { value: String, reason: String },
}
