use dor_types::Pid;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("object not found: {0}")]
    ObjectNotFound(Pid),

    #[error("object already exists: {0}")]
    ObjectExists(Pid),

    /// Another live writer holds the object.
    #[error("object {0} is checked out by another writer")]
    WriterCheckedOut(Pid),

    #[error("document has no pid")]
    MissingPid,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("access error: {0}")]
    Access(#[from] dor_access::AccessError),

    #[error("canonical xml error: {0}")]
    Foxml(#[from] dor_foxml::FoxmlError),

    #[error("store error: {0}")]
    Store(#[from] dor_store::StoreError),

    #[error("invalid value: {0}")]
    Value(#[from] dor_types::TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type SdkResult<T> = Result<T, SdkError>;
