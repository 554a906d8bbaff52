use dor_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FoxmlError {
    /// A required model field is missing or invalid (no PID, incomplete
    /// audit record, content that does not match its control group).
    #[error("object integrity error: {0}")]
    StructuralIntegrity(String),

    /// The input is not well-formed canonical XML.
    #[error("format error: {0}")]
    Format(String),

    /// The text could not be represented in the requested encoding.
    #[error("cannot encode as {encoding}: {reason}")]
    Transcode { encoding: String, reason: String },

    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("invalid value: {0}")]
    Value(#[from] TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for FoxmlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Format(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for FoxmlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Format(err.to_string())
    }
}

pub type FoxmlResult<T> = Result<T, FoxmlError>;
