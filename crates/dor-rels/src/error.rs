use dor_types::TypeError;

/// Errors from relationship graph handling. All of them are format errors
/// from the caller's point of view: nothing is written when one occurs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelsError {
    /// The stored RDF/XML could not be read.
    #[error("rdf/xml parse error: {0}")]
    Parse(String),

    /// The graph could not be written as RDF/XML.
    #[error("rdf/xml serialization error: {0}")]
    Serialize(String),

    /// A subject, predicate, object, or datatype is not an absolute URI.
    #[error("malformed uri: {0}")]
    InvalidUri(#[from] TypeError),

    /// Neither or both of object URI and object literal were supplied.
    #[error("exactly one of object uri or object literal is required")]
    ObjectArguments,
}

/// Result alias for relationship graph operations.
pub type RelsResult<T> = Result<T, RelsError>;
