use std::fmt;

use dor_types::validate_uri;

use crate::error::{RelsError, RelsResult};

/// Prefix marking a blank-node identifier in subject or object position.
pub const BLANK_NODE_PREFIX: &str = "_:";

/// Object of a triple: a resource URI or a literal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RdfObject {
    Resource(String),
    /// `lang` is the `xml:lang` tag of a plain literal; typed literals
    /// never carry one.
    Literal {
        value: String,
        datatype: Option<String>,
        lang: Option<String>,
    },
}

impl RdfObject {
    /// Build an object from the relationship call arguments.
    ///
    /// Exactly one of `uri` and `literal` must be given. The URI and the
    /// literal datatype, when present, must be absolute URIs.
    pub fn from_parts(
        uri: Option<&str>,
        literal: Option<&str>,
        literal_type: Option<&str>,
    ) -> RelsResult<Self> {
        match (uri, literal) {
            (Some(uri), None) => {
                validate_uri(uri)?;
                Ok(Self::Resource(uri.to_string()))
            }
            (None, Some(value)) => {
                if let Some(dt) = literal_type {
                    validate_uri(dt)?;
                }
                Ok(Self::Literal {
                    value: value.to_string(),
                    datatype: literal_type.map(str::to_string),
                    lang: None,
                })
            }
            _ => Err(RelsError::ObjectArguments),
        }
    }

    pub fn as_resource(&self) -> Option<&str> {
        match self {
            Self::Resource(uri) => Some(uri),
            Self::Literal { .. } => None,
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal { value, .. } => Some(value),
            Self::Resource(_) => None,
        }
    }

    pub fn datatype(&self) -> Option<&str> {
        match self {
            Self::Literal { datatype, .. } => datatype.as_deref(),
            Self::Resource(_) => None,
        }
    }

    pub fn lang(&self) -> Option<&str> {
        match self {
            Self::Literal { lang, .. } => lang.as_deref(),
            Self::Resource(_) => None,
        }
    }
}

impl fmt::Display for RdfObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource(uri) if uri.starts_with(BLANK_NODE_PREFIX) => f.write_str(uri),
            Self::Resource(uri) => write!(f, "<{uri}>"),
            Self::Literal { value, datatype: Some(dt), .. } => write!(f, "{value:?}^^<{dt}>"),
            Self::Literal { value, lang: Some(lang), .. } => write!(f, "{value:?}@{lang}"),
            Self::Literal { value, .. } => write!(f, "{value:?}"),
        }
    }
}

/// A fully expanded RDF statement.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: RdfObject,
}

impl Triple {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: RdfObject) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> <{}> {}", self.subject, self.predicate, self.object)
    }
}

/// A relationship as reported back to callers.
///
/// `predicate` is kept as the caller supplied it (possibly a CURIE such as
/// `rel:isMemberOf`), unlike [`Triple::predicate`], which is expanded.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RelationshipTuple {
    pub subject: String,
    pub predicate: String,
    pub object: RdfObject,
}

impl RelationshipTuple {
    pub fn object_uri(&self) -> Option<&str> {
        self.object.as_resource()
    }

    pub fn object_literal(&self) -> Option<&str> {
        self.object.as_literal()
    }

    pub fn literal_type(&self) -> Option<&str> {
        self.object.datatype()
    }

    pub fn literal_lang(&self) -> Option<&str> {
        self.object.lang()
    }
}

impl From<Triple> for RelationshipTuple {
    fn from(t: Triple) -> Self {
        Self {
            subject: t.subject,
            predicate: t.predicate,
            object: t.object,
        }
    }
}
