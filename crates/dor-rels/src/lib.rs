//! RDF relationship graphs embedded in a digital object.
//!
//! One reserved datastream of every object holds an RDF/XML document
//! describing the object's relationships. This crate provides what the
//! relationship operations need to edit it:
//!
//! - [`Triple`] / [`RdfObject`]: the triple model
//! - [`RelsGraph`]: a parsed document with its triples and prefix map,
//!   used to expand CURIE predicates such as `rel:isMemberOf`
//! - [`rdfxml`]: the reader plus the strict and fallback writers
//! - [`FilteredTriples`]: an iterator adapter that adds or purges one
//!   triple and reports whether anything changed

pub mod error;
pub mod filter;
pub mod graph;
pub mod rdfxml;
pub mod triple;

pub use error::{RelsError, RelsResult};
pub use filter::{FilterMode, FilteredTriples};
pub use graph::RelsGraph;
pub use triple::{RdfObject, RelationshipTuple, Triple};
