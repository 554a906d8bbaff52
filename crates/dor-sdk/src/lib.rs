//! High-level SDK for a DOR repository.
//!
//! [`Repository`] is the entry point for applications: it hands out
//! readers and single-checkout writers over stored objects, persists
//! commits through the canonical serializer, and imports and exports
//! canonical documents.

pub mod commit;
pub mod config;
pub mod error;
pub mod repository;

pub use commit::FoxmlCommitSink;
pub use config::RepositoryConfig;
pub use error::{SdkError, SdkResult};
pub use repository::{RepoWriter, Repository};

// Re-export key types
pub use dor_access::{
    Clock, FixedClock, ObjectReader, ObjectWriter, Relationship, RelationshipChange, SimpleReader,
    SystemClock, WriterState,
};
pub use dor_foxml::{Encoding, TranslationContext};
pub use dor_model::{AuditRecord, Datastream, DatastreamContent, DigitalObject};
pub use dor_rels::RelationshipTuple;
pub use dor_types::{ControlGroup, Pid, State, Timestamp};
