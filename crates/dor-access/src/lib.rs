//! Reader and writer access to digital objects.
//!
//! An [`ObjectReader`] is a read-only view over one [`DigitalObject`]. An
//! [`ObjectWriter`] adds guarded mutation on top of the same view and owns
//! the object exclusively until it is committed or invalidated:
//!
//! - mutations are legal only while the writer is [`WriterState::Active`]
//! - [`ObjectWriter::remove`] marks the object for deletion on commit
//! - [`ObjectWriter::commit`] hands the object to a [`CommitSink`] and ends
//!   the writer's life
//! - [`ObjectWriter::rollback`] restores the object as it was when the
//!   writer was opened
//!
//! Relationship add and purge go through the [`RelationshipEngine`], which
//! rewrites the `RELS-EXT` datastream only when the triple set changes.
//!
//! [`DigitalObject`]: dor_model::DigitalObject

pub mod clock;
pub mod commit;
pub mod error;
pub mod reader;
pub mod relationships;
pub mod writer;

pub use clock::{Clock, FixedClock, SystemClock};
pub use commit::{CommitRequest, CommitSink};
pub use error::{AccessError, AccessResult};
pub use reader::{ObjectReader, SimpleReader};
pub use relationships::{Relationship, RelationshipChange, RelationshipEngine};
pub use writer::{ObjectWriter, SimpleWriter, WriterOptions, WriterState};
