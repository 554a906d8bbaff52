//! Foundation types for the digital-object repository (DOR).
//!
//! This crate provides the identity, enumeration, and temporal types shared
//! by every other DOR crate.
//!
//! # Key Types
//!
//! - [`Pid`]: Persistent identifier of a digital object (`namespace:id`)
//! - [`State`]: Lifecycle state of objects, datastreams, and disseminators
//! - [`ControlGroup`]: Datastream storage mode (X, M, E, R)
//! - [`ObjectType`]: Data object, behavior definition, or behavior mechanism
//! - [`ChecksumType`]: Digest algorithm recorded on datastream versions
//! - [`Timestamp`]: UTC instant with second-precision wire formatting

pub mod error;
pub mod kinds;
pub mod names;
pub mod pid;
pub mod temporal;
pub mod uri;

pub use error::TypeError;
pub use kinds::{ChecksumType, ControlGroup, ObjectType, State};
pub use names::{
    AUDIT_DATASTREAM_ID, LEGACY_AUDIT_DATASTREAM_ID, RELS_EXT_DATASTREAM_ID,
};
pub use pid::Pid;
pub use temporal::{format_timestamp, parse_timestamp, Timestamp};
pub use uri::validate_uri;
