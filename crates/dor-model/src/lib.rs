//! In-memory digital object model.
//!
//! A [`DigitalObject`] is the aggregate root. It exclusively owns:
//!
//! - [`Datastream`] versions, grouped by datastream ID, oldest first
//! - [`Disseminator`] versions, grouped by disseminator ID, oldest first
//! - the append-only list of [`AuditRecord`]s
//! - object properties and the namespace-prefix map
//!
//! The model performs no I/O and has no transaction semantics. Guarded
//! mutation lives in `dor-access`; this crate only places things
//! structurally and hands out IDs that are never reused within the
//! lifetime of an object value.

pub mod audit;
pub mod datastream;
pub mod disseminator;
pub mod error;
pub mod object;

pub use audit::AuditRecord;
pub use datastream::{Datastream, DatastreamContent};
pub use disseminator::{Disseminator, DsBinding};
pub use error::{ModelError, ModelResult};
pub use object::DigitalObject;
