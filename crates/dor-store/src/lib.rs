//! Storage for serialized digital objects.
//!
//! The store keeps one byte blob per PID: the canonical serialization of
//! the object's latest committed state. It never interprets the bytes.
//!
//! All backends implement [`ObjectStore`]:
//!
//! - [`InMemoryObjectStore`] -- `BTreeMap`-based store for tests and embedding

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use traits::ObjectStore;
