//! Canonical XML (FOXML) wire format for digital objects.
//!
//! [`FoxmlSerializer`] writes a [`DigitalObject`](dor_model::DigitalObject)
//! in a fixed, byte-for-byte stable layout that other tooling depends on.
//! [`FoxmlParser`] reads that layout back. For any valid object,
//! serializing, parsing, and serializing again yields identical bytes.
//!
//! All per-call settings travel in [`SerializeOptions`] / [`ParseOptions`];
//! neither the serializer nor the parser keeps state between calls.

pub mod charset;
pub mod error;
pub mod options;
pub mod parser;
pub mod serializer;
pub mod translate;

pub use charset::Encoding;
pub use error::{FoxmlError, FoxmlResult};
pub use options::{ParseOptions, SerializeOptions, DEFAULT_LOCAL_SERVER_URL};
pub use parser::FoxmlParser;
pub use serializer::FoxmlSerializer;
pub use translate::{TranslationContext, LOCAL_SERVER_PLACEHOLDER};
