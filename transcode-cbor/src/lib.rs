#![warn(missing_docs)]
//! CBOR (RFC 8949 subset) codec engine (spec §4.6): a head-byte
//! [`reader`]/[`writer`] pair, plus the schema-directed
//! [`ser::CborSerializer`]/[`de::CborDeserializer`] built on top of them.
//!
//! Structs encode as element-positional lists, not string-keyed maps — see
//! [`ser`]'s module docs for why.

mod float16;
mod head;
mod reader;
mod writer;

pub mod de;
pub mod error;
pub mod ser;

pub use de::CborDeserializer;
pub use error::{CborError, CborErrorKind};
pub use ser::CborSerializer;
