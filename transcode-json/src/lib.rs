#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
//! JSON codec engine (spec §4.3): a pull-based [`reader::JsonReader`]
//! tokenizer, a push-based [`writer::JsonWriter`], and the schema-directed
//! [`ser::JsonSerializer`]/[`de::JsonDeserializer`] built on top of them.

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod de;
pub mod error;
pub mod reader;
pub mod ser;
pub mod writer;

pub use de::JsonDeserializer;
pub use error::{JsonError, JsonErrorKind};
pub use reader::{JsonReader, JsonToken};
pub use ser::JsonSerializer;
pub use writer::{JsonWriter, WriteOptions};
