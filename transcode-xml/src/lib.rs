#![warn(missing_docs)]
//! XML codec engine (spec §4.4): a depth-tracking [`reader::XmlReader`]
//! tokenizer, a pretty-printing [`writer::XmlWriter`], and the
//! schema-directed [`ser::XmlSerializer`]/[`de::XmlDeserializer`] built on
//! top of them.

pub mod de;
pub mod error;
pub mod reader;
pub mod ser;
pub mod writer;

pub use de::XmlDeserializer;
pub use error::{XmlError, XmlErrorKind};
pub use reader::{QualifiedName, XmlReader, XmlSubtreeReader, XmlToken};
pub use ser::XmlSerializer;
pub use writer::{WriteOptions, XmlWriter};
