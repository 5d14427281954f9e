#![warn(missing_docs)]
//! Form-URL codec engine (spec §4.5): an encode-only schema-directed
//! serializer producing `application/x-www-form-urlencoded` query strings.

pub mod error;
pub mod ser;

pub use error::{FormUrlError, FormUrlErrorKind};
pub use ser::FormUrlSerializer;
