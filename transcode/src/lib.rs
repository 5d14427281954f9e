#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
//! One [`Serializer`]/[`Deserializer`] contract, several wire formats.
//!
//! This crate just re-exports [`transcode_core`]'s format-agnostic surface
//! at the top level, plus a module per enabled codec engine (`json`, `xml`,
//! `formurl`, `cbor`), each gated by its own feature so a consumer who only
//! needs one format doesn't pull in the others' dependencies.

#[cfg(feature = "alloc")]
extern crate alloc;

pub use transcode_core::{
    bignum, blob, descriptor, document, error, instant, schema, serial_kind, traits,
    BigDecimal, BigInteger, Buffer, Category, CoreError, CoreErrorKind, Deserializer, Document,
    FieldDescriptor, FieldIndex, Instant, ListIter, MapIter, ObjectDescriptor, SdkSerializable,
    SerialKind, Serializer, StructIter, Trait, TraitBag,
};

/// JSON codec engine (spec §4.3), re-exported from `transcode-json`.
#[cfg(feature = "json")]
pub mod json {
    pub use transcode_json::*;
}

/// XML codec engine (spec §4.4), re-exported from `transcode-xml`.
#[cfg(feature = "xml")]
pub mod xml {
    pub use transcode_xml::*;
}

/// `application/x-www-form-urlencoded` codec engine (spec §4.5), re-exported
/// from `transcode-formurl`.
#[cfg(feature = "formurl")]
pub mod formurl {
    pub use transcode_formurl::*;
}

/// CBOR codec engine (spec §4.6), re-exported from `transcode-cbor`.
#[cfg(feature = "cbor")]
pub mod cbor {
    pub use transcode_cbor::*;
}
