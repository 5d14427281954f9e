#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
//! Schema-directed serialization core.
//!
//! This crate defines the format-agnostic surface that every wire codec in
//! the `transcode` family (`transcode-json`, `transcode-xml`,
//! `transcode-formurl`, `transcode-cbor`) is built against: [`Buffer`], field
//! and object [`descriptor`]s with their [`traits`][crate::traits], the
//! closed [`SerialKind`] set, and the [`Serializer`]/[`Deserializer`]
//! contracts in [`schema`].
//!
//! Descriptors are built once (typically as `static` data next to a
//! generated type) and shared across every codec; it is the per-field
//! [`Trait`](traits::Trait) set that tells each codec engine how to render
//! or parse that field on the wire.

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod bignum;
pub mod blob;
pub mod buffer;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod instant;
pub mod schema;
pub mod serial_kind;
pub mod traits;

pub use bignum::{BigDecimal, BigInteger};
pub use buffer::Buffer;
pub use descriptor::{FieldDescriptor, ObjectDescriptor};
pub use document::Document;
pub use error::{Category, CoreError, CoreErrorKind};
pub use instant::Instant;
pub use schema::{
    Deserializer, FieldIndex, ListIter, MapIter, SdkSerializable, Serializer, StructIter,
};
pub use serial_kind::SerialKind;
pub use traits::{Trait, TraitBag};
