//! The schema-directed push/pull API (spec §2 layer 4, §6 "External
//! Interfaces"): the format-agnostic operations every codec engine exposes
//! to generated or hand-written serializers, and that every schema
//! deserializer exposes to consumers.
//!
//! Grounded in `facet_format::FormatSerializer`/`FormatParser`: one
//! `&mut self`-threaded state machine per engine rather than a tree of
//! nested borrowed sub-serializers, with an associated `Error` type per
//! format. Unlike the teacher's reflection-driven trait, fields are
//! identified by [`crate::FieldDescriptor`] rather than discovered via
//! `Shape` introspection, and object fields are pushed with an explicit
//! scalar per [`crate::SerialKind`] rather than one generic `ScalarValue`.

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::descriptor::{FieldDescriptor, ObjectDescriptor};
use crate::document::Document;
use crate::instant::Instant;

/// The outcome of asking a struct iterator for the next field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldIndex {
    /// A field recognized by the object descriptor, at this stable index.
    Index(usize),
    /// A field present on the wire but not named by the descriptor.
    /// Callers must explicitly skip its value.
    Unknown,
    /// No more fields remain; the struct is exhausted.
    Exhausted,
}

/// Schema-directed serializer contract (spec §6 "Producer surface").
///
/// One `Serializer` instance is threaded through an entire encode call;
/// `begin_*`/`end_*` push and pop nesting levels on the underlying engine
/// rather than returning nested sub-serializers.
pub trait Serializer {
    /// The format-specific error type.
    type Error;

    /// Push a struct/object level, honoring the descriptor's object-level
    /// traits (root name, namespace, query literals, ...).
    fn begin_struct(&mut self, descriptor: &ObjectDescriptor) -> Result<(), Self::Error>;
    /// Pop the current struct/object level.
    fn end_struct(&mut self) -> Result<(), Self::Error>;

    /// Push a list level of `size` elements for the field described by
    /// `descriptor`. `size` must be exact: formats with definite-length
    /// wire representations (CBOR) need it up front; formats that don't
    /// (JSON, XML) ignore it.
    fn begin_list(&mut self, descriptor: &FieldDescriptor, size: usize) -> Result<(), Self::Error>;
    /// Pop the current list level.
    fn end_list(&mut self) -> Result<(), Self::Error>;

    /// Push a map level of `size` entries for the field described by
    /// `descriptor`. Same exactness requirement as [`Serializer::begin_list`].
    fn begin_map(&mut self, descriptor: &FieldDescriptor, size: usize) -> Result<(), Self::Error>;
    /// Pop the current map level.
    fn end_map(&mut self) -> Result<(), Self::Error>;

    /// Emit the current field's wire key, honoring its naming traits.
    /// A no-op for element-positional formats (CBOR).
    fn field_name(&mut self, descriptor: &FieldDescriptor) -> Result<(), Self::Error>;

    /// Emit a boolean value.
    fn serialize_boolean(&mut self, value: bool) -> Result<(), Self::Error>;
    /// Emit an 8-bit signed integer value.
    fn serialize_byte(&mut self, value: i8) -> Result<(), Self::Error>;
    /// Emit a 16-bit signed integer value.
    fn serialize_short(&mut self, value: i16) -> Result<(), Self::Error>;
    /// Emit a 32-bit signed integer value.
    fn serialize_integer(&mut self, value: i32) -> Result<(), Self::Error>;
    /// Emit a 64-bit signed integer value.
    fn serialize_long(&mut self, value: i64) -> Result<(), Self::Error>;
    /// Emit an IEEE-754 single-precision value.
    fn serialize_float(&mut self, value: f32) -> Result<(), Self::Error>;
    /// Emit an IEEE-754 double-precision value.
    fn serialize_double(&mut self, value: f64) -> Result<(), Self::Error>;
    /// Emit a single Unicode scalar value.
    fn serialize_char(&mut self, value: char) -> Result<(), Self::Error>;
    /// Emit a UTF-8 string value.
    fn serialize_string(&mut self, value: &str) -> Result<(), Self::Error>;
    /// Emit an opaque byte blob.
    fn serialize_blob(&mut self, value: &[u8]) -> Result<(), Self::Error>;
    /// Emit a timestamp value.
    fn serialize_timestamp(&mut self, value: Instant) -> Result<(), Self::Error>;
    /// Emit an untyped document value.
    fn serialize_document(&mut self, value: &Document) -> Result<(), Self::Error>;
    /// Emit an explicit null/absent value.
    fn serialize_null(&mut self) -> Result<(), Self::Error>;

    /// `field(descriptor, value)` for booleans: emit the field's key (if
    /// any) followed by its value, in one call.
    fn field_boolean(&mut self, descriptor: &FieldDescriptor, value: bool) -> Result<(), Self::Error> {
        self.field_name(descriptor)?;
        self.serialize_boolean(value)
    }
    /// `field(descriptor, value)` for bytes.
    fn field_byte(&mut self, descriptor: &FieldDescriptor, value: i8) -> Result<(), Self::Error> {
        self.field_name(descriptor)?;
        self.serialize_byte(value)
    }
    /// `field(descriptor, value)` for shorts.
    fn field_short(&mut self, descriptor: &FieldDescriptor, value: i16) -> Result<(), Self::Error> {
        self.field_name(descriptor)?;
        self.serialize_short(value)
    }
    /// `field(descriptor, value)` for integers.
    fn field_integer(&mut self, descriptor: &FieldDescriptor, value: i32) -> Result<(), Self::Error> {
        self.field_name(descriptor)?;
        self.serialize_integer(value)
    }
    /// `field(descriptor, value)` for longs.
    fn field_long(&mut self, descriptor: &FieldDescriptor, value: i64) -> Result<(), Self::Error> {
        self.field_name(descriptor)?;
        self.serialize_long(value)
    }
    /// `field(descriptor, value)` for floats.
    fn field_float(&mut self, descriptor: &FieldDescriptor, value: f32) -> Result<(), Self::Error> {
        self.field_name(descriptor)?;
        self.serialize_float(value)
    }
    /// `field(descriptor, value)` for doubles.
    fn field_double(&mut self, descriptor: &FieldDescriptor, value: f64) -> Result<(), Self::Error> {
        self.field_name(descriptor)?;
        self.serialize_double(value)
    }
    /// `field(descriptor, value)` for chars.
    fn field_char(&mut self, descriptor: &FieldDescriptor, value: char) -> Result<(), Self::Error> {
        self.field_name(descriptor)?;
        self.serialize_char(value)
    }
    /// `field(descriptor, value)` for strings.
    fn field_string(&mut self, descriptor: &FieldDescriptor, value: &str) -> Result<(), Self::Error> {
        self.field_name(descriptor)?;
        self.serialize_string(value)
    }
    /// `field(descriptor, value)` for blobs.
    fn field_blob(&mut self, descriptor: &FieldDescriptor, value: &[u8]) -> Result<(), Self::Error> {
        self.field_name(descriptor)?;
        self.serialize_blob(value)
    }
    /// `field(descriptor, value)` for timestamps.
    fn field_timestamp(&mut self, descriptor: &FieldDescriptor, value: Instant) -> Result<(), Self::Error> {
        self.field_name(descriptor)?;
        self.serialize_timestamp(value)
    }
    /// `field(descriptor, value)` for documents.
    fn field_document(&mut self, descriptor: &FieldDescriptor, value: &Document) -> Result<(), Self::Error> {
        self.field_name(descriptor)?;
        self.serialize_document(value)
    }
}

/// A value that knows how to push itself into any [`Serializer`] of
/// format `S` (`serializeSdkSerializable(v)`, spec §6).
pub trait SdkSerializable<S: Serializer> {
    /// Push this value's fields into `serializer`.
    fn serialize(&self, serializer: &mut S) -> Result<(), S::Error>;
}

/// Schema-directed deserializer contract (spec §6 "Consumer surface").
pub trait Deserializer {
    /// The format-specific error type.
    type Error;

    /// Begin iterating a struct's fields against `descriptor`, returning an
    /// iterator driver; the caller loops calling
    /// [`StructIter::find_next_field_index`] until [`FieldIndex::Exhausted`].
    fn deserialize_struct(&mut self, descriptor: &ObjectDescriptor) -> Result<(), Self::Error>;
    /// End the current struct.
    fn end_struct(&mut self) -> Result<(), Self::Error>;

    /// Begin iterating a list's elements.
    fn deserialize_list(&mut self, descriptor: &FieldDescriptor) -> Result<(), Self::Error>;
    /// End the current list.
    fn end_list(&mut self) -> Result<(), Self::Error>;

    /// Begin iterating a map's entries.
    fn deserialize_map(&mut self, descriptor: &FieldDescriptor) -> Result<(), Self::Error>;
    /// End the current map.
    fn end_map(&mut self) -> Result<(), Self::Error>;

    /// Consume and discard the next value, recursing into containers
    /// (`skipValue()`).
    fn skip_value(&mut self) -> Result<(), Self::Error>;

    /// Read a boolean value.
    fn deserialize_boolean(&mut self) -> Result<bool, Self::Error>;
    /// Read an 8-bit signed integer, narrowing with overflow checks.
    fn deserialize_byte(&mut self) -> Result<i8, Self::Error>;
    /// Read a 16-bit signed integer, narrowing with overflow checks.
    fn deserialize_short(&mut self) -> Result<i16, Self::Error>;
    /// Read a 32-bit signed integer, narrowing with overflow checks.
    fn deserialize_integer(&mut self) -> Result<i32, Self::Error>;
    /// Read a 64-bit signed integer.
    fn deserialize_long(&mut self) -> Result<i64, Self::Error>;
    /// Read an IEEE-754 single-precision value.
    fn deserialize_float(&mut self) -> Result<f32, Self::Error>;
    /// Read an IEEE-754 double-precision value.
    fn deserialize_double(&mut self) -> Result<f64, Self::Error>;
    /// Read a single Unicode scalar value.
    fn deserialize_char(&mut self) -> Result<char, Self::Error>;
    /// Read a scalar token's literal text, with no type narrowing; accepts
    /// any scalar (spec §9: "deliberate, to support custom timestamp
    /// parsing").
    fn deserialize_string(&mut self) -> Result<alloc::string::String, Self::Error>;
    /// Read an opaque byte blob.
    fn deserialize_blob(&mut self) -> Result<Vec<u8>, Self::Error>;
    /// Read a timestamp value.
    fn deserialize_timestamp(&mut self) -> Result<Instant, Self::Error>;
    /// Read an untyped document value.
    fn deserialize_document(&mut self) -> Result<Document, Self::Error>;
    /// Consume an explicit null (or, for CBOR, `undefined`).
    fn deserialize_null(&mut self) -> Result<(), Self::Error>;
}

/// Drives struct field iteration (`StructIter`, spec §6).
pub trait StructIter {
    /// The format-specific error type.
    type Error;

    /// The known index, [`FieldIndex::Unknown`], or [`FieldIndex::
    /// Exhausted`].
    fn find_next_field_index(
        &mut self,
        descriptor: &ObjectDescriptor,
    ) -> Result<FieldIndex, Self::Error>;
}

/// Drives list element iteration (`ListIter`, spec §6).
pub trait ListIter {
    /// The format-specific error type.
    type Error;

    /// Whether another element follows.
    fn has_next_element(&mut self) -> Result<bool, Self::Error>;
    /// Whether the element just entered has a value (`false` for a sparse
    /// null placeholder, which the caller should decode as null without
    /// calling a scalar `deserialize_*`).
    fn next_has_value(&mut self) -> Result<bool, Self::Error>;
}

/// Drives map entry iteration (`MapIter`, spec §6).
pub trait MapIter {
    /// The format-specific error type.
    type Error;

    /// Whether another entry follows.
    fn has_next_entry(&mut self) -> Result<bool, Self::Error>;
    /// Whether the entry just entered has a value (sparse map support).
    fn next_has_value(&mut self) -> Result<bool, Self::Error>;
}
