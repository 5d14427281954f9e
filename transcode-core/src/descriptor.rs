//! Field and object descriptors (spec §4.1).
//!
//! A [`FieldDescriptor`]'s `index` is assigned once, when it is registered
//! into an [`ObjectDescriptor`], and is immutable afterwards — this is the
//! stable per-field index `findNextFieldIndex()` returns during
//! deserialization. Because the index isn't known until registration,
//! fields are built as an [`UnindexedField`] first and only become a
//! [`FieldDescriptor`] inside [`ObjectDescriptor::build`].

#[cfg(feature = "alloc")]
use alloc::{string::String, vec::Vec};

use crate::serial_kind::SerialKind;
use crate::traits::TraitBag;

/// A field, before it has been assigned a stable index by registering it
/// into an [`ObjectDescriptor`].
pub struct UnindexedField {
    kind: SerialKind,
    serial_name: String,
    traits: TraitBag,
}

impl UnindexedField {
    /// Start building a field of the given logical kind and wire-neutral
    /// serial name.
    pub fn new(kind: SerialKind, serial_name: impl Into<String>) -> Self {
        Self {
            kind,
            serial_name: serial_name.into(),
            traits: TraitBag::new(),
        }
    }

    /// Attach a trait, preserving declaration order.
    pub fn with_trait<T: crate::traits::Trait>(mut self, value: T) -> Self {
        self.traits.push(value);
        self
    }
}

/// `{ kind, serialName, traits[], index }` (spec §3).
pub struct FieldDescriptor {
    kind: SerialKind,
    serial_name: String,
    traits: TraitBag,
    index: usize,
}

impl FieldDescriptor {
    /// The field's logical type.
    pub fn kind(&self) -> SerialKind {
        self.kind
    }

    /// The field's wire-neutral serial name; format-specific traits (e.g.
    /// [`crate::traits::XmlSerialName`]) override it per codec.
    pub fn serial_name(&self) -> &str {
        &self.serial_name
    }

    /// The traits attached to this field.
    pub fn traits(&self) -> &TraitBag {
        &self.traits
    }

    /// The field's stable, zero-based position within its
    /// [`ObjectDescriptor`]. Immutable after registration.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// `{ fields: ordered list of Field Descriptor, traits[] }` (spec §3).
///
/// Invariant: `fields()[i].index() == i` for all `i`.
pub struct ObjectDescriptor {
    fields: Vec<FieldDescriptor>,
    traits: TraitBag,
}

impl ObjectDescriptor {
    /// `buildObjectDescriptor(objectTraits, fields[]) -> ObjectDescriptor`:
    /// assigns stable indices `0..n-1` in declaration order.
    pub fn build(traits: TraitBag, fields: Vec<UnindexedField>) -> Self {
        let fields = fields
            .into_iter()
            .enumerate()
            .map(|(index, f)| FieldDescriptor {
                kind: f.kind,
                serial_name: f.serial_name,
                traits: f.traits,
                index,
            })
            .collect();
        Self { fields, traits }
    }

    /// The fields, in declaration order, each with its assigned index.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field by its stable index.
    pub fn field(&self, index: usize) -> Option<&FieldDescriptor> {
        self.fields.get(index)
    }

    /// The object-level traits (e.g. root `XmlSerialName`, `XmlNamespace`,
    /// `QueryLiteral`s).
    pub fn traits(&self) -> &TraitBag {
        &self.traits
    }
}
