//! Field and object traits (spec §3 "Trait") and the [`TraitBag`] that holds
//! them.
//!
//! Rust has no reified generics, so the spec's `hasTrait<T>`/`findTrait<T>`/
//! `expectTrait<T>` surface is expressed here the way type-keyed extension
//! storage is expressed elsewhere in the ecosystem (`http::Extensions`,
//! `tower::util::Extensions`): each trait is its own small, `'static` type,
//! and [`TraitBag`] stores them type-erased, looked up by
//! [`core::any::TypeId`].

#[cfg(feature = "alloc")]
use alloc::{boxed::Box, string::String, vec::Vec};
use core::any::Any;

use crate::error::{CoreError, CoreErrorKind};

/// Object-level or field-level `@jsonName`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonSerialName(pub String);

/// Marks a field as accepting any otherwise-unrecognized JSON member (a
/// catch-all map field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonUnknownField;

/// XML local name, optionally namespace-prefixed at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlSerialName(pub String);

/// Marks a field as an XML attribute rather than a child element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlAttribute;

/// An XML namespace declaration, with an optional prefix (absent = default
/// namespace).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNamespace {
    /// Namespace URI.
    pub uri: String,
    /// Declared prefix, if any.
    pub prefix: Option<String>,
}

/// Overrides the default `member` element name for list items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlCollectionName {
    /// Element name used for each list item.
    pub element: String,
}

/// Namespace applied to collection value elements specifically (distinct
/// from the collection's own wrapper namespace).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlCollectionValueNamespace {
    /// Namespace URI.
    pub uri: String,
    /// Declared prefix, if any.
    pub prefix: Option<String>,
}

/// Overrides the default `entry`/`key`/`value` element names for maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlMapName {
    /// Wrapper element name for each entry.
    pub entry: String,
    /// Element name for the key.
    pub key: String,
    /// Element name for the value.
    pub value: String,
}

/// Omit the wrapper element/key segment; repeat the member name directly
/// under the parent. Shared meaning across XML lists and maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flattened;

/// Permits null elements/values, rendered as empty elements and preserved
/// as null on decode (XML only — form-url sparse values are always an
/// error, see [`crate::error::Category`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SparseValues;

/// form-url field/path-segment name override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormUrlSerialName(pub String);

/// Omit the `entry`/member wrapper segment in form-url keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormUrlFlattened;

/// Overrides the default `member` path segment for list items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormUrlCollectionName {
    /// Path segment used for each list item.
    pub member: String,
}

/// Overrides the default `key`/`value` path segments for map entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormUrlMapName {
    /// Path segment for the key.
    pub key: String,
    /// Path segment for the value.
    pub value: String,
}

/// An object-level literal `key=value` pair emitted verbatim and first, in
/// declaration order. An object descriptor may carry more than one; use
/// [`TraitBag::find_all`] to enumerate them all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryLiteral {
    /// Literal key.
    pub key: String,
    /// Literal value (still percent-encoded at render time).
    pub value: String,
}

/// CBOR map-key text override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CborSerialName(pub String);

/// The wire representation a `Timestamp` field renders as, for formats
/// where no single representation is implied by the wire type itself (XML,
/// JSON, form-url — CBOR always uses tag 1, see §4.6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormatKind {
    /// Seconds since the Unix epoch, as a decimal number. The default.
    EpochSeconds,
    /// ISO-8601 `date-time` (`2023-03-07T12:34:56Z`).
    DateTime,
    /// RFC 2822 / HTTP-date (`Tue, 07 Mar 2023 12:34:56 GMT`).
    HttpDate,
}

/// `TimestampFormat` trait payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampFormat(pub TimestampFormatKind);

/// Marker trait implemented by every trait payload type storable in a
/// [`TraitBag`]. Blanket-implemented; never implement it directly.
pub trait Trait: Any + core::fmt::Debug {}

impl<T: Any + core::fmt::Debug> Trait for T {}

/// An ordered, type-heterogeneous collection of traits attached to a field
/// or object descriptor.
#[derive(Debug, Default)]
pub struct TraitBag {
    items: Vec<Box<dyn Any>>,
}

impl TraitBag {
    /// An empty trait bag.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a trait bag from a list of boxed trait payloads.
    pub fn from_traits(items: Vec<Box<dyn Any>>) -> Self {
        Self { items }
    }

    /// Attach another trait, preserving declaration order.
    pub fn push<T: Trait>(&mut self, value: T) {
        self.items.push(Box::new(value));
    }

    /// Whether a trait of type `T` is present.
    pub fn has_trait<T: Trait>(&self) -> bool {
        self.find_trait::<T>().is_some()
    }

    /// The first trait of type `T`, if any.
    pub fn find_trait<T: Trait>(&self) -> Option<&T> {
        self.items.iter().find_map(|b| b.downcast_ref::<T>())
    }

    /// Every trait of type `T`, in declaration order.
    pub fn find_all<T: Trait>(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter_map(|b| b.downcast_ref::<T>())
    }

    /// The first trait of type `T`, or a [`CoreErrorKind::MissingTrait`]
    /// error naming `T` via [`core::any::type_name`].
    pub fn expect_trait<T: Trait>(&self) -> Result<&T, CoreError> {
        self.find_trait::<T>().ok_or_else(|| {
            let trait_name = core::any::type_name::<T>();
            log::debug!("expect_trait: `{trait_name}` missing from descriptor");
            CoreError::new(CoreErrorKind::MissingTrait { trait_name })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_and_miss() {
        let mut bag = TraitBag::new();
        bag.push(XmlAttribute);
        bag.push(XmlSerialName(String::from("foo")));
        assert!(bag.has_trait::<XmlAttribute>());
        assert_eq!(bag.find_trait::<XmlSerialName>().unwrap().0, "foo");
        assert!(bag.find_trait::<Flattened>().is_none());
        assert!(bag.expect_trait::<Flattened>().is_err());
    }

    #[test]
    fn find_all_preserves_order() {
        let mut bag = TraitBag::new();
        bag.push(QueryLiteral { key: String::from("Action"), value: String::from("Foo") });
        bag.push(QueryLiteral { key: String::from("Version"), value: String::from("2015-03-31") });
        let keys: Vec<_> = bag.find_all::<QueryLiteral>().map(|q| q.key.clone()).collect();
        assert_eq!(keys, ["Action", "Version"]);
    }
}
