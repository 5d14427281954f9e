//! Integration coverage for the XML entity-safety scenario (spec §8
//! scenario 6): a `DOCTYPE`/external-entity payload must be rejected as
//! `InvalidReference` through the full schema-directed deserializer, not
//! just the raw token reader.

use transcode_core::descriptor::{ObjectDescriptor, UnindexedField};
use transcode_core::traits::TraitBag;
use transcode_core::{Deserializer, SerialKind, StructIter};
use transcode_xml::{XmlDeserializer, XmlErrorKind};

fn descriptor() -> ObjectDescriptor {
    ObjectDescriptor::build(
        TraitBag::new(),
        vec![UnindexedField::new(SerialKind::String, "name")],
    )
}

#[test]
fn doctype_with_external_entity_is_rejected() {
    let desc = descriptor();
    let input =
        b"<!DOCTYPE a [<!ENTITY xxe SYSTEM \"file:///etc/passwd\">]><a><name>&xxe;</name></a>";
    let mut de = XmlDeserializer::new(input);
    let err = de
        .deserialize_struct(&desc)
        .expect_err("DOCTYPE must not be accepted");
    assert!(matches!(err.kind(), XmlErrorKind::InvalidReference));
}

#[test]
fn bare_entity_reference_in_text_is_rejected() {
    let desc = descriptor();
    let input = b"<a><name>&xxe;</name></a>";
    let mut de = XmlDeserializer::new(input);
    de.deserialize_struct(&desc).unwrap();
    assert_eq!(
        de.find_next_field_index(&desc).unwrap(),
        transcode_core::FieldIndex::Index(0)
    );
    let err = de
        .deserialize_string()
        .expect_err("an undeclared entity reference must not be accepted");
    assert!(matches!(err.kind(), XmlErrorKind::InvalidReference));
}
