//! Integration coverage for the form-URL nested-struct scenario (spec §8
//! scenario 2): object-level literal traits plus a map field, encoded as a
//! single `application/x-www-form-urlencoded` line.

use transcode_core::descriptor::{ObjectDescriptor, UnindexedField};
use transcode_core::traits::{QueryLiteral, TraitBag};
use transcode_core::{SerialKind, Serializer};
use transcode_formurl::FormUrlSerializer;

fn descriptor() -> ObjectDescriptor {
    let mut object_traits = TraitBag::new();
    object_traits.push(QueryLiteral {
        key: String::from("Action"),
        value: String::from("FooOperation"),
    });
    object_traits.push(QueryLiteral {
        key: String::from("Version"),
        value: String::from("2015-03-31"),
    });
    ObjectDescriptor::build(
        object_traits,
        vec![UnindexedField::new(SerialKind::Map, "Tags")],
    )
}

#[test]
fn encodes_matching_the_worked_example() {
    let desc = descriptor();
    let mut ser = FormUrlSerializer::new();
    ser.begin_struct(&desc).unwrap();
    ser.field_name(&desc.fields()[0]).unwrap();
    ser.begin_map(&desc.fields()[0], 2).unwrap();
    ser.serialize_string("k1").unwrap();
    ser.serialize_string("v1").unwrap();
    ser.serialize_string("k2").unwrap();
    ser.serialize_string("v2").unwrap();
    ser.end_map().unwrap();
    ser.end_struct().unwrap();

    assert_eq!(
        ser.finish(),
        "Action=FooOperation&Version=2015-03-31&Tags.entry.1.key=k1&Tags.entry.1.value=v1&Tags.entry.2.key=k2&Tags.entry.2.value=v2"
    );
}

#[test]
fn unreserved_characters_pass_through_unescaped() {
    let desc = ObjectDescriptor::build(
        TraitBag::new(),
        vec![UnindexedField::new(SerialKind::String, "path")],
    );
    let mut ser = FormUrlSerializer::new();
    ser.begin_struct(&desc).unwrap();
    ser.field_string(&desc.fields()[0], "a-b_c.d~e f").unwrap();
    ser.end_struct().unwrap();
    assert_eq!(ser.finish(), "path=a-b_c.d~e%20f");
}
