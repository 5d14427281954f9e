//! Integration coverage for the all-primitives struct scenario (spec §8
//! scenario 1): every scalar `SerialKind` round-tripped through JSON.

use transcode_core::descriptor::{ObjectDescriptor, UnindexedField};
use transcode_core::traits::TraitBag;
use transcode_core::{Deserializer, FieldIndex, SerialKind, Serializer, StructIter};
use transcode_json::writer::WriteOptions;
use transcode_json::{JsonDeserializer, JsonSerializer};

fn descriptor() -> ObjectDescriptor {
    ObjectDescriptor::build(
        TraitBag::new(),
        vec![
            UnindexedField::new(SerialKind::Boolean, "boolean"),
            UnindexedField::new(SerialKind::Byte, "byte"),
            UnindexedField::new(SerialKind::Short, "short"),
            UnindexedField::new(SerialKind::Integer, "int"),
            UnindexedField::new(SerialKind::Long, "long"),
            UnindexedField::new(SerialKind::Float, "float"),
            UnindexedField::new(SerialKind::Double, "double"),
            UnindexedField::new(SerialKind::Char, "char"),
            UnindexedField::new(SerialKind::String, "string"),
        ],
    )
}

#[test]
fn encodes_matching_the_worked_example() {
    let desc = descriptor();
    let mut ser = JsonSerializer::new(WriteOptions::compact());
    ser.begin_struct(&desc).unwrap();
    ser.field_boolean(&desc.fields()[0], true).unwrap();
    ser.field_byte(&desc.fields()[1], 10).unwrap();
    ser.field_short(&desc.fields()[2], 20).unwrap();
    ser.field_integer(&desc.fields()[3], 30).unwrap();
    ser.field_long(&desc.fields()[4], 40).unwrap();
    ser.field_float(&desc.fields()[5], 50.0).unwrap();
    ser.field_double(&desc.fields()[6], 60.0).unwrap();
    ser.field_char(&desc.fields()[7], 'A').unwrap();
    ser.field_string(&desc.fields()[8], "Str0").unwrap();
    ser.end_struct().unwrap();

    let out = String::from_utf8(ser.into_bytes()).unwrap();
    assert_eq!(
        out,
        r#"{"boolean":true,"byte":10,"short":20,"int":30,"long":40,"float":50.0,"double":60.0,"char":"A","string":"Str0"}"#
    );
}

#[test]
fn decodes_back_into_the_same_values() {
    let desc = descriptor();
    let input = r#"{"boolean":true,"byte":10,"short":20,"int":30,"long":40,"float":50.0,"double":60.0,"char":"A","string":"Str0"}"#;
    let mut de = JsonDeserializer::from_str(input);
    de.deserialize_struct(&desc).unwrap();

    let mut boolean = None;
    let mut byte = None;
    let mut short = None;
    let mut int = None;
    let mut long = None;
    let mut float = None;
    let mut double = None;
    let mut ch = None;
    let mut string = None;

    loop {
        match de.find_next_field_index(&desc).unwrap() {
            FieldIndex::Exhausted => break,
            FieldIndex::Unknown => de.skip_value().unwrap(),
            FieldIndex::Index(0) => boolean = Some(de.deserialize_boolean().unwrap()),
            FieldIndex::Index(1) => byte = Some(de.deserialize_byte().unwrap()),
            FieldIndex::Index(2) => short = Some(de.deserialize_short().unwrap()),
            FieldIndex::Index(3) => int = Some(de.deserialize_integer().unwrap()),
            FieldIndex::Index(4) => long = Some(de.deserialize_long().unwrap()),
            FieldIndex::Index(5) => float = Some(de.deserialize_float().unwrap()),
            FieldIndex::Index(6) => double = Some(de.deserialize_double().unwrap()),
            FieldIndex::Index(7) => ch = Some(de.deserialize_char().unwrap()),
            FieldIndex::Index(8) => string = Some(de.deserialize_string().unwrap()),
            FieldIndex::Index(_) => unreachable!(),
        }
    }
    de.end_struct().unwrap();

    assert_eq!(boolean, Some(true));
    assert_eq!(byte, Some(10));
    assert_eq!(short, Some(20));
    assert_eq!(int, Some(30));
    assert_eq!(long, Some(40));
    assert_eq!(float, Some(50.0));
    assert_eq!(double, Some(60.0));
    assert_eq!(ch, Some('A'));
    assert_eq!(string, Some(String::from("Str0")));
}

#[test]
fn unknown_fields_are_skipped_by_default() {
    let desc = ObjectDescriptor::build(
        TraitBag::new(),
        vec![UnindexedField::new(SerialKind::Integer, "known")],
    );
    let mut de = JsonDeserializer::from_str(r#"{"extra":{"nested":[1,2,3]},"known":7}"#);
    de.deserialize_struct(&desc).unwrap();
    let mut known = None;
    loop {
        match de.find_next_field_index(&desc).unwrap() {
            FieldIndex::Exhausted => break,
            FieldIndex::Unknown => de.skip_value().unwrap(),
            FieldIndex::Index(0) => known = Some(de.deserialize_integer().unwrap()),
            FieldIndex::Index(_) => unreachable!(),
        }
    }
    de.end_struct().unwrap();
    assert_eq!(known, Some(7));
}
