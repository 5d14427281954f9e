//! Integration coverage for the XML list-of-structs scenario (spec §8
//! scenario 5): a non-flattened list whose items are themselves structs,
//! round-tripped through XML.

use transcode_core::descriptor::{ObjectDescriptor, UnindexedField};
use transcode_core::traits::TraitBag;
use transcode_core::{Deserializer, FieldIndex, ListIter, SerialKind, Serializer, StructIter};
use transcode_xml::writer::WriteOptions;
use transcode_xml::{XmlDeserializer, XmlSerializer};

fn item_descriptor() -> ObjectDescriptor {
    ObjectDescriptor::build(
        TraitBag::new(),
        vec![UnindexedField::new(SerialKind::String, "name")],
    )
}

fn foo_item_descriptor() -> ObjectDescriptor {
    ObjectDescriptor::build(
        TraitBag::new(),
        vec![
            UnindexedField::new(SerialKind::String, "fooMember"),
            UnindexedField::new(SerialKind::Integer, "someInt"),
        ],
    )
}

fn response_descriptor() -> ObjectDescriptor {
    ObjectDescriptor::build(
        TraitBag::new(),
        vec![UnindexedField::new(SerialKind::List, "parentList")],
    )
}

#[test]
fn encodes_a_list_of_structs() {
    let outer = response_descriptor();
    let inner = item_descriptor();
    let mut ser = XmlSerializer::new(WriteOptions::no_prologue());
    ser.begin_struct(&outer).unwrap();
    ser.field_name(&outer.fields()[0]).unwrap();
    ser.begin_list(&outer.fields()[0], 2).unwrap();
    ser.begin_struct(&inner).unwrap();
    ser.field_string(&inner.fields()[0], "a").unwrap();
    ser.end_struct().unwrap();
    ser.begin_struct(&inner).unwrap();
    ser.field_string(&inner.fields()[0], "b").unwrap();
    ser.end_struct().unwrap();
    ser.end_list().unwrap();
    ser.end_struct().unwrap();

    assert_eq!(
        ser.finish(),
        "<root>\n    <parentList>\n        <member>\n            <name>a</name>\n        </member>\n        <member>\n            <name>b</name>\n        </member>\n    </parentList>\n</root>"
    );
}

#[test]
fn decodes_a_list_of_structs() {
    let outer = response_descriptor();
    let inner = item_descriptor();
    let xml = b"<FooResponse><parentList><member><name>a</name></member><member><name>b</name></member></parentList></FooResponse>";
    let mut de = XmlDeserializer::new(xml);
    de.deserialize_struct(&outer).unwrap();
    assert_eq!(
        de.find_next_field_index(&outer).unwrap(),
        FieldIndex::Index(0)
    );
    de.deserialize_list(&outer.fields()[0]).unwrap();

    let mut names = Vec::new();
    while de.has_next_element().unwrap() {
        de.deserialize_struct(&inner).unwrap();
        let mut name = None;
        loop {
            match de.find_next_field_index(&inner).unwrap() {
                FieldIndex::Exhausted => break,
                FieldIndex::Unknown => de.skip_value().unwrap(),
                FieldIndex::Index(0) => name = Some(de.deserialize_string().unwrap()),
                FieldIndex::Index(_) => unreachable!(),
            }
        }
        de.end_struct().unwrap();
        names.push(name.unwrap());
    }
    de.end_list().unwrap();
    assert_eq!(
        de.find_next_field_index(&outer).unwrap(),
        FieldIndex::Exhausted
    );
    de.end_struct().unwrap();

    assert_eq!(names, vec![String::from("a"), String::from("b")]);
}

#[test]
fn decodes_the_worked_example_literally() {
    // spec §8 scenario 5, reproduced byte-for-byte.
    let outer = response_descriptor();
    let inner = foo_item_descriptor();
    let xml = b"<FooResponse><parentList><member><fooMember>a</fooMember><someInt>3</someInt></member><member><fooMember>c</fooMember><someInt>6</someInt></member></parentList></FooResponse>";
    let mut de = XmlDeserializer::new(xml);
    de.deserialize_struct(&outer).unwrap();
    assert_eq!(
        de.find_next_field_index(&outer).unwrap(),
        FieldIndex::Index(0)
    );
    de.deserialize_list(&outer.fields()[0]).unwrap();

    let mut items = Vec::new();
    while de.has_next_element().unwrap() {
        de.deserialize_struct(&inner).unwrap();
        let mut foo_member = None;
        let mut some_int = None;
        loop {
            match de.find_next_field_index(&inner).unwrap() {
                FieldIndex::Exhausted => break,
                FieldIndex::Unknown => de.skip_value().unwrap(),
                FieldIndex::Index(0) => foo_member = Some(de.deserialize_string().unwrap()),
                FieldIndex::Index(1) => some_int = Some(de.deserialize_integer().unwrap()),
                FieldIndex::Index(_) => unreachable!(),
            }
        }
        de.end_struct().unwrap();
        items.push((foo_member.unwrap(), some_int.unwrap()));
    }
    de.end_list().unwrap();
    assert_eq!(
        de.find_next_field_index(&outer).unwrap(),
        FieldIndex::Exhausted
    );
    de.end_struct().unwrap();

    assert_eq!(
        items,
        vec![(String::from("a"), 3), (String::from("c"), 6)]
    );
}
