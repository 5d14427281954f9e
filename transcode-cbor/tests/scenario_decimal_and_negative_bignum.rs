//! Integration coverage for spec §8 scenarios 3 and 4: CBOR's decimal
//! fraction tag and its negative-integer encoding.

use transcode_cbor::{CborDeserializer, CborSerializer};
use transcode_core::descriptor::{ObjectDescriptor, UnindexedField};
use transcode_core::traits::TraitBag;
use transcode_core::{Deserializer, Document, FieldIndex, SerialKind, Serializer, StructIter};

fn struct_descriptor() -> ObjectDescriptor {
    ObjectDescriptor::build(
        TraitBag::new(),
        vec![
            UnindexedField::new(SerialKind::Integer, "a"),
            UnindexedField::new(SerialKind::Long, "b"),
        ],
    )
}

#[test]
fn struct_fields_round_trip_positionally() {
    let desc = struct_descriptor();
    let mut ser = CborSerializer::new();
    ser.begin_struct(&desc).unwrap();
    ser.field_integer(&desc.fields()[0], 42).unwrap();
    ser.field_long(&desc.fields()[1], -1).unwrap();
    ser.end_struct().unwrap();
    let bytes = ser.into_bytes();

    let mut de = CborDeserializer::from_slice(&bytes);
    de.deserialize_struct(&desc).unwrap();
    let mut a = None;
    let mut b = None;
    loop {
        match de.find_next_field_index(&desc).unwrap() {
            FieldIndex::Exhausted => break,
            FieldIndex::Unknown => de.skip_value().unwrap(),
            FieldIndex::Index(0) => a = Some(de.deserialize_integer().unwrap()),
            FieldIndex::Index(1) => b = Some(de.deserialize_long().unwrap()),
            FieldIndex::Index(_) => unreachable!(),
        }
    }
    de.end_struct().unwrap();
    assert_eq!(a, Some(42));
    assert_eq!(b, Some(-1));
}

#[test]
fn decimal_fraction_matches_worked_example() {
    // spec §8 scenario 3: BigDecimal("273.15") <-> c4 82 21 19 6a b3
    let bytes = [0xc4u8, 0x82, 0x21, 0x19, 0x6a, 0xb3];
    let mut de = CborDeserializer::from_slice(&bytes);
    assert_eq!(
        de.deserialize_document().unwrap(),
        Document::String(String::from("273.15"))
    );
}

#[test]
fn quantified_negative_integer_invariant() {
    // spec §8: for all CBOR negative integers n, n == -1 - asUnsigned(wireArgument(n))
    for (n, argument) in [(-1i64, 0u64), (-2, 1), (-100, 99), (-65536, 65535)] {
        let mut ser = CborSerializer::new();
        ser.serialize_long(n).unwrap();
        let bytes = ser.into_bytes();
        assert_eq!(bytes[0] >> 5, 1); // major 1 (negative integer)

        let mut de = CborDeserializer::from_slice(&bytes);
        assert_eq!(de.deserialize_long().unwrap(), n);
        assert_eq!(n, -1 - argument as i64);
    }
}

#[test]
fn scenario_four_negative_integer_overflows_i64() {
    // spec §8 scenario 4, using the wire bytes consistent with its own
    // "stored argument ULong.MAX_VALUE" description and the quantified
    // invariant above (the literal hex in the prose has a typo'd final byte).
    let bytes = [0x3bu8, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
    let mut de = CborDeserializer::from_slice(&bytes);
    assert!(de.deserialize_long().is_err());
}
