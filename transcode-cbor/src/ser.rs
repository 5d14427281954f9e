//! Schema-directed CBOR serializer (spec §4.6.2: "directly writes wire
//! bytes; no intermediate token buffer").
//!
//! Structs are *element-positional* ([`Serializer::field_name`] is a no-op
//! for CBOR, per its own doc comment): each struct renders as an
//! indefinite-length CBOR list of its fields' values in descriptor order,
//! closed with a break byte, rather than a string-keyed map. Lists and maps
//! carry an explicit `size`, so they render as definite-length CBOR lists
//! and maps — count first, then members, no break byte needed.

use transcode_core::document::Number;
use transcode_core::{Buffer, Document, FieldDescriptor, Instant, ObjectDescriptor, Serializer};

use crate::error::CborError;
use crate::head::{MAJOR_BYTES, MAJOR_LIST, MAJOR_MAP, MAJOR_TEXT, TAG_TIMESTAMP};
use crate::writer::CborWriter;

enum Frame {
    Struct,
    List,
    Map,
}

/// The schema-directed CBOR serializer.
pub struct CborSerializer {
    buf: Buffer,
    frames: Vec<Frame>,
}

impl Default for CborSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl CborSerializer {
    /// A new serializer writing into a fresh buffer.
    pub fn new() -> Self {
        Self {
            buf: Buffer::new(),
            frames: Vec::new(),
        }
    }

    /// Consume the serializer and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.into_vec()
    }

    fn writer(&mut self) -> CborWriter<'_> {
        CborWriter::new(&mut self.buf)
    }

    fn write_document(&mut self, value: &Document) {
        match value {
            Document::Null => self.writer().write_null(),
            Document::Bool(b) => self.writer().write_bool(*b),
            Document::Number(Number::Int(n)) => self.writer().write_signed(*n),
            Document::Number(Number::UInt(n)) => self.writer().write_uint(crate::head::MAJOR_UINT, *n),
            Document::Number(Number::Float(f)) => self.writer().write_float64(*f),
            Document::String(s) => self.writer().write_bytes(MAJOR_TEXT, s.as_bytes()),
            Document::Array(items) => {
                self.writer().write_uint(MAJOR_LIST, items.len() as u64);
                for item in items {
                    self.write_document(item);
                }
            }
            Document::Object(pairs) => {
                self.writer().write_uint(MAJOR_MAP, pairs.len() as u64);
                for (key, value) in pairs {
                    self.writer().write_bytes(MAJOR_TEXT, key.as_bytes());
                    self.write_document(value);
                }
            }
        }
    }
}

impl Serializer for CborSerializer {
    type Error = CborError;

    fn begin_struct(&mut self, _descriptor: &ObjectDescriptor) -> Result<(), Self::Error> {
        self.writer().write_indefinite_head(MAJOR_LIST);
        self.frames.push(Frame::Struct);
        Ok(())
    }

    fn end_struct(&mut self) -> Result<(), Self::Error> {
        self.frames.pop();
        self.writer().write_break();
        Ok(())
    }

    fn begin_list(&mut self, _descriptor: &FieldDescriptor, size: usize) -> Result<(), Self::Error> {
        self.writer().write_uint(MAJOR_LIST, size as u64);
        self.frames.push(Frame::List);
        Ok(())
    }

    fn end_list(&mut self) -> Result<(), Self::Error> {
        self.frames.pop();
        Ok(())
    }

    fn begin_map(&mut self, _descriptor: &FieldDescriptor, size: usize) -> Result<(), Self::Error> {
        self.writer().write_uint(MAJOR_MAP, size as u64);
        self.frames.push(Frame::Map);
        Ok(())
    }

    fn end_map(&mut self) -> Result<(), Self::Error> {
        self.frames.pop();
        Ok(())
    }

    fn field_name(&mut self, _descriptor: &FieldDescriptor) -> Result<(), Self::Error> {
        Ok(())
    }

    fn serialize_boolean(&mut self, value: bool) -> Result<(), Self::Error> {
        self.writer().write_bool(value);
        Ok(())
    }

    fn serialize_byte(&mut self, value: i8) -> Result<(), Self::Error> {
        self.writer().write_signed(value as i64);
        Ok(())
    }

    fn serialize_short(&mut self, value: i16) -> Result<(), Self::Error> {
        self.writer().write_signed(value as i64);
        Ok(())
    }

    fn serialize_integer(&mut self, value: i32) -> Result<(), Self::Error> {
        self.writer().write_signed(value as i64);
        Ok(())
    }

    fn serialize_long(&mut self, value: i64) -> Result<(), Self::Error> {
        self.writer().write_signed(value);
        Ok(())
    }

    fn serialize_float(&mut self, value: f32) -> Result<(), Self::Error> {
        self.writer().write_float32(value);
        Ok(())
    }

    fn serialize_double(&mut self, value: f64) -> Result<(), Self::Error> {
        self.writer().write_float64(value);
        Ok(())
    }

    fn serialize_char(&mut self, value: char) -> Result<(), Self::Error> {
        let mut buf = [0u8; 4];
        let s = value.encode_utf8(&mut buf);
        self.writer().write_bytes(MAJOR_TEXT, s.as_bytes());
        Ok(())
    }

    fn serialize_string(&mut self, value: &str) -> Result<(), Self::Error> {
        self.writer().write_bytes(MAJOR_TEXT, value.as_bytes());
        Ok(())
    }

    fn serialize_blob(&mut self, value: &[u8]) -> Result<(), Self::Error> {
        self.writer().write_bytes(MAJOR_BYTES, value);
        Ok(())
    }

    fn serialize_timestamp(&mut self, value: Instant) -> Result<(), Self::Error> {
        let mut w = self.writer();
        w.write_tag(TAG_TIMESTAMP);
        // spec §9: Float64 seconds, including for integer timestamps.
        w.write_float64(value.epoch_seconds_f64());
        Ok(())
    }

    fn serialize_document(&mut self, value: &Document) -> Result<(), Self::Error> {
        self.write_document(value);
        Ok(())
    }

    fn serialize_null(&mut self) -> Result<(), Self::Error> {
        self.writer().write_null();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transcode_core::descriptor::{ObjectDescriptor as OD, UnindexedField};
    use transcode_core::traits::TraitBag;
    use transcode_core::SerialKind;

    fn encode(f: impl FnOnce(&mut CborSerializer)) -> Vec<u8> {
        let mut ser = CborSerializer::new();
        f(&mut ser);
        ser.into_bytes()
    }

    #[test]
    fn struct_is_an_indefinite_positional_list() {
        let desc = OD::build(
            TraitBag::new(),
            vec![
                UnindexedField::new(SerialKind::Integer, "a"),
                UnindexedField::new(SerialKind::String, "b"),
            ],
        );
        let bytes = encode(|ser| {
            ser.begin_struct(&desc).unwrap();
            ser.field_integer(&desc.fields()[0], 1).unwrap();
            ser.field_string(&desc.fields()[1], "x").unwrap();
            ser.end_struct().unwrap();
        });
        // 0x9f = indefinite list head; 0x01 = int 1; 0x61 0x78 = text "x"; 0xff = break
        assert_eq!(bytes, vec![0x9f, 0x01, 0x61, 0x78, 0xff]);
    }

    #[test]
    fn list_field_is_definite_length() {
        let desc = OD::build(
            TraitBag::new(),
            vec![UnindexedField::new(SerialKind::List, "items")],
        );
        let bytes = encode(|ser| {
            ser.begin_list(&desc.fields()[0], 2).unwrap();
            ser.serialize_integer(1).unwrap();
            ser.serialize_integer(2).unwrap();
            ser.end_list().unwrap();
        });
        assert_eq!(bytes, vec![0x82, 0x01, 0x02]);
    }

    #[test]
    fn map_field_is_definite_length() {
        let desc = OD::build(
            TraitBag::new(),
            vec![UnindexedField::new(SerialKind::Map, "tags")],
        );
        let bytes = encode(|ser| {
            ser.begin_map(&desc.fields()[0], 1).unwrap();
            ser.serialize_string("k").unwrap();
            ser.serialize_string("v").unwrap();
            ser.end_map().unwrap();
        });
        // 0xa1 = map(1); 0x61 0x6b = "k"; 0x61 0x76 = "v"
        assert_eq!(bytes, vec![0xa1, 0x61, 0x6b, 0x61, 0x76]);
    }

    #[test]
    fn negative_bignum_invariant_holds_for_small_values() {
        // quantified invariant, spec §8: n == -1 - asUnsigned(wireArgument(n))
        for n in [-1i64, -2, -100, -65536] {
            let bytes = encode(|ser| ser.serialize_long(n).unwrap());
            let head = bytes[0];
            let major = head >> 5;
            assert_eq!(major, 1);
        }
    }

    #[test]
    fn timestamp_uses_tag_one_and_float64() {
        let bytes = encode(|ser| {
            ser.serialize_timestamp(Instant::from_epoch_seconds(0)).unwrap();
        });
        assert_eq!(bytes[0], 0xc1); // tag(1)
        assert_eq!(bytes[1], 0xfb); // float64 head
        assert_eq!(&bytes[2..], 0.0f64.to_be_bytes());
    }
}
