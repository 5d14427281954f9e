//! Schema-directed JSON serializer (spec §4.3.3).
//!
//! `beginStruct(desc)` pushes an object; `field(desc, value)` writes
//! `"name":value`. List/map subwriters enforce element form by delegating
//! straight to [`JsonWriter::begin_array`]/[`JsonWriter::begin_object`]. Map
//! entries have no descriptor to name them, so `begin_map` opens a frame
//! that alternates key/value on each subsequent scalar call: the caller
//! writes `serialize_string(key)` then the value's own `serialize_*`/
//! `begin_*` call, and the serializer renders the key slot as an object
//! member name instead of a string value.

#[cfg(feature = "alloc")]
use alloc::{format, string::String, vec::Vec};

use transcode_core::traits::JsonSerialName;
use transcode_core::{Document, FieldDescriptor, Instant, ObjectDescriptor, Serializer};

use crate::error::JsonError;
use crate::writer::{JsonWriter, WriteOptions};

/// Tracks, for the innermost open container, whether the next scalar call
/// is a map key (alternating `true`/`false`) or an ordinary struct/list
/// member (`Other`, no alternation).
#[derive(Clone, Copy)]
enum Frame {
    Map(bool),
    Other,
}

/// The schema-directed JSON serializer.
pub struct JsonSerializer {
    writer: JsonWriter,
    frames: Vec<Frame>,
}

impl JsonSerializer {
    /// A new serializer with the given formatting options.
    pub fn new(options: WriteOptions) -> Self {
        Self {
            writer: JsonWriter::new(options),
            frames: Vec::new(),
        }
    }

    /// Consume the serializer and return the rendered bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.finish()
    }

    /// Whether the value about to be written occupies a map-key slot
    /// (`begin_map` pushes an entry alternating key/value/key/...; callers
    /// write each map entry as a `serialize_string(key)` immediately
    /// followed by the value's own `serialize_*`/`begin_*` call).
    fn consume_slot(&mut self) -> bool {
        match self.frames.last_mut() {
            Some(Frame::Map(expect_key)) => {
                let is_key = *expect_key;
                *expect_key = !is_key;
                is_key
            }
            _ => false,
        }
    }
}

fn json_name(descriptor: &FieldDescriptor) -> String {
    descriptor
        .traits()
        .find_trait::<JsonSerialName>()
        .map(|t| t.0.clone())
        .unwrap_or_else(|| String::from(descriptor.serial_name()))
}

/// Render an `f32` the way the spec's worked example does: a decimal point
/// is always present, even for whole values (`50.0`, not `50`).
pub fn format_f32(value: f32) -> String {
    format_finite_or_named(value as f64, value.is_finite(), format!("{value}"))
}

/// Render an `f64` with the same whole-value decimal-point guarantee.
pub fn format_f64(value: f64) -> String {
    format_finite_or_named(value, value.is_finite(), format!("{value}"))
}

fn format_finite_or_named(value: f64, is_finite: bool, rendered: String) -> String {
    if !is_finite {
        return if value.is_nan() {
            String::from("\"NaN\"")
        } else if value > 0.0 {
            String::from("\"Infinity\"")
        } else {
            String::from("\"-Infinity\"")
        };
    }
    if rendered.contains('.') || rendered.contains('e') || rendered.contains('E') {
        rendered
    } else {
        format!("{rendered}.0")
    }
}

impl Serializer for JsonSerializer {
    type Error = JsonError;

    fn begin_struct(&mut self, _descriptor: &ObjectDescriptor) -> Result<(), Self::Error> {
        self.consume_slot();
        self.writer.begin_object()?;
        self.frames.push(Frame::Other);
        Ok(())
    }

    fn end_struct(&mut self) -> Result<(), Self::Error> {
        self.frames.pop();
        self.writer.end_object()
    }

    fn begin_list(&mut self, _descriptor: &FieldDescriptor, _size: usize) -> Result<(), Self::Error> {
        self.consume_slot();
        self.writer.begin_array()?;
        self.frames.push(Frame::Other);
        Ok(())
    }

    fn end_list(&mut self) -> Result<(), Self::Error> {
        self.frames.pop();
        self.writer.end_array()
    }

    fn begin_map(&mut self, _descriptor: &FieldDescriptor, _size: usize) -> Result<(), Self::Error> {
        self.consume_slot();
        self.writer.begin_object()?;
        self.frames.push(Frame::Map(true));
        Ok(())
    }

    fn end_map(&mut self) -> Result<(), Self::Error> {
        self.frames.pop();
        self.writer.end_object()
    }

    fn field_name(&mut self, descriptor: &FieldDescriptor) -> Result<(), Self::Error> {
        self.writer.name(&json_name(descriptor))
    }

    fn serialize_boolean(&mut self, value: bool) -> Result<(), Self::Error> {
        self.consume_slot();
        self.writer.bool(value)
    }

    fn serialize_byte(&mut self, value: i8) -> Result<(), Self::Error> {
        self.consume_slot();
        self.writer.number_literal(&format!("{value}"))
    }

    fn serialize_short(&mut self, value: i16) -> Result<(), Self::Error> {
        self.consume_slot();
        self.writer.number_literal(&format!("{value}"))
    }

    fn serialize_integer(&mut self, value: i32) -> Result<(), Self::Error> {
        self.consume_slot();
        self.writer.number_literal(&format!("{value}"))
    }

    fn serialize_long(&mut self, value: i64) -> Result<(), Self::Error> {
        self.consume_slot();
        self.writer.number_literal(&format!("{value}"))
    }

    fn serialize_float(&mut self, value: f32) -> Result<(), Self::Error> {
        self.consume_slot();
        self.writer.number_literal(&format_f32(value))
    }

    fn serialize_double(&mut self, value: f64) -> Result<(), Self::Error> {
        self.consume_slot();
        self.writer.number_literal(&format_f64(value))
    }

    fn serialize_char(&mut self, value: char) -> Result<(), Self::Error> {
        let is_key = self.consume_slot();
        let mut buf = [0u8; 4];
        let s = value.encode_utf8(&mut buf);
        if is_key {
            self.writer.name(s)
        } else {
            self.writer.string(s)
        }
    }

    fn serialize_string(&mut self, value: &str) -> Result<(), Self::Error> {
        if self.consume_slot() {
            self.writer.name(value)
        } else {
            self.writer.string(value)
        }
    }

    fn serialize_blob(&mut self, value: &[u8]) -> Result<(), Self::Error> {
        self.consume_slot();
        self.writer.string(&transcode_core::blob::encode(value))
    }

    fn serialize_timestamp(&mut self, value: Instant) -> Result<(), Self::Error> {
        self.consume_slot();
        self.writer.number_literal(&format_f64(value.epoch_seconds_f64()))
    }

    fn serialize_document(&mut self, value: &Document) -> Result<(), Self::Error> {
        self.consume_slot();
        self.write_document(value)
    }

    fn serialize_null(&mut self) -> Result<(), Self::Error> {
        self.consume_slot();
        self.writer.null()
    }
}

impl JsonSerializer {
    fn write_document(&mut self, value: &Document) -> Result<(), JsonError> {
        match value {
            Document::Null => self.writer.null(),
            Document::Bool(b) => self.writer.bool(*b),
            Document::Number(transcode_core::document::Number::Int(n)) => {
                self.writer.number_literal(&format!("{n}"))
            }
            Document::Number(transcode_core::document::Number::UInt(n)) => {
                self.writer.number_literal(&format!("{n}"))
            }
            Document::Number(transcode_core::document::Number::Float(f)) => {
                self.writer.number_literal(&format_f64(*f))
            }
            Document::String(s) => self.writer.string(s),
            Document::Array(items) => {
                self.writer.begin_array()?;
                for item in items {
                    self.write_document(item)?;
                }
                self.writer.end_array()
            }
            Document::Object(pairs) => {
                self.writer.begin_object()?;
                for (key, value) in pairs {
                    self.writer.name(key)?;
                    self.write_document(value)?;
                }
                self.writer.end_object()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transcode_core::descriptor::{ObjectDescriptor as OD, UnindexedField};
    use transcode_core::traits::TraitBag;
    use transcode_core::SerialKind;

    #[test]
    fn all_primitives_struct() {
        // spec §8 scenario 1
        let desc = OD::build(
            TraitBag::new(),
            alloc::vec![
                UnindexedField::new(SerialKind::Boolean, "boolean"),
                UnindexedField::new(SerialKind::Byte, "byte"),
                UnindexedField::new(SerialKind::Short, "short"),
                UnindexedField::new(SerialKind::Integer, "int"),
                UnindexedField::new(SerialKind::Long, "long"),
                UnindexedField::new(SerialKind::Float, "float"),
                UnindexedField::new(SerialKind::Double, "double"),
                UnindexedField::new(SerialKind::Char, "char"),
                UnindexedField::new(SerialKind::String, "string"),
                UnindexedField::new(SerialKind::List, "listInt"),
            ],
        );
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
        ser.field_name(&desc.fields()[9]).unwrap();
        ser.begin_list(&desc.fields()[9], 3).unwrap();
        ser.serialize_integer(1).unwrap();
        ser.serialize_integer(2).unwrap();
        ser.serialize_integer(3).unwrap();
        ser.end_list().unwrap();
        ser.end_struct().unwrap();
        let out = String::from_utf8(ser.into_bytes()).unwrap();
        assert_eq!(
            out,
            r#"{"boolean":true,"byte":10,"short":20,"int":30,"long":40,"float":50.0,"double":60.0,"char":"A","string":"Str0","listInt":[1,2,3]}"#
        );
    }

    #[test]
    fn map_entries_alternate_key_and_value() {
        let desc = OD::build(
            TraitBag::new(),
            alloc::vec![UnindexedField::new(SerialKind::Map, "tags")],
        );
        let mut ser = JsonSerializer::new(WriteOptions::compact());
        ser.begin_struct(&desc).unwrap();
        ser.field_name(&desc.fields()[0]).unwrap();
        ser.begin_map(&desc.fields()[0], 2).unwrap();
        ser.serialize_string("k1").unwrap();
        ser.serialize_string("v1").unwrap();
        ser.serialize_string("k2").unwrap();
        ser.serialize_integer(2).unwrap();
        ser.end_map().unwrap();
        ser.end_struct().unwrap();
        let out = String::from_utf8(ser.into_bytes()).unwrap();
        assert_eq!(out, r#"{"tags":{"k1":"v1","k2":2}}"#);
    }

    #[test]
    fn struct_nested_inside_map_value_does_not_disturb_key_alternation() {
        let inner = OD::build(
            TraitBag::new(),
            alloc::vec![UnindexedField::new(SerialKind::Integer, "n")],
        );
        let outer = OD::build(
            TraitBag::new(),
            alloc::vec![UnindexedField::new(SerialKind::Map, "items")],
        );
        let mut ser = JsonSerializer::new(WriteOptions::compact());
        ser.begin_struct(&outer).unwrap();
        ser.field_name(&outer.fields()[0]).unwrap();
        ser.begin_map(&outer.fields()[0], 1).unwrap();
        ser.serialize_string("only").unwrap();
        ser.begin_struct(&inner).unwrap();
        ser.field_integer(&inner.fields()[0], 7).unwrap();
        ser.end_struct().unwrap();
        ser.end_map().unwrap();
        ser.end_struct().unwrap();
        let out = String::from_utf8(ser.into_bytes()).unwrap();
        assert_eq!(out, r#"{"items":{"only":{"n":7}}}"#);
    }
}
