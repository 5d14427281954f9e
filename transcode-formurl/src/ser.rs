//! Schema-directed form-URL serializer (spec §4.5).
//!
//! There is no streaming writer underneath this one the way JSON/XML have
//! — the whole point of the format is a flat `key=value&...` line, so this
//! serializer instead accumulates `(path, text)` pairs and percent-encodes
//! them once, at [`FormUrlSerializer::finish`]. The "path" a scalar lands
//! at is built the same way XML's element names are: a pending field name
//! combines with the innermost list/map frame's item/entry naming, except
//! here the unit is a dot-joined path segment instead of an element.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use transcode_core::traits::{
    FormUrlCollectionName, FormUrlFlattened, FormUrlMapName, FormUrlSerialName, QueryLiteral,
    TimestampFormat, TimestampFormatKind,
};
use transcode_core::{Document, FieldDescriptor, Instant, ObjectDescriptor, Serializer};

use crate::error::{FormUrlError, FormUrlErrorKind};

const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn encode_component(text: &str) -> String {
    utf8_percent_encode(text, UNRESERVED).to_string()
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

struct PendingField {
    name: String,
    timestamp_format: Option<TimestampFormatKind>,
}

enum Frame {
    Plain {
        prefix: String,
    },
    List {
        prefix: String,
        item_name: String,
        flattened: bool,
        index: usize,
    },
    Map {
        prefix: String,
        key_name: String,
        value_name: String,
        flattened: bool,
        index: usize,
        expect_key: bool,
    },
}

/// The schema-directed, encode-only form-URL serializer.
pub struct FormUrlSerializer {
    pairs: Vec<(String, String)>,
    pending: Option<PendingField>,
    frames: Vec<Frame>,
}

impl Default for FormUrlSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl FormUrlSerializer {
    /// A new, empty serializer.
    pub fn new() -> Self {
        Self {
            pairs: Vec::new(),
            pending: None,
            frames: Vec::new(),
        }
    }

    /// Consume the serializer and return the percent-encoded query string.
    pub fn finish(self) -> String {
        self.pairs
            .into_iter()
            .map(|(k, v)| format!("{}={}", encode_component(&k), encode_component(&v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Resolve the path segment a struct, list, map, or scalar occupies,
    /// consuming a pending field name or advancing the innermost list/map
    /// frame's index/key-value alternation.
    fn enter_slot(&mut self) -> Result<String, FormUrlError> {
        if let Some(pending) = self.pending.take() {
            let prefix = match self.frames.last() {
                Some(Frame::Plain { prefix }) => prefix.clone(),
                None => String::new(),
                _ => {
                    return Err(FormUrlError::ser(FormUrlErrorKind::ProgrammerError {
                        message: "a field name was written outside a struct",
                    }))
                }
            };
            return Ok(join(&prefix, &pending.name));
        }
        match self.frames.last_mut() {
            Some(Frame::List {
                prefix,
                item_name,
                flattened,
                index,
            }) => {
                *index += 1;
                let segment = if *flattened {
                    format!("{index}")
                } else {
                    format!("{item_name}.{index}")
                };
                Ok(join(prefix, &segment))
            }
            Some(Frame::Map {
                prefix,
                key_name,
                value_name,
                flattened,
                index,
                expect_key,
            }) => {
                if *expect_key {
                    *index += 1;
                    *expect_key = false;
                    let segment = if *flattened {
                        format!("{index}.{key_name}")
                    } else {
                        format!("entry.{index}.{key_name}")
                    };
                    Ok(join(prefix, &segment))
                } else {
                    *expect_key = true;
                    let segment = if *flattened {
                        format!("{index}.{value_name}")
                    } else {
                        format!("entry.{index}.{value_name}")
                    };
                    Ok(join(prefix, &segment))
                }
            }
            None => Ok(String::new()),
            Some(Frame::Plain { .. }) => Err(FormUrlError::ser(FormUrlErrorKind::ProgrammerError {
                message: "a scalar was written inside a struct with no preceding field_name",
            })),
        }
    }

    fn emit_literals(&mut self, descriptor: &ObjectDescriptor) {
        for literal in descriptor.traits().find_all::<QueryLiteral>() {
            self.pairs.push((literal.key.clone(), literal.value.clone()));
        }
    }

    fn emit_scalar(&mut self, text: String) -> Result<(), FormUrlError> {
        let key = self.enter_slot()?;
        self.pairs.push((key, text));
        Ok(())
    }

    fn write_document_leaf(&mut self, key: &str, value: &Document) {
        match value {
            Document::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.write_document_leaf(&join(key, &format!("member.{}", i + 1)), item);
                }
            }
            Document::Object(pairs) => {
                for (field, item) in pairs {
                    self.write_document_leaf(&join(key, field), item);
                }
            }
            scalar => self.pairs.push((key.to_string(), document_scalar_text(scalar))),
        }
    }
}

fn format_double_text(value: f64) -> String {
    if value.is_nan() {
        String::from("NaN")
    } else if value.is_infinite() {
        if value > 0.0 {
            String::from("Infinity")
        } else {
            String::from("-Infinity")
        }
    } else {
        format!("{value}")
    }
}

fn format_epoch_seconds(value: Instant) -> String {
    if value.subsecond_nanos() == 0 {
        format!("{}", value.epoch_seconds())
    } else {
        format_double_text(value.epoch_seconds_f64())
    }
}

fn render_timestamp(value: Instant, format: TimestampFormatKind) -> String {
    match format {
        TimestampFormatKind::EpochSeconds => format_epoch_seconds(value),
        TimestampFormatKind::DateTime => value.to_iso8601(),
        TimestampFormatKind::HttpDate => value.to_rfc2822(),
    }
}

fn document_scalar_text(value: &Document) -> String {
    use transcode_core::document::Number;
    match value {
        Document::Null => String::new(),
        Document::Bool(b) => format!("{b}"),
        Document::String(s) => s.clone(),
        Document::Number(Number::Int(n)) => format!("{n}"),
        Document::Number(Number::UInt(n)) => format!("{n}"),
        Document::Number(Number::Float(f)) => format_double_text(*f),
        Document::Array(_) | Document::Object(_) => String::new(),
    }
}

impl Serializer for FormUrlSerializer {
    type Error = FormUrlError;

    fn begin_struct(&mut self, descriptor: &ObjectDescriptor) -> Result<(), Self::Error> {
        let prefix = self.enter_slot()?;
        log::trace!("begin_struct: prefix={prefix:?}");
        self.emit_literals(descriptor);
        self.frames.push(Frame::Plain { prefix });
        Ok(())
    }

    fn end_struct(&mut self) -> Result<(), Self::Error> {
        match self.frames.pop() {
            Some(Frame::Plain { .. }) => Ok(()),
            _ => Err(FormUrlError::ser(FormUrlErrorKind::ProgrammerError {
                message: "end_struct without a matching begin_struct",
            })),
        }
    }

    fn begin_list(&mut self, descriptor: &FieldDescriptor, _size: usize) -> Result<(), Self::Error> {
        let flattened = descriptor.traits().has_trait::<FormUrlFlattened>();
        let item_name = descriptor
            .traits()
            .find_trait::<FormUrlCollectionName>()
            .map(|t| t.member.clone())
            .unwrap_or_else(|| String::from("member"));
        let prefix = self.enter_slot()?;
        self.frames.push(Frame::List {
            prefix,
            item_name,
            flattened,
            index: 0,
        });
        Ok(())
    }

    fn end_list(&mut self) -> Result<(), Self::Error> {
        match self.frames.pop() {
            Some(Frame::List { .. }) => Ok(()),
            _ => Err(FormUrlError::ser(FormUrlErrorKind::ProgrammerError {
                message: "end_list without a matching begin_list",
            })),
        }
    }

    fn begin_map(&mut self, descriptor: &FieldDescriptor, _size: usize) -> Result<(), Self::Error> {
        let flattened = descriptor.traits().has_trait::<FormUrlFlattened>();
        let names = descriptor.traits().find_trait::<FormUrlMapName>();
        let key_name = names.map(|n| n.key.clone()).unwrap_or_else(|| String::from("key"));
        let value_name = names
            .map(|n| n.value.clone())
            .unwrap_or_else(|| String::from("value"));
        let prefix = self.enter_slot()?;
        self.frames.push(Frame::Map {
            prefix,
            key_name,
            value_name,
            flattened,
            index: 0,
            expect_key: true,
        });
        Ok(())
    }

    fn end_map(&mut self) -> Result<(), Self::Error> {
        match self.frames.pop() {
            Some(Frame::Map { .. }) => Ok(()),
            _ => Err(FormUrlError::ser(FormUrlErrorKind::ProgrammerError {
                message: "end_map without a matching begin_map",
            })),
        }
    }

    fn field_name(&mut self, descriptor: &FieldDescriptor) -> Result<(), Self::Error> {
        let name = descriptor
            .traits()
            .find_trait::<FormUrlSerialName>()
            .map(|t| t.0.clone())
            .unwrap_or_else(|| String::from(descriptor.serial_name()));
        let timestamp_format = descriptor.traits().find_trait::<TimestampFormat>().map(|t| t.0);
        self.pending = Some(PendingField {
            name,
            timestamp_format,
        });
        Ok(())
    }

    fn serialize_boolean(&mut self, value: bool) -> Result<(), Self::Error> {
        self.emit_scalar(String::from(if value { "true" } else { "false" }))
    }

    fn serialize_byte(&mut self, value: i8) -> Result<(), Self::Error> {
        self.emit_scalar(format!("{value}"))
    }

    fn serialize_short(&mut self, value: i16) -> Result<(), Self::Error> {
        self.emit_scalar(format!("{value}"))
    }

    fn serialize_integer(&mut self, value: i32) -> Result<(), Self::Error> {
        self.emit_scalar(format!("{value}"))
    }

    fn serialize_long(&mut self, value: i64) -> Result<(), Self::Error> {
        self.emit_scalar(format!("{value}"))
    }

    fn serialize_float(&mut self, value: f32) -> Result<(), Self::Error> {
        self.emit_scalar(format_double_text(value as f64))
    }

    fn serialize_double(&mut self, value: f64) -> Result<(), Self::Error> {
        self.emit_scalar(format_double_text(value))
    }

    fn serialize_char(&mut self, value: char) -> Result<(), Self::Error> {
        let mut buf = [0u8; 4];
        self.emit_scalar(value.encode_utf8(&mut buf).to_string())
    }

    fn serialize_string(&mut self, value: &str) -> Result<(), Self::Error> {
        self.emit_scalar(value.to_string())
    }

    fn serialize_blob(&mut self, value: &[u8]) -> Result<(), Self::Error> {
        self.emit_scalar(transcode_core::blob::encode(value))
    }

    fn serialize_timestamp(&mut self, value: Instant) -> Result<(), Self::Error> {
        let format = self
            .pending
            .as_ref()
            .and_then(|p| p.timestamp_format)
            .unwrap_or(TimestampFormatKind::EpochSeconds);
        self.emit_scalar(render_timestamp(value, format))
    }

    fn serialize_document(&mut self, value: &Document) -> Result<(), Self::Error> {
        match value {
            Document::Array(_) | Document::Object(_) => {
                let key = self.enter_slot()?;
                self.write_document_leaf(&key, value);
                Ok(())
            }
            scalar => self.emit_scalar(document_scalar_text(scalar)),
        }
    }

    fn serialize_null(&mut self) -> Result<(), Self::Error> {
        log::debug!("serialize_null: form-url never allows sparse values");
        Err(FormUrlError::ser(FormUrlErrorKind::SparseNotAllowed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transcode_core::descriptor::{ObjectDescriptor as OD, UnindexedField};
    use transcode_core::traits::TraitBag;
    use transcode_core::SerialKind;

    #[test]
    fn nested_struct_with_map_field_matches_the_worked_example() {
        let mut object_traits = TraitBag::new();
        object_traits.push(QueryLiteral {
            key: String::from("Action"),
            value: String::from("FooOperation"),
        });
        object_traits.push(QueryLiteral {
            key: String::from("Version"),
            value: String::from("2015-03-31"),
        });
        let desc = OD::build(
            object_traits,
            vec![UnindexedField::new(SerialKind::Map, "Tags")],
        );
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
    fn flattened_list_drops_the_member_segment() {
        let desc = OD::build(
            TraitBag::new(),
            vec![UnindexedField::new(SerialKind::List, "Id").with_trait(FormUrlFlattened)],
        );
        let mut ser = FormUrlSerializer::new();
        ser.begin_struct(&desc).unwrap();
        ser.field_name(&desc.fields()[0]).unwrap();
        ser.begin_list(&desc.fields()[0], 2).unwrap();
        ser.serialize_string("a").unwrap();
        ser.serialize_string("b").unwrap();
        ser.end_list().unwrap();
        ser.end_struct().unwrap();
        assert_eq!(ser.finish(), "Id.1=a&Id.2=b");
    }

    #[test]
    fn non_flattened_list_keeps_the_member_segment() {
        let desc = OD::build(
            TraitBag::new(),
            vec![UnindexedField::new(SerialKind::List, "Items")],
        );
        let mut ser = FormUrlSerializer::new();
        ser.begin_struct(&desc).unwrap();
        ser.field_name(&desc.fields()[0]).unwrap();
        ser.begin_list(&desc.fields()[0], 2).unwrap();
        ser.serialize_integer(1).unwrap();
        ser.serialize_integer(2).unwrap();
        ser.end_list().unwrap();
        ser.end_struct().unwrap();
        assert_eq!(ser.finish(), "Items.member.1=1&Items.member.2=2");
    }

    #[test]
    fn space_is_encoded_as_percent_twenty_not_plus() {
        let desc = OD::build(
            TraitBag::new(),
            vec![UnindexedField::new(SerialKind::String, "note")],
        );
        let mut ser = FormUrlSerializer::new();
        ser.begin_struct(&desc).unwrap();
        ser.field_string(&desc.fields()[0], "a b").unwrap();
        ser.end_struct().unwrap();
        assert_eq!(ser.finish(), "note=a%20b");
    }

    #[test]
    fn null_is_rejected() {
        let desc = OD::build(
            TraitBag::new(),
            vec![UnindexedField::new(SerialKind::String, "note")],
        );
        let mut ser = FormUrlSerializer::new();
        ser.begin_struct(&desc).unwrap();
        ser.field_name(&desc.fields()[0]).unwrap();
        let err = ser.serialize_null().unwrap_err();
        assert!(matches!(err.kind(), FormUrlErrorKind::SparseNotAllowed));
    }

    #[test]
    fn nested_struct_field_prefixes_its_children() {
        let inner_desc = OD::build(
            TraitBag::new(),
            vec![UnindexedField::new(SerialKind::String, "Name")],
        );
        let outer_desc = OD::build(
            TraitBag::new(),
            vec![UnindexedField::new(SerialKind::Struct, "Filter")],
        );
        let mut ser = FormUrlSerializer::new();
        ser.begin_struct(&outer_desc).unwrap();
        ser.field_name(&outer_desc.fields()[0]).unwrap();
        ser.begin_struct(&inner_desc).unwrap();
        ser.field_string(&inner_desc.fields()[0], "x").unwrap();
        ser.end_struct().unwrap();
        ser.end_struct().unwrap();
        assert_eq!(ser.finish(), "Filter.Name=x");
    }
}
