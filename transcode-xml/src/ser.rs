//! Schema-directed XML serializer (spec §4.4.3).
//!
//! `field_name` defers: XML doesn't know until the next call whether a
//! field renders as an attribute or a child element, so it's stashed as
//! `pending` and consumed by the next `serialize_*`/`begin_*` call. List
//! and map items have no field descriptor of their own, so their element
//! names come from the enclosing [`Frame`] instead; map entries alternate
//! key/value the same way [`transcode_json::JsonSerializer`] alternates
//! object-member-name/value, except the unit of alternation is a whole
//! `<entry>` element rather than a JSON object member.

use transcode_core::traits::{
    Flattened, SparseValues, TimestampFormat, TimestampFormatKind, XmlAttribute,
    XmlCollectionName, XmlMapName, XmlNamespace, XmlSerialName,
};
use transcode_core::{Document, FieldDescriptor, Instant, ObjectDescriptor, Serializer};

use crate::error::{XmlError, XmlErrorKind};
use crate::writer::{WriteOptions, XmlWriter};

struct PendingField {
    name: String,
    is_attribute: bool,
    timestamp_format: Option<TimestampFormatKind>,
    sparse_allowed: bool,
}

enum Frame {
    /// Inside a struct, or directly under a map value wrapper — scalars
    /// here must come with a `pending` field (or are a programmer error).
    Plain,
    List {
        /// Element name repeated for each item (already resolved for
        /// `Flattened`, in which case it equals the field's own name).
        item_name: String,
        flattened: bool,
        sparse_allowed: bool,
    },
    Map {
        entry_name: String,
        key_name: String,
        value_name: String,
        flattened: bool,
        /// Whether the next slot written is a key (`true`) or a value.
        expect_key: bool,
        /// Whether an `<entry>` is currently open, awaiting its value.
        entry_open: bool,
        sparse_allowed: bool,
    },
}

enum ValueSlot {
    Attribute(String),
    Element,
}

/// The schema-directed XML serializer.
pub struct XmlSerializer {
    writer: XmlWriter,
    pending: Option<PendingField>,
    frames: Vec<Frame>,
}

impl XmlSerializer {
    /// A new serializer with the given formatting options.
    pub fn new(options: WriteOptions) -> Self {
        Self {
            writer: XmlWriter::new(options),
            pending: None,
            frames: Vec::new(),
        }
    }

    /// Consume the serializer and return the rendered document text.
    pub fn finish(self) -> String {
        self.writer.finish()
    }

    fn write_namespace_attribute(&mut self, ns: &XmlNamespace) -> Result<(), XmlError> {
        let attr_name = match &ns.prefix {
            Some(p) => format!("xmlns:{p}"),
            None => String::from("xmlns"),
        };
        self.writer.attribute(&attr_name, &ns.uri)
    }

    /// Open the wrapper element for a list/map/struct, honoring (in
    /// priority order) a pending field name, an enclosing list's item
    /// name, an enclosing map's current key/value slot, or — only when
    /// none of those apply, i.e. this is the document root — `fallback_name`.
    fn open_element_for(&mut self, fallback_name: &str) -> Result<(), XmlError> {
        if let Some(p) = self.pending.take() {
            if p.is_attribute {
                return Err(XmlError::ser(XmlErrorKind::ProgrammerError {
                    message: "a struct, list, or map field cannot be an XML attribute",
                }));
            }
            return self.writer.begin_element(&p.name);
        }
        match self.frames.last() {
            Some(Frame::List { item_name, .. }) => {
                let name = item_name.clone();
                self.writer.begin_element(&name)
            }
            Some(Frame::Map { .. }) => self.open_next_map_slot(),
            _ => self.writer.begin_element(fallback_name),
        }
    }

    fn enter_value(&mut self) -> Result<ValueSlot, XmlError> {
        if let Some(p) = self.pending.take() {
            if p.is_attribute {
                return Ok(ValueSlot::Attribute(p.name));
            }
            self.writer.begin_element(&p.name)?;
            return Ok(ValueSlot::Element);
        }
        match self.frames.last() {
            Some(Frame::List { item_name, .. }) => {
                let name = item_name.clone();
                self.writer.begin_element(&name)?;
                Ok(ValueSlot::Element)
            }
            Some(Frame::Map { .. }) => {
                self.open_next_map_slot()?;
                Ok(ValueSlot::Element)
            }
            _ => Err(XmlError::ser(XmlErrorKind::ProgrammerError {
                message: "scalar value written with no pending field and no enclosing list or map",
            })),
        }
    }

    /// Advance the innermost map frame's key/value alternation by one slot,
    /// writing whatever `<entry>`/`<key>`/`<value>` open tags that implies.
    fn open_next_map_slot(&mut self) -> Result<(), XmlError> {
        let idx = match self.frames.len().checked_sub(1) {
            Some(i) => i,
            None => {
                return Err(XmlError::ser(XmlErrorKind::ProgrammerError {
                    message: "map slot opened with no enclosing map",
                }))
            }
        };
        let (close_prev_entry, entry_to_open, slot_name) = match &mut self.frames[idx] {
            Frame::Map {
                entry_name,
                key_name,
                value_name,
                expect_key,
                entry_open,
                ..
            } => {
                if *expect_key {
                    let close_prev = *entry_open;
                    *entry_open = true;
                    *expect_key = false;
                    (close_prev, Some(entry_name.clone()), key_name.clone())
                } else {
                    *expect_key = true;
                    (false, None, value_name.clone())
                }
            }
            _ => {
                return Err(XmlError::ser(XmlErrorKind::ProgrammerError {
                    message: "map slot opened outside a map context",
                }))
            }
        };
        if close_prev_entry {
            self.writer.end_element()?;
        }
        if let Some(entry_name) = entry_to_open {
            self.writer.begin_element(&entry_name)?;
        }
        self.writer.begin_element(&slot_name)
    }

    /// Whether the slot a scalar write would currently land in (a pending
    /// field, or the innermost list/map frame) carries `SparseValues`.
    fn current_slot_allows_sparse(&self) -> bool {
        if let Some(p) = &self.pending {
            return p.sparse_allowed;
        }
        match self.frames.last() {
            Some(Frame::List { sparse_allowed, .. }) => *sparse_allowed,
            Some(Frame::Map { sparse_allowed, .. }) => *sparse_allowed,
            _ => false,
        }
    }
}

fn xml_name(descriptor: &FieldDescriptor) -> String {
    descriptor
        .traits()
        .find_trait::<XmlSerialName>()
        .map(|t| t.0.clone())
        .unwrap_or_else(|| String::from(descriptor.serial_name()))
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

impl Serializer for XmlSerializer {
    type Error = XmlError;

    fn begin_struct(&mut self, descriptor: &ObjectDescriptor) -> Result<(), Self::Error> {
        let root_name = descriptor
            .traits()
            .find_trait::<XmlSerialName>()
            .map(|t| t.0.clone())
            .unwrap_or_else(|| String::from("root"));
        self.open_element_for(&root_name)?;
        if let Some(ns) = descriptor.traits().find_trait::<XmlNamespace>() {
            self.write_namespace_attribute(ns)?;
        }
        self.frames.push(Frame::Plain);
        Ok(())
    }

    fn end_struct(&mut self) -> Result<(), Self::Error> {
        self.frames.pop();
        self.writer.end_element()
    }

    fn begin_list(&mut self, descriptor: &FieldDescriptor, _size: usize) -> Result<(), Self::Error> {
        let flattened = descriptor.traits().has_trait::<Flattened>();
        let sparse_allowed = descriptor.traits().has_trait::<SparseValues>();
        let own_name = xml_name(descriptor);
        let item_name = if flattened {
            own_name.clone()
        } else {
            descriptor
                .traits()
                .find_trait::<XmlCollectionName>()
                .map(|t| t.element.clone())
                .unwrap_or_else(|| String::from("member"))
        };
        if flattened {
            self.pending = None;
        } else {
            self.open_element_for(&own_name)?;
        }
        self.frames.push(Frame::List { item_name, flattened, sparse_allowed });
        Ok(())
    }

    fn end_list(&mut self) -> Result<(), Self::Error> {
        match self.frames.pop() {
            Some(Frame::List { flattened: false, .. }) => self.writer.end_element(),
            Some(Frame::List { flattened: true, .. }) => Ok(()),
            _ => Err(XmlError::ser(XmlErrorKind::ProgrammerError {
                message: "end_list without a matching begin_list",
            })),
        }
    }

    fn begin_map(&mut self, descriptor: &FieldDescriptor, _size: usize) -> Result<(), Self::Error> {
        let flattened = descriptor.traits().has_trait::<Flattened>();
        let sparse_allowed = descriptor.traits().has_trait::<SparseValues>();
        let names = descriptor.traits().find_trait::<XmlMapName>();
        let entry_name = names
            .map(|n| n.entry.clone())
            .unwrap_or_else(|| String::from("entry"));
        let key_name = names
            .map(|n| n.key.clone())
            .unwrap_or_else(|| String::from("key"));
        let value_name = names
            .map(|n| n.value.clone())
            .unwrap_or_else(|| String::from("value"));
        if flattened {
            self.pending = None;
        } else {
            let own_name = xml_name(descriptor);
            self.open_element_for(&own_name)?;
        }
        self.frames.push(Frame::Map {
            entry_name,
            key_name,
            value_name,
            flattened,
            expect_key: true,
            entry_open: false,
            sparse_allowed,
        });
        Ok(())
    }

    fn end_map(&mut self) -> Result<(), Self::Error> {
        match self.frames.pop() {
            Some(Frame::Map { flattened, entry_open, .. }) => {
                if entry_open {
                    self.writer.end_element()?;
                }
                if !flattened {
                    self.writer.end_element()?;
                }
                Ok(())
            }
            _ => Err(XmlError::ser(XmlErrorKind::ProgrammerError {
                message: "end_map without a matching begin_map",
            })),
        }
    }

    fn field_name(&mut self, descriptor: &FieldDescriptor) -> Result<(), Self::Error> {
        let name = xml_name(descriptor);
        let is_attribute = descriptor.traits().has_trait::<XmlAttribute>();
        let timestamp_format = descriptor.traits().find_trait::<TimestampFormat>().map(|t| t.0);
        let sparse_allowed = descriptor.traits().has_trait::<SparseValues>();
        self.pending = Some(PendingField {
            name,
            is_attribute,
            timestamp_format,
            sparse_allowed,
        });
        Ok(())
    }

    fn serialize_boolean(&mut self, value: bool) -> Result<(), Self::Error> {
        let text = if value { "true" } else { "false" };
        match self.enter_value()? {
            ValueSlot::Attribute(name) => self.writer.attribute(&name, text),
            ValueSlot::Element => {
                self.writer.text(text)?;
                self.writer.end_element()
            }
        }
    }

    fn serialize_byte(&mut self, value: i8) -> Result<(), Self::Error> {
        self.serialize_text(&format!("{value}"))
    }

    fn serialize_short(&mut self, value: i16) -> Result<(), Self::Error> {
        self.serialize_text(&format!("{value}"))
    }

    fn serialize_integer(&mut self, value: i32) -> Result<(), Self::Error> {
        self.serialize_text(&format!("{value}"))
    }

    fn serialize_long(&mut self, value: i64) -> Result<(), Self::Error> {
        self.serialize_text(&format!("{value}"))
    }

    fn serialize_float(&mut self, value: f32) -> Result<(), Self::Error> {
        self.serialize_text(&format_double_text(value as f64))
    }

    fn serialize_double(&mut self, value: f64) -> Result<(), Self::Error> {
        self.serialize_text(&format_double_text(value))
    }

    fn serialize_char(&mut self, value: char) -> Result<(), Self::Error> {
        let mut buf = [0u8; 4];
        self.serialize_text(value.encode_utf8(&mut buf))
    }

    fn serialize_string(&mut self, value: &str) -> Result<(), Self::Error> {
        self.serialize_text(value)
    }

    fn serialize_blob(&mut self, value: &[u8]) -> Result<(), Self::Error> {
        self.serialize_text(&transcode_core::blob::encode(value))
    }

    fn serialize_timestamp(&mut self, value: Instant) -> Result<(), Self::Error> {
        let format = self
            .pending
            .as_ref()
            .and_then(|p| p.timestamp_format)
            .unwrap_or(TimestampFormatKind::EpochSeconds);
        let text = render_timestamp(value, format);
        self.serialize_text(&text)
    }

    fn serialize_document(&mut self, value: &Document) -> Result<(), Self::Error> {
        match value {
            Document::Array(items) => {
                // A pending field's element (or list-item/map-slot element)
                // opens the container; each entry repeats as `<member>`.
                let is_attr = matches!(
                    self.pending.as_ref(),
                    Some(p) if p.is_attribute
                );
                if is_attr {
                    return Err(XmlError::ser(XmlErrorKind::ProgrammerError {
                        message: "a document array cannot be an XML attribute",
                    }));
                }
                self.open_container_for_document()?;
                for item in items {
                    self.writer.begin_element("member")?;
                    self.write_document_leaf(item)?;
                }
                self.writer.end_element()
            }
            Document::Object(pairs) => {
                self.open_container_for_document()?;
                for (key, value) in pairs {
                    self.writer.begin_element(key)?;
                    self.write_document_leaf(value)?;
                }
                self.writer.end_element()
            }
            scalar => self.serialize_text(&document_scalar_text(scalar)),
        }
    }

    fn serialize_null(&mut self) -> Result<(), Self::Error> {
        if !self.current_slot_allows_sparse() {
            log::debug!("serialize_null: rejected, current slot lacks SparseValues");
            return Err(XmlError::ser(XmlErrorKind::SparseNotAllowed));
        }
        match self.enter_value()? {
            ValueSlot::Attribute(name) => self.writer.attribute(&name, ""),
            ValueSlot::Element => self.writer.end_element(),
        }
    }
}

impl XmlSerializer {
    fn serialize_text(&mut self, text: &str) -> Result<(), XmlError> {
        match self.enter_value()? {
            ValueSlot::Attribute(name) => self.writer.attribute(&name, text),
            ValueSlot::Element => {
                self.writer.text(text)?;
                self.writer.end_element()
            }
        }
    }

    fn open_container_for_document(&mut self) -> Result<(), XmlError> {
        if let Some(p) = self.pending.take() {
            return self.writer.begin_element(&p.name);
        }
        match self.frames.last() {
            Some(Frame::List { item_name, .. }) => {
                let name = item_name.clone();
                self.writer.begin_element(&name)
            }
            Some(Frame::Map { .. }) => self.open_next_map_slot(),
            _ => self.writer.begin_element("value"),
        }
    }

    fn write_document_leaf(&mut self, value: &Document) -> Result<(), XmlError> {
        match value {
            Document::Array(items) => {
                for item in items {
                    self.writer.begin_element("member")?;
                    self.write_document_leaf(item)?;
                }
            }
            Document::Object(pairs) => {
                for (key, value) in pairs {
                    self.writer.begin_element(key)?;
                    self.write_document_leaf(value)?;
                }
            }
            scalar => {
                self.writer.text(&document_scalar_text(scalar))?;
            }
        }
        self.writer.end_element()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transcode_core::descriptor::{ObjectDescriptor as OD, UnindexedField};
    use transcode_core::traits::TraitBag;
    use transcode_core::SerialKind;

    fn build(traits: TraitBag, fields: Vec<UnindexedField>) -> OD {
        OD::build(traits, fields)
    }

    #[test]
    fn struct_with_attribute_and_child_element() {
        let mut object_traits = TraitBag::new();
        object_traits.push(XmlSerialName(String::from("Widget")));
        let desc = build(
            object_traits,
            vec![
                UnindexedField::new(SerialKind::String, "id").with_trait(XmlAttribute),
                UnindexedField::new(SerialKind::Integer, "count"),
            ],
        );
        let mut ser = XmlSerializer::new(WriteOptions::no_prologue());
        ser.begin_struct(&desc).unwrap();
        ser.field_string(&desc.fields()[0], "w1").unwrap();
        ser.field_integer(&desc.fields()[1], 3).unwrap();
        ser.end_struct().unwrap();
        assert_eq!(
            ser.finish(),
            "<Widget id=\"w1\">\n    <count>3</count>\n</Widget>"
        );
    }

    #[test]
    fn non_flattened_list_wraps_in_member_elements() {
        let mut object_traits = TraitBag::new();
        object_traits.push(XmlSerialName(String::from("Response")));
        let desc = build(
            object_traits,
            vec![UnindexedField::new(SerialKind::List, "values")],
        );
        let mut ser = XmlSerializer::new(WriteOptions::no_prologue());
        ser.begin_struct(&desc).unwrap();
        ser.field_name(&desc.fields()[0]).unwrap();
        ser.begin_list(&desc.fields()[0], 2).unwrap();
        ser.serialize_integer(1).unwrap();
        ser.serialize_integer(2).unwrap();
        ser.end_list().unwrap();
        ser.end_struct().unwrap();
        assert_eq!(
            ser.finish(),
            "<Response>\n    <values>\n        <member>1</member>\n        <member>2</member>\n    </values>\n</Response>"
        );
    }

    #[test]
    fn flattened_list_repeats_the_field_name() {
        let mut object_traits = TraitBag::new();
        object_traits.push(XmlSerialName(String::from("Response")));
        let desc = build(
            object_traits,
            vec![UnindexedField::new(SerialKind::List, "Id").with_trait(Flattened)],
        );
        let mut ser = XmlSerializer::new(WriteOptions::no_prologue());
        ser.begin_struct(&desc).unwrap();
        ser.field_name(&desc.fields()[0]).unwrap();
        ser.begin_list(&desc.fields()[0], 2).unwrap();
        ser.serialize_string("a").unwrap();
        ser.serialize_string("b").unwrap();
        ser.end_list().unwrap();
        ser.end_struct().unwrap();
        assert_eq!(
            ser.finish(),
            "<Response>\n    <Id>a</Id>\n    <Id>b</Id>\n</Response>"
        );
    }

    #[test]
    fn map_entries_wrap_key_and_value() {
        let mut object_traits = TraitBag::new();
        object_traits.push(XmlSerialName(String::from("Response")));
        let desc = build(
            object_traits,
            vec![UnindexedField::new(SerialKind::Map, "Tags")],
        );
        let mut ser = XmlSerializer::new(WriteOptions::no_prologue());
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
            "<Response>\n    <Tags>\n        <entry>\n            <key>k1</key>\n            <value>v1</value>\n        </entry>\n        <entry>\n            <key>k2</key>\n            <value>v2</value>\n        </entry>\n    </Tags>\n</Response>"
        );
    }

    #[test]
    fn namespace_trait_emits_xmlns_attribute() {
        let mut object_traits = TraitBag::new();
        object_traits.push(XmlSerialName(String::from("Widget")));
        object_traits.push(XmlNamespace {
            uri: String::from("https://example.com/ns"),
            prefix: None,
        });
        let desc = build(object_traits, vec![]);
        let mut ser = XmlSerializer::new(WriteOptions::no_prologue());
        ser.begin_struct(&desc).unwrap();
        ser.end_struct().unwrap();
        assert_eq!(
            ser.finish(),
            r#"<Widget xmlns="https://example.com/ns"/>"#
        );
    }

    #[test]
    fn null_value_renders_as_empty_element_when_sparse_is_allowed() {
        let desc = build(
            TraitBag::new(),
            vec![UnindexedField::new(SerialKind::String, "note").with_trait(SparseValues)],
        );
        let mut ser = XmlSerializer::new(WriteOptions::no_prologue());
        ser.begin_struct(&desc).unwrap();
        ser.field_name(&desc.fields()[0]).unwrap();
        ser.serialize_null().unwrap();
        ser.end_struct().unwrap();
        assert_eq!(ser.finish(), "<root>\n    <note/>\n</root>");
    }

    #[test]
    fn null_value_is_rejected_without_sparse_values_trait() {
        let desc = build(
            TraitBag::new(),
            vec![UnindexedField::new(SerialKind::String, "note")],
        );
        let mut ser = XmlSerializer::new(WriteOptions::no_prologue());
        ser.begin_struct(&desc).unwrap();
        ser.field_name(&desc.fields()[0]).unwrap();
        let err = ser.serialize_null().unwrap_err();
        assert!(matches!(err.kind(), XmlErrorKind::SparseNotAllowed));
    }
}
