//! Schema-directed XML deserializer (spec §4.4.3).
//!
//! Field lookup works through two passes per struct: the element's own
//! attributes (collected when its `BeginElement` was read) are matched
//! against [`XmlAttribute`]-tagged fields first, then child elements are
//! matched by name. A child element's `BeginElement` is consumed as soon
//! as it is identified — stashed as `opened` — and whatever the caller
//! does next (`deserialize_integer`, `deserialize_struct`, ...) consumes
//! it from there; there is no separate "enter" step the way JSON has none
//! either.
//!
//! Map entries differ from JSON's `pending_key` convention: because `key`
//! and `value` are sibling elements rather than a name token immediately
//! followed by its value, [`MapIter::next_has_value`] must be called
//! *after* the key has been read (not before, as in JSON) so that it can
//! peek the `value` element once it's actually next in the stream.

use transcode_core::traits::{Flattened, XmlAttribute, XmlCollectionName, XmlMapName};
use transcode_core::{
    Deserializer, Document, FieldDescriptor, FieldIndex, Instant, ListIter, MapIter,
    ObjectDescriptor, StructIter,
};

use crate::error::{XmlError, XmlErrorKind};
use crate::reader::{QualifiedName, XmlReader, XmlToken};

struct OpenedElement {
    depth: usize,
    attributes: Vec<(QualifiedName, String)>,
}

enum Scope {
    Struct {
        depth: usize,
        attrs: Vec<(QualifiedName, String)>,
        attr_pos: usize,
    },
    List {
        item_name: String,
        item_depth: usize,
        wrapper_depth: Option<usize>,
        pending_item: Option<OpenedElement>,
    },
    Map {
        entry_name: String,
        key_name: String,
        value_name: String,
        entry_depth: usize,
        wrapper_depth: Option<usize>,
        pending_entry: Option<OpenedElement>,
        entry_open: bool,
    },
}

/// The schema-directed XML deserializer.
pub struct XmlDeserializer<'de> {
    reader: XmlReader<'de>,
    opened: Option<OpenedElement>,
    pending_scalar: Option<String>,
    scopes: Vec<Scope>,
}

fn programmer_error(message: &'static str) -> XmlError {
    XmlError::de(XmlErrorKind::ProgrammerError { message })
}

fn malformed(message: impl Into<String>) -> XmlError {
    let message = message.into();
    log::debug!("malformed: {message}");
    XmlError::de(XmlErrorKind::Malformed { message })
}

fn xml_name(descriptor: &FieldDescriptor) -> String {
    descriptor
        .traits()
        .find_trait::<transcode_core::traits::XmlSerialName>()
        .map(|t| t.0.clone())
        .unwrap_or_else(|| String::from(descriptor.serial_name()))
}

impl<'de> XmlDeserializer<'de> {
    /// Build a deserializer over a UTF-8 XML document.
    pub fn new(input: &'de [u8]) -> Self {
        Self {
            reader: XmlReader::new(input),
            opened: None,
            pending_scalar: None,
            scopes: Vec::new(),
        }
    }

    fn take_opened(&mut self) -> Result<OpenedElement, XmlError> {
        if let Some(o) = self.opened.take() {
            return Ok(o);
        }
        match self.reader.next_token()? {
            Some(XmlToken::BeginElement { depth, attributes, .. }) => {
                Ok(OpenedElement { depth, attributes })
            }
            _ => Err(malformed("expected an opening tag")),
        }
    }

    fn next_pending_attribute(&mut self) -> Option<(String, String)> {
        match self.scopes.last_mut() {
            Some(Scope::Struct { attrs, attr_pos, .. }) if *attr_pos < attrs.len() => {
                let (name, value) = attrs[*attr_pos].clone();
                *attr_pos += 1;
                Some((name.local, value))
            }
            _ => None,
        }
    }

    fn skip_subtree(&mut self, depth: usize) -> Result<(), XmlError> {
        loop {
            match self.reader.next_token()? {
                Some(XmlToken::EndElement { depth: d, .. }) if d == depth => return Ok(()),
                Some(_) => continue,
                None => return Err(XmlError::de(XmlErrorKind::UnexpectedEndOfInput)),
            }
        }
    }

    fn take_scalar_text(&mut self) -> Result<String, XmlError> {
        if let Some(text) = self.pending_scalar.take() {
            return Ok(text);
        }
        let opened = self
            .opened
            .take()
            .ok_or_else(|| programmer_error("scalar read with no opened element"))?;
        match self.reader.next_token()? {
            Some(XmlToken::EndElement { depth, .. }) if depth == opened.depth => Ok(String::new()),
            Some(XmlToken::Text { value, .. }) => match self.reader.next_token()? {
                Some(XmlToken::EndElement { depth, .. }) if depth == opened.depth => Ok(value),
                _ => Err(malformed("expected a closing tag after scalar text")),
            },
            _ => Err(malformed("expected scalar text content")),
        }
    }

    fn read_document_value(&mut self, depth: usize) -> Result<Document, XmlError> {
        match self.reader.peek(0)? {
            Some(XmlToken::Text { .. }) => {
                let value = match self.reader.next_token()?.unwrap() {
                    XmlToken::Text { value, .. } => value,
                    _ => unreachable!(),
                };
                match self.reader.next_token()? {
                    Some(XmlToken::EndElement { depth: d, .. }) if d == depth => {
                        Ok(Document::String(value))
                    }
                    _ => Err(malformed("expected a closing tag after document text")),
                }
            }
            Some(XmlToken::EndElement { depth: d, .. }) if *d == depth => {
                self.reader.next_token()?;
                Ok(Document::Null)
            }
            Some(XmlToken::BeginElement { .. }) => {
                let mut children: Vec<(String, Document)> = Vec::new();
                loop {
                    match self.reader.next_token()? {
                        Some(XmlToken::EndElement { depth: d, .. }) if d == depth => break,
                        Some(XmlToken::BeginElement { depth: cd, name, .. }) => {
                            let value = self.read_document_value(cd)?;
                            children.push((name.local, value));
                        }
                        Some(_) => continue,
                        None => return Err(XmlError::de(XmlErrorKind::UnexpectedEndOfInput)),
                    }
                }
                if !children.is_empty() && children.iter().all(|(k, _)| k == "member") {
                    Ok(Document::Array(children.into_iter().map(|(_, v)| v).collect()))
                } else {
                    Ok(Document::Object(children))
                }
            }
            None => Err(XmlError::de(XmlErrorKind::UnexpectedEndOfInput)),
        }
    }
}

impl<'de> Deserializer for XmlDeserializer<'de> {
    type Error = XmlError;

    fn deserialize_struct(&mut self, _descriptor: &ObjectDescriptor) -> Result<(), Self::Error> {
        let opened = self.take_opened()?;
        log::trace!("deserialize_struct: pushing scope at depth {}", opened.depth);
        self.scopes.push(Scope::Struct {
            depth: opened.depth,
            attrs: opened.attributes,
            attr_pos: 0,
        });
        Ok(())
    }

    fn end_struct(&mut self) -> Result<(), Self::Error> {
        match self.scopes.pop() {
            Some(Scope::Struct { .. }) => Ok(()),
            _ => Err(programmer_error("end_struct without a matching deserialize_struct")),
        }
    }

    fn deserialize_list(&mut self, descriptor: &FieldDescriptor) -> Result<(), Self::Error> {
        let flattened = descriptor.traits().has_trait::<Flattened>();
        let item_name = if flattened {
            xml_name(descriptor)
        } else {
            descriptor
                .traits()
                .find_trait::<XmlCollectionName>()
                .map(|t| t.element.clone())
                .unwrap_or_else(|| String::from("member"))
        };
        if flattened {
            let opened = self
                .opened
                .take()
                .ok_or_else(|| programmer_error("flattened list entered with no opened element"))?;
            let item_depth = opened.depth;
            self.scopes.push(Scope::List {
                item_name,
                item_depth,
                wrapper_depth: None,
                pending_item: Some(opened),
            });
        } else {
            let opened = self.take_opened()?;
            self.scopes.push(Scope::List {
                item_name,
                item_depth: opened.depth + 1,
                wrapper_depth: Some(opened.depth),
                pending_item: None,
            });
        }
        Ok(())
    }

    fn end_list(&mut self) -> Result<(), Self::Error> {
        match self.scopes.pop() {
            Some(Scope::List { .. }) => Ok(()),
            _ => Err(programmer_error("end_list without a matching deserialize_list")),
        }
    }

    fn deserialize_map(&mut self, descriptor: &FieldDescriptor) -> Result<(), Self::Error> {
        let flattened = descriptor.traits().has_trait::<Flattened>();
        let names = descriptor.traits().find_trait::<XmlMapName>();
        let entry_name = names
            .map(|n| n.entry.clone())
            .unwrap_or_else(|| String::from("entry"));
        let key_name = names.map(|n| n.key.clone()).unwrap_or_else(|| String::from("key"));
        let value_name = names
            .map(|n| n.value.clone())
            .unwrap_or_else(|| String::from("value"));
        if flattened {
            let opened = self
                .opened
                .take()
                .ok_or_else(|| programmer_error("flattened map entered with no opened element"))?;
            let entry_depth = opened.depth;
            self.scopes.push(Scope::Map {
                entry_name,
                key_name,
                value_name,
                entry_depth,
                wrapper_depth: None,
                pending_entry: Some(opened),
                entry_open: false,
            });
        } else {
            let opened = self.take_opened()?;
            self.scopes.push(Scope::Map {
                entry_name,
                key_name,
                value_name,
                entry_depth: opened.depth + 1,
                wrapper_depth: Some(opened.depth),
                pending_entry: None,
                entry_open: false,
            });
        }
        Ok(())
    }

    fn end_map(&mut self) -> Result<(), Self::Error> {
        match self.scopes.pop() {
            Some(Scope::Map { .. }) => Ok(()),
            _ => Err(programmer_error("end_map without a matching deserialize_map")),
        }
    }

    fn skip_value(&mut self) -> Result<(), Self::Error> {
        if self.pending_scalar.take().is_some() {
            return Ok(());
        }
        if let Some(opened) = self.opened.take() {
            return self.skip_subtree(opened.depth);
        }
        Ok(())
    }

    fn deserialize_boolean(&mut self) -> Result<bool, Self::Error> {
        let text = self.take_scalar_text()?;
        match text.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(malformed(format!("invalid boolean text: {text}"))),
        }
    }

    fn deserialize_byte(&mut self) -> Result<i8, Self::Error> {
        let text = self.take_scalar_text()?;
        text.parse()
            .map_err(|_| malformed(format!("invalid byte text: {text}")))
    }

    fn deserialize_short(&mut self) -> Result<i16, Self::Error> {
        let text = self.take_scalar_text()?;
        text.parse()
            .map_err(|_| malformed(format!("invalid short text: {text}")))
    }

    fn deserialize_integer(&mut self) -> Result<i32, Self::Error> {
        let text = self.take_scalar_text()?;
        text.parse()
            .map_err(|_| malformed(format!("invalid integer text: {text}")))
    }

    fn deserialize_long(&mut self) -> Result<i64, Self::Error> {
        let text = self.take_scalar_text()?;
        text.parse()
            .map_err(|_| malformed(format!("invalid long text: {text}")))
    }

    fn deserialize_float(&mut self) -> Result<f32, Self::Error> {
        let text = self.take_scalar_text()?;
        match text.as_str() {
            "NaN" => Ok(f32::NAN),
            "Infinity" => Ok(f32::INFINITY),
            "-Infinity" => Ok(f32::NEG_INFINITY),
            _ => text.parse().map_err(|_| malformed(format!("invalid float text: {text}"))),
        }
    }

    fn deserialize_double(&mut self) -> Result<f64, Self::Error> {
        let text = self.take_scalar_text()?;
        match text.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            _ => text.parse().map_err(|_| malformed(format!("invalid double text: {text}"))),
        }
    }

    fn deserialize_char(&mut self) -> Result<char, Self::Error> {
        let text = self.take_scalar_text()?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(malformed(format!("invalid char text: {text}"))),
        }
    }

    fn deserialize_string(&mut self) -> Result<String, Self::Error> {
        self.take_scalar_text()
    }

    fn deserialize_blob(&mut self) -> Result<Vec<u8>, Self::Error> {
        let text = self.take_scalar_text()?;
        transcode_core::blob::decode(&text).map_err(XmlError::from)
    }

    fn deserialize_timestamp(&mut self) -> Result<Instant, Self::Error> {
        let text = self.take_scalar_text()?;
        if let Ok(seconds) = text.parse::<f64>() {
            return Ok(Instant::from_epoch_seconds_f64(seconds));
        }
        if let Some(instant) = Instant::parse_iso8601(&text) {
            return Ok(instant);
        }
        if let Some(instant) = Instant::parse_rfc2822(&text) {
            return Ok(instant);
        }
        Err(malformed(format!("invalid timestamp text: {text}")))
    }

    fn deserialize_document(&mut self) -> Result<Document, Self::Error> {
        let opened = self
            .opened
            .take()
            .ok_or_else(|| programmer_error("deserialize_document with no opened element"))?;
        self.read_document_value(opened.depth)
    }

    fn deserialize_null(&mut self) -> Result<(), Self::Error> {
        if self.pending_scalar.take().is_some() {
            return Ok(());
        }
        let opened = self
            .opened
            .take()
            .ok_or_else(|| programmer_error("deserialize_null with no opened element"))?;
        match self.reader.next_token()? {
            Some(XmlToken::EndElement { depth, .. }) if depth == opened.depth => Ok(()),
            _ => Err(malformed("expected an empty element for null")),
        }
    }
}

impl<'de> StructIter for XmlDeserializer<'de> {
    type Error = XmlError;

    fn find_next_field_index(
        &mut self,
        descriptor: &ObjectDescriptor,
    ) -> Result<FieldIndex, Self::Error> {
        let depth = match self.scopes.last() {
            Some(Scope::Struct { depth, .. }) => *depth,
            _ => return Err(programmer_error("find_next_field_index called outside a struct")),
        };

        if let Some((name, value)) = self.next_pending_attribute() {
            for field in descriptor.fields() {
                if field.traits().has_trait::<XmlAttribute>() && xml_name(field) == name {
                    self.pending_scalar = Some(value);
                    return Ok(FieldIndex::Index(field.index()));
                }
            }
            log::debug!("skipping unknown attribute: {name}");
            return Ok(FieldIndex::Unknown);
        }

        loop {
            match self.reader.peek(0)? {
                Some(XmlToken::EndElement { depth: d, .. }) if *d == depth => {
                    self.reader.next_token()?;
                    return Ok(FieldIndex::Exhausted);
                }
                Some(XmlToken::BeginElement { depth: d, .. }) if *d == depth + 1 => {
                    let local = match self.reader.next_token()?.unwrap() {
                        XmlToken::BeginElement { depth, name, attributes, .. } => {
                            self.opened = Some(OpenedElement { depth, attributes });
                            name.local
                        }
                        _ => unreachable!(),
                    };
                    for field in descriptor.fields() {
                        if !field.traits().has_trait::<XmlAttribute>() && xml_name(field) == local {
                            return Ok(FieldIndex::Index(field.index()));
                        }
                    }
                    log::debug!("skipping unknown element: {local}");
                    return Ok(FieldIndex::Unknown);
                }
                Some(_) => {
                    self.reader.next_token()?;
                }
                None => return Err(XmlError::de(XmlErrorKind::UnexpectedEndOfInput)),
            }
        }
    }
}

impl<'de> ListIter for XmlDeserializer<'de> {
    type Error = XmlError;

    fn has_next_element(&mut self) -> Result<bool, Self::Error> {
        let (item_name, item_depth, wrapper_depth) = match self.scopes.last() {
            Some(Scope::List { item_name, item_depth, wrapper_depth, .. }) => {
                (item_name.clone(), *item_depth, *wrapper_depth)
            }
            _ => return Err(programmer_error("has_next_element called outside a list")),
        };
        let pending = match self.scopes.last_mut() {
            Some(Scope::List { pending_item, .. }) => pending_item.take(),
            _ => None,
        };
        if let Some(opened) = pending {
            self.opened = Some(opened);
            return Ok(true);
        }
        loop {
            match wrapper_depth {
                Some(wd) => match self.reader.peek(0)? {
                    Some(XmlToken::EndElement { depth, .. }) if *depth == wd => {
                        self.reader.next_token()?;
                        return Ok(false);
                    }
                    Some(XmlToken::BeginElement { depth, .. }) if *depth == item_depth => {
                        match self.reader.next_token()?.unwrap() {
                            XmlToken::BeginElement { depth, attributes, .. } => {
                                self.opened = Some(OpenedElement { depth, attributes });
                            }
                            _ => unreachable!(),
                        }
                        return Ok(true);
                    }
                    Some(_) => {
                        self.reader.next_token()?;
                    }
                    None => return Err(XmlError::de(XmlErrorKind::UnexpectedEndOfInput)),
                },
                None => {
                    return match self.reader.peek(0)? {
                        Some(XmlToken::BeginElement { depth, name, .. })
                            if *depth == item_depth && name.local == item_name =>
                        {
                            match self.reader.next_token()?.unwrap() {
                                XmlToken::BeginElement { depth, attributes, .. } => {
                                    self.opened = Some(OpenedElement { depth, attributes });
                                }
                                _ => unreachable!(),
                            }
                            Ok(true)
                        }
                        _ => Ok(false),
                    };
                }
            }
        }
    }

    fn next_has_value(&mut self) -> Result<bool, Self::Error> {
        let depth = self
            .opened
            .as_ref()
            .map(|o| o.depth)
            .ok_or_else(|| programmer_error("next_has_value with no opened item"))?;
        match self.reader.peek(0)? {
            Some(XmlToken::EndElement { depth: d, .. }) if *d == depth => Ok(false),
            _ => Ok(true),
        }
    }
}

impl<'de> MapIter for XmlDeserializer<'de> {
    type Error = XmlError;

    fn has_next_entry(&mut self) -> Result<bool, Self::Error> {
        let (entry_depth, wrapper_depth, entry_name, key_name, was_open) = match self.scopes.last() {
            Some(Scope::Map { entry_depth, wrapper_depth, entry_name, key_name, entry_open, .. }) => {
                (*entry_depth, *wrapper_depth, entry_name.clone(), key_name.clone(), *entry_open)
            }
            _ => return Err(programmer_error("has_next_entry called outside a map")),
        };

        if was_open {
            match self.reader.next_token()? {
                Some(XmlToken::EndElement { depth, .. }) if depth == entry_depth => {}
                _ => return Err(malformed("expected a closing entry tag")),
            }
            if let Some(Scope::Map { entry_open, .. }) = self.scopes.last_mut() {
                *entry_open = false;
            }
        }

        let pending = match self.scopes.last_mut() {
            Some(Scope::Map { pending_entry, .. }) => pending_entry.take(),
            _ => None,
        };

        let opened = if pending.is_some() {
            pending
        } else if let Some(wd) = wrapper_depth {
            match self.reader.peek(0)? {
                Some(XmlToken::EndElement { depth, .. }) if *depth == wd => {
                    self.reader.next_token()?;
                    None
                }
                Some(XmlToken::BeginElement { depth, .. }) if *depth == entry_depth => {
                    match self.reader.next_token()?.unwrap() {
                        XmlToken::BeginElement { depth, attributes, .. } => {
                            Some(OpenedElement { depth, attributes })
                        }
                        _ => unreachable!(),
                    }
                }
                _ => None,
            }
        } else {
            match self.reader.peek(0)? {
                Some(XmlToken::BeginElement { depth, name, .. })
                    if *depth == entry_depth && name.local == entry_name =>
                {
                    match self.reader.next_token()?.unwrap() {
                        XmlToken::BeginElement { depth, attributes, .. } => {
                            Some(OpenedElement { depth, attributes })
                        }
                        _ => unreachable!(),
                    }
                }
                _ => None,
            }
        };

        let opened = match opened {
            Some(o) => o,
            None => return Ok(false),
        };
        let _ = opened.attributes;

        if let Some(Scope::Map { entry_open, .. }) = self.scopes.last_mut() {
            *entry_open = true;
        }

        match self.reader.next_token()? {
            Some(XmlToken::BeginElement { depth, name, attributes, .. }) => {
                if name.local != key_name {
                    return Err(malformed(format!(
                        "expected map entry key element `{key_name}`, found `{}`",
                        name.local
                    )));
                }
                self.opened = Some(OpenedElement { depth, attributes });
            }
            _ => return Err(malformed("expected a map entry key element")),
        }
        Ok(true)
    }

    fn next_has_value(&mut self) -> Result<bool, Self::Error> {
        let value_name = match self.scopes.last() {
            Some(Scope::Map { value_name, .. }) => value_name.clone(),
            _ => return Err(programmer_error("next_has_value called outside a map")),
        };
        match self.reader.next_token()? {
            Some(XmlToken::BeginElement { depth, name, attributes, .. }) => {
                if name.local != value_name {
                    return Err(malformed(format!(
                        "expected map entry value element `{value_name}`, found `{}`",
                        name.local
                    )));
                }
                let is_empty = matches!(
                    self.reader.peek(0)?,
                    Some(XmlToken::EndElement { depth: d, .. }) if *d == depth
                );
                self.opened = Some(OpenedElement { depth, attributes });
                Ok(!is_empty)
            }
            _ => Err(malformed("expected a map entry value element")),
        }
    }
}
