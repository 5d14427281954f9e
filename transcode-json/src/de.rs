//! Schema-directed JSON deserializer (spec §4.3.3).
//!
//! Field lookup (`findNextFieldIndex`) matches the wire member name against
//! each field's [`JsonSerialName`] override, falling back to its plain
//! [`FieldDescriptor::serial_name`]. Map keys are read the same way object
//! member names are: [`MapIter::has_next_entry`] consumes the `Name` token
//! and stashes it, so the following `deserialize_string()` call returns it
//! without a second read.

#[cfg(feature = "alloc")]
use alloc::{string::String, vec::Vec};

use transcode_core::traits::JsonSerialName;
use transcode_core::{
    Deserializer, Document, FieldDescriptor, FieldIndex, Instant, ListIter, MapIter,
    ObjectDescriptor, StructIter,
};

use crate::error::{JsonError, JsonErrorKind};
use crate::reader::{JsonReader, JsonToken};

/// The schema-directed JSON deserializer.
pub struct JsonDeserializer<'de> {
    reader: JsonReader<'de>,
    pending_key: Option<String>,
}

impl<'de> JsonDeserializer<'de> {
    /// Build a deserializer over a UTF-8 byte slice.
    pub fn new(input: &'de [u8]) -> Result<Self, JsonError> {
        Ok(Self {
            reader: JsonReader::new(input)?,
            pending_key: None,
        })
    }

    /// Build a deserializer over a `str`.
    pub fn from_str(input: &'de str) -> Self {
        Self {
            reader: JsonReader::from_str(input),
            pending_key: None,
        }
    }

    fn expect(&mut self, expected: JsonToken, what: &'static str) -> Result<(), JsonError> {
        let tok = self.reader.next_token()?;
        if tok == expected {
            Ok(())
        } else {
            Err(JsonError::de(JsonErrorKind::ProgrammerError { message: what }))
        }
    }

    fn take_string_token(&mut self) -> Result<String, JsonError> {
        if let Some(key) = self.pending_key.take() {
            return Ok(key);
        }
        match self.reader.next_token()? {
            JsonToken::String(s) => Ok(s),
            JsonToken::Number(s) => Ok(s),
            JsonToken::Bool(true) => Ok(String::from("true")),
            JsonToken::Bool(false) => Ok(String::from("false")),
            JsonToken::Null => Ok(String::from("null")),
            _ => Err(JsonError::de(JsonErrorKind::UnexpectedChar {
                found: '\0',
                expected: "a scalar value",
            })),
        }
    }

    fn take_number_token(&mut self) -> Result<String, JsonError> {
        match self.reader.next_token()? {
            JsonToken::Number(s) => Ok(s),
            JsonToken::String(s) => Ok(s),
            other => Err(unexpected_token(&other, "a numeric value")),
        }
    }

    fn parse_integer(&mut self) -> Result<i64, JsonError> {
        let text = self.take_number_token()?;
        if text.contains('.') || text.contains('e') || text.contains('E') {
            return Err(JsonError::de(JsonErrorKind::InvalidNumber { text }));
        }
        text.parse::<i64>()
            .map_err(|_| JsonError::de(JsonErrorKind::InvalidNumber { text }))
    }

    fn parse_float(&mut self) -> Result<f64, JsonError> {
        let text = self.take_number_token()?;
        text.parse::<f64>()
            .map_err(|_| JsonError::de(JsonErrorKind::InvalidNumber { text }))
    }

    fn parse_document(&mut self, tok: JsonToken) -> Result<Document, JsonError> {
        match tok {
            JsonToken::Null => Ok(Document::Null),
            JsonToken::Bool(b) => Ok(Document::Bool(b)),
            JsonToken::String(s) => Ok(Document::String(s)),
            JsonToken::Number(text) => Ok(Document::Number(parse_document_number(&text)?)),
            JsonToken::BeginArray => {
                let mut items = Vec::new();
                loop {
                    let next = self.reader.next_token()?;
                    if next == JsonToken::EndArray {
                        break;
                    }
                    items.push(self.parse_document(next)?);
                }
                Ok(Document::Array(items))
            }
            JsonToken::BeginObject => {
                let mut pairs = Vec::new();
                loop {
                    let next = self.reader.next_token()?;
                    let key = match next {
                        JsonToken::EndObject => break,
                        JsonToken::Name(n) => n,
                        _ => {
                            return Err(JsonError::de(JsonErrorKind::ProgrammerError {
                                message: "expected object member name",
                            }))
                        }
                    };
                    let value_tok = self.reader.next_token()?;
                    pairs.push((key, self.parse_document(value_tok)?));
                }
                Ok(Document::Object(pairs))
            }
            _ => Err(JsonError::de(JsonErrorKind::ProgrammerError {
                message: "unexpected token while reading a document value",
            })),
        }
    }
}

fn unexpected_token(tok: &JsonToken, expected: &'static str) -> JsonError {
    let found = match tok {
        JsonToken::BeginObject => '{',
        JsonToken::EndObject => '}',
        JsonToken::BeginArray => '[',
        JsonToken::EndArray => ']',
        JsonToken::Bool(_) => 'b',
        JsonToken::Null => 'n',
        _ => '?',
    };
    JsonError::de(JsonErrorKind::UnexpectedChar { found, expected })
}

fn parse_document_number(text: &str) -> Result<transcode_core::document::Number, JsonError> {
    use transcode_core::document::Number;
    if text.contains('.') || text.contains('e') || text.contains('E') {
        let f: f64 = text
            .parse()
            .map_err(|_| JsonError::de(JsonErrorKind::InvalidNumber { text: String::from(text) }))?;
        return Ok(Number::Float(f));
    }
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Number::Int(i));
    }
    let u: u64 = text
        .parse()
        .map_err(|_| JsonError::de(JsonErrorKind::InvalidNumber { text: String::from(text) }))?;
    Ok(Number::UInt(u))
}

fn json_name(descriptor: &FieldDescriptor) -> String {
    descriptor
        .traits()
        .find_trait::<JsonSerialName>()
        .map(|t| t.0.clone())
        .unwrap_or_else(|| String::from(descriptor.serial_name()))
}

fn narrow<T: TryFrom<i64>>(value: i64) -> Result<T, JsonError> {
    T::try_from(value).map_err(|_| {
        log::debug!("narrow: {value} does not fit the target integer width");
        JsonError::de(JsonErrorKind::Overflow)
    })
}

impl<'de> Deserializer for JsonDeserializer<'de> {
    type Error = JsonError;

    fn deserialize_struct(&mut self, _descriptor: &ObjectDescriptor) -> Result<(), Self::Error> {
        log::trace!("deserialize_struct: entering object");
        self.expect(JsonToken::BeginObject, "expected a JSON object")
    }

    fn end_struct(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn deserialize_list(&mut self, _descriptor: &FieldDescriptor) -> Result<(), Self::Error> {
        log::trace!("deserialize_list: entering array");
        self.expect(JsonToken::BeginArray, "expected a JSON array")
    }

    fn end_list(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn deserialize_map(&mut self, _descriptor: &FieldDescriptor) -> Result<(), Self::Error> {
        self.expect(JsonToken::BeginObject, "expected a JSON object")
    }

    fn end_map(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn skip_value(&mut self) -> Result<(), Self::Error> {
        self.pending_key = None;
        self.reader.skip_next()
    }

    fn deserialize_boolean(&mut self) -> Result<bool, Self::Error> {
        match self.reader.next_token()? {
            JsonToken::Bool(b) => Ok(b),
            other => Err(unexpected_token(&other, "a boolean value")),
        }
    }

    fn deserialize_byte(&mut self) -> Result<i8, Self::Error> {
        narrow(self.parse_integer()?)
    }

    fn deserialize_short(&mut self) -> Result<i16, Self::Error> {
        narrow(self.parse_integer()?)
    }

    fn deserialize_integer(&mut self) -> Result<i32, Self::Error> {
        narrow(self.parse_integer()?)
    }

    fn deserialize_long(&mut self) -> Result<i64, Self::Error> {
        self.parse_integer()
    }

    fn deserialize_float(&mut self) -> Result<f32, Self::Error> {
        let value = self.parse_float()?;
        Ok(value as f32)
    }

    fn deserialize_double(&mut self) -> Result<f64, Self::Error> {
        self.parse_float()
    }

    fn deserialize_char(&mut self) -> Result<char, Self::Error> {
        let text = self.take_string_token()?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(JsonError::de(JsonErrorKind::InvalidNumber { text })),
        }
    }

    fn deserialize_string(&mut self) -> Result<String, Self::Error> {
        self.take_string_token()
    }

    fn deserialize_blob(&mut self) -> Result<Vec<u8>, Self::Error> {
        let text = self.take_string_token()?;
        transcode_core::blob::decode(&text).map_err(JsonError::from)
    }

    fn deserialize_timestamp(&mut self) -> Result<Instant, Self::Error> {
        let seconds = self.parse_float()?;
        Ok(Instant::from_epoch_seconds_f64(seconds))
    }

    fn deserialize_document(&mut self) -> Result<Document, Self::Error> {
        let tok = self.reader.next_token()?;
        self.parse_document(tok)
    }

    fn deserialize_null(&mut self) -> Result<(), Self::Error> {
        self.expect(JsonToken::Null, "expected null")
    }
}

impl<'de> StructIter for JsonDeserializer<'de> {
    type Error = JsonError;

    fn find_next_field_index(
        &mut self,
        descriptor: &ObjectDescriptor,
    ) -> Result<FieldIndex, Self::Error> {
        if *self.reader.peek_token()? == JsonToken::EndObject {
            self.reader.next_token()?;
            return Ok(FieldIndex::Exhausted);
        }
        match self.reader.next_token()? {
            JsonToken::Name(name) => {
                for field in descriptor.fields() {
                    if json_name(field) == name {
                        return Ok(FieldIndex::Index(field.index()));
                    }
                }
                log::debug!("skipping unknown field: {name}");
                Ok(FieldIndex::Unknown)
            }
            _ => Err(JsonError::de(JsonErrorKind::ProgrammerError {
                message: "expected an object member name",
            })),
        }
    }
}

impl<'de> ListIter for JsonDeserializer<'de> {
    type Error = JsonError;

    fn has_next_element(&mut self) -> Result<bool, Self::Error> {
        if *self.reader.peek_token()? == JsonToken::EndArray {
            self.reader.next_token()?;
            return Ok(false);
        }
        Ok(true)
    }

    fn next_has_value(&mut self) -> Result<bool, Self::Error> {
        Ok(*self.reader.peek_token()? != JsonToken::Null)
    }
}

impl<'de> MapIter for JsonDeserializer<'de> {
    type Error = JsonError;

    fn has_next_entry(&mut self) -> Result<bool, Self::Error> {
        if *self.reader.peek_token()? == JsonToken::EndObject {
            self.reader.next_token()?;
            return Ok(false);
        }
        match self.reader.next_token()? {
            JsonToken::Name(name) => {
                self.pending_key = Some(name);
                Ok(true)
            }
            _ => Err(JsonError::de(JsonErrorKind::ProgrammerError {
                message: "expected a map entry key",
            })),
        }
    }

    fn next_has_value(&mut self) -> Result<bool, Self::Error> {
        Ok(*self.reader.peek_token()? != JsonToken::Null)
    }
}
