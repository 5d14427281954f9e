//! Schema-directed CBOR deserializer (spec §4.6.3).
//!
//! Structs decode as element-positional lists: [`StructIter::find_next_field_index`]
//! walks a position counter against the descriptor's field order rather than
//! matching a wire key, mirroring [`crate::ser::CborSerializer`]'s encode side.
//! Lists and maps may be definite- or indefinite-length on the wire; a
//! [`Frame`] stack tracks which, and for maps, whether the next scalar call
//! reads a key or a value.

use transcode_core::document::Number;
use transcode_core::{
    BigDecimal, BigInteger, Buffer, Deserializer, Document, FieldDescriptor, FieldIndex, Instant,
    ListIter, MapIter, ObjectDescriptor, StructIter,
};

use crate::error::{CborError, CborErrorKind};
use crate::float16::decode_f16;
use crate::head::*;
use crate::reader::CborReader;

/// Tracks one open struct/list/map: its remaining definite count, if any,
/// and (for structs) the next positional field index, or (for maps)
/// whether the next scalar call is a key or a value.
enum Frame {
    Struct { remaining: Option<u64>, position: usize },
    List { remaining: Option<u64> },
    Map { remaining: Option<u64>, expect_key: bool },
}

/// The schema-directed CBOR deserializer.
pub struct CborDeserializer {
    buf: Buffer,
    frames: Vec<Frame>,
}

impl CborDeserializer {
    /// Build a deserializer over owned wire bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            buf: Buffer::from_vec(bytes),
            frames: Vec::new(),
        }
    }

    /// Build a deserializer over a borrowed byte slice.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            buf: Buffer::from_slice(bytes),
            frames: Vec::new(),
        }
    }

    fn reader(&mut self) -> CborReader<'_> {
        CborReader::new(&mut self.buf)
    }

    /// Read a container head and check its major, returning the resolved
    /// count (`None` for indefinite length).
    fn open_container(&mut self, expected_major: u8) -> Result<Option<u64>, CborError> {
        let head = self.reader().read_head()?;
        if head.major != expected_major {
            return Err(CborError::de(CborErrorKind::UnexpectedMinor {
                major: head.major,
                minor: head.minor,
            }));
        }
        self.reader().read_argument(head.major, head.minor)
    }

    /// Toggle the innermost map's key/value alternation; `false` outside a
    /// map frame.
    fn consume_slot(&mut self) -> bool {
        match self.frames.last_mut() {
            Some(Frame::Map { expect_key, .. }) => {
                let is_key = *expect_key;
                *expect_key = !is_key;
                is_key
            }
            _ => false,
        }
    }

    fn read_signed(&mut self) -> Result<i64, CborError> {
        let mut r = self.reader();
        let head = r.read_head()?;
        match head.major {
            MAJOR_UINT => {
                let arg = r
                    .read_argument(head.major, head.minor)?
                    .ok_or_else(|| CborError::de(CborErrorKind::UnexpectedMinor {
                        major: head.major,
                        minor: head.minor,
                    }))?;
                i64::try_from(arg).map_err(|_| CborError::de(CborErrorKind::Overflow))
            }
            MAJOR_NEG => {
                let arg = r
                    .read_argument(head.major, head.minor)?
                    .ok_or_else(|| CborError::de(CborErrorKind::UnexpectedMinor {
                        major: head.major,
                        minor: head.minor,
                    }))?;
                // spec §8: n == -1 - asUnsigned(wireArgument(n))
                let logical = -1i128 - arg as i128;
                if logical < i64::MIN as i128 {
                    Err(CborError::de(CborErrorKind::Overflow))
                } else {
                    Ok(logical as i64)
                }
            }
            _ => Err(CborError::de(CborErrorKind::UnexpectedMinor {
                major: head.major,
                minor: head.minor,
            })),
        }
    }

    fn read_float_bits(&mut self) -> Result<f64, CborError> {
        let head = self.reader().read_head()?;
        if head.major != MAJOR_SIMPLE {
            return Err(CborError::de(CborErrorKind::UnexpectedMinor {
                major: head.major,
                minor: head.minor,
            }));
        }
        match head.minor {
            MINOR_FLOAT16 => {
                let bytes = self.buf.read_byte_array(2)?;
                Ok(decode_f16(u16::from_be_bytes([bytes[0], bytes[1]])) as f64)
            }
            MINOR_FLOAT32 => {
                let bytes = self.buf.read_byte_array(4)?;
                Ok(f32::from_be_bytes(bytes.try_into().unwrap()) as f64)
            }
            MINOR_FLOAT64 => {
                let bytes = self.buf.read_byte_array(8)?;
                Ok(f64::from_be_bytes(bytes.try_into().unwrap()))
            }
            minor => Err(CborError::de(CborErrorKind::UnexpectedMinor { major: MAJOR_SIMPLE, minor })),
        }
    }

    fn read_text(&mut self) -> Result<String, CborError> {
        let head = self.reader().read_head()?;
        if head.major != MAJOR_TEXT {
            return Err(CborError::de(CborErrorKind::UnexpectedMinor {
                major: head.major,
                minor: head.minor,
            }));
        }
        let bytes = self.reader().read_string_body(MAJOR_TEXT, head)?;
        String::from_utf8(bytes).map_err(|_| CborError::de(CborErrorKind::Overflow))
    }

    fn read_bignum(&mut self, negative: bool) -> Result<String, CborError> {
        let head = self.reader().read_head()?;
        if head.major != MAJOR_BYTES {
            return Err(CborError::de(CborErrorKind::UnexpectedMinor {
                major: head.major,
                minor: head.minor,
            }));
        }
        let bytes = self.reader().read_string_body(MAJOR_BYTES, head)?;
        let big = if negative {
            BigInteger::from_negative_bignum_bytes(&bytes)
        } else {
            BigInteger::from_unsigned_bytes(&bytes)
        };
        Ok(big.to_decimal_string())
    }

    fn read_decimal_fraction(&mut self) -> Result<String, CborError> {
        let count = self
            .open_container(MAJOR_LIST)?
            .ok_or_else(|| CborError::de(CborErrorKind::InvalidMantissa))?;
        if count != 2 {
            return Err(CborError::de(CborErrorKind::InvalidMantissa));
        }
        let exponent = self.read_signed()?;
        let mantissa_head = self.reader().peek_head()?;
        let mantissa = match mantissa_head.major {
            MAJOR_TAG => {
                let head = self.reader().read_head()?;
                let tag = self
                    .reader()
                    .read_argument(MAJOR_TAG, head.minor)?
                    .ok_or_else(|| CborError::de(CborErrorKind::UnexpectedMinor {
                        major: MAJOR_TAG,
                        minor: head.minor,
                    }))?;
                match tag {
                    TAG_UNSIGNED_BIGNUM => BigInteger::from_decimal_str(&self.read_bignum(false)?)
                        .ok_or_else(|| CborError::de(CborErrorKind::InvalidMantissa))?,
                    TAG_NEGATIVE_BIGNUM => BigInteger::from_decimal_str(&self.read_bignum(true)?)
                        .ok_or_else(|| CborError::de(CborErrorKind::InvalidMantissa))?,
                    other => {
                        log::debug!("unsupported CBOR tag in bignum position: {other}");
                        return Err(CborError::de(CborErrorKind::UnsupportedTag { tag: other }));
                    }
                }
            }
            _ => BigInteger::from_decimal_str(&self.read_signed()?.to_string())
                .ok_or_else(|| CborError::de(CborErrorKind::InvalidMantissa))?,
        };
        Ok(BigDecimal::new(mantissa, exponent).to_decimal_string())
    }

    fn read_document_value(&mut self) -> Result<Document, CborError> {
        let head = self.reader().peek_head()?;
        match head.major {
            MAJOR_UINT => {
                let (_, arg) = self.reader().read_uint()?;
                Ok(Document::Number(Number::UInt(arg.unwrap_or(0))))
            }
            MAJOR_NEG => Ok(Document::Number(Number::Int(self.read_signed()?))),
            MAJOR_BYTES => {
                self.reader().read_head()?;
                let bytes = self.reader().read_string_body(MAJOR_BYTES, head)?;
                Ok(Document::String(transcode_core::blob::encode(&bytes)))
            }
            MAJOR_TEXT => Ok(Document::String(self.read_text()?)),
            MAJOR_LIST => {
                self.reader().read_head()?;
                let count = self.reader().read_argument(MAJOR_LIST, head.minor)?;
                let mut items = Vec::new();
                match count {
                    Some(n) => {
                        for _ in 0..n {
                            items.push(self.read_document_value()?);
                        }
                    }
                    None => loop {
                        let next = self.reader().peek_head()?;
                        if next.major == MAJOR_SIMPLE && next.minor == MINOR_BREAK {
                            self.reader().read_head()?;
                            break;
                        }
                        items.push(self.read_document_value()?);
                    },
                }
                Ok(Document::Array(items))
            }
            MAJOR_MAP => {
                self.reader().read_head()?;
                let count = self.reader().read_argument(MAJOR_MAP, head.minor)?;
                let mut pairs = Vec::new();
                match count {
                    Some(n) => {
                        for _ in 0..n {
                            let key = self.read_text()?;
                            let value = self.read_document_value()?;
                            pairs.push((key, value));
                        }
                    }
                    None => loop {
                        let next = self.reader().peek_head()?;
                        if next.major == MAJOR_SIMPLE && next.minor == MINOR_BREAK {
                            self.reader().read_head()?;
                            break;
                        }
                        let key = self.read_text()?;
                        let value = self.read_document_value()?;
                        pairs.push((key, value));
                    },
                }
                Ok(Document::Object(pairs))
            }
            MAJOR_TAG => {
                self.reader().read_head()?;
                let tag = self
                    .reader()
                    .read_argument(MAJOR_TAG, head.minor)?
                    .ok_or_else(|| CborError::de(CborErrorKind::UnexpectedMinor {
                        major: MAJOR_TAG,
                        minor: head.minor,
                    }))?;
                match tag {
                    TAG_TIMESTAMP => Ok(Document::Number(Number::Float(self.read_float_bits()?))),
                    TAG_UNSIGNED_BIGNUM => Ok(Document::String(self.read_bignum(false)?)),
                    TAG_NEGATIVE_BIGNUM => Ok(Document::String(self.read_bignum(true)?)),
                    TAG_DECIMAL_FRACTION => Ok(Document::String(self.read_decimal_fraction()?)),
                    other => {
                        log::debug!("unsupported CBOR tag in document position: {other}");
                        Err(CborError::de(CborErrorKind::UnsupportedTag { tag: other }))
                    }
                }
            }
            MAJOR_SIMPLE => match head.minor {
                MINOR_FALSE => {
                    self.reader().read_head()?;
                    Ok(Document::Bool(false))
                }
                MINOR_TRUE => {
                    self.reader().read_head()?;
                    Ok(Document::Bool(true))
                }
                MINOR_NULL | MINOR_UNDEFINED => {
                    self.reader().read_head()?;
                    Ok(Document::Null)
                }
                MINOR_FLOAT16 | MINOR_FLOAT32 | MINOR_FLOAT64 => {
                    Ok(Document::Number(Number::Float(self.read_float_bits()?)))
                }
                minor => Err(CborError::de(CborErrorKind::UnexpectedMinor { major: MAJOR_SIMPLE, minor })),
            },
            major => Err(CborError::de(CborErrorKind::UnexpectedMinor { major, minor: head.minor })),
        }
    }

    /// Discard exactly one complete CBOR value (scalar, container, or tagged
    /// value), consuming its wire bytes without building anything.
    fn skip_one(&mut self) -> Result<(), CborError> {
        self.read_document_value().map(|_| ())
    }
}

fn narrow<T: TryFrom<i64>>(value: i64) -> Result<T, CborError> {
    T::try_from(value).map_err(|_| {
        log::debug!("narrow: {value} does not fit the target integer width");
        CborError::de(CborErrorKind::Overflow)
    })
}

impl Deserializer for CborDeserializer {
    type Error = CborError;

    fn deserialize_struct(&mut self, _descriptor: &ObjectDescriptor) -> Result<(), Self::Error> {
        self.consume_slot();
        let remaining = self.open_container(MAJOR_LIST)?;
        log::trace!("deserialize_struct: remaining={remaining:?}");
        self.frames.push(Frame::Struct { remaining, position: 0 });
        Ok(())
    }

    fn end_struct(&mut self) -> Result<(), Self::Error> {
        if let Some(Frame::Struct { remaining: None, .. }) = self.frames.last() {
            self.reader().expect_break()?;
        }
        self.frames.pop();
        Ok(())
    }

    fn deserialize_list(&mut self, _descriptor: &FieldDescriptor) -> Result<(), Self::Error> {
        self.consume_slot();
        let remaining = self.open_container(MAJOR_LIST)?;
        self.frames.push(Frame::List { remaining });
        Ok(())
    }

    fn end_list(&mut self) -> Result<(), Self::Error> {
        if let Some(Frame::List { remaining: None }) = self.frames.last() {
            self.reader().expect_break()?;
        }
        self.frames.pop();
        Ok(())
    }

    fn deserialize_map(&mut self, _descriptor: &FieldDescriptor) -> Result<(), Self::Error> {
        self.consume_slot();
        let remaining = self.open_container(MAJOR_MAP)?;
        self.frames.push(Frame::Map { remaining, expect_key: true });
        Ok(())
    }

    fn end_map(&mut self) -> Result<(), Self::Error> {
        if let Some(Frame::Map { remaining: None, .. }) = self.frames.last() {
            self.reader().expect_break()?;
        }
        self.frames.pop();
        Ok(())
    }

    fn skip_value(&mut self) -> Result<(), Self::Error> {
        self.consume_slot();
        self.skip_one()
    }

    fn deserialize_boolean(&mut self) -> Result<bool, Self::Error> {
        self.consume_slot();
        let head = self.reader().read_head()?;
        match (head.major, head.minor) {
            (MAJOR_SIMPLE, MINOR_FALSE) => Ok(false),
            (MAJOR_SIMPLE, MINOR_TRUE) => Ok(true),
            (major, minor) => Err(CborError::de(CborErrorKind::UnexpectedMinor { major, minor })),
        }
    }

    fn deserialize_byte(&mut self) -> Result<i8, Self::Error> {
        self.consume_slot();
        narrow(self.read_signed()?)
    }

    fn deserialize_short(&mut self) -> Result<i16, Self::Error> {
        self.consume_slot();
        narrow(self.read_signed()?)
    }

    fn deserialize_integer(&mut self) -> Result<i32, Self::Error> {
        self.consume_slot();
        narrow(self.read_signed()?)
    }

    fn deserialize_long(&mut self) -> Result<i64, Self::Error> {
        self.consume_slot();
        self.read_signed()
    }

    fn deserialize_float(&mut self) -> Result<f32, Self::Error> {
        self.consume_slot();
        Ok(self.read_float_bits()? as f32)
    }

    fn deserialize_double(&mut self) -> Result<f64, Self::Error> {
        self.consume_slot();
        self.read_float_bits()
    }

    fn deserialize_char(&mut self) -> Result<char, Self::Error> {
        self.consume_slot();
        let text = self.read_text()?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(CborError::de(CborErrorKind::Overflow)),
        }
    }

    fn deserialize_string(&mut self) -> Result<String, Self::Error> {
        let is_key = self.consume_slot();
        if is_key {
            let head = self.reader().peek_head()?;
            if head.major != MAJOR_TEXT {
                log::debug!("map key is not a text string: major={}", head.major);
                return Err(CborError::de(CborErrorKind::NonTextMapKey));
            }
        }
        self.read_text()
    }

    fn deserialize_blob(&mut self) -> Result<Vec<u8>, Self::Error> {
        self.consume_slot();
        let head = self.reader().read_head()?;
        if head.major != MAJOR_BYTES {
            return Err(CborError::de(CborErrorKind::UnexpectedMinor {
                major: head.major,
                minor: head.minor,
            }));
        }
        self.reader().read_string_body(MAJOR_BYTES, head)
    }

    fn deserialize_timestamp(&mut self) -> Result<Instant, Self::Error> {
        self.consume_slot();
        let head = self.reader().read_head()?;
        if head.major != MAJOR_TAG {
            return Err(CborError::de(CborErrorKind::UnexpectedMinor {
                major: head.major,
                minor: head.minor,
            }));
        }
        let tag = self
            .reader()
            .read_argument(MAJOR_TAG, head.minor)?
            .ok_or_else(|| CborError::de(CborErrorKind::UnexpectedMinor {
                major: MAJOR_TAG,
                minor: head.minor,
            }))?;
        if tag != TAG_TIMESTAMP {
            log::debug!("expected timestamp tag {TAG_TIMESTAMP}, found tag {tag}");
            return Err(CborError::de(CborErrorKind::UnsupportedTag { tag }));
        }
        let seconds = self.read_float_bits()?;
        Ok(Instant::from_epoch_seconds_f64(seconds))
    }

    fn deserialize_document(&mut self) -> Result<Document, Self::Error> {
        self.consume_slot();
        self.read_document_value()
    }

    fn deserialize_null(&mut self) -> Result<(), Self::Error> {
        self.consume_slot();
        let head = self.reader().read_head()?;
        match (head.major, head.minor) {
            (MAJOR_SIMPLE, MINOR_NULL) | (MAJOR_SIMPLE, MINOR_UNDEFINED) => Ok(()),
            (major, minor) => Err(CborError::de(CborErrorKind::UnexpectedMinor { major, minor })),
        }
    }
}

impl StructIter for CborDeserializer {
    type Error = CborError;

    fn find_next_field_index(&mut self, descriptor: &ObjectDescriptor) -> Result<FieldIndex, Self::Error> {
        let exhausted = match self.frames.last() {
            Some(Frame::Struct { remaining: Some(0), .. }) => true,
            Some(Frame::Struct { remaining: None, .. }) => {
                let next = self.reader().peek_head()?;
                next.major == MAJOR_SIMPLE && next.minor == MINOR_BREAK
            }
            _ => return Err(CborError::de(CborErrorKind::ProgrammerError {
                message: "find_next_field_index called outside a struct frame",
            })),
        };
        if exhausted {
            return Ok(FieldIndex::Exhausted);
        }
        let position = match self.frames.last_mut() {
            Some(Frame::Struct { remaining, position }) => {
                let position = *position;
                *position += 1;
                if let Some(r) = remaining.as_mut() {
                    *r -= 1;
                }
                position
            }
            _ => unreachable!(),
        };
        match descriptor.fields().get(position) {
            Some(field) => Ok(FieldIndex::Index(field.index())),
            None => {
                log::debug!("skipping unknown field at position {position}");
                Ok(FieldIndex::Unknown)
            }
        }
    }
}

impl ListIter for CborDeserializer {
    type Error = CborError;

    fn has_next_element(&mut self) -> Result<bool, Self::Error> {
        match self.frames.last_mut() {
            Some(Frame::List { remaining: Some(0) }) => Ok(false),
            Some(Frame::List { remaining: Some(r) }) => {
                *r -= 1;
                Ok(true)
            }
            Some(Frame::List { remaining: None }) => {
                let next = self.reader().peek_head()?;
                Ok(!(next.major == MAJOR_SIMPLE && next.minor == MINOR_BREAK))
            }
            _ => Err(CborError::de(CborErrorKind::ProgrammerError {
                message: "has_next_element called outside a list frame",
            })),
        }
    }

    fn next_has_value(&mut self) -> Result<bool, Self::Error> {
        let next = self.reader().peek_head()?;
        Ok(!(next.major == MAJOR_SIMPLE && (next.minor == MINOR_NULL || next.minor == MINOR_UNDEFINED)))
    }
}

impl MapIter for CborDeserializer {
    type Error = CborError;

    fn has_next_entry(&mut self) -> Result<bool, Self::Error> {
        match self.frames.last_mut() {
            Some(Frame::Map { remaining: Some(0), .. }) => Ok(false),
            Some(Frame::Map { remaining: Some(r), .. }) => {
                *r -= 1;
                Ok(true)
            }
            Some(Frame::Map { remaining: None, .. }) => {
                let next = self.reader().peek_head()?;
                Ok(!(next.major == MAJOR_SIMPLE && next.minor == MINOR_BREAK))
            }
            _ => Err(CborError::de(CborErrorKind::ProgrammerError {
                message: "has_next_entry called outside a map frame",
            })),
        }
    }

    fn next_has_value(&mut self) -> Result<bool, Self::Error> {
        let next = self.reader().peek_head()?;
        Ok(!(next.major == MAJOR_SIMPLE && (next.minor == MINOR_NULL || next.minor == MINOR_UNDEFINED)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transcode_core::descriptor::{ObjectDescriptor as OD, UnindexedField};
    use transcode_core::traits::TraitBag;
    use transcode_core::SerialKind;

    fn descriptor() -> OD {
        OD::build(
            TraitBag::new(),
            vec![
                UnindexedField::new(SerialKind::Integer, "a"),
                UnindexedField::new(SerialKind::String, "b"),
            ],
        )
    }

    #[test]
    fn reads_positional_struct_fields() {
        let desc = descriptor();
        // indefinite list: int 1, text "x", break
        let mut de = CborDeserializer::from_slice(&[0x9f, 0x01, 0x61, 0x78, 0xff]);
        de.deserialize_struct(&desc).unwrap();
        assert_eq!(de.find_next_field_index(&desc).unwrap(), FieldIndex::Index(0));
        assert_eq!(de.deserialize_integer().unwrap(), 1);
        assert_eq!(de.find_next_field_index(&desc).unwrap(), FieldIndex::Index(1));
        assert_eq!(de.deserialize_string().unwrap(), "x");
        assert_eq!(de.find_next_field_index(&desc).unwrap(), FieldIndex::Exhausted);
        de.end_struct().unwrap();
    }

    #[test]
    fn negative_bignum_scenario_four() {
        // corrected wire bytes per spec §8 scenario 4's quantified invariant:
        // n == -1 - asUnsigned(argument); argument = u64::MAX -> n = -2^64.
        let mut de = CborDeserializer::from_slice(&[0x3b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        let err = de.deserialize_long().unwrap_err();
        assert!(matches!(err.kind(), CborErrorKind::Overflow));
    }

    #[test]
    fn definite_length_list_of_integers() {
        let desc_field = {
            let d = OD::build(TraitBag::new(), vec![UnindexedField::new(SerialKind::List, "items")]);
            d
        };
        let mut de = CborDeserializer::from_slice(&[0x82, 0x01, 0x02]);
        de.deserialize_list(&desc_field.fields()[0]).unwrap();
        assert!(de.has_next_element().unwrap());
        assert_eq!(de.deserialize_integer().unwrap(), 1);
        assert!(de.has_next_element().unwrap());
        assert_eq!(de.deserialize_integer().unwrap(), 2);
        assert!(!de.has_next_element().unwrap());
        de.end_list().unwrap();
    }

    #[test]
    fn definite_length_map_round_trip() {
        let desc_field = OD::build(TraitBag::new(), vec![UnindexedField::new(SerialKind::Map, "tags")]);
        let mut de = CborDeserializer::from_slice(&[0xa1, 0x61, 0x6b, 0x61, 0x76]);
        de.deserialize_map(&desc_field.fields()[0]).unwrap();
        assert!(de.has_next_entry().unwrap());
        assert_eq!(de.deserialize_string().unwrap(), "k");
        assert_eq!(de.deserialize_string().unwrap(), "v");
        assert!(!de.has_next_entry().unwrap());
        de.end_map().unwrap();
    }

    #[test]
    fn timestamp_round_trip() {
        let mut de = CborDeserializer::from_slice(&[0xc1, 0xfb, 0, 0, 0, 0, 0, 0, 0, 0]);
        let instant = de.deserialize_timestamp().unwrap();
        assert_eq!(instant.epoch_seconds(), 0);
    }

    #[test]
    fn decimal_fraction_scenario_three() {
        // spec §8 scenario 3: c4 82 21 19 6a b3 -> BigDecimal("273.15")
        let mut de = CborDeserializer::from_slice(&[0xc4, 0x82, 0x21, 0x19, 0x6a, 0xb3]);
        let doc = de.deserialize_document().unwrap();
        assert_eq!(doc, Document::String(String::from("273.15")));
    }
}
