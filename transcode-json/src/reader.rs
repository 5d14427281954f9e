//! Streaming JSON reader (spec §4.3.1).
//!
//! Lexical rules follow RFC 8259. Numbers are retained as textual tokens
//! until a typed `deserialize*` narrows them; `skipNext()` recursively
//! consumes the next value including all nested structure; EOF emits
//! exactly one [`JsonToken::EndDocument`].

#[cfg(feature = "alloc")]
use alloc::{string::String, vec::Vec};

use crate::error::{JsonError, JsonErrorKind};

/// One lexical unit of the JSON token stream (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub enum JsonToken {
    /// `{`
    BeginObject,
    /// `}`
    EndObject,
    /// `[`
    BeginArray,
    /// `]`
    EndArray,
    /// An object member name.
    Name(String),
    /// A string value, already unescaped.
    String(String),
    /// A numeric value, retained as its original textual form.
    Number(String),
    /// `true`/`false`.
    Bool(bool),
    /// `null`.
    Null,
    /// Emitted exactly once, after the root value has been fully consumed.
    EndDocument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjState {
    KeyOrEnd,
    Value,
    CommaOrEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrState {
    ValueOrEnd,
    CommaOrEnd,
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Object(ObjState),
    Array(ArrState),
}

/// A pull-based JSON tokenizer over a borrowed byte slice.
pub struct JsonReader<'de> {
    input: &'de str,
    pos: usize,
    stack: Vec<Frame>,
    peeked: Option<JsonToken>,
    root_read: bool,
    done: bool,
}

impl<'de> JsonReader<'de> {
    /// Build a reader over a UTF-8 byte slice.
    pub fn new(input: &'de [u8]) -> Result<Self, JsonError> {
        let input =
            core::str::from_utf8(input).map_err(|_| JsonError::de(JsonErrorKind::InvalidUtf8))?;
        Ok(Self {
            input,
            pos: 0,
            stack: Vec::new(),
            peeked: None,
            root_read: false,
            done: false,
        })
    }

    /// Build a reader over a `str`.
    pub fn from_str(input: &'de str) -> Self {
        Self {
            input,
            pos: 0,
            stack: Vec::new(),
            peeked: None,
            root_read: false,
            done: false,
        }
    }

    /// Pull the next token, consuming it.
    pub fn next_token(&mut self) -> Result<JsonToken, JsonError> {
        if let Some(tok) = self.peeked.take() {
            return Ok(tok);
        }
        self.read_token()
    }

    /// Borrow the next token without consuming it. Two consecutive calls
    /// return equal tokens.
    pub fn peek_token(&mut self) -> Result<&JsonToken, JsonError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.read_token()?);
        }
        Ok(self.peeked.as_ref().expect("just populated"))
    }

    /// Recursively consume the next value (primitive, array, or object),
    /// including all nested structure.
    pub fn skip_next(&mut self) -> Result<(), JsonError> {
        let first = self.next_token()?;
        self.skip_from(first)
    }

    fn skip_from(&mut self, tok: JsonToken) -> Result<(), JsonError> {
        let mut depth = match tok {
            JsonToken::BeginObject | JsonToken::BeginArray => 1usize,
            _ => return Ok(()),
        };
        while depth > 0 {
            match self.next_token()? {
                JsonToken::BeginObject | JsonToken::BeginArray => depth += 1,
                JsonToken::EndObject | JsonToken::EndArray => depth -= 1,
                _ => {}
            }
        }
        Ok(())
    }

    fn read_token(&mut self) -> Result<JsonToken, JsonError> {
        if self.done {
            return Ok(JsonToken::EndDocument);
        }
        match self.stack.last().copied() {
            None => {
                if self.root_read {
                    self.done = true;
                    return Ok(JsonToken::EndDocument);
                }
                self.skip_ws();
                let tok = self.read_value()?;
                if self.stack.is_empty() {
                    self.root_read = true;
                }
                Ok(tok)
            }
            Some(Frame::Object(state)) => self.read_in_object(state),
            Some(Frame::Array(state)) => self.read_in_array(state),
        }
    }

    fn read_in_object(&mut self, state: ObjState) -> Result<JsonToken, JsonError> {
        self.skip_ws();
        match state {
            ObjState::KeyOrEnd => {
                if self.peek_char() == Some('}') {
                    self.advance_char();
                    self.pop_frame();
                    return Ok(JsonToken::EndObject);
                }
                let name = self.read_string_literal()?;
                self.skip_ws();
                self.expect_char(':')?;
                self.set_top(Frame::Object(ObjState::Value));
                Ok(JsonToken::Name(name))
            }
            ObjState::Value => {
                self.skip_ws();
                let tok = self.read_value()?;
                self.set_top(Frame::Object(ObjState::CommaOrEnd));
                Ok(tok)
            }
            ObjState::CommaOrEnd => match self.peek_char() {
                Some(',') => {
                    self.advance_char();
                    self.set_top(Frame::Object(ObjState::KeyOrEnd));
                    self.read_in_object(ObjState::KeyOrEnd)
                }
                Some('}') => {
                    self.advance_char();
                    self.pop_frame();
                    Ok(JsonToken::EndObject)
                }
                _ => Err(self.unexpected("',' or '}'")),
            },
        }
    }

    fn read_in_array(&mut self, state: ArrState) -> Result<JsonToken, JsonError> {
        self.skip_ws();
        match state {
            ArrState::ValueOrEnd => {
                if self.peek_char() == Some(']') {
                    self.advance_char();
                    self.pop_frame();
                    return Ok(JsonToken::EndArray);
                }
                let tok = self.read_value()?;
                self.set_top(Frame::Array(ArrState::CommaOrEnd));
                Ok(tok)
            }
            ArrState::CommaOrEnd => match self.peek_char() {
                Some(',') => {
                    self.advance_char();
                    self.set_top(Frame::Array(ArrState::ValueOrEnd));
                    self.read_in_array(ArrState::ValueOrEnd)
                }
                Some(']') => {
                    self.advance_char();
                    self.pop_frame();
                    Ok(JsonToken::EndArray)
                }
                _ => Err(self.unexpected("',' or ']'")),
            },
        }
    }

    /// Read one value (object/array start, string, number, bool, or null).
    fn read_value(&mut self) -> Result<JsonToken, JsonError> {
        match self.peek_char() {
            Some('{') => {
                self.advance_char();
                self.stack.push(Frame::Object(ObjState::KeyOrEnd));
                Ok(JsonToken::BeginObject)
            }
            Some('[') => {
                self.advance_char();
                self.stack.push(Frame::Array(ArrState::ValueOrEnd));
                Ok(JsonToken::BeginArray)
            }
            Some('"') => Ok(JsonToken::String(self.read_string_literal()?)),
            Some('t') => {
                self.expect_literal("true")?;
                Ok(JsonToken::Bool(true))
            }
            Some('f') => {
                self.expect_literal("false")?;
                Ok(JsonToken::Bool(false))
            }
            Some('n') => {
                self.expect_literal("null")?;
                Ok(JsonToken::Null)
            }
            Some(c) if c == '-' || c.is_ascii_digit() => Ok(JsonToken::Number(self.read_number()?)),
            Some(c) => Err(JsonError::de(JsonErrorKind::UnexpectedChar {
                found: c,
                expected: "a JSON value",
            })),
            None => Err(JsonError::de(JsonErrorKind::UnexpectedEndOfInput)),
        }
    }

    fn pop_frame(&mut self) {
        self.stack.pop();
        if let Some(top) = self.stack.last_mut() {
            match top {
                Frame::Object(s) => *s = ObjState::CommaOrEnd,
                Frame::Array(s) => *s = ArrState::CommaOrEnd,
            }
        } else {
            self.root_read = true;
        }
    }

    fn set_top(&mut self, frame: Frame) {
        if let Some(top) = self.stack.last_mut() {
            *top = frame;
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn expect_char(&mut self, expected: char) -> Result<(), JsonError> {
        match self.advance_char() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(JsonError::de(JsonErrorKind::UnexpectedChar {
                found: c,
                expected: "expected character",
            })),
            None => Err(JsonError::de(JsonErrorKind::UnexpectedEndOfInput)),
        }
    }

    fn expect_literal(&mut self, literal: &'static str) -> Result<(), JsonError> {
        if self.input[self.pos..].starts_with(literal) {
            self.pos += literal.len();
            Ok(())
        } else {
            Err(JsonError::de(JsonErrorKind::UnexpectedChar {
                found: self.peek_char().unwrap_or('\0'),
                expected: literal,
            }))
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek_char() {
            if c == ' ' || c == '\t' || c == '\n' || c == '\r' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn unexpected(&self, expected: &'static str) -> JsonError {
        match self.input[self.pos..].chars().next() {
            Some(found) => JsonError::de(JsonErrorKind::UnexpectedChar { found, expected }),
            None => JsonError::de(JsonErrorKind::UnexpectedEndOfInput),
        }
    }

    fn read_number(&mut self) -> Result<String, JsonError> {
        let start = self.pos;
        if self.peek_char() == Some('-') {
            self.pos += 1;
        }
        let int_start = self.pos;
        match self.peek_char() {
            Some('0') => self.pos += 1,
            Some(c) if c.is_ascii_digit() => {
                while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
            _ => {
                return Err(JsonError::de(JsonErrorKind::InvalidNumber {
                    text: String::from(&self.input[start..self.pos]),
                }));
            }
        }
        if self.pos == int_start {
            return Err(JsonError::de(JsonErrorKind::InvalidNumber {
                text: String::from(&self.input[start..self.pos]),
            }));
        }
        if self.peek_char() == Some('.') {
            self.pos += 1;
            let frac_start = self.pos;
            while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
            if self.pos == frac_start {
                return Err(JsonError::de(JsonErrorKind::InvalidNumber {
                    text: String::from(&self.input[start..self.pos]),
                }));
            }
        }
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            self.pos += 1;
            if matches!(self.peek_char(), Some('+') | Some('-')) {
                self.pos += 1;
            }
            let exp_start = self.pos;
            while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
            if self.pos == exp_start {
                return Err(JsonError::de(JsonErrorKind::InvalidNumber {
                    text: String::from(&self.input[start..self.pos]),
                }));
            }
        }
        Ok(String::from(&self.input[start..self.pos]))
    }

    fn read_string_literal(&mut self) -> Result<String, JsonError> {
        self.expect_char('"')?;
        let mut out = String::new();
        loop {
            let c = self
                .advance_char()
                .ok_or_else(|| JsonError::de(JsonErrorKind::UnexpectedEndOfInput))?;
            match c {
                '"' => return Ok(out),
                '\\' => {
                    let esc = self
                        .advance_char()
                        .ok_or_else(|| JsonError::de(JsonErrorKind::UnexpectedEndOfInput))?;
                    match esc {
                        '"' => out.push('"'),
                        '\\' => out.push('\\'),
                        '/' => out.push('/'),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{c}'),
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        'u' => {
                            let hi = self.read_hex4()?;
                            let cp = if (0xD800..=0xDBFF).contains(&hi) {
                                self.expect_char('\\')?;
                                self.expect_char('u')?;
                                let lo = self.read_hex4()?;
                                if !(0xDC00..=0xDFFF).contains(&lo) {
                                    return Err(JsonError::de(JsonErrorKind::InvalidEscape));
                                }
                                0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00)
                            } else {
                                hi
                            };
                            let ch = char::from_u32(cp)
                                .ok_or_else(|| JsonError::de(JsonErrorKind::InvalidEscape))?;
                            out.push(ch);
                        }
                        _ => return Err(JsonError::de(JsonErrorKind::InvalidEscape)),
                    }
                }
                c if (c as u32) < 0x20 => return Err(JsonError::de(JsonErrorKind::InvalidEscape)),
                c => out.push(c),
            }
        }
    }

    fn read_hex4(&mut self) -> Result<u32, JsonError> {
        let mut value = 0u32;
        for _ in 0..4 {
            let c = self
                .advance_char()
                .ok_or_else(|| JsonError::de(JsonErrorKind::UnexpectedEndOfInput))?;
            let digit = c
                .to_digit(16)
                .ok_or_else(|| JsonError::de(JsonErrorKind::InvalidEscape))?;
            value = value * 16 + digit;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<JsonToken> {
        let mut reader = JsonReader::from_str(input);
        let mut out = Vec::new();
        loop {
            let tok = reader.next_token().unwrap();
            let is_end = tok == JsonToken::EndDocument;
            out.push(tok);
            if is_end {
                break;
            }
        }
        out
    }

    #[test]
    fn flat_object() {
        let toks = tokens(r#"{"a":1,"b":true}"#);
        assert_eq!(
            toks,
            [
                JsonToken::BeginObject,
                JsonToken::Name("a".into()),
                JsonToken::Number("1".into()),
                JsonToken::Name("b".into()),
                JsonToken::Bool(true),
                JsonToken::EndObject,
                JsonToken::EndDocument,
            ]
        );
    }

    #[test]
    fn nested_array_skip() {
        let mut reader = JsonReader::from_str(r#"{"a":[1,2,[3,4]],"b":5}"#);
        assert_eq!(reader.next_token().unwrap(), JsonToken::BeginObject);
        assert_eq!(reader.next_token().unwrap(), JsonToken::Name("a".into()));
        reader.skip_next().unwrap();
        assert_eq!(reader.next_token().unwrap(), JsonToken::Name("b".into()));
        assert_eq!(reader.next_token().unwrap(), JsonToken::Number("5".into()));
        assert_eq!(reader.next_token().unwrap(), JsonToken::EndObject);
    }

    #[test]
    fn peek_is_stable() {
        let mut reader = JsonReader::from_str("42");
        assert_eq!(reader.peek_token().unwrap(), &JsonToken::Number("42".into()));
        assert_eq!(reader.peek_token().unwrap(), &JsonToken::Number("42".into()));
        assert_eq!(reader.next_token().unwrap(), JsonToken::Number("42".into()));
    }

    #[test]
    fn string_escapes() {
        let toks = tokens(r#""a\nbA😀""#);
        assert_eq!(toks[0], JsonToken::String("a\nbA😀".into()));
    }

    #[test]
    fn end_document_emitted_once() {
        let mut reader = JsonReader::from_str("1");
        assert_eq!(reader.next_token().unwrap(), JsonToken::Number("1".into()));
        assert_eq!(reader.next_token().unwrap(), JsonToken::EndDocument);
        assert_eq!(reader.next_token().unwrap(), JsonToken::EndDocument);
    }
}
