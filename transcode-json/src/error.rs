//! JSON codec errors (spec §4.3, §7).

#[cfg(feature = "alloc")]
use alloc::string::String;

use transcode_core::Category;

/// A JSON codec failure.
#[derive(Debug)]
pub struct JsonError {
    category: Category,
    kind: JsonErrorKind,
}

/// Specific, testable JSON error kinds.
#[derive(Debug, Clone)]
pub enum JsonErrorKind {
    /// The input ended before a complete token could be read.
    UnexpectedEndOfInput,
    /// A structural character was not the one expected at this position.
    UnexpectedChar {
        /// The character actually found.
        found: char,
        /// What was expected instead.
        expected: &'static str,
    },
    /// A `\uXXXX` escape, or the two-byte surrogate pair it is part of, was
    /// malformed.
    InvalidEscape,
    /// Bytes did not form valid UTF-8.
    InvalidUtf8,
    /// A numeric token's text could not be narrowed to the requested type
    /// (e.g. fractional text requested as an integer).
    InvalidNumber {
        /// The textual token that failed to narrow.
        text: String,
    },
    /// A typed narrowing (`deserializeByte`/`Short`/`Integer`) found a
    /// value that doesn't fit in the target type.
    Overflow,
    /// The caller wrote a primitive inside an object without a preceding
    /// `Name` token, or otherwise unbalanced begin/end operations.
    ProgrammerError {
        /// What went wrong.
        message: &'static str,
    },
    /// Descriptor misuse: a required trait was missing.
    MissingTrait {
        /// Name of the expected trait type.
        trait_name: &'static str,
    },
    /// A field marked strict/required was absent from the wire input.
    UnknownFieldRejected,
    /// A `Blob` field's string value was not valid base64.
    InvalidBlobEncoding,
}

impl JsonError {
    /// Build a deserialization-category error.
    pub fn de(kind: JsonErrorKind) -> Self {
        Self {
            category: Category::Deserialization,
            kind,
        }
    }

    /// Build a serialization-category error (programmer misuse of the
    /// writer).
    pub fn ser(kind: JsonErrorKind) -> Self {
        Self {
            category: Category::Serialization,
            kind,
        }
    }

    /// Build a schema-category error (descriptor misuse).
    pub fn schema(kind: JsonErrorKind) -> Self {
        Self {
            category: Category::Schema,
            kind,
        }
    }

    /// The error family this failure belongs to.
    pub fn category(&self) -> Category {
        self.category
    }

    /// The specific kind of failure.
    pub fn kind(&self) -> &JsonErrorKind {
        &self.kind
    }
}

impl From<transcode_core::CoreError> for JsonError {
    fn from(e: transcode_core::CoreError) -> Self {
        use transcode_core::CoreErrorKind;
        match e.kind() {
            CoreErrorKind::UnexpectedEndOfPayload { .. } => {
                JsonError::de(JsonErrorKind::UnexpectedEndOfInput)
            }
            CoreErrorKind::MissingTrait { trait_name } => {
                JsonError::schema(JsonErrorKind::MissingTrait { trait_name })
            }
            CoreErrorKind::InvalidBlobEncoding => {
                JsonError::de(JsonErrorKind::InvalidBlobEncoding)
            }
        }
    }
}

impl core::fmt::Display for JsonError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.kind {
            JsonErrorKind::UnexpectedEndOfInput => write!(f, "unexpected end of JSON input"),
            JsonErrorKind::UnexpectedChar { found, expected } => {
                write!(f, "unexpected character '{found}', expected {expected}")
            }
            JsonErrorKind::InvalidEscape => write!(f, "invalid \\u escape sequence"),
            JsonErrorKind::InvalidUtf8 => write!(f, "invalid UTF-8 in JSON string"),
            JsonErrorKind::InvalidNumber { text } => write!(f, "invalid numeric literal: {text}"),
            JsonErrorKind::Overflow => write!(f, "numeric value out of range for target type"),
            JsonErrorKind::ProgrammerError { message } => write!(f, "programmer error: {message}"),
            JsonErrorKind::MissingTrait { trait_name } => {
                write!(f, "missing required trait `{trait_name}`")
            }
            JsonErrorKind::UnknownFieldRejected => {
                write!(f, "unknown field rejected under strict decoding")
            }
            JsonErrorKind::InvalidBlobEncoding => write!(f, "invalid base64 blob encoding"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for JsonError {}
