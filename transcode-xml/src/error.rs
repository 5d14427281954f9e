//! XML codec errors (spec §4.4, §7).

use transcode_core::Category;

/// An XML codec failure.
#[derive(Debug)]
pub struct XmlError {
    category: Category,
    kind: XmlErrorKind,
}

/// Specific, testable XML error kinds.
#[derive(Debug, Clone)]
pub enum XmlErrorKind {
    /// The input ended before a complete token could be read.
    UnexpectedEndOfInput,
    /// The underlying XML was not well-formed.
    Malformed {
        /// Description from the underlying parser.
        message: String,
    },
    /// An entity reference other than the five predefined entities or a
    /// numeric character reference was encountered, or a `DOCTYPE`
    /// declaration was present. Always fatal; no external I/O is ever
    /// attempted.
    InvalidReference,
    /// An `EndElement` was read that does not match the innermost open
    /// element.
    MismatchedEndElement,
    /// The caller issued writer operations inconsistent with well-formed
    /// XML (e.g. an attribute written after a child element).
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
    /// A null scalar, or a sparse list/map element, was serialized for a
    /// field, list, or map that does not carry the `SparseValues` trait.
    SparseNotAllowed,
}

impl XmlError {
    /// Build a deserialization-category error.
    pub fn de(kind: XmlErrorKind) -> Self {
        Self {
            category: Category::Deserialization,
            kind,
        }
    }

    /// Build a serialization-category error.
    pub fn ser(kind: XmlErrorKind) -> Self {
        Self {
            category: Category::Serialization,
            kind,
        }
    }

    /// Build a schema-category error.
    pub fn schema(kind: XmlErrorKind) -> Self {
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
    pub fn kind(&self) -> &XmlErrorKind {
        &self.kind
    }
}

impl From<transcode_core::CoreError> for XmlError {
    fn from(e: transcode_core::CoreError) -> Self {
        use transcode_core::CoreErrorKind;
        match e.kind() {
            CoreErrorKind::UnexpectedEndOfPayload { .. } => {
                XmlError::de(XmlErrorKind::UnexpectedEndOfInput)
            }
            CoreErrorKind::MissingTrait { trait_name } => {
                XmlError::schema(XmlErrorKind::MissingTrait { trait_name })
            }
            CoreErrorKind::InvalidBlobEncoding => XmlError::de(XmlErrorKind::Malformed {
                message: String::from("invalid base64 blob encoding"),
            }),
        }
    }
}

impl From<quick_xml::Error> for XmlError {
    fn from(e: quick_xml::Error) -> Self {
        XmlError::de(XmlErrorKind::Malformed {
            message: e.to_string(),
        })
    }
}

impl core::fmt::Display for XmlError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.kind {
            XmlErrorKind::UnexpectedEndOfInput => write!(f, "unexpected end of XML input"),
            XmlErrorKind::Malformed { message } => write!(f, "malformed XML: {message}"),
            XmlErrorKind::InvalidReference => {
                write!(f, "disallowed entity reference or DOCTYPE declaration")
            }
            XmlErrorKind::MismatchedEndElement => {
                write!(f, "end element does not match the innermost open element")
            }
            XmlErrorKind::ProgrammerError { message } => write!(f, "programmer error: {message}"),
            XmlErrorKind::MissingTrait { trait_name } => {
                write!(f, "missing required trait `{trait_name}`")
            }
            XmlErrorKind::UnknownFieldRejected => {
                write!(f, "unknown field rejected under strict decoding")
            }
            XmlErrorKind::SparseNotAllowed => {
                write!(f, "null requires the SparseValues trait on this field, list, or map")
            }
        }
    }
}

impl std::error::Error for XmlError {}
