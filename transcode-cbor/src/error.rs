//! CBOR codec errors (spec §4.6.4, §7).

use transcode_core::Category;

/// A CBOR codec failure.
#[derive(Debug)]
pub struct CborError {
    category: Category,
    kind: CborErrorKind,
}

/// Specific, testable CBOR error kinds.
#[derive(Debug, Clone)]
pub enum CborErrorKind {
    /// A head byte's argument bytes ran past the end of the buffer.
    TruncatedArgument,
    /// A minor value is not legal in the position it was found (e.g. 28-30,
    /// or 31 on a major that does not support indefinite length).
    UnexpectedMinor {
        /// The major type the minor was read under.
        major: u8,
        /// The offending minor value.
        minor: u8,
    },
    /// A tag id outside the natively handled set (1-4).
    UnsupportedTag {
        /// The tag id found on the wire.
        tag: u64,
    },
    /// An indefinite-length byte/text string chunk list did not end with
    /// the `0xFF` break byte where one was expected.
    ExpectedBreak,
    /// An indefinite-length byte/text string contained a nested indefinite
    /// chunk, which is not legal CBOR.
    NestedIndefinite,
    /// A map key was not a text string.
    NonTextMapKey,
    /// A typed narrowing found a value that doesn't fit in the target type.
    Overflow,
    /// A tag-4 decimal fraction's mantissa was neither an integer nor a
    /// bignum-tagged byte string.
    InvalidMantissa,
    /// The caller wrote or read a primitive with unbalanced begin/end
    /// operations, or outside of a struct with no preceding `field_name`.
    ProgrammerError {
        /// What went wrong.
        message: &'static str,
    },
    /// Descriptor misuse: a required trait was missing.
    MissingTrait {
        /// Name of the expected trait type.
        trait_name: &'static str,
    },
}

impl CborError {
    /// Build a serialization-category error.
    pub fn ser(kind: CborErrorKind) -> Self {
        Self {
            category: Category::Serialization,
            kind,
        }
    }

    /// Build a deserialization-category error.
    pub fn de(kind: CborErrorKind) -> Self {
        Self {
            category: Category::Deserialization,
            kind,
        }
    }

    /// Build a schema-category error (descriptor misuse).
    pub fn schema(kind: CborErrorKind) -> Self {
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
    pub fn kind(&self) -> &CborErrorKind {
        &self.kind
    }
}

impl From<transcode_core::CoreError> for CborError {
    fn from(e: transcode_core::CoreError) -> Self {
        use transcode_core::CoreErrorKind;
        match e.kind() {
            CoreErrorKind::UnexpectedEndOfPayload { .. } => {
                CborError::de(CborErrorKind::TruncatedArgument)
            }
            CoreErrorKind::MissingTrait { trait_name } => {
                CborError::schema(CborErrorKind::MissingTrait { trait_name })
            }
            CoreErrorKind::InvalidBlobEncoding => CborError::de(CborErrorKind::ProgrammerError {
                message: "unexpected core error decoding a blob",
            }),
        }
    }
}

impl core::fmt::Display for CborError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.kind {
            CborErrorKind::TruncatedArgument => {
                write!(f, "head byte argument ran past the end of the payload")
            }
            CborErrorKind::UnexpectedMinor { major, minor } => {
                write!(f, "unexpected minor {minor} under major {major}")
            }
            CborErrorKind::UnsupportedTag { tag } => write!(f, "unsupported CBOR tag {tag}"),
            CborErrorKind::ExpectedBreak => write!(f, "expected an indefinite-length break byte"),
            CborErrorKind::NestedIndefinite => {
                write!(f, "indefinite-length chunk contains a nested indefinite chunk")
            }
            CborErrorKind::NonTextMapKey => write!(f, "CBOR map key is not a text string"),
            CborErrorKind::Overflow => write!(f, "numeric value out of range for target type"),
            CborErrorKind::InvalidMantissa => {
                write!(f, "decimal fraction mantissa is neither an integer nor a bignum")
            }
            CborErrorKind::ProgrammerError { message } => write!(f, "programmer error: {message}"),
            CborErrorKind::MissingTrait { trait_name } => {
                write!(f, "missing required trait `{trait_name}`")
            }
        }
    }
}

impl std::error::Error for CborError {}
