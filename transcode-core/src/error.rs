//! The three error families shared by every codec (spec §7): each codec
//! crate defines its own `Error`/`ErrorKind` pair, but every kind carries one
//! of these [`Category`] values so callers can dispatch on *kind*, not on a
//! Rust type.

#[cfg(feature = "alloc")]
use alloc::string::String;

/// Which of the three error families a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// The caller issued an operation inconsistent with the target format
    /// (e.g. a null value into a form-url field, mismatched begin/end).
    Serialization,
    /// The wire input itself is malformed (truncated, wrong token, invalid
    /// entity reference, overflow on narrowing).
    Deserialization,
    /// Descriptor misuse: a missing required trait, or an unknown field
    /// while strict decoding was requested.
    Schema,
}

/// Errors raised directly by `transcode-core` (buffer and descriptor
/// misuse); format crates wrap this in their own error type when it
/// surfaces through a codec.
#[derive(Debug)]
pub struct CoreError {
    kind: CoreErrorKind,
}

/// Specific, testable core error kinds.
#[derive(Debug, Clone)]
pub enum CoreErrorKind {
    /// A read was attempted past the end of the buffer's unread region.
    UnexpectedEndOfPayload {
        /// Bytes requested.
        requested: usize,
        /// Bytes actually remaining.
        remaining: usize,
    },
    /// `expectTrait::<T>` found no matching trait on the descriptor.
    MissingTrait {
        /// Name of the trait type that was expected.
        trait_name: &'static str,
    },
    /// A `Blob` field's base64 text was not validly encoded.
    InvalidBlobEncoding,
}

impl CoreError {
    /// Build a new core error from its kind.
    pub fn new(kind: CoreErrorKind) -> Self {
        Self { kind }
    }

    /// The category this error belongs to.
    pub fn category(&self) -> Category {
        match self.kind {
            CoreErrorKind::UnexpectedEndOfPayload { .. } => Category::Deserialization,
            CoreErrorKind::MissingTrait { .. } => Category::Schema,
            CoreErrorKind::InvalidBlobEncoding => Category::Deserialization,
        }
    }

    /// The specific kind of failure.
    pub fn kind(&self) -> &CoreErrorKind {
        &self.kind
    }
}

impl core::fmt::Display for CoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.kind {
            CoreErrorKind::UnexpectedEndOfPayload {
                requested,
                remaining,
            } => write!(
                f,
                "unexpected end of payload: requested {requested} bytes, {remaining} remaining"
            ),
            CoreErrorKind::MissingTrait { trait_name } => {
                write!(f, "missing required trait `{trait_name}`")
            }
            CoreErrorKind::InvalidBlobEncoding => write!(f, "invalid base64 blob encoding"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CoreError {}

#[cfg(feature = "alloc")]
impl From<CoreError> for String {
    fn from(e: CoreError) -> Self {
        alloc::format!("{e}")
    }
}
