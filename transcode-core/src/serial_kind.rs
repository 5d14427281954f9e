//! The closed set of logical types a [`crate::descriptor::FieldDescriptor`]
//! can describe.

/// Drives each codec's default encoding and its type-check diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SerialKind {
    /// `true`/`false`.
    Boolean,
    /// 8-bit signed integer.
    Byte,
    /// 16-bit signed integer.
    Short,
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    Long,
    /// IEEE-754 single precision.
    Float,
    /// IEEE-754 double precision.
    Double,
    /// A single Unicode scalar value.
    Char,
    /// A UTF-8 string.
    String,
    /// An opaque byte blob.
    Blob,
    /// An instant in time (§ [`crate::instant::Instant`]).
    Timestamp,
    /// An untyped, self-describing value tree (§
    /// [`crate::document::Document`]).
    Document,
    /// An ordered sequence of values of one element kind.
    List,
    /// An ordered sequence of key/value pairs.
    Map,
    /// A nested object described by its own [`crate::descriptor::
    /// ObjectDescriptor`].
    Struct,
}

impl SerialKind {
    /// A lowercase name suitable for error messages and diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            SerialKind::Boolean => "boolean",
            SerialKind::Byte => "byte",
            SerialKind::Short => "short",
            SerialKind::Integer => "integer",
            SerialKind::Long => "long",
            SerialKind::Float => "float",
            SerialKind::Double => "double",
            SerialKind::Char => "char",
            SerialKind::String => "string",
            SerialKind::Blob => "blob",
            SerialKind::Timestamp => "timestamp",
            SerialKind::Document => "document",
            SerialKind::List => "list",
            SerialKind::Map => "map",
            SerialKind::Struct => "struct",
        }
    }
}
