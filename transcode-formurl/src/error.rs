//! Form-URL codec errors (spec §4.5, §7).

use transcode_core::Category;

/// A form-URL codec failure.
#[derive(Debug)]
pub struct FormUrlError {
    category: Category,
    kind: FormUrlErrorKind,
}

/// Specific, testable form-URL error kinds.
#[derive(Debug, Clone)]
pub enum FormUrlErrorKind {
    /// A null scalar, or a sparse list/map element, was serialized. Form-URL
    /// has no wire representation for null (spec §9).
    SparseNotAllowed,
    /// The caller wrote a primitive with no preceding `field_name`, or
    /// otherwise unbalanced begin/end operations.
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

impl FormUrlError {
    /// Build a serialization-category error.
    pub fn ser(kind: FormUrlErrorKind) -> Self {
        Self {
            category: Category::Serialization,
            kind,
        }
    }

    /// Build a schema-category error (descriptor misuse).
    pub fn schema(kind: FormUrlErrorKind) -> Self {
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
    pub fn kind(&self) -> &FormUrlErrorKind {
        &self.kind
    }
}

impl From<transcode_core::CoreError> for FormUrlError {
    fn from(e: transcode_core::CoreError) -> Self {
        use transcode_core::CoreErrorKind;
        match e.kind() {
            CoreErrorKind::MissingTrait { trait_name } => {
                FormUrlError::schema(FormUrlErrorKind::MissingTrait { trait_name })
            }
            _ => FormUrlError::ser(FormUrlErrorKind::ProgrammerError {
                message: "unexpected core error in an encode-only codec",
            }),
        }
    }
}

impl core::fmt::Display for FormUrlError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.kind {
            FormUrlErrorKind::SparseNotAllowed => {
                write!(f, "form-url encoding does not support null values")
            }
            FormUrlErrorKind::ProgrammerError { message } => {
                write!(f, "programmer error: {message}")
            }
            FormUrlErrorKind::MissingTrait { trait_name } => {
                write!(f, "missing required trait `{trait_name}`")
            }
        }
    }
}

impl std::error::Error for FormUrlError {}
