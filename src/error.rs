//! Error types.
//!
//! Construction-time problems ([`SpecError`], [`NumericFormatError`]) are
//! fatal and surface before any record is decoded. Misuse of a decoded
//! container is a [`StructureError`]. An [`EncodeError`] aborts encoding of a
//! whole record. A single field failing to convert is not an error at all:
//! it is stored in place as [`crate::Value::Unconverted`].

use thiserror::Error;

use crate::value::Unconverted;

/// A PICTURE format string could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumericFormatError {
    #[error("unexpected character {symbol:?} at position {position}")]
    UnexpectedCharacter { symbol: char, position: usize },

    #[error("second sign marker at position {position}; only one S is allowed")]
    DuplicateSign { position: usize },

    #[error("second decimal marker at position {position}; only one of V or . is allowed")]
    DuplicateDecimal { position: usize },

    #[error("unexpected end of input, expected ')'")]
    UnterminatedRepeat,

    #[error("numeric format {0:?} has no width")]
    Empty(String),

    #[error("format has {digits} digits; at most {max} can be held exactly")]
    TooManyDigits { digits: usize, max: usize },
}

/// A layout declaration is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("layout declares no fields")]
    NoFields,

    #[error("width of field '{field}' must be larger than 0")]
    NonPositiveWidth { field: String },

    #[error("array '{field}' must have at least one element")]
    EmptyArray { field: String },

    #[error("field '{field}' is declared more than once")]
    DuplicateField { field: String },

    #[error("malformed field description {entry:?}: {reason}")]
    Malformed { entry: String, reason: String },

    #[error("integer width {width} is too wide; at most {max} digits fit in 64 bits")]
    IntegerWidth { width: usize, max: usize },

    #[error("invalid date format {format:?}: {reason}")]
    DateFormat { format: String, reason: String },

    #[error("numeric format {format:?}: {source}")]
    NumericFormat {
        format: String,
        #[source]
        source: NumericFormatError,
    },
}

/// A decoded container was asked to change shape or address a missing slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("record has no field '{0}'; fields cannot be added")]
    UnknownField(String),

    #[error("index {index} out of range for fixed length {len}")]
    OutOfRange { index: usize, len: usize },

    #[error("slot '{field}' holds {expected}; cannot store {found}")]
    WrongShape {
        field: String,
        expected: String,
        found: String,
    },
}

/// A record could not be written back to text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("field {field}: {value}")]
    Unconverted { field: String, value: Unconverted },

    #[error("field {field}: expected {expected}, found {found}")]
    ShapeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}
