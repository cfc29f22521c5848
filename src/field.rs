//! Field types: the unit of a layout.
//!
//! Every field has a fixed width. A leaf is either plain text or carries a
//! [`Codec`] that converts between its text and a typed [`Value`]. Which of
//! the two a leaf is gets decided once, when the layout is built, by the
//! [`FieldSpec`] variant.

use std::fmt;
use std::sync::Arc;

use crate::date::{Date, DateTime};
use crate::layout::{ArraySpec, RecordSpec, SequenceSpec};
use crate::numeric::{Integer, Numeric};
use crate::text::BoxedText;
use crate::value::{Unconverted, Value};

/// Bidirectional conversion between a fixed-width column and a value.
///
/// `decode` never fails outright: text it cannot read comes back as
/// [`Value::Unconverted`]. `encode` returns text of at most `width()`
/// characters; the layout pads shorter output with `pad()`.
pub trait Codec: fmt::Debug + Send + Sync {
    fn width(&self) -> usize;

    fn decode(&self, text: &str) -> Value;

    fn encode(&self, value: &Value) -> Result<String, Unconverted>;

    /// Fill character for output shorter than the width.
    fn pad(&self) -> char {
        ' '
    }
}

/// A field in a layout.
#[derive(Debug, Clone)]
pub enum FieldSpec {
    /// Plain text of the given width: trailing blanks trimmed on decode,
    /// left-justified on encode.
    Text(usize),
    /// A leaf with a converter.
    Convert(Arc<dyn Codec>),
    /// Nested record with named fields.
    Record(Arc<RecordSpec>),
    /// Nested positional sequence.
    Sequence(Arc<SequenceSpec>),
    /// A single element repeated a fixed number of times.
    Array(Arc<ArraySpec>),
}

impl FieldSpec {
    /// Wrap a user-defined codec.
    pub fn custom(codec: impl Codec + 'static) -> Self {
        FieldSpec::Convert(Arc::new(codec))
    }

    /// Width of the field's text in characters.
    pub fn width(&self) -> usize {
        match self {
            FieldSpec::Text(width) => *width,
            FieldSpec::Convert(codec) => codec.width(),
            FieldSpec::Record(r) => r.width(),
            FieldSpec::Sequence(s) => s.width(),
            FieldSpec::Array(a) => a.width(),
        }
    }

    pub fn pad(&self) -> char {
        match self {
            FieldSpec::Convert(codec) => codec.pad(),
            _ => ' ',
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, FieldSpec::Text(_) | FieldSpec::Convert(_))
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            FieldSpec::Text(_) | FieldSpec::Convert(_) => "field",
            FieldSpec::Record(_) => "record",
            FieldSpec::Sequence(_) => "sequence",
            FieldSpec::Array(_) => "array",
        }
    }
}

impl From<usize> for FieldSpec {
    fn from(width: usize) -> Self {
        FieldSpec::Text(width)
    }
}

impl From<Integer> for FieldSpec {
    fn from(codec: Integer) -> Self {
        FieldSpec::custom(codec)
    }
}

impl From<Numeric> for FieldSpec {
    fn from(codec: Numeric) -> Self {
        FieldSpec::custom(codec)
    }
}

impl From<Date> for FieldSpec {
    fn from(codec: Date) -> Self {
        FieldSpec::custom(codec)
    }
}

impl From<DateTime> for FieldSpec {
    fn from(codec: DateTime) -> Self {
        FieldSpec::custom(codec)
    }
}

impl From<BoxedText> for FieldSpec {
    fn from(codec: BoxedText) -> Self {
        FieldSpec::custom(codec)
    }
}

impl From<RecordSpec> for FieldSpec {
    fn from(spec: RecordSpec) -> Self {
        FieldSpec::Record(Arc::new(spec))
    }
}

impl From<Arc<RecordSpec>> for FieldSpec {
    fn from(spec: Arc<RecordSpec>) -> Self {
        FieldSpec::Record(spec)
    }
}

impl From<SequenceSpec> for FieldSpec {
    fn from(spec: SequenceSpec) -> Self {
        FieldSpec::Sequence(Arc::new(spec))
    }
}

impl From<ArraySpec> for FieldSpec {
    fn from(spec: ArraySpec) -> Self {
        FieldSpec::Array(Arc::new(spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct YesNo;

    impl Codec for YesNo {
        fn width(&self) -> usize {
            1
        }

        fn decode(&self, text: &str) -> Value {
            match text {
                "Y" => Value::Integer(1),
                "N" => Value::Integer(0),
                _ => Value::Unconverted(Unconverted::new("expected Y or N", text)),
            }
        }

        fn encode(&self, value: &Value) -> Result<String, Unconverted> {
            match value.as_integer() {
                Some(0) => Ok("N".to_string()),
                Some(_) => Ok("Y".to_string()),
                None => Err(Unconverted::new("expected a flag", value.to_string())),
            }
        }
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_layouts_and_values_are_thread_safe() {
        assert_send_sync::<FieldSpec>();
        assert_send_sync::<Arc<dyn Codec>>();
        assert_send_sync::<crate::RecordSpec>();
        assert_send_sync::<crate::SequenceSpec>();
        assert_send_sync::<crate::ArraySpec>();
        assert_send_sync::<crate::Value>();
        assert_send_sync::<crate::EncodeError>();
    }

    #[test]
    fn test_widths() {
        assert_eq!(FieldSpec::from(12).width(), 12);
        assert_eq!(FieldSpec::from(Integer::new(3).unwrap()).width(), 3);
        assert_eq!(FieldSpec::custom(YesNo).width(), 1);
    }

    #[test]
    fn test_pad_defaults() {
        assert_eq!(FieldSpec::from(4).pad(), ' ');
        assert_eq!(FieldSpec::from(Integer::new(4).unwrap()).pad(), '0');
        assert_eq!(FieldSpec::custom(YesNo).pad(), ' ');
    }

    #[test]
    fn test_custom_codec_in_record() {
        let spec: FieldSpec = crate::declare::RecordBuilder::new()
            .field("flag", FieldSpec::custom(YesNo))
            .field("rest", 3)
            .build()
            .unwrap()
            .into();
        let value = crate::decode("Yabc", &spec);
        let rec = value.as_record().unwrap();
        assert_eq!(rec["flag"], 1i64);
        assert_eq!(crate::encode(&value, &spec).unwrap(), "Yabc");
    }
}
