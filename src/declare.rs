//! Declaring layouts: a builder and a compact one-line grammar.
//!
//! The grammar lists fields separated by `;`:
//!
//! ```text
//! first_name:12;last_name:15;middle_initial;age:Integer(3);colors[3]:Integer(4)
//! ```
//!
//! - `name:width` - plain text field
//! - `name` - plain text field of width 1
//! - `name[count]:width` - array of `count` elements
//! - the width may be a typed field: `Integer(n)`, `Numeric(fmt)`,
//!   `Date(fmt)` or `DateTime(fmt)`
//!
//! A positional sequence leaves the names out: `1;1;2` or `4;Integer(3)`.

use std::str::FromStr;

use crate::date::{Date, DateTime};
use crate::error::SpecError;
use crate::field::FieldSpec;
use crate::layout::{ArraySpec, RecordSpec, SequenceSpec};
use crate::numeric::{Integer, Numeric};

/// Builds a [`RecordSpec`] one field at a time.
///
/// Errors are held until [`build`](Self::build), so a declaration reads as
/// one chain.
#[derive(Debug, Default)]
pub struct RecordBuilder {
    fields: Vec<(String, FieldSpec)>,
    error: Option<SpecError>,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, spec: impl Into<FieldSpec>) -> Self {
        self.fields.push((name.into(), spec.into()));
        self
    }

    /// Add a field holding `count` copies of `element`.
    pub fn array(
        mut self,
        name: impl Into<String>,
        count: usize,
        element: impl Into<FieldSpec>,
    ) -> Self {
        let name = name.into();
        match array(&name, count, element.into()) {
            Ok(spec) => self.fields.push((name, spec)),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    pub fn build(self) -> Result<RecordSpec, SpecError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        RecordSpec::new(self.fields)
    }
}

impl RecordSpec {
    pub fn builder() -> RecordBuilder {
        RecordBuilder::new()
    }
}

fn array(name: &str, count: usize, element: FieldSpec) -> Result<FieldSpec, SpecError> {
    if count == 0 {
        return Err(SpecError::EmptyArray {
            field: name.to_string(),
        });
    }
    if element.width() == 0 {
        return Err(SpecError::NonPositiveWidth {
            field: name.to_string(),
        });
    }
    Ok(ArraySpec::new(count, element)?.into())
}

/// Compile a record layout from the compact grammar.
pub fn compile(text: &str) -> Result<RecordSpec, SpecError> {
    let mut builder = RecordBuilder::new();
    for entry in entries(text) {
        let (head, width) = match entry.split_once(':') {
            Some((head, width)) => (head.trim(), Some(width.trim())),
            None => (entry, None),
        };
        let (name, count) = parse_head(entry, head)?;
        let spec = match width {
            Some(width) => parse_width(entry, width)?,
            None => FieldSpec::Text(1),
        };
        builder = match count {
            Some(count) => builder.array(name, count, spec),
            None => builder.field(name, spec),
        };
    }
    builder.build()
}

/// Compile a positional sequence from the compact grammar: widths only.
pub fn compile_sequence(text: &str) -> Result<SequenceSpec, SpecError> {
    let members = entries(text)
        .map(|entry| parse_width(entry, entry))
        .collect::<Result<Vec<_>, _>>()?;
    SequenceSpec::new(members)
}

impl FromStr for RecordSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        compile(s)
    }
}

impl FromStr for SequenceSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        compile_sequence(s)
    }
}

fn entries(text: &str) -> impl Iterator<Item = &str> {
    text.split(';').map(str::trim).filter(|e| !e.is_empty())
}

fn malformed(entry: &str, reason: impl Into<String>) -> SpecError {
    SpecError::Malformed {
        entry: entry.to_string(),
        reason: reason.into(),
    }
}

/// `name` or `name[count]`.
fn parse_head<'a>(entry: &str, head: &'a str) -> Result<(&'a str, Option<usize>), SpecError> {
    let Some((name, rest)) = head.split_once('[') else {
        check_name(entry, head)?;
        return Ok((head, None));
    };
    let name = name.trim();
    check_name(entry, name)?;
    let count = rest
        .strip_suffix(']')
        .ok_or_else(|| malformed(entry, "expected ']' after array count"))?
        .trim()
        .parse::<usize>()
        .map_err(|_| malformed(entry, "array count must be a whole number"))?;
    Ok((name, Some(count)))
}

fn check_name(entry: &str, name: &str) -> Result<(), SpecError> {
    if name.is_empty() {
        return Err(malformed(entry, "missing field name"));
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(malformed(entry, "field names may hold only letters, digits and '_'"));
    }
    Ok(())
}

/// A bare width or a typed field such as `Numeric(9(4)V99)`.
fn parse_width(entry: &str, token: &str) -> Result<FieldSpec, SpecError> {
    if let Some((kind, rest)) = token.split_once('(') {
        let arg = rest
            .strip_suffix(')')
            .ok_or_else(|| malformed(entry, "expected ')' to close field type"))?;
        return typed(entry, kind.trim(), arg);
    }
    let width = token
        .parse::<i64>()
        .map_err(|_| malformed(entry, format!("width {token:?} is not a number")))?;
    if width <= 0 {
        return Err(SpecError::NonPositiveWidth {
            field: entry.to_string(),
        });
    }
    Ok(FieldSpec::Text(width as usize))
}

fn typed(entry: &str, kind: &str, arg: &str) -> Result<FieldSpec, SpecError> {
    match kind {
        "Integer" => {
            let width = arg
                .trim()
                .parse::<usize>()
                .map_err(|_| malformed(entry, "Integer width must be a whole number"))?;
            Ok(Integer::new(width)?.into())
        }
        "Numeric" => Numeric::new(arg)
            .map(Into::into)
            .map_err(|source| SpecError::NumericFormat {
                format: arg.to_string(),
                source,
            }),
        "Date" => Ok(Date::new(arg)?.into()),
        "DateTime" => Ok(DateTime::new(arg)?.into()),
        other => Err(malformed(entry, format!("unknown field type {other:?}"))),
    }
}
