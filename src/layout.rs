//! Layout engine: composite widths and the raw split/join of fixed-width
//! text.
//!
//! Nothing here converts values. [`parse`] cuts a line into a container of
//! text slices and [`format`] glues text slices back into a line; the
//! [`crate::convert`] module layers typed conversion on top.
//!
//! Widths count characters. For the ASCII data these files hold that is the
//! same as bytes.

use std::borrow::Cow;
use std::collections::HashMap;

use tracing::debug;

use crate::convert;
use crate::error::{EncodeError, SpecError};
use crate::field::FieldSpec;
use crate::value::{List, ListSpec, Record, Value};

/// A record layout: named fields in declared order.
#[derive(Debug, Clone)]
pub struct RecordSpec {
    names: Vec<String>,
    members: Vec<FieldSpec>,
    index: HashMap<String, usize>,
    width: usize,
}

impl RecordSpec {
    /// Build a record layout from `(name, field)` pairs.
    pub fn new<I, N>(fields: I) -> Result<Self, SpecError>
    where
        I: IntoIterator<Item = (N, FieldSpec)>,
        N: Into<String>,
    {
        let mut names = Vec::new();
        let mut members = Vec::new();
        let mut index = HashMap::new();
        for (name, spec) in fields {
            let name = name.into();
            check_width(&name, &spec)?;
            if index.insert(name.clone(), members.len()).is_some() {
                return Err(SpecError::DuplicateField { field: name });
            }
            names.push(name);
            members.push(spec);
        }
        if members.is_empty() {
            return Err(SpecError::NoFields);
        }
        let width = members.iter().map(FieldSpec::width).sum();
        debug!(fields = members.len(), width, "compiled record layout");
        Ok(Self {
            names,
            members,
            index,
            width,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.position(name).map(|i| &self.members[i])
    }

    /// The field at `index`. The caller checks the bound.
    pub fn member(&self, index: usize) -> &FieldSpec {
        &self.members[index]
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.names().zip(self.members.iter())
    }

    /// Character offset of each field within the record.
    pub fn offsets(&self) -> Vec<(&str, usize, usize)> {
        let mut offset = 0;
        self.fields()
            .map(|(name, spec)| {
                let start = offset;
                offset += spec.width();
                (name, start, spec.width())
            })
            .collect()
    }
}

/// A positional layout: unnamed fields in order, like a tuple.
#[derive(Debug, Clone)]
pub struct SequenceSpec {
    members: Vec<FieldSpec>,
    width: usize,
}

impl SequenceSpec {
    pub fn new<I>(members: I) -> Result<Self, SpecError>
    where
        I: IntoIterator,
        I::Item: Into<FieldSpec>,
    {
        let members: Vec<FieldSpec> = members.into_iter().map(Into::into).collect();
        for (i, spec) in members.iter().enumerate() {
            check_width(&i.to_string(), spec)?;
        }
        if members.is_empty() {
            return Err(SpecError::NoFields);
        }
        let width = members.iter().map(FieldSpec::width).sum();
        Ok(Self { members, width })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member(&self, index: usize) -> &FieldSpec {
        &self.members[index]
    }

    pub fn members(&self) -> &[FieldSpec] {
        &self.members
    }
}

/// One element layout repeated a fixed number of times.
#[derive(Debug, Clone)]
pub struct ArraySpec {
    count: usize,
    element: FieldSpec,
}

impl ArraySpec {
    pub fn new(count: usize, element: impl Into<FieldSpec>) -> Result<Self, SpecError> {
        let element = element.into();
        if count == 0 {
            return Err(SpecError::EmptyArray {
                field: "array".to_string(),
            });
        }
        check_width("array element", &element)?;
        Ok(Self { count, element })
    }

    pub fn width(&self) -> usize {
        self.count * self.element.width()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn element(&self) -> &FieldSpec {
        &self.element
    }
}

fn check_width(name: &str, spec: &FieldSpec) -> Result<(), SpecError> {
    if spec.width() == 0 {
        return Err(SpecError::NonPositiveWidth {
            field: name.to_string(),
        });
    }
    Ok(())
}

/// Right-pad `text` with spaces to `width` characters. Longer text is
/// returned untouched; the caller ignores the excess.
pub fn pad_line(text: &str, width: usize) -> Cow<'_, str> {
    let len = text.chars().count();
    if len >= width {
        Cow::Borrowed(text)
    } else {
        let mut padded = String::with_capacity(width);
        padded.push_str(text);
        padded.extend(std::iter::repeat_n(' ', width - len));
        Cow::Owned(padded)
    }
}

/// Make `text` exactly `width` characters: pad on the right with `pad`, or
/// cut off the right end.
pub fn fit(text: &str, width: usize, pad: char) -> Cow<'_, str> {
    let len = text.chars().count();
    if len == width {
        Cow::Borrowed(text)
    } else if len < width {
        let mut out = String::with_capacity(width);
        out.push_str(text);
        out.extend(std::iter::repeat_n(pad, width - len));
        Cow::Owned(out)
    } else {
        Cow::Borrowed(take_chars(text, width).0)
    }
}

/// Split `text` after `n` characters.
fn take_chars(text: &str, n: usize) -> (&str, &str) {
    let end = text.char_indices().nth(n).map_or(text.len(), |(i, _)| i);
    text.split_at(end)
}

/// Cut `text` into consecutive slices of the given widths. Text shorter than
/// the total yields short (possibly empty) trailing slices.
pub fn split<'a, I>(text: &'a str, widths: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = usize>,
{
    let mut rest = text;
    widths
        .into_iter()
        .map(|width| {
            let (head, tail) = take_chars(rest, width);
            rest = tail;
            head
        })
        .collect()
}

/// Split a line into a container of raw text, without conversion.
///
/// Plain-text leaves lose trailing blanks; converting leaves keep their
/// slice exactly so the converter sees every column.
pub fn parse(text: &str, spec: &FieldSpec) -> Value {
    let text = pad_line(text, spec.width());
    parse_padded(&text, spec)
}

fn parse_padded(text: &str, spec: &FieldSpec) -> Value {
    match spec {
        FieldSpec::Text(width) => Value::Text(take_chars(text, *width).0.trim_end().to_string()),
        FieldSpec::Convert(codec) => Value::Text(take_chars(text, codec.width()).0.to_string()),
        FieldSpec::Record(r) => {
            let slices = split(text, r.fields().map(|(_, f)| f.width()));
            let slots = slices
                .into_iter()
                .zip(r.fields())
                .map(|(slice, (_, f))| parse_padded(slice, f))
                .collect();
            Value::Record(Record::from_slots(r.clone(), slots))
        }
        FieldSpec::Sequence(s) => {
            let slices = split(text, s.members().iter().map(FieldSpec::width));
            let slots = slices
                .into_iter()
                .zip(s.members())
                .map(|(slice, f)| parse_padded(slice, f))
                .collect();
            Value::List(List::from_slots(ListSpec::Sequence(s.clone()), slots))
        }
        FieldSpec::Array(a) => {
            let element = a.element();
            let slices = split(text, std::iter::repeat_n(element.width(), a.count()));
            let slots = slices
                .into_iter()
                .map(|slice| parse_padded(slice, element))
                .collect();
            Value::List(List::from_slots(ListSpec::Array(a.clone()), slots))
        }
    }
}

/// Join a container back into one line of exactly `spec.width()`
/// characters.
///
/// Each leaf is rendered by [`convert::render_leaf`], then padded with the
/// field's pad character or truncated on the right to its width.
pub fn format(value: &Value, spec: &FieldSpec) -> Result<String, EncodeError> {
    let mut out = String::with_capacity(spec.width());
    join_into(value, spec, "", &mut out)?;
    Ok(out)
}

fn join_into(
    value: &Value,
    spec: &FieldSpec,
    path: &str,
    out: &mut String,
) -> Result<(), EncodeError> {
    if spec.is_leaf() {
        let text = convert::render_leaf(value, spec, path)?;
        out.push_str(&fit(&text, spec.width(), spec.pad()));
        return Ok(());
    }

    // A blank composite renders each member blank.
    if let Value::Empty = value {
        return join_into(&Value::blank(spec), spec, path, out);
    }

    match (spec, value) {
        (FieldSpec::Record(r), Value::Record(rec)) => {
            for (name, field) in r.fields() {
                let child_path = child_path(path, name);
                let child = rec
                    .get(name)
                    .ok_or_else(|| EncodeError::ShapeMismatch {
                        field: child_path.clone(),
                        expected: "a value",
                        found: "missing field",
                    })?;
                join_into(child, field, &child_path, out)?;
            }
            Ok(())
        }
        (FieldSpec::Sequence(s), Value::List(list)) => {
            check_len(path, s.len(), list.len())?;
            for (i, (field, child)) in s.members().iter().zip(list.iter()).enumerate() {
                join_into(child, field, &format!("{path}[{i}]"), out)?;
            }
            Ok(())
        }
        (FieldSpec::Array(a), Value::List(list)) => {
            check_len(path, a.count(), list.len())?;
            for (i, child) in list.iter().enumerate() {
                join_into(child, a.element(), &format!("{path}[{i}]"), out)?;
            }
            Ok(())
        }
        (spec, value) => Err(mismatch(path, spec, value)),
    }
}

pub(crate) fn child_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

pub(crate) fn mismatch(path: &str, spec: &FieldSpec, value: &Value) -> EncodeError {
    if let Value::Unconverted(u) = value {
        return EncodeError::Unconverted {
            field: display_path(path),
            value: u.clone(),
        };
    }
    EncodeError::ShapeMismatch {
        field: display_path(path),
        expected: spec.kind(),
        found: value.kind(),
    }
}

pub(crate) fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

fn check_len(path: &str, expected: usize, found: usize) -> Result<(), EncodeError> {
    if expected != found {
        return Err(EncodeError::ShapeMismatch {
            field: display_path(path),
            expected: "a list of the declared length",
            found: "a list of another length",
        });
    }
    Ok(())
}
