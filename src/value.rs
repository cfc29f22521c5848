//! Decoded values and the fixed-shape containers that hold them.
//!
//! A [`Record`] (named slots) or [`List`] (positional slots) is produced by
//! decoding a line against a layout. Its shape never changes afterwards:
//! there is no way to add, remove, or reorder slots, only to replace the
//! value in one. Replacing a slot with [`Value::Text`] runs the slot's
//! decoder, so a record that has been touched always holds typed values.

use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::convert;
use crate::error::StructureError;
use crate::field::FieldSpec;
use crate::layout::{ArraySpec, RecordSpec, SequenceSpec};

/// A field whose text could not be converted, or whose value could not be
/// written back as text.
///
/// Stored in place of the value so that one bad field does not spoil the
/// rest of the record. It is falsy: [`Value::is_truthy`] returns `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unconverted {
    text: String,
    reason: String,
}

impl Unconverted {
    pub fn new(reason: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reason: reason.into(),
        }
    }

    /// The text that failed to convert.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for Unconverted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, given='{}'", self.reason, self.text)
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A blank field: absence of a value, not zero.
    Empty,
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Record(Record),
    List(List),
    Unconverted(Unconverted),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Record(_) => "record",
            Value::List(_) => "list",
            Value::Unconverted(_) => "unconverted",
        }
    }

    /// `false` for blank and unconverted fields.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Empty | Value::Unconverted(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// The value as a decimal. Integers are widened.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Integer(n) => Some(Decimal::from(*n)),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_unconverted(&self) -> Option<&Unconverted> {
        match self {
            Value::Unconverted(u) => Some(u),
            _ => None,
        }
    }

    /// Whether this value, or anything nested in it, is unconverted.
    pub fn has_unconverted(&self) -> bool {
        match self {
            Value::Unconverted(_) => true,
            Value::Record(r) => r.has_unconverted(),
            Value::List(l) => l.has_unconverted(),
            _ => false,
        }
    }

    /// Every unconverted value in this tree, paired with its field path.
    pub fn unconverted(&self) -> Vec<(String, &Unconverted)> {
        let mut found = Vec::new();
        collect_unconverted(self, String::new(), &mut found);
        found
    }

    /// One line per unconverted field: `Field <path> - <reason>, given='<text>'`.
    pub fn unconverted_report(&self) -> String {
        render_report(&self.unconverted())
    }

    /// A blank value shaped like `spec`: containers for composites, `Empty`
    /// for leaves.
    pub fn blank(spec: &FieldSpec) -> Value {
        match spec {
            FieldSpec::Text(_) | FieldSpec::Convert(_) => Value::Empty,
            FieldSpec::Record(r) => Value::Record(Record::blank(r.clone())),
            FieldSpec::Sequence(s) => Value::List(List::blank(ListSpec::Sequence(s.clone()))),
            FieldSpec::Array(a) => Value::List(List::blank(ListSpec::Array(a.clone()))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::DateTime(d) => write!(f, "{d}"),
            Value::Record(r) => write!(f, "{r}"),
            Value::List(l) => write!(f, "{l}"),
            Value::Unconverted(u) => write!(f, "<unconverted: {u}>"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::DateTime(d)
    }
}

impl From<Unconverted> for Value {
    fn from(u: Unconverted) -> Self {
        Value::Unconverted(u)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl From<List> for Value {
    fn from(l: List) -> Self {
        Value::List(l)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_text() == Some(*other)
    }
}

impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        self.as_integer() == Some(*other)
    }
}

impl PartialEq<Decimal> for Value {
    fn eq(&self, other: &Decimal) -> bool {
        matches!(self, Value::Decimal(d) if d == other)
    }
}

/// A decoded record: one named slot per field, in declared order.
#[derive(Debug, Clone)]
pub struct Record {
    spec: Arc<RecordSpec>,
    slots: Vec<Value>,
}

impl Record {
    pub(crate) fn from_slots(spec: Arc<RecordSpec>, slots: Vec<Value>) -> Self {
        debug_assert_eq!(spec.len(), slots.len());
        Self { spec, slots }
    }

    pub(crate) fn into_parts(self) -> (Arc<RecordSpec>, Vec<Value>) {
        (self.spec, self.slots)
    }

    /// A record with every field blank.
    pub fn blank(spec: Arc<RecordSpec>) -> Self {
        let slots = spec.fields().map(|(_, f)| Value::blank(f)).collect();
        Self { spec, slots }
    }

    pub fn spec(&self) -> &Arc<RecordSpec> {
        &self.spec
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.spec.position(name).map(|i| &self.slots[i])
    }

    /// The nested record in field `name`, for setting its fields in place.
    pub fn record_mut(&mut self, name: &str) -> Option<&mut Record> {
        let index = self.spec.position(name)?;
        self.slots[index].as_record_mut()
    }

    /// The nested sequence or array in field `name`.
    pub fn list_mut(&mut self, name: &str) -> Option<&mut List> {
        let index = self.spec.position(name)?;
        self.slots[index].as_list_mut()
    }

    /// Replace the value of an existing field.
    ///
    /// Text is run through the field's decoder; anything else is stored as
    /// given. Naming a field the layout does not have, or giving a nested
    /// container of another shape, is an error and leaves the record as it
    /// was.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), StructureError> {
        let index = self
            .spec
            .position(name)
            .ok_or_else(|| StructureError::UnknownField(name.to_string()))?;
        let field = self.spec.member(index);
        self.slots[index] = convert::assign(value.into(), field, name)?;
        Ok(())
    }

    /// Replace several fields at once. If any name is unknown or any value
    /// has the wrong shape nothing is changed.
    pub fn update<I, K, V>(&mut self, pairs: I) -> Result<(), StructureError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut staged = Vec::new();
        for (name, value) in pairs {
            let name = name.as_ref();
            let index = self
                .spec
                .position(name)
                .ok_or_else(|| StructureError::UnknownField(name.to_string()))?;
            let value = convert::assign(value.into(), self.spec.member(index), name)?;
            staged.push((index, value));
        }
        for (index, value) in staged {
            self.slots[index] = value;
        }
        Ok(())
    }

    /// Fields in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.spec.names().zip(self.slots.iter())
    }

    pub fn values(&self) -> &[Value] {
        &self.slots
    }

    pub fn has_unconverted(&self) -> bool {
        self.slots.iter().any(Value::has_unconverted)
    }

    pub fn unconverted(&self) -> Vec<(String, &Unconverted)> {
        let mut found = Vec::new();
        for (name, value) in self.iter() {
            collect_unconverted(value, name.to_string(), &mut found);
        }
        found
    }

    pub fn unconverted_report(&self) -> String {
        render_report(&self.unconverted())
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.slots == other.slots && self.spec.names().eq(other.spec.names())
    }
}

impl Index<&str> for Record {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        match self.get(name) {
            Some(value) => value,
            None => panic!("record has no field '{name}'"),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: ")?;
            fmt_nested(value, f)?;
        }
        f.write_str("}")
    }
}

/// The layout behind a [`List`]: a positional sequence or a homogeneous
/// array.
#[derive(Debug, Clone)]
pub enum ListSpec {
    Sequence(Arc<SequenceSpec>),
    Array(Arc<ArraySpec>),
}

impl ListSpec {
    pub fn len(&self) -> usize {
        match self {
            ListSpec::Sequence(s) => s.len(),
            ListSpec::Array(a) => a.count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The field spec of slot `index`. The caller checks the bound.
    pub fn member(&self, index: usize) -> &FieldSpec {
        match self {
            ListSpec::Sequence(s) => s.member(index),
            ListSpec::Array(a) => a.element(),
        }
    }
}

/// A decoded sequence or array: positional slots of fixed count.
#[derive(Debug, Clone)]
pub struct List {
    spec: ListSpec,
    slots: Vec<Value>,
}

impl List {
    pub(crate) fn from_slots(spec: ListSpec, slots: Vec<Value>) -> Self {
        debug_assert_eq!(spec.len(), slots.len());
        Self { spec, slots }
    }

    pub(crate) fn into_parts(self) -> (ListSpec, Vec<Value>) {
        (self.spec, self.slots)
    }

    pub fn blank(spec: ListSpec) -> Self {
        let slots = (0..spec.len())
            .map(|i| Value::blank(spec.member(i)))
            .collect();
        Self { spec, slots }
    }

    pub fn spec(&self) -> &ListSpec {
        &self.spec
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.slots.get(index)
    }

    /// The nested record at `index`.
    pub fn record_mut(&mut self, index: usize) -> Option<&mut Record> {
        self.slots.get_mut(index).and_then(Value::as_record_mut)
    }

    /// The nested sequence or array at `index`.
    pub fn list_mut(&mut self, index: usize) -> Option<&mut List> {
        self.slots.get_mut(index).and_then(Value::as_list_mut)
    }

    /// Replace the value at `index`, decoding text and checking shape as
    /// [`Record::set`] does.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> Result<(), StructureError> {
        let len = self.slots.len();
        if index >= len {
            return Err(StructureError::OutOfRange { index, len });
        }
        let slot = format!("[{index}]");
        self.slots[index] = convert::assign(value.into(), self.spec.member(index), &slot)?;
        Ok(())
    }

    /// Replace every slot. The number of values must equal the fixed length.
    pub fn set_all<I, V>(&mut self, values: I) -> Result<(), StructureError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let len = self.slots.len();
        if values.len() != len {
            return Err(StructureError::OutOfRange {
                index: values.len(),
                len,
            });
        }
        let mut staged = Vec::with_capacity(len);
        for (index, value) in values.into_iter().enumerate() {
            let slot = format!("[{index}]");
            staged.push(convert::assign(value, self.spec.member(index), &slot)?);
        }
        self.slots = staged;
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.slots.iter()
    }

    pub fn values(&self) -> &[Value] {
        &self.slots
    }

    pub fn has_unconverted(&self) -> bool {
        self.slots.iter().any(Value::has_unconverted)
    }

    pub fn unconverted(&self) -> Vec<(String, &Unconverted)> {
        let mut found = Vec::new();
        for (i, value) in self.slots.iter().enumerate() {
            collect_unconverted(value, format!("[{i}]"), &mut found);
        }
        found
    }

    pub fn unconverted_report(&self) -> String {
        render_report(&self.unconverted())
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.slots == other.slots
    }
}

impl<V> PartialEq<Vec<V>> for List
where
    Value: PartialEq<V>,
{
    fn eq(&self, other: &Vec<V>) -> bool {
        self.slots.len() == other.len() && self.slots.iter().zip(other).all(|(a, b)| a == b)
    }
}

impl Index<usize> for List {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.slots[index]
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.slots.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            fmt_nested(value, f)?;
        }
        f.write_str("]")
    }
}

/// Text is quoted inside containers so blanks stay visible.
fn fmt_nested(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Text(s) => write!(f, "{s:?}"),
        Value::Empty => f.write_str("-"),
        other => write!(f, "{other}"),
    }
}

fn collect_unconverted<'a>(
    value: &'a Value,
    path: String,
    found: &mut Vec<(String, &'a Unconverted)>,
) {
    match value {
        Value::Unconverted(u) => found.push((path, u)),
        Value::Record(r) => {
            for (name, child) in r.iter() {
                let child_path = if path.is_empty() {
                    name.to_string()
                } else {
                    format!("{path}.{name}")
                };
                collect_unconverted(child, child_path, found);
            }
        }
        Value::List(l) => {
            for (i, child) in l.iter().enumerate() {
                collect_unconverted(child, format!("{path}[{i}]"), found);
            }
        }
        _ => {}
    }
}

fn render_report(found: &[(String, &Unconverted)]) -> String {
    found
        .iter()
        .map(|(path, u)| format!("Field {path} - {u}"))
        .collect::<Vec<_>>()
        .join("\n")
}
