//! Conversion pipeline: typed values on top of the layout engine.
//!
//! Decoding never fails as a whole: each converting field decodes on its own
//! and a field that cannot be read becomes [`Value::Unconverted`] in place.
//! Encoding is the opposite: one field that cannot be written aborts the
//! record, because a partly written line would shift every later column.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{EncodeError, StructureError};
use crate::field::FieldSpec;
use crate::layout::{self, child_path, display_path, mismatch};
use crate::value::{List, ListSpec, Record, Value};

/// Decode one line into a typed value.
pub fn decode(text: &str, spec: &FieldSpec) -> Value {
    from_text(layout::parse(text, spec), spec)
}

/// Encode a value into one line of exactly `spec.width()` characters.
pub fn encode(value: &Value, spec: &FieldSpec) -> Result<String, EncodeError> {
    layout::format(value, spec).inspect_err(|e| warn!(error = %e, "record not encoded"))
}

/// Convert the text leaves of a parsed container into typed values.
///
/// Leaves already holding a typed value are left alone.
pub fn from_text(value: Value, spec: &FieldSpec) -> Value {
    from_text_at(value, spec, "")
}

fn from_text_at(value: Value, spec: &FieldSpec, path: &str) -> Value {
    match (spec, value) {
        (FieldSpec::Convert(codec), Value::Text(text)) => {
            let decoded = codec.decode(&text);
            if let Value::Unconverted(u) = &decoded {
                debug!(field = %display_path(path), reason = u.reason(), "field not converted");
            }
            decoded
        }
        (FieldSpec::Record(_), Value::Record(rec)) => {
            let (spec, slots) = rec.into_parts();
            let slots = slots
                .into_iter()
                .zip(spec.fields())
                .map(|(child, (name, field))| from_text_at(child, field, &child_path(path, name)))
                .collect();
            Value::Record(Record::from_slots(spec, slots))
        }
        (FieldSpec::Sequence(_) | FieldSpec::Array(_), Value::List(list)) => {
            let (list_spec, slots) = list.into_parts();
            let slots = slots
                .into_iter()
                .enumerate()
                .map(|(i, child)| {
                    from_text_at(child, list_spec.member(i), &format!("{path}[{i}]"))
                })
                .collect();
            Value::List(List::from_slots(list_spec, slots))
        }
        (_, value) => value,
    }
}

/// Render every leaf of a container as text, without joining.
///
/// The result has the same shape as `value`, with a [`Value::Text`] in each
/// leaf slot holding exactly what [`encode`] would write there before
/// padding.
pub fn to_text(value: &Value, spec: &FieldSpec) -> Result<Value, EncodeError> {
    to_text_at(value, spec, "")
}

fn to_text_at(value: &Value, spec: &FieldSpec, path: &str) -> Result<Value, EncodeError> {
    if spec.is_leaf() {
        return render_leaf(value, spec, path).map(Value::Text);
    }
    match (spec, value) {
        (FieldSpec::Record(_), Value::Record(rec)) => {
            let mut slots = Vec::with_capacity(rec.len());
            for (name, child) in rec.iter() {
                let field = rec.spec().member(slots.len());
                slots.push(to_text_at(child, field, &child_path(path, name))?);
            }
            Ok(Value::Record(Record::from_slots(rec.spec().clone(), slots)))
        }
        (FieldSpec::Sequence(_) | FieldSpec::Array(_), Value::List(list)) => {
            let mut slots = Vec::with_capacity(list.len());
            for (i, child) in list.iter().enumerate() {
                slots.push(to_text_at(child, list.spec().member(i), &format!("{path}[{i}]"))?);
            }
            Ok(Value::List(List::from_slots(list.spec().clone(), slots)))
        }
        (spec, value) => Err(mismatch(path, spec, value)),
    }
}

/// Text for one leaf, before padding to its width.
///
/// Text in a converting slot is read through the codec and written back so
/// it comes out in the field's canonical form. A typed value in a plain-text
/// slot is written with its `Display` form.
pub(crate) fn render_leaf(
    value: &Value,
    spec: &FieldSpec,
    path: &str,
) -> Result<String, EncodeError> {
    let unconverted = |u| EncodeError::Unconverted {
        field: display_path(path),
        value: u,
    };
    match (spec, value) {
        (_, Value::Unconverted(u)) => Err(unconverted(u.clone())),
        (_, Value::Record(_) | Value::List(_)) => Err(mismatch(path, spec, value)),
        (FieldSpec::Convert(codec), Value::Text(text)) => match codec.decode(text) {
            Value::Unconverted(u) => Err(unconverted(u)),
            decoded => codec.encode(&decoded).map_err(unconverted),
        },
        (FieldSpec::Convert(codec), value) => codec.encode(value).map_err(unconverted),
        (_, value) => Ok(value.to_string()),
    }
}

/// The value a slot holds after being assigned `value`: text is decoded for
/// the slot's field, anything else is kept as is.
///
/// A record or list must have the shape of the slot's layout, and a
/// composite slot takes no typed leaf value. Blank and unconverted values
/// fit any slot.
pub(crate) fn assign(value: Value, spec: &FieldSpec, slot: &str) -> Result<Value, StructureError> {
    let value = match value {
        Value::Text(text) => match spec {
            FieldSpec::Text(_) => Value::Text(text),
            FieldSpec::Convert(codec) => codec.decode(&text),
            _ => decode(&text, spec),
        },
        other => other,
    };
    if fits(&value, spec) {
        Ok(value)
    } else {
        Err(StructureError::WrongShape {
            field: slot.to_string(),
            expected: describe_spec(spec),
            found: describe_value(&value),
        })
    }
}

fn fits(value: &Value, spec: &FieldSpec) -> bool {
    match (spec, value) {
        (_, Value::Empty | Value::Unconverted(_)) => true,
        (FieldSpec::Record(want), Value::Record(rec)) => {
            let have = rec.spec();
            Arc::ptr_eq(want, have)
                || (want.width() == have.width() && want.names().eq(have.names()))
        }
        (FieldSpec::Sequence(want), Value::List(list)) => match list.spec() {
            ListSpec::Sequence(have) => {
                Arc::ptr_eq(want, have)
                    || (want.len() == have.len() && want.width() == have.width())
            }
            ListSpec::Array(_) => false,
        },
        (FieldSpec::Array(want), Value::List(list)) => match list.spec() {
            ListSpec::Array(have) => {
                Arc::ptr_eq(want, have)
                    || (want.count() == have.count() && want.width() == have.width())
            }
            ListSpec::Sequence(_) => false,
        },
        (_, Value::Record(_) | Value::List(_)) => false,
        (spec, _) => spec.is_leaf(),
    }
}

fn describe_spec(spec: &FieldSpec) -> String {
    match spec {
        FieldSpec::Text(_) | FieldSpec::Convert(_) => "a field".to_string(),
        FieldSpec::Record(r) => format!("a record of {} fields", r.len()),
        FieldSpec::Sequence(s) => format!("a sequence of {}", s.len()),
        FieldSpec::Array(a) => format!("an array of {}", a.count()),
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Record(r) => format!("a record of {} fields", r.len()),
        Value::List(l) => match l.spec() {
            ListSpec::Sequence(_) => format!("a sequence of {}", l.len()),
            ListSpec::Array(_) => format!("an array of {}", l.len()),
        },
        other => format!("a value of kind {}", other.kind()),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;
    use crate::declare::RecordBuilder;
    use crate::layout::{ArraySpec, SequenceSpec};
    use crate::numeric::{Integer, Numeric};

    const LINE: &str = "jeremy      lowery         s031000100020003";

    fn person() -> FieldSpec {
        RecordBuilder::new()
            .field("first_name", 12)
            .field("last_name", 15)
            .field("middle_initial", 1)
            .field("age", Integer::new(3).unwrap())
            .array("colors", 3, Integer::new(4).unwrap())
            .build()
            .unwrap()
            .into()
    }

    fn line_item() -> FieldSpec {
        RecordBuilder::new()
            .field("invoice_id", Integer::new(4).unwrap())
            .field("item_nbr", Integer::new(2).unwrap())
            .field("price", Numeric::new("999V99").unwrap())
            .field("sales_tax", Numeric::new("99V99").unwrap())
            .field("total", Numeric::new("999V99").unwrap())
            .build()
            .unwrap()
            .into()
    }

    #[test]
    fn test_shared_spec_across_threads() {
        let spec = person();
        let lines: Vec<String> = (0..8)
            .map(|i| format!("jeremy      lowery         s{:03}000100020003", 30 + i))
            .collect();
        let ages: Vec<i64> = std::thread::scope(|scope| {
            let handles: Vec<_> = lines
                .iter()
                .map(|line| {
                    let spec = &spec;
                    scope.spawn(move || {
                        let value = decode(line, spec);
                        assert_eq!(encode(&value, spec).unwrap(), *line);
                        value.as_record().unwrap()["age"].as_integer().unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(ages, (30..38).collect::<Vec<i64>>());
    }

    #[test]
    fn test_decode_mainline() {
        let value = decode(LINE, &person());
        let rec = value.as_record().unwrap();
        assert_eq!(rec["first_name"], "jeremy");
        assert_eq!(rec["last_name"], "lowery");
        assert_eq!(rec["middle_initial"], "s");
        assert_eq!(rec["age"], 31i64);
        assert_eq!(*rec["colors"].as_list().unwrap(), vec![1i64, 2, 3]);
        let names: Vec<&str> = rec.iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["first_name", "last_name", "middle_initial", "age", "colors"]
        );
    }

    #[test]
    fn test_round_trip() {
        let spec = person();
        assert_eq!(encode(&decode(LINE, &spec), &spec).unwrap(), LINE);
    }

    #[test]
    fn test_replace_and_encode() {
        let spec = person();
        let mut value = decode(LINE, &spec);
        let rec = value.as_record_mut().unwrap();
        rec.set("last_name", "smith").unwrap();
        assert_eq!(
            encode(&value, &spec).unwrap(),
            "jeremy      smith          s031000100020003"
        );
    }

    #[test]
    fn test_update_with_text_reencodes() {
        let spec = person();
        let mut value = decode(LINE, &spec);
        let rec = value.as_record_mut().unwrap();
        rec.set("last_name", "smith").unwrap();
        rec.set("age", "35").unwrap();
        rec.list_mut("colors")
            .unwrap()
            .set_all(["2", "4", "3"])
            .unwrap();
        assert_eq!(rec["age"], 35i64);
        assert_eq!(
            encode(&value, &spec).unwrap(),
            "jeremy      smith          s035000200040003"
        );
    }

    #[test]
    fn test_assign_typed_value() {
        let spec = person();
        let mut value = decode(LINE, &spec);
        value.as_record_mut().unwrap().set("age", 30i64).unwrap();
        assert_eq!(
            encode(&value, &spec).unwrap(),
            "jeremy      lowery         s030000100020003"
        );
    }

    #[test]
    fn test_partial_failure_isolation() {
        let spec = person();
        let value = decode("jeremy      lowery         sX23000100020003", &spec);
        let rec = value.as_record().unwrap();
        assert!(rec.has_unconverted());
        assert_eq!(rec["first_name"], "jeremy");
        assert_eq!(*rec["colors"].as_list().unwrap(), vec![1i64, 2, 3]);
        let failed = rec.unconverted();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "age");
        assert_eq!(
            failed[0].1.to_string(),
            "expecting all digits for integer, given='X23'"
        );
        assert_eq!(
            rec.unconverted_report(),
            "Field age - expecting all digits for integer, given='X23'"
        );
    }

    #[test]
    fn test_encode_stops_at_unconverted() {
        let spec = person();
        let value = decode("jeremy      lowery         sX23000100020003", &spec);
        match encode(&value, &spec) {
            Err(EncodeError::Unconverted { field, value }) => {
                assert_eq!(field, "age");
                assert_eq!(value.text(), "X23");
            }
            other => panic!("expected unconverted error, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_overflowing_integer_fails() {
        let spec = person();
        let mut value = decode(LINE, &spec);
        value.as_record_mut().unwrap().set("age", 1000i64).unwrap();
        let err = encode(&value, &spec).unwrap_err();
        assert!(matches!(err, EncodeError::Unconverted { ref field, .. } if field == "age"));
    }

    #[test]
    fn test_padding_idempotence() {
        let spec = person();
        let short = "jeremy      lowery";
        let padded = format!("{short:<width$}", width = spec.width());
        assert_eq!(decode(short, &spec), decode(&padded, &spec));
    }

    #[test]
    fn test_short_line_decodes_blanks() {
        let value = decode("jeremy      lowery         s", &person());
        let rec = value.as_record().unwrap();
        assert!(!rec.has_unconverted());
        assert_eq!(rec["age"], Value::Empty);
        assert_eq!(*rec["colors"].as_list().unwrap(), vec![Value::Empty; 3]);
    }

    #[test]
    fn test_numeric_line_item() {
        let spec = line_item();
        // Shorter than the layout; the missing total decodes blank.
        let value = decode("100101550000525", &spec);
        let rec = value.as_record().unwrap();
        assert!(!rec.has_unconverted());
        assert_eq!(rec["invoice_id"], 1001i64);
        assert_eq!(rec["item_nbr"], 1i64);
        assert_eq!(rec["price"], Decimal::from_str("550.00").unwrap());
        assert_eq!(rec["sales_tax"], Decimal::from_str("5.25").unwrap());
        assert!(rec["total"].is_empty());
    }

    #[test]
    fn test_numeric_computed_total() {
        let spec = line_item();
        let mut value = decode("100101550000525", &spec);
        let rec = value.as_record_mut().unwrap();
        let total = rec["price"].as_decimal().unwrap() + rec["sales_tax"].as_decimal().unwrap();
        rec.set("total", total).unwrap();
        let text = encode(&value, &spec).unwrap();
        assert_eq!(text, "10010155000052555525");

        let reread = decode(&text, &spec);
        assert_eq!(reread.as_record().unwrap()["total"], total);
    }

    #[test]
    fn test_integer_pair() {
        let spec: FieldSpec = RecordBuilder::new()
            .field("x", Integer::new(3).unwrap())
            .field("y", Integer::new(3).unwrap())
            .build()
            .unwrap()
            .into();
        let mut value = decode(" 12 50", &spec);
        let rec = value.as_record_mut().unwrap();
        assert_eq!(rec["x"], 12i64);
        assert_eq!(rec["y"], 50i64);
        rec.set("x", 20i64).unwrap();
        assert_eq!(encode(&value, &spec).unwrap(), "020050");
    }

    #[test]
    fn test_two_stage_sequence() {
        let spec: FieldSpec = SequenceSpec::new([
            FieldSpec::from(12),
            FieldSpec::from(15),
            FieldSpec::from(1),
            FieldSpec::from(Integer::new(3).unwrap()),
        ])
        .unwrap()
        .into();
        let line = "jeremy      lowery         s 23";

        let parsed = layout::parse(line, &spec);
        assert_eq!(*parsed.as_list().unwrap(), vec!["jeremy", "lowery", "s", " 23"]);

        let typed = from_text(parsed, &spec);
        assert_eq!(typed.as_list().unwrap()[3], 23i64);

        let text = to_text(&typed, &spec).unwrap();
        assert_eq!(*text.as_list().unwrap(), vec!["jeremy", "lowery", "s", "023"]);
        assert_eq!(
            layout::format(&text, &spec).unwrap(),
            "jeremy      lowery         s023"
        );
    }

    #[test]
    fn test_text_in_converting_slot_is_normalized() {
        let spec: FieldSpec = ArraySpec::new(3, Integer::new(4).unwrap()).unwrap().into();
        let parsed = layout::parse("   1  2 0003", &spec);
        assert_eq!(encode(&parsed, &spec).unwrap(), "000100020003");
    }

    #[test]
    fn test_nested_records() {
        let spec: FieldSpec = RecordBuilder::new()
            .field(
                "demo",
                RecordBuilder::new()
                    .field("first_name", 6)
                    .field("last_name", 6)
                    .field("sex", 1)
                    .build()
                    .unwrap(),
            )
            .field(
                "address",
                RecordBuilder::new()
                    .field("line_1", 10)
                    .field("line_2", 10)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
            .into();
        let text = "jeremyloweryM100 elm stbelton, tx";
        let value = decode(text, &spec);
        let rec = value.as_record().unwrap();
        let demo = rec["demo"].as_record().unwrap();
        assert_eq!(demo["first_name"], "jeremy");
        assert_eq!(demo["last_name"], "lowery");
        assert_eq!(demo["sex"], "M");
        let address = rec["address"].as_record().unwrap();
        assert_eq!(address["line_1"], "100 elm st");
        assert_eq!(address["line_2"], "belton, tx");
        assert_eq!(encode(&value, &spec).unwrap(), text);
    }

    #[test]
    fn test_nested_unconverted_path() {
        let spec: FieldSpec = RecordBuilder::new()
            .field(
                "totals",
                RecordBuilder::new()
                    .field("amount", Numeric::new("99.99").unwrap())
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
            .into();
        let value = decode("12,34", &spec);
        assert_eq!(value.unconverted()[0].0, "totals.amount");
        assert!(matches!(
            encode(&value, &spec),
            Err(EncodeError::Unconverted { ref field, .. }) if field == "totals.amount"
        ));
    }

    #[test]
    fn test_assign_text_to_composite_slot() {
        let spec: FieldSpec = person();
        let mut value = decode(LINE, &spec);
        value
            .as_record_mut()
            .unwrap()
            .set("colors", "000900080007")
            .unwrap();
        assert_eq!(
            *value.as_record().unwrap()["colors"].as_list().unwrap(),
            vec![9i64, 8, 7]
        );
    }
}
