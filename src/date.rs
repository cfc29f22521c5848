//! Calendar fields over strftime formats.
//!
//! Only directives with a fixed rendered width are accepted, since the
//! format has to fill a column of known size. Full day and month names,
//! locale representations and time zones vary in width and are rejected
//! when the field is built.

use std::fmt::Write;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::error::SpecError;
use crate::field::Codec;
use crate::value::{Unconverted, Value};

/// Rendered width of each supported directive.
const DIRECTIVE_WIDTHS: &[(char, usize)] = &[
    ('a', 3),
    ('b', 3),
    ('C', 2),
    ('d', 2),
    ('D', 8),
    ('e', 2),
    ('F', 10),
    ('G', 4),
    ('g', 2),
    ('h', 3),
    ('H', 2),
    ('I', 2),
    ('j', 3),
    ('k', 2),
    ('l', 2),
    ('m', 2),
    ('M', 2),
    ('p', 2),
    ('P', 2),
    ('r', 11),
    ('R', 5),
    ('S', 2),
    ('t', 1),
    ('T', 8),
    ('u', 1),
    ('U', 2),
    ('V', 2),
    ('w', 1),
    ('W', 2),
    ('y', 2),
    ('Y', 4),
    ('%', 1),
];

/// Column width of a strftime format. Literal characters count one each.
pub fn format_width(format: &str) -> Result<usize, SpecError> {
    let error = |reason: String| SpecError::DateFormat {
        format: format.to_string(),
        reason,
    };
    if format.is_empty() {
        return Err(error("format is empty".to_string()));
    }
    let mut width = 0;
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            width += 1;
            continue;
        }
        let directive = chars
            .next()
            .ok_or_else(|| error("format ends with a lone '%'".to_string()))?;
        let (_, w) = DIRECTIVE_WIDTHS
            .iter()
            .find(|(d, _)| *d == directive)
            .ok_or_else(|| error(format!("directive %{directive} has no fixed width")))?;
        width += w;
    }
    Ok(width)
}

/// Render with `format`, refusing output that does not fill the column
/// exactly.
fn render(
    item: impl std::fmt::Display,
    format: &str,
    width: usize,
    given: &Value,
) -> Result<String, Unconverted> {
    let mut out = String::with_capacity(width);
    if write!(out, "{item}").is_err() {
        return Err(Unconverted::new(format!("cannot format with {format:?}"), given.to_string()));
    }
    if out.chars().count() != width {
        return Err(Unconverted::new(
            format!("Cannot fit into text of width {width}"),
            out,
        ));
    }
    Ok(out)
}

fn blank(width: usize) -> String {
    " ".repeat(width)
}

/// A calendar date.
#[derive(Debug, Clone)]
pub struct Date {
    format: String,
    width: usize,
}

impl Date {
    pub fn new(format: &str) -> Result<Self, SpecError> {
        let width = format_width(format)?;
        debug!(format, width, "compiled date format");
        Ok(Self {
            format: format.to_string(),
            width,
        })
    }

    pub fn format(&self) -> &str {
        &self.format
    }
}

impl Codec for Date {
    fn width(&self) -> usize {
        self.width
    }

    fn decode(&self, text: &str) -> Value {
        if text.trim().is_empty() {
            return Value::Empty;
        }
        match NaiveDate::parse_from_str(text, &self.format) {
            Ok(d) => Value::Date(d),
            Err(_) => Value::Unconverted(Unconverted::new(
                format!("expected date in format '{}'", self.format),
                text,
            )),
        }
    }

    fn encode(&self, value: &Value) -> Result<String, Unconverted> {
        let date = match value {
            Value::Empty => return Ok(blank(self.width)),
            Value::Date(d) => *d,
            Value::DateTime(dt) => dt.date(),
            other => return Err(Unconverted::new("expected a date", other.to_string())),
        };
        render(date.format(&self.format), &self.format, self.width, value)
    }
}

/// A date with a time of day.
#[derive(Debug, Clone)]
pub struct DateTime {
    format: String,
    width: usize,
}

impl DateTime {
    pub fn new(format: &str) -> Result<Self, SpecError> {
        let width = format_width(format)?;
        debug!(format, width, "compiled datetime format");
        Ok(Self {
            format: format.to_string(),
            width,
        })
    }

    pub fn format(&self) -> &str {
        &self.format
    }
}

impl Codec for DateTime {
    fn width(&self) -> usize {
        self.width
    }

    fn decode(&self, text: &str) -> Value {
        if text.trim().is_empty() {
            return Value::Empty;
        }
        match NaiveDateTime::parse_from_str(text, &self.format) {
            Ok(dt) => Value::DateTime(dt),
            Err(_) => Value::Unconverted(Unconverted::new(
                format!("expected date in format '{}'", self.format),
                text,
            )),
        }
    }

    fn encode(&self, value: &Value) -> Result<String, Unconverted> {
        let datetime = match value {
            Value::Empty => return Ok(blank(self.width)),
            Value::DateTime(dt) => *dt,
            Value::Date(d) => d.and_time(chrono::NaiveTime::MIN),
            other => return Err(Unconverted::new("expected a date and time", other.to_string())),
        };
        render(datetime.format(&self.format), &self.format, self.width, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_width() {
        assert_eq!(format_width("%Y%m%d").unwrap(), 8);
        assert_eq!(format_width("%Y%m%d %H%M%S").unwrap(), 15);
        assert_eq!(format_width("%F").unwrap(), 10);
        assert_eq!(format_width("%d-%b-%y").unwrap(), 9);
        assert_eq!(format_width("100%%").unwrap(), 4);
    }

    #[test]
    fn test_format_width_rejects_variable_directives() {
        assert!(matches!(format_width("%A"), Err(SpecError::DateFormat { .. })));
        assert!(matches!(format_width("%B %d"), Err(SpecError::DateFormat { .. })));
        assert!(matches!(format_width("%Y%"), Err(SpecError::DateFormat { .. })));
        assert!(matches!(format_width(""), Err(SpecError::DateFormat { .. })));
    }

    #[test]
    fn test_date_decode() {
        let spec = Date::new("%Y%m%d").unwrap();
        assert_eq!(spec.width(), 8);
        assert_eq!(
            spec.decode("20040101"),
            Value::Date(NaiveDate::from_ymd_opt(2004, 1, 1).unwrap())
        );
        assert_eq!(spec.decode("        "), Value::Empty);
    }

    #[test]
    fn test_date_decode_failure() {
        let spec = Date::new("%Y%m%d").unwrap();
        let value = spec.decode("2004XX01");
        assert_eq!(
            value.as_unconverted().unwrap().to_string(),
            "expected date in format '%Y%m%d', given='2004XX01'"
        );
    }

    #[test]
    fn test_date_encode() {
        let spec = Date::new("%Y%m%d").unwrap();
        let date = NaiveDate::from_ymd_opt(2004, 1, 1).unwrap();
        assert_eq!(spec.encode(&Value::Date(date)).unwrap(), "20040101");
        assert_eq!(spec.encode(&Value::Empty).unwrap(), "        ");
        assert!(spec.encode(&Value::Integer(3)).is_err());
    }

    #[test]
    fn test_datetime() {
        let spec = DateTime::new("%Y%m%d %H%M%S").unwrap();
        assert_eq!(spec.width(), 15);
        let expected = NaiveDate::from_ymd_opt(2010, 5, 2)
            .unwrap()
            .and_hms_opt(13, 30, 25)
            .unwrap();
        assert_eq!(spec.decode("20100502 133025"), Value::DateTime(expected));
        assert_eq!(
            spec.encode(&Value::DateTime(expected)).unwrap(),
            "20100502 133025"
        );
    }

    #[test]
    fn test_datetime_accepts_date() {
        let spec = DateTime::new("%Y-%m-%d %H:%M").unwrap();
        let date = NaiveDate::from_ymd_opt(2010, 5, 2).unwrap();
        assert_eq!(spec.encode(&Value::Date(date)).unwrap(), "2010-05-02 00:00");
    }
}
