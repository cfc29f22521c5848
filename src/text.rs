//! Multi-line text packed into fixed columns.

use crate::field::Codec;
use crate::layout::fit;
use crate::value::{Unconverted, Value};

/// Up to `lines` lines of text, each stored in a column of `width`
/// characters.
///
/// Decoded text joins the lines with `\r\n`, dropping trailing blanks and
/// trailing empty lines. Encoding cuts or pads each line to the column.
#[derive(Debug, Clone)]
pub struct BoxedText {
    width: usize,
    lines: usize,
}

impl BoxedText {
    pub fn new(width: usize, lines: usize) -> Self {
        Self { width, lines }
    }

    pub fn line_width(&self) -> usize {
        self.width
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    fn join(lines: Vec<&str>) -> Value {
        let mut lines: Vec<&str> = lines.into_iter().map(str::trim_end).collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        if lines.is_empty() {
            return Value::Empty;
        }
        Value::Text(lines.join("\r\n"))
    }
}

impl Codec for BoxedText {
    fn width(&self) -> usize {
        self.width * self.lines
    }

    fn decode(&self, text: &str) -> Value {
        if self.width == 0 || self.lines == 0 {
            return Value::Empty;
        }
        // Text that already holds line breaks is taken as lines.
        if text.contains('\n') {
            return Self::join(text.lines().collect());
        }
        let chars: Vec<char> = text.chars().collect();
        let mut lines = Vec::with_capacity(self.lines);
        let mut start = 0;
        for chunk in chars.chunks(self.width).take(self.lines) {
            let end = start + chunk.iter().map(|c| c.len_utf8()).sum::<usize>();
            lines.push(&text[start..end]);
            start = end;
        }
        Self::join(lines)
    }

    fn encode(&self, value: &Value) -> Result<String, Unconverted> {
        let text = match value {
            Value::Empty => "",
            Value::Text(s) => s.as_str(),
            other => return Err(Unconverted::new("expected text", other.to_string())),
        };
        let lines: Vec<&str> = text.lines().collect();
        if lines.len() > self.lines {
            return Err(Unconverted::new(
                format!("more than {} lines", self.lines),
                text,
            ));
        }
        let mut out = String::with_capacity(self.width());
        for i in 0..self.lines {
            out.push_str(&fit(lines.get(i).copied().unwrap_or(""), self.width, ' '));
        }
        Ok(out)
    }
}
