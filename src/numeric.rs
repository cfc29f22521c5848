//! Numeric fields: plain integers and COBOL PICTURE formats.
//!
//! A PICTURE format such as `9(4)V99` or `S999,999.99` is compiled once into
//! a list of [`Primitive`]s laid out left to right. Decoding walks them
//! forward over the text; encoding walks them backward over the reversed
//! magnitude so that digit runs pad on the correct side.
//!
//! | symbol | primitive | width |
//! |--------|-----------|-------|
//! | `9`, `9(n)` | digit run | n |
//! | `V` | implied decimal point | 0 |
//! | `.` | explicit decimal point | 1 |
//! | `,` | group separator | 1 |
//! | space | filler | 1 |
//! | `S` | sign | 1 |

use std::num::IntErrorKind;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::error::{NumericFormatError, SpecError};
use crate::field::Codec;
use crate::value::{Unconverted, Value};

/// Whole numbers, right-aligned in their column.
#[derive(Debug, Clone)]
pub struct Integer {
    width: usize,
    pad: char,
}

impl Integer {
    /// Widest column whose every value fits in an `i64`.
    pub const MAX_WIDTH: usize = 18;

    pub fn new(width: usize) -> Result<Self, SpecError> {
        if width > Self::MAX_WIDTH {
            return Err(SpecError::IntegerWidth {
                width,
                max: Self::MAX_WIDTH,
            });
        }
        Ok(Self { width, pad: '0' })
    }

    /// Use `pad` instead of `0` to fill the left of short numbers.
    pub fn with_pad(mut self, pad: char) -> Self {
        self.pad = pad;
        self
    }
}

impl Codec for Integer {
    fn width(&self) -> usize {
        self.width
    }

    fn decode(&self, text: &str) -> Value {
        let clean = text.trim();
        if clean.is_empty() {
            return Value::Empty;
        }
        match clean.parse::<i64>() {
            Ok(n) => Value::Integer(n),
            Err(e)
                if matches!(
                    e.kind(),
                    IntErrorKind::PosOverflow | IntErrorKind::NegOverflow
                ) =>
            {
                Value::Unconverted(Unconverted::new("integer does not fit in 64 bits", text))
            }
            Err(_) => {
                Value::Unconverted(Unconverted::new("expecting all digits for integer", text))
            }
        }
    }

    fn encode(&self, value: &Value) -> Result<String, Unconverted> {
        let text = match value {
            Value::Empty => return Ok(" ".repeat(self.width)),
            Value::Integer(n) => n.to_string(),
            Value::Decimal(d) if d.fract().is_zero() => d.trunc().normalize().to_string(),
            other => {
                return Err(Unconverted::new(
                    format!("expecting an integer, found {}", other.kind()),
                    other.to_string(),
                ));
            }
        };
        let len = text.chars().count();
        if len > self.width {
            return Err(Unconverted::new(
                format!("Cannot fit into text of width {}", self.width),
                text,
            ));
        }
        let fill = std::iter::repeat_n(self.pad, self.width - len);
        let mut out = String::with_capacity(self.width);
        // Zero fill goes between the sign and the digits.
        match text.strip_prefix('-') {
            Some(digits) if self.pad == '0' => {
                out.push('-');
                out.extend(fill);
                out.push_str(digits);
            }
            _ => {
                out.extend(fill);
                out.push_str(&text);
            }
        }
        Ok(out)
    }

    fn pad(&self) -> char {
        self.pad
    }
}

/// One compiled piece of a PICTURE format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// A run of `n` digit columns.
    Digits(usize),
    /// `V`: a decimal point that occupies no column.
    Implied,
    /// `.`: a decimal point written in the text.
    Point,
    /// `,`: a group separator.
    Comma,
    /// A filler column; its content is ignored on decode.
    Space,
    /// `S`: `-` for negative values, blank otherwise.
    Sign,
}

impl Primitive {
    pub fn width(&self) -> usize {
        match self {
            Primitive::Digits(n) => *n,
            Primitive::Implied => 0,
            Primitive::Point | Primitive::Comma | Primitive::Space | Primitive::Sign => 1,
        }
    }

    fn is_decimal_marker(&self) -> bool {
        matches!(self, Primitive::Implied | Primitive::Point)
    }

    /// Consume this primitive's columns from `input`, appending the decimal
    /// digits they stand for to `digits`.
    fn read(
        &self,
        input: &mut std::str::Chars<'_>,
        digits: &mut String,
        negative: &mut bool,
    ) -> Result<(), String> {
        match self {
            Primitive::Digits(n) => {
                let run: String = input.by_ref().take(*n).collect();
                if run.chars().count() != *n || !run.chars().all(|c| c.is_ascii_digit() || c == ' ')
                {
                    return Err(format!("Expected {n} digits. Found {run:?}"));
                }
                digits.extend(run.chars().map(|c| if c == ' ' { '0' } else { c }));
            }
            Primitive::Implied => digits.push('.'),
            Primitive::Point => {
                let c = input.next();
                if c != Some('.') {
                    return Err(format!("Expected '.' found {}", show(c)));
                }
                digits.push('.');
            }
            Primitive::Comma => {
                let c = input.next();
                if c != Some(',') {
                    return Err(format!("Expected ',' found {}", show(c)));
                }
            }
            Primitive::Space => {
                input.next();
            }
            Primitive::Sign => match input.next() {
                Some('-') => *negative = true,
                Some(' ') | Some('+') => {}
                c => return Err(format!("Expected sign found {}", show(c))),
            },
        }
        Ok(())
    }

    /// Write this primitive's columns to `out`, both reversed, consuming
    /// characters of the reversed magnitude from `input`.
    fn write(
        &self,
        input: &mut std::str::Chars<'_>,
        out: &mut String,
        negative: bool,
    ) -> Result<(), String> {
        match self {
            Primitive::Digits(n) => {
                let run: String = input.by_ref().take(*n).collect();
                if !run.chars().all(|c| c.is_ascii_digit()) {
                    return Err(format!("Found non numeric data {run:?} in value"));
                }
                out.push_str(&run);
                out.extend(std::iter::repeat_n('0', n - run.chars().count()));
            }
            Primitive::Implied => {
                let c = input.next();
                if c != Some('.') {
                    return Err(format!("Expected '.' found {}", show(c)));
                }
            }
            Primitive::Point => {
                let c = input.next();
                if c != Some('.') {
                    return Err(format!("Expected '.' found {}", show(c)));
                }
                out.push('.');
            }
            Primitive::Comma => out.push(','),
            Primitive::Space => out.push(' '),
            Primitive::Sign => out.push(if negative { '-' } else { ' ' }),
        }
        Ok(())
    }
}

fn show(c: Option<char>) -> String {
    match c {
        Some(c) => format!("{c:?}"),
        None => "end of text".to_string(),
    }
}

/// States of the format compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Between primitives.
    Start,
    /// Inside a run of `9`s.
    Nine,
    /// Inside the parentheses of `9(n)`.
    LParen,
}

/// What the compiler does on one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Begin a digit run of one.
    OpenRun,
    /// Add one digit to the open run.
    ExtendRun,
    /// Emit a structural primitive.
    Emit(Primitive),
    /// Close the open digit run, then emit a structural primitive.
    CloseRunAndEmit(Primitive),
    /// Start reading a repeat count.
    OpenRepeat,
    /// Accumulate one decimal digit of the repeat count.
    RepeatDigit(u32),
    /// Apply the repeat count to the open run.
    CloseRepeat,
}

fn structural(symbol: char) -> Option<Primitive> {
    match symbol {
        '.' => Some(Primitive::Point),
        ',' => Some(Primitive::Comma),
        'V' => Some(Primitive::Implied),
        ' ' => Some(Primitive::Space),
        'S' => Some(Primitive::Sign),
        _ => None,
    }
}

/// The transition table.
fn transition(state: State, symbol: char) -> Option<(State, Action)> {
    match (state, symbol) {
        (State::Start, '9') => Some((State::Nine, Action::OpenRun)),
        (State::Start, s) => structural(s).map(|p| (State::Start, Action::Emit(p))),
        (State::Nine, '9') => Some((State::Nine, Action::ExtendRun)),
        (State::Nine, '(') => Some((State::LParen, Action::OpenRepeat)),
        (State::Nine, s) => structural(s).map(|p| (State::Start, Action::CloseRunAndEmit(p))),
        (State::LParen, ')') => Some((State::Nine, Action::CloseRepeat)),
        (State::LParen, s) => s
            .to_digit(10)
            .map(|d| (State::LParen, Action::RepeatDigit(d))),
    }
}

/// Most digits a format may hold: the significant digits of a [`Decimal`].
pub const MAX_DIGITS: usize = 28;

/// Compile a PICTURE format into its primitives.
pub fn compile(format: &str) -> Result<Vec<Primitive>, NumericFormatError> {
    let mut primitives = Vec::new();
    let mut state = State::Start;
    let mut run = 0usize;
    let mut repeat: Option<usize> = None;
    let mut seen_sign = false;
    let mut seen_decimal = false;

    for (index, symbol) in format.chars().enumerate() {
        let position = index + 1;
        let (next, action) = transition(state, symbol)
            .ok_or(NumericFormatError::UnexpectedCharacter { symbol, position })?;

        let emitted = match action {
            Action::OpenRun => {
                run = 1;
                None
            }
            Action::ExtendRun => {
                run += 1;
                None
            }
            Action::OpenRepeat => {
                repeat = None;
                None
            }
            Action::RepeatDigit(d) => {
                let so_far = repeat.unwrap_or(0);
                repeat = Some(so_far.saturating_mul(10).saturating_add(d as usize));
                None
            }
            Action::CloseRepeat => {
                // The 9 before the parenthesis already counted one digit.
                if let Some(n) = repeat.take()
                    && n != 0
                {
                    run += n - 1;
                }
                None
            }
            Action::Emit(p) => Some(p),
            Action::CloseRunAndEmit(p) => {
                primitives.push(Primitive::Digits(run));
                run = 0;
                Some(p)
            }
        };

        if let Some(p) = emitted {
            if p == Primitive::Sign {
                if seen_sign {
                    return Err(NumericFormatError::DuplicateSign { position });
                }
                seen_sign = true;
            }
            if p.is_decimal_marker() {
                if seen_decimal {
                    return Err(NumericFormatError::DuplicateDecimal { position });
                }
                seen_decimal = true;
            }
            primitives.push(p);
        }
        state = next;
    }

    match state {
        State::Nine => primitives.push(Primitive::Digits(run)),
        State::LParen => return Err(NumericFormatError::UnterminatedRepeat),
        State::Start => {}
    }

    if primitives.iter().map(Primitive::width).sum::<usize>() == 0 {
        return Err(NumericFormatError::Empty(format.to_string()));
    }
    let digits: usize = primitives
        .iter()
        .map(|p| match p {
            Primitive::Digits(n) => *n,
            _ => 0,
        })
        .sum();
    if digits > MAX_DIGITS {
        return Err(NumericFormatError::TooManyDigits {
            digits,
            max: MAX_DIGITS,
        });
    }
    Ok(primitives)
}

/// A fixed-point decimal field described by a PICTURE format.
#[derive(Debug, Clone)]
pub struct Numeric {
    format: String,
    primitives: Vec<Primitive>,
    width: usize,
    precision: u32,
    has_decimal: bool,
    /// `10^n` for the `n` digits before the decimal marker.
    modulus: Decimal,
}

impl Numeric {
    pub fn new(format: &str) -> Result<Self, NumericFormatError> {
        let primitives = compile(format)?;
        let width = primitives.iter().map(Primitive::width).sum();

        // Digits after the decimal marker set the scale used when encoding.
        let mut precision = 0;
        let mut whole_digits = 0;
        let mut after_decimal = false;
        for p in &primitives {
            match p {
                p if p.is_decimal_marker() => after_decimal = true,
                Primitive::Digits(n) if after_decimal => precision += *n as u32,
                Primitive::Digits(n) => whole_digits += *n as u32,
                _ => {}
            }
        }
        // At most MAX_DIGITS, so the power fits a Decimal.
        let modulus = Decimal::from_i128_with_scale(10i128.pow(whole_digits), 0);

        debug!(
            format,
            width,
            precision,
            primitives = primitives.len(),
            "compiled numeric format"
        );
        Ok(Self {
            format: format.to_string(),
            primitives,
            width,
            precision,
            has_decimal: after_decimal,
            modulus,
        })
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Number of fractional digits.
    pub fn precision(&self) -> u32 {
        self.precision
    }
}

impl FromStr for Numeric {
    type Err = NumericFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Numeric::new(s)
    }
}

impl Codec for Numeric {
    fn width(&self) -> usize {
        self.width
    }

    fn decode(&self, text: &str) -> Value {
        if text.trim().is_empty() {
            return Value::Empty;
        }
        let len = text.chars().count();
        let padded;
        let text_in = if len < self.width {
            padded = format!("{text:>width$}", width = self.width);
            padded.as_str()
        } else {
            text
        };

        let mut input = text_in.chars();
        let mut digits = String::with_capacity(self.width + 1);
        let mut negative = false;
        for p in &self.primitives {
            if let Err(reason) = p.read(&mut input, &mut digits, &mut negative) {
                return Value::Unconverted(Unconverted::new(reason, text));
            }
        }

        if digits.starts_with('.') {
            digits.insert(0, '0');
        }
        if digits.ends_with('.') {
            digits.push('0');
        }
        if negative {
            digits.insert(0, '-');
        }
        match Decimal::from_str(&digits) {
            Ok(d) => Value::Decimal(d),
            Err(e) => Value::Unconverted(Unconverted::new(e.to_string(), text)),
        }
    }

    fn encode(&self, value: &Value) -> Result<String, Unconverted> {
        let number = match value {
            Value::Empty => return Ok(" ".repeat(self.width)),
            Value::Decimal(d) => *d,
            Value::Integer(n) => Decimal::from(*n),
            other => {
                return Err(Unconverted::new(
                    format!("expecting a decimal, found {}", other.kind()),
                    other.to_string(),
                ));
            }
        };

        // Leading digits wider than the format are dropped: 12345 in 99 is 45.
        let mut magnitude = number
            .abs()
            .round_dp_with_strategy(self.precision, RoundingStrategy::MidpointAwayFromZero)
            % self.modulus;
        magnitude.rescale(self.precision);
        let negative = number.is_sign_negative() && !magnitude.is_zero();
        let mut plain = magnitude.to_string();
        if self.has_decimal && self.precision == 0 {
            plain.push('.');
        }

        let reversed: String = plain.chars().rev().collect();
        let mut input = reversed.chars();
        let mut out = String::with_capacity(self.width);
        for p in self.primitives.iter().rev() {
            p.write(&mut input, &mut out, negative)
                .map_err(|reason| Unconverted::new(reason, plain.clone()))?;
        }
        Ok(out.chars().rev().collect())
    }
}
