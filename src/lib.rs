//! # flatrec
//!
//! Fixed-width text records with typed fields.
//!
//! Mainframe extracts, bank files and other batch interchange formats store
//! each record as one line of text with every field at a known column. This
//! library declares such a layout once and then converts lines into typed
//! values and back.
//!
//! ## Overview
//!
//! - **Fields** have a fixed width and an optional converter: plain text,
//!   integers, COBOL `PICTURE` numerics such as `9(4)V99`, dates, and
//!   multi-line text boxes.
//! - **Layouts** nest: records of named fields, positional sequences, and
//!   arrays of one element repeated a fixed number of times.
//! - **Decoding never stops at a bad field.** A field that cannot be read is
//!   kept in place as [`Value::Unconverted`], so the rest of the record is
//!   still usable and the bad text can be reported.
//! - **Encoding is all or nothing.** Every line written is exactly the
//!   layout's width.
//!
//! ## Example
//!
//! ```
//! use flatrec::{FieldSpec, RecordSpec, decode, encode};
//!
//! let layout = "first_name:12;last_name:15;middle_initial;age:Integer(3);colors[3]:Integer(4)";
//! let spec: FieldSpec = layout.parse::<RecordSpec>().unwrap().into();
//!
//! let mut value = decode("jeremy      lowery         s031000100020003", &spec);
//! let record = value.as_record_mut().unwrap();
//! assert_eq!(record["age"], 31i64);
//!
//! record.set("last_name", "smith").unwrap();
//! assert_eq!(
//!     encode(&value, &spec).unwrap(),
//!     "jeremy      smith          s031000100020003"
//! );
//! ```

pub mod convert;
pub mod date;
pub mod declare;
pub mod error;
pub mod field;
pub mod layout;
pub mod numeric;
pub mod text;
pub mod value;

pub use convert::{decode, encode, from_text, to_text};
pub use date::{Date, DateTime};
pub use declare::{RecordBuilder, compile, compile_sequence};
pub use error::{EncodeError, NumericFormatError, SpecError, StructureError};
pub use field::{Codec, FieldSpec};
pub use layout::{ArraySpec, RecordSpec, SequenceSpec, format, parse};
pub use numeric::{Integer, Numeric, Primitive};
pub use text::BoxedText;
pub use value::{List, ListSpec, Record, Unconverted, Value};
