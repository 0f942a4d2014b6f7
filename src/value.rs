use std::fmt;
use std::sync::Arc;

use crate::data_type::DataType;

/// A calendar date in `YYYY-MM-DD` form.
///
/// Only the textual shape is checked; `2024-13-45` is accepted the same way
/// any four digits, two digits and two digits separated by dashes are.
/// Ordering is chronological because the fields are compared year first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl Date {
    /// Parses text of the exact form `YYYY-MM-DD`.
    ///
    /// # Example
    /// ```
    /// use reldb::value::Date;
    /// let d = Date::parse("2024-03-09").unwrap();
    /// assert_eq!((d.year, d.month, d.day), (2024, 3, 9));
    /// assert!(Date::parse("2024-3-9").is_none());
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return None;
        }
        let digits = |range: std::ops::Range<usize>| -> Option<u16> {
            bytes[range].iter().try_fold(0u16, |acc, b| {
                b.is_ascii_digit().then(|| acc * 10 + u16::from(b - b'0'))
            })
        };
        Some(Self {
            year: digits(0..4)?,
            month: digits(5..7)? as u8,
            day: digits(8..10)? as u8,
        })
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Represents a single data value stored in the database.
///
/// This enum wraps all supported Rust types into a single type that can be
/// passed around the engine. It includes support for SQL `NULL` values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// represents an empty or missing value.
    Null,
    /// A 64-bit signed integer value.
    Int(i64),
    /// A UTF-8 string value, wrapped in an [Arc] for cheap cloning across
    /// joined rows.
    Char(Arc<str>),
    /// A date value.
    Date(Date),
}

/// The type a value is treated as when two values are compared.
///
/// Text is inspected: `'42'` compares as an integer and `'2024-01-01'` as a
/// date, so literals written in a WHERE clause meet the column values they
/// are compared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparable {
    Int,
    Date,
    Text,
}

impl Value {
    /// Returns `true` if the value is [Value::Null].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the inner integer value if this is a [Value::Int].
    /// Otherwise, returns `None`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns a reference to the inner string slice if this is a [Value::Char].
    /// Otherwise, returns `None`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Char(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the inner date if this is a [Value::Date].
    pub fn as_date(&self) -> Option<Date> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the logical [DataType] family of this value.
    ///
    /// Returns `None` for [Value::Null]. Text reports `Char(0)`: the length
    /// belongs to the column, not to the value.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Int(_) => Some(DataType::Int),
            Self::Char(_) => Some(DataType::Char(0)),
            Self::Date(_) => Some(DataType::Date),
        }
    }

    /// Infers how the value takes part in a comparison: integral first, then
    /// the date pattern, then plain text. `None` for NULL.
    pub fn comparable(&self) -> Option<Comparable> {
        match self {
            Self::Null => None,
            Self::Int(_) => Some(Comparable::Int),
            Self::Date(_) => Some(Comparable::Date),
            Self::Char(s) => {
                if s.parse::<i64>().is_ok() {
                    Some(Comparable::Int)
                } else if Date::parse(s).is_some() {
                    Some(Comparable::Date)
                } else {
                    Some(Comparable::Text)
                }
            }
        }
    }

    /// Integer reading of the value, parsing text when needed.
    pub fn to_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Char(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Date reading of the value, parsing text when needed.
    pub fn to_date(&self) -> Option<Date> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Char(s) => Date::parse(s),
            _ => None,
        }
    }

    /// Literal form used inside primary-key tuples: integers bare, dates
    /// single-quoted, text quoted like a Python `repr`.
    pub fn key_literal(&self) -> String {
        match self {
            Self::Null => "None".to_string(),
            Self::Int(i) => i.to_string(),
            Self::Char(s) => quote_text(s),
            Self::Date(d) => format!("'{d}'"),
        }
    }
}

/// Single quotes unless the text holds a `'` and no `"`.
fn quote_text(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Char(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{d}"),
        }
    }
}
