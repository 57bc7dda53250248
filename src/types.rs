//! Public data types produced by a parse: [`Value`], [`Table`] (the type of [`crate::Document`]),
//! the [`DateTime`] family, and the [`TomlError`] error type.
//!
//! None of these types borrow from the source text: format preservation is an explicit non-goal
//! of this crate, so there is nothing to gain from threading a lifetime through `Value` the way a
//! format-preserving parser would.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::fmt::Display;

use log::warn;

/// An insertion-ordered mapping from `String` keys to [`Value`]s.
///
/// This is the type of both the root [`crate::Document`] returned by [`crate::parse`] and any
/// nested `[table]` or inline table `Value::Table`.
#[derive(Debug, Clone, Default)]
pub struct Table {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl Table {
    /// Creates an empty table.
    pub fn new() -> Table {
        Table { entries: Vec::new(), index: HashMap::new() }
    }

    /// Inserts `key` with `value`, returning the previous value if `key` was already present.
    ///
    /// Unlike the parser's own internal bookkeeping, this does not enforce TOML's redefinition
    /// rules — it is a plain map operation for callers building or editing a `Table` by hand.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        if let Some(&i) = self.index.get(&key) {
            Some(std::mem::replace(&mut self.entries[i].1, value))
        } else {
            self.index.insert(key.clone(), self.entries.len());
            self.entries.push((key, value));
            None
        }
    }

    /// Looks up `key`, returning `None` if absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// Looks up `key` mutably, returning `None` if absent.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self.index.get(key) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// The number of top-level entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Table) -> bool {
        self.entries == other.entries
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = (&'a str, &'a Value);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a Value)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// The seven value kinds a TOML document can contain.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A UTF-8 string, already unescaped.
    String(String),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A 64-bit IEEE-754 float, including `inf`/`-inf`/`nan`.
    Float(f64),
    /// A boolean.
    Boolean(bool),
    /// A date and/or time value; see [`DateTime`] for the four sub-kinds TOML 1.0 permits.
    DateTime(DateTime),
    /// An array. TOML 1.0 permits mixed-type arrays, so elements are not constrained to share a
    /// variant.
    Array(Vec<Value>),
    /// A table, whether written as a `[header]`, an array-of-tables element, or an inline
    /// `{ k = v }` literal. There is no separate `InlineTable` variant: by the time parsing
    /// completes, an inline table is just a table that can no longer be extended, and that
    /// constraint has already been enforced during assembly.
    Table(Table),
}

impl Value {
    /// Returns the contained string, or `None` if this isn't a `Value::String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the contained integer, or `None` if this isn't a `Value::Integer`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the contained float, or `None` if this isn't a `Value::Float`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the contained bool, or `None` if this isn't a `Value::Boolean`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the contained table, or `None` if this isn't a `Value::Table`.
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the contained array, or `None` if this isn't a `Value::Array`.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a.as_slice()),
            _ => None,
        }
    }
}

/// A calendar date: `<year>-<month>-<day>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    /// Full year, 1-9999.
    pub year: u16,
    /// Month, 1-12.
    pub month: u8,
    /// Day of month, 1-31 depending on month and leap year.
    pub day: u8,
}

/// A time of day, with optional sub-second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    /// Hour, 0-23.
    pub hour: u8,
    /// Minute, 0-59.
    pub minute: u8,
    /// Second, 0-59. TOML's grammar allows a leap second of 60; this parser follows the reference
    /// implementation and rejects it like any other out-of-range value.
    pub second: u8,
    /// Nanoseconds past `second`, 0-999_999_999. Source fractions with more than nine digits are
    /// truncated rather than rejected.
    pub nanosecond: u32,
}

/// A UTC offset attached to an offset date-time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    /// `Z` or `z` — UTC.
    Utc,
    /// `+HH:MM` or `-HH:MM`, stored as signed minutes east of UTC.
    Minutes(i16),
}

/// The four date/time sub-kinds TOML 1.0 distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTime {
    /// `1979-05-27T07:32:00Z` / `1979-05-27T07:32:00-07:00`
    OffsetDateTime(Date, Time, Offset),
    /// `1979-05-27T07:32:00` — no offset, not assumed to be UTC.
    LocalDateTime(Date, Time),
    /// `1979-05-27`
    LocalDate(Date),
    /// `07:32:00`
    LocalTime(Time),
}

/// The error type returned by [`crate::parse`].
///
/// Carries a message and the byte offset in the source at which the problem was detected. The
/// source text itself is not stored on the error — call [`TomlError::line_col`] with the same
/// `&str` that was passed to [`crate::parse`] to translate the offset into a 1-based line/column
/// pair on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TomlError {
    message: String,
    offset: usize,
}

impl TomlError {
    pub(crate) fn new(message: impl Into<String>, offset: usize) -> TomlError {
        let message = message.into();
        warn!("toml parse error at byte {}: {}", offset, message);
        TomlError { message, offset }
    }

    /// The human-readable description of the failure.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The byte offset into the source at which the failure was detected.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Translates this error's byte offset into a 1-based `(line, column)` pair, given the same
    /// source text that was parsed.
    ///
    /// Column is a character (not byte) count within the line. If `source` does not match what
    /// was originally parsed the result is meaningless but will not panic, except when `source` is
    /// shorter than the recorded offset, in which case the end of `source` is used.
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let offset = self.offset.min(source.len());
        let prefix = &source[..offset];
        let line = prefix.matches('\n').count() + 1;
        let col = match prefix.rfind('\n') {
            Some(nl) => source[nl + 1..offset].chars().count() + 1,
            None => prefix.chars().count() + 1,
        };
        (line, col)
    }
}

impl Display for TomlError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (at byte offset {})", self.message, self.offset)
    }
}

impl Error for TomlError {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn table_insert_and_get_preserve_order() {
        let mut t = Table::new();
        t.insert("b", Value::Integer(2));
        t.insert("a", Value::Integer(1));
        let keys: Vec<&str> = t.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(t.get("a"), Some(&Value::Integer(1)));
    }

    #[test]
    fn table_insert_replaces_and_returns_old_value() {
        let mut t = Table::new();
        t.insert("a", Value::Integer(1));
        let old = t.insert("a", Value::Integer(2));
        assert_eq!(old, Some(Value::Integer(1)));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn line_col_counts_lines_and_chars() {
        let src = "a = 1\nb = 2\nc = !\n";
        let err = TomlError::new("unexpected character", 16);
        assert_eq!(err.line_col(src), (3, 5));
    }

    #[test]
    fn line_col_on_first_line() {
        let src = "a = !";
        let err = TomlError::new("unexpected character", 4);
        assert_eq!(err.line_col(src), (1, 5));
    }
}
