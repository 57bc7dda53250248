//! The value extractor: dispatches a position in the source to the right scalar recognizer, and
//! assembles arrays and inline tables out of recursive calls to itself.
//!
//! This layer sits between the scalar recognizers (`strings`/`numbers`/`datetime`, all `nom`) and
//! the document assembler (plain imperative code, one layer up): it slices the source and hands
//! the slice to whichever recognizer applies, turning "n bytes consumed" back into an absolute
//! cursor position the assembler can keep walking from.

use std::collections::HashMap;

use crate::internals::datetime;
use crate::internals::numbers;
use crate::internals::scanner;
use crate::internals::strings;
use crate::types::{TomlError, Value};

/// The assembler's working representation of a table: an ordinary insertion-ordered map, plus the
/// two bits of bookkeeping the redefinition rules need.
///
/// `explicit` is true once this table has been introduced by something the writer had to spell
/// out — a `[header]`, an array-of-tables entry, or an inline `{ ... }` literal — as opposed to
/// being created implicitly as an ancestor of a dotted key (`a.b.c = 1` implicitly creates `a` and
/// `a.b`). A `[header]` is only allowed to name a table that does not yet exist, or that exists
/// but is still implicit; redeclaring an explicit table is an error.
///
/// `frozen` is true for inline tables and for anything nested inside one: TOML forbids extending
/// an inline table after its closing `}`, by any later dotted key or header.
///
/// `via_dotted_key` is true for a table created as an intermediate ancestor of a dotted key (e.g.
/// `apple` in `apple.color = "red"`). Such a table is already "defined" as far as a later
/// `[header]` is concerned — `[fruit.apple]` after `fruit.apple.color = "red"` is an error — even
/// though nothing ever set `explicit` on it, since a table header never declared it directly. It
/// may still be walked through as an *ancestor* of a deeper header (`[fruit.apple.seed]` is fine):
/// only the leaf of a header path is checked against this flag.
#[derive(Debug, Clone, Default)]
pub(crate) struct BuildTable {
    pub(crate) entries: Vec<(String, BuildValue)>,
    pub(crate) index: HashMap<String, usize>,
    pub(crate) explicit: bool,
    pub(crate) frozen: bool,
    pub(crate) via_dotted_key: bool,
}

impl BuildTable {
    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut BuildValue> {
        self.index.get(key).map(|&i| &mut self.entries[i].1)
    }

    pub(crate) fn insert_new(&mut self, key: String, value: BuildValue) {
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
    }

    pub(crate) fn into_value(self) -> crate::types::Table {
        let mut table = crate::types::Table::new();
        for (k, v) in self.entries {
            table.insert(k, v.into_value());
        }
        table
    }
}

#[derive(Debug, Clone)]
pub(crate) enum BuildValue {
    Scalar(Value),
    Array(Vec<BuildValue>),
    Table(BuildTable),
    /// The element sequence behind an `[[array.of.tables]]` header. Kept distinct from `Array` so
    /// that a plain `x = [1, 2]` and a `[[x]]` header can be told apart when one collides with the
    /// other, and so the assembler can always append/mutate the last element in place.
    TableArray(Vec<BuildTable>),
}

impl BuildValue {
    pub(crate) fn into_value(self) -> Value {
        match self {
            BuildValue::Scalar(v) => v,
            BuildValue::Array(items) => Value::Array(items.into_iter().map(BuildValue::into_value).collect()),
            BuildValue::Table(t) => Value::Table(t.into_value()),
            BuildValue::TableArray(tables) => {
                Value::Array(tables.into_iter().map(|t| Value::Table(t.into_value())).collect())
            }
        }
    }

    pub(crate) fn as_table_mut(&mut self) -> Option<&mut BuildTable> {
        match self {
            BuildValue::Table(t) => Some(t),
            _ => None,
        }
    }
}

/// Parses a bare or quoted key segment starting at `pos`. Bare keys are `[A-Za-z0-9_-]+`; quoted
/// keys follow single-line basic or literal string syntax (no multi-line form, no escaped
/// newlines) and may be empty.
pub(crate) fn parse_key_segment(source: &str, pos: usize) -> Result<(String, usize), TomlError> {
    match source.as_bytes().get(pos) {
        Some(b'"') | Some(b'\'') => {
            let (s, end) = strings::parse_string(source, pos)?;
            if s.contains('\n') {
                return Err(TomlError::new("keys cannot span multiple lines", pos));
            }
            Ok((s, end))
        }
        _ => {
            let bytes = source.as_bytes();
            let mut end = pos;
            while end < bytes.len() && is_bare_key_byte(bytes[end]) {
                end += 1;
            }
            if end == pos {
                return Err(TomlError::new("expected a key", pos));
            }
            Ok((source[pos..end].to_string(), end))
        }
    }
}

fn is_bare_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Parses a (possibly dotted) key, e.g. `a.b.c`. Dots may be surrounded by spaces/tabs but not
/// newlines.
pub(crate) fn parse_dotted_key(source: &str, pos: usize) -> Result<(Vec<String>, usize), TomlError> {
    let (first, mut pos) = parse_key_segment(source, pos)?;
    let mut segments = vec![first];
    loop {
        let after_ws = scanner::skip_ws(source, pos);
        if source.as_bytes().get(after_ws) != Some(&b'.') {
            return Ok((segments, pos));
        }
        let after_dot = scanner::skip_ws(source, after_ws + 1);
        let (segment, next) = parse_key_segment(source, after_dot)?;
        segments.push(segment);
        pos = next;
    }
}

/// Parses any value: string, boolean, date/time, number, array, or inline table.
pub(crate) fn extract_value(source: &str, pos: usize) -> Result<(BuildValue, usize), TomlError> {
    match source.as_bytes().get(pos) {
        Some(b'"') | Some(b'\'') => {
            let (s, end) = strings::parse_string(source, pos)?;
            Ok((BuildValue::Scalar(Value::String(s)), end))
        }
        Some(b'[') => parse_array(source, pos),
        Some(b'{') => parse_inline_table(source, pos),
        Some(b't') if source[pos..].starts_with("true") => {
            Ok((BuildValue::Scalar(Value::Boolean(true)), pos + 4))
        }
        Some(b'f') if source[pos..].starts_with("false") => {
            Ok((BuildValue::Scalar(Value::Boolean(false)), pos + 5))
        }
        Some(b'i') if source[pos..].starts_with("inf") => {
            let (v, end) = numbers::parse_number(source, pos)?;
            Ok((BuildValue::Scalar(v), end))
        }
        Some(b'n') if source[pos..].starts_with("nan") => {
            let (v, end) = numbers::parse_number(source, pos)?;
            Ok((BuildValue::Scalar(v), end))
        }
        Some(b'0'..=b'9') | Some(b'+') | Some(b'-') => {
            if datetime::looks_like_datetime(source, pos) {
                let (dt, end) = datetime::parse_datetime(source, pos)?;
                datetime::validate(&dt).map_err(|msg| TomlError::new(msg, pos))?;
                return Ok((BuildValue::Scalar(Value::DateTime(dt)), end));
            }
            let (v, end) = numbers::parse_number(source, pos)?;
            Ok((BuildValue::Scalar(v), end))
        }
        _ => Err(TomlError::new("expected a value", pos)),
    }
}

fn parse_array(source: &str, pos: usize) -> Result<(BuildValue, usize), TomlError> {
    debug_assert_eq!(source.as_bytes().get(pos), Some(&b'['));
    let mut pos = pos + 1;
    let mut items = Vec::new();
    loop {
        pos = scanner::skip_void(source, pos, true)?;
        if source.as_bytes().get(pos) == Some(&b']') {
            return Ok((BuildValue::Array(items), pos + 1));
        }
        let (value, after) = extract_value(source, pos)?;
        items.push(value);
        pos = scanner::skip_void(source, after, true)?;
        match source.as_bytes().get(pos) {
            Some(b',') => {
                pos = scanner::skip_void(source, pos + 1, true)?;
            }
            Some(b']') => return Ok((BuildValue::Array(items), pos + 1)),
            _ => return Err(TomlError::new("expected ',' or ']' in array", pos)),
        }
    }
}

fn parse_inline_table(source: &str, pos: usize) -> Result<(BuildValue, usize), TomlError> {
    debug_assert_eq!(source.as_bytes().get(pos), Some(&b'{'));
    let mut table = BuildTable { explicit: true, frozen: false, ..BuildTable::default() };
    let mut pos = scanner::skip_ws(source, pos + 1);
    if source.as_bytes().get(pos) == Some(&b'}') {
        table.frozen = true;
        return Ok((BuildValue::Table(table), pos + 1));
    }
    loop {
        let (segments, after_key) = parse_dotted_key(source, pos)?;
        let after_ws = scanner::skip_ws(source, after_key);
        if source.as_bytes().get(after_ws) != Some(&b'=') {
            return Err(TomlError::new("expected '=' after key", after_ws));
        }
        let after_eq = scanner::skip_ws(source, after_ws + 1);
        let (value, after_value) = extract_value(source, after_eq)?;
        insert_dotted(&mut table, &segments, value, after_key)?;
        pos = scanner::skip_ws(source, after_value);
        match source.as_bytes().get(pos) {
            Some(b',') => {
                pos = scanner::skip_ws(source, pos + 1);
                if source.as_bytes().get(pos) == Some(&b'}') {
                    return Err(TomlError::new("trailing comma is not allowed in an inline table", pos));
                }
            }
            Some(b'}') => {
                table.frozen = true;
                return Ok((BuildValue::Table(table), pos + 1));
            }
            _ => return Err(TomlError::new("expected ',' or '}' in inline table", pos)),
        }
    }
}

/// Walks `segments` inside `table`, creating intermediate implicit tables as needed, and inserts
/// `value` at the leaf. Used both by inline tables (all segments fresh) and by the assembler for
/// top-level `a.b.c = 1` lines.
pub(crate) fn insert_dotted(
    table: &mut BuildTable,
    segments: &[String],
    value: BuildValue,
    error_pos: usize,
) -> Result<(), TomlError> {
    if table.frozen {
        return Err(TomlError::new("cannot extend an inline table", error_pos));
    }
    let (leaf, ancestors) = segments.split_last().expect("dotted key has at least one segment");
    let mut current = table;
    for segment in ancestors {
        if !current.index.contains_key(segment) {
            let ancestor = BuildTable { via_dotted_key: true, ..BuildTable::default() };
            current.insert_new(segment.clone(), BuildValue::Table(ancestor));
        } else if !matches!(current.get_mut(segment), Some(BuildValue::Table(_))) {
            return Err(TomlError::new(
                format!("key '{}' is already defined as a non-table value", segment),
                error_pos,
            ));
        }
        current = match current.get_mut(segment).unwrap() {
            BuildValue::Table(t) => t,
            _ => unreachable!("checked above"),
        };
        if current.frozen {
            return Err(TomlError::new("cannot extend an inline table", error_pos));
        }
    }
    if current.index.contains_key(leaf) {
        return Err(TomlError::new(format!("duplicate key '{}'", leaf), error_pos));
    }
    current.insert_new(leaf.clone(), value);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_bare_and_quoted_keys() {
        assert_eq!(parse_key_segment("abc_def-1 ", 0).unwrap().0, "abc_def-1");
        assert_eq!(parse_key_segment(r#""a b" "#, 0).unwrap().0, "a b");
        assert_eq!(parse_key_segment("'a.b' ", 0).unwrap().0, "a.b");
    }

    #[test]
    fn parses_dotted_key_with_surrounding_spaces() {
        let (segs, end) = parse_dotted_key("a . b.c=", 0).unwrap();
        assert_eq!(segs, vec!["a", "b", "c"]);
        assert_eq!(&"a . b.c="[end..], "=");
    }

    #[test]
    fn extracts_scalars_and_containers() {
        assert!(matches!(extract_value("true", 0).unwrap().0, BuildValue::Scalar(Value::Boolean(true))));
        assert!(matches!(extract_value("42", 0).unwrap().0, BuildValue::Scalar(Value::Integer(42))));
        assert!(matches!(extract_value("[1, 2, 3]", 0).unwrap().0, BuildValue::Array(ref v) if v.len() == 3));
    }

    #[test]
    fn extracts_unsigned_inf_and_nan() {
        assert!(matches!(
            extract_value("inf", 0).unwrap().0,
            BuildValue::Scalar(Value::Float(f)) if f == f64::INFINITY
        ));
        assert!(matches!(
            extract_value("nan", 0).unwrap().0,
            BuildValue::Scalar(Value::Float(f)) if f.is_nan()
        ));
    }

    #[test]
    fn inline_table_freezes_on_close() {
        let (v, _) = extract_value("{ a = 1 }", 0).unwrap();
        match v {
            BuildValue::Table(t) => assert!(t.frozen),
            _ => panic!("expected table"),
        }
    }

    #[test]
    fn inline_table_rejects_newline_before_close() {
        assert!(extract_value("{ a = 1\n}", 0).is_err());
    }

    #[test]
    fn inline_table_rejects_trailing_comma() {
        assert!(extract_value("{ a = 1, }", 0).is_err());
    }

    #[test]
    fn inline_table_allows_empty() {
        let (v, end) = extract_value("{}", 0).unwrap();
        assert_eq!(end, 2);
        match v {
            BuildValue::Table(t) => assert_eq!(t.entries.len(), 0),
            _ => panic!("expected table"),
        }
    }

    #[test]
    fn array_allows_newlines_and_trailing_comma() {
        let (v, _) = extract_value("[\n  1,\n  2,\n]", 0).unwrap();
        match v {
            BuildValue::Array(items) => assert_eq!(items.len(), 2),
            _ => panic!("expected array"),
        }
    }
}
