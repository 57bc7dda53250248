//! The document assembler: the imperative state machine that walks a TOML source top to bottom,
//! dispatching each line to either a table header (`[a.b]`, `[[a.b]]`) or a key/value pair, and
//! maintaining the "current table" pointer the grammar implies but never spells out explicitly.
//!
//! This is the one layer that is not built from `nom`: the control flow here is a handful of
//! mutually exclusive cases driven by a single leading byte, and the state being threaded through
//! (the current table, the seen-table bookkeeping) is exactly the kind of thing a combinator
//! parser is awkward at and a loop is not.

use crate::internals::scanner;
use crate::internals::value::{self, BuildTable, BuildValue};
use crate::types::{Table, TomlError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSeg {
    Key(String),
    Index(usize),
}

enum Cursor<'a> {
    Val(&'a mut BuildValue),
    Tbl(&'a mut BuildTable),
}

impl<'a> Cursor<'a> {
    fn into_table(self, seg_name: &str, error_pos: usize) -> Result<&'a mut BuildTable, TomlError> {
        match self {
            Cursor::Tbl(t) => Ok(t),
            Cursor::Val(BuildValue::Table(t)) => Ok(t),
            Cursor::Val(_) => Err(TomlError::new(
                format!("'{}' does not refer to a table", seg_name),
                error_pos,
            )),
        }
    }
}

/// Parses an entire document, returning the assembled root table.
pub(crate) fn parse(source: &str) -> Result<Table, TomlError> {
    let mut root = BuildTable { explicit: true, ..BuildTable::default() };
    let mut current: Vec<PathSeg> = Vec::new();
    let mut pos = 0usize;

    loop {
        pos = scanner::skip_void(source, pos, true)?;
        if pos >= source.len() {
            break;
        }
        let bytes = source.as_bytes();
        if bytes[pos] == b'[' {
            if bytes.get(pos + 1) == Some(&b'[') {
                let (path, next) = parse_array_table_header(source, pos, &mut root)?;
                current = path;
                pos = next;
            } else {
                let (path, next) = parse_standard_table_header(source, pos, &mut root)?;
                current = path;
                pos = next;
            }
        } else {
            pos = parse_keyval_line(source, pos, &mut root, &current)?;
        }
    }

    Ok(root.into_value())
}

fn step<'a>(cursor: Cursor<'a>, seg: &PathSeg, create_missing: bool, error_pos: usize) -> Result<Cursor<'a>, TomlError> {
    match seg {
        PathSeg::Key(key) => {
            let table = cursor.into_table(key, error_pos)?;
            if table.frozen {
                return Err(TomlError::new("cannot extend an inline table", error_pos));
            }
            if !table.index.contains_key(key) {
                if !create_missing {
                    return Err(TomlError::new(format!("table '{}' does not exist", key), error_pos));
                }
                table.insert_new(key.clone(), BuildValue::Table(BuildTable::default()));
            }
            Ok(Cursor::Val(table.get_mut(key).unwrap()))
        }
        PathSeg::Index(i) => match cursor {
            Cursor::Val(BuildValue::TableArray(tables)) => Ok(Cursor::Tbl(&mut tables[*i])),
            _ => Err(TomlError::new("internal error: index into non-array-of-tables", error_pos)),
        },
    }
}

fn navigate<'a>(root: &'a mut BuildTable, path: &[PathSeg], error_pos: usize) -> Result<&'a mut BuildTable, TomlError> {
    let mut cursor = Cursor::Tbl(root);
    for seg in path {
        cursor = step(cursor, seg, false, error_pos)?;
    }
    cursor.into_table("<current>", error_pos)
}

/// Walks `ancestors` from `root`, creating implicit tables as needed and following the last
/// element when a segment names an existing array-of-tables. Returns the path to the final
/// ancestor table.
fn walk_ancestors(root: &mut BuildTable, ancestors: &[String], error_pos: usize) -> Result<Vec<PathSeg>, TomlError> {
    let mut path = Vec::new();
    let mut cursor = Cursor::Tbl(root);
    for seg in ancestors {
        let key_seg = PathSeg::Key(seg.clone());
        cursor = step(cursor, &key_seg, true, error_pos)?;
        path.push(key_seg);
        if let Cursor::Val(BuildValue::TableArray(tables)) = &cursor {
            if tables.is_empty() {
                return Err(TomlError::new(format!("'{}' is an empty array of tables", seg), error_pos));
            }
            let idx = tables.len() - 1;
            path.push(PathSeg::Index(idx));
            cursor = match cursor {
                Cursor::Val(BuildValue::TableArray(tables)) => Cursor::Tbl(&mut tables[idx]),
                _ => unreachable!(),
            };
        }
    }
    Ok(path)
}

fn parse_standard_table_header(
    source: &str,
    pos: usize,
    root: &mut BuildTable,
) -> Result<(Vec<PathSeg>, usize), TomlError> {
    let key_start = pos + 1;
    let (segments, after_key) = value::parse_dotted_key(source, key_start)?;
    let after_ws = scanner::skip_ws(source, after_key);
    if source.as_bytes().get(after_ws) != Some(&b']') {
        return Err(TomlError::new("expected ']' to close table header", after_ws));
    }
    let after_line = scanner::expect_newline_or_eof(source, after_ws + 1)?;

    let (leaf, ancestors) = segments.split_last().expect("table header names at least one key");
    let ancestor_path = walk_ancestors(root, ancestors, pos)?;
    let parent = navigate(root, &ancestor_path, pos)?;
    if parent.frozen {
        return Err(TomlError::new("cannot extend an inline table", pos));
    }

    match parent.get_mut(leaf) {
        None => {
            parent.insert_new(leaf.clone(), BuildValue::Table(BuildTable { explicit: true, ..BuildTable::default() }));
        }
        Some(BuildValue::Table(t)) => {
            if t.explicit || t.via_dotted_key {
                return Err(TomlError::new(format!("table '{}' is already defined", leaf), pos));
            }
            t.explicit = true;
        }
        Some(_) => {
            return Err(TomlError::new(format!("'{}' is already defined as a non-table value", leaf), pos));
        }
    }

    let mut full_path = ancestor_path;
    full_path.push(PathSeg::Key(leaf.clone()));
    Ok((full_path, after_line))
}

fn parse_array_table_header(
    source: &str,
    pos: usize,
    root: &mut BuildTable,
) -> Result<(Vec<PathSeg>, usize), TomlError> {
    let key_start = pos + 2;
    let (segments, after_key) = value::parse_dotted_key(source, key_start)?;
    let after_ws = scanner::skip_ws(source, after_key);
    if source.as_bytes().get(after_ws..after_ws + 2) != Some(b"]]") {
        return Err(TomlError::new("expected ']]' to close array-of-tables header", after_ws));
    }
    let after_line = scanner::expect_newline_or_eof(source, after_ws + 2)?;

    let (leaf, ancestors) = segments.split_last().expect("array table header names at least one key");
    let ancestor_path = walk_ancestors(root, ancestors, pos)?;
    let parent = navigate(root, &ancestor_path, pos)?;
    if parent.frozen {
        return Err(TomlError::new("cannot extend an inline table", pos));
    }

    if !parent.index.contains_key(leaf) {
        parent.insert_new(leaf.clone(), BuildValue::TableArray(Vec::new()));
    }
    let idx = match parent.get_mut(leaf).unwrap() {
        BuildValue::TableArray(tables) => {
            tables.push(BuildTable { explicit: true, ..BuildTable::default() });
            tables.len() - 1
        }
        _ => {
            return Err(TomlError::new(
                format!("'{}' is already defined and is not an array of tables", leaf),
                pos,
            ))
        }
    };

    let mut full_path = ancestor_path;
    full_path.push(PathSeg::Key(leaf.clone()));
    full_path.push(PathSeg::Index(idx));
    Ok((full_path, after_line))
}

fn parse_keyval_line(
    source: &str,
    pos: usize,
    root: &mut BuildTable,
    current_path: &[PathSeg],
) -> Result<usize, TomlError> {
    let (segments, after_key) = value::parse_dotted_key(source, pos)?;
    let after_ws = scanner::skip_ws(source, after_key);
    if source.as_bytes().get(after_ws) != Some(&b'=') {
        return Err(TomlError::new("expected '=' after key", after_ws));
    }
    let after_eq = scanner::skip_ws(source, after_ws + 1);
    let (built, after_value) = value::extract_value(source, after_eq)?;
    let after_line = scanner::expect_newline_or_eof(source, after_value)?;

    let table = navigate(root, current_path, pos)?;
    value::insert_dotted(table, &segments, built, pos)?;
    Ok(after_line)
}

#[cfg(test)]
mod test {
    use super::*;

    fn doc(src: &str) -> Table {
        parse(src).unwrap()
    }

    #[test]
    fn parses_flat_key_values() {
        let t = doc("a = 1\nb = \"two\"\n");
        assert_eq!(t.get("a").and_then(|v| v.as_integer()), Some(1));
        assert_eq!(t.get("b").and_then(|v| v.as_str()), Some("two"));
    }

    #[test]
    fn dotted_keys_build_nested_tables() {
        let t = doc("a.b.c = 1\n");
        let a = t.get("a").and_then(|v| v.as_table()).unwrap();
        let b = a.get("b").and_then(|v| v.as_table()).unwrap();
        assert_eq!(b.get("c").and_then(|v| v.as_integer()), Some(1));
    }

    #[test]
    fn standard_table_headers_nest() {
        let t = doc("[a]\nx = 1\n[a.b]\ny = 2\n");
        let a = t.get("a").and_then(|v| v.as_table()).unwrap();
        assert_eq!(a.get("x").and_then(|v| v.as_integer()), Some(1));
        let b = a.get("b").and_then(|v| v.as_table()).unwrap();
        assert_eq!(b.get("y").and_then(|v| v.as_integer()), Some(2));
    }

    #[test]
    fn duplicate_table_header_is_an_error() {
        assert!(parse("[a]\n[a]\n").is_err());
    }

    #[test]
    fn header_cannot_redeclare_a_table_created_via_dotted_key() {
        assert!(parse("a.b.c = 1\n[a.b]\nd = 2\n").is_err());
        assert!(parse("fruit.apple.color = \"red\"\n[fruit.apple]\n").is_err());
    }

    #[test]
    fn header_can_add_a_subtable_under_a_dotted_key_table() {
        let t = doc("fruit.apple.color = \"red\"\n[fruit.apple.seed]\ncolor = \"brown\"\n");
        let fruit = t.get("fruit").and_then(|v| v.as_table()).unwrap();
        let apple = fruit.get("apple").and_then(|v| v.as_table()).unwrap();
        assert_eq!(apple.get("color").and_then(|v| v.as_str()), Some("red"));
        let seed = apple.get("seed").and_then(|v| v.as_table()).unwrap();
        assert_eq!(seed.get("color").and_then(|v| v.as_str()), Some("brown"));
    }

    #[test]
    fn implicit_table_can_be_declared_explicit_once() {
        let t = doc("[a.b]\nx = 1\n[a]\ny = 2\n");
        let a = t.get("a").and_then(|v| v.as_table()).unwrap();
        assert_eq!(a.get("y").and_then(|v| v.as_integer()), Some(2));
    }

    #[test]
    fn array_of_tables_accumulates_elements() {
        let src = "[[fruits]]\nname = \"apple\"\n[[fruits]]\nname = \"banana\"\n";
        let t = doc(src);
        let fruits = t.get("fruits").and_then(|v| v.as_array()).unwrap();
        assert_eq!(fruits.len(), 2);
        assert_eq!(
            fruits[0].as_table().and_then(|t| t.get("name")).and_then(|v| v.as_str()),
            Some("apple")
        );
        assert_eq!(
            fruits[1].as_table().and_then(|t| t.get("name")).and_then(|v| v.as_str()),
            Some("banana")
        );
    }

    #[test]
    fn array_of_tables_supports_nested_subtable_headers() {
        let src = "[[fruits]]\nname = \"apple\"\n[fruits.physical]\ncolor = \"red\"\n";
        let t = doc(src);
        let fruits = t.get("fruits").and_then(|v| v.as_array()).unwrap();
        let physical = fruits[0].as_table().and_then(|t| t.get("physical")).and_then(|v| v.as_table()).unwrap();
        assert_eq!(physical.get("color").and_then(|v| v.as_str()), Some("red"));
    }

    #[test]
    fn redefining_key_on_same_line_twice_is_an_error() {
        assert!(parse("a = 1 = 2\n").is_err());
    }

    #[test]
    fn duplicate_key_in_same_table_is_an_error() {
        assert!(parse("a = 1\na = 2\n").is_err());
    }

    #[test]
    fn cannot_extend_inline_table_with_dotted_key() {
        assert!(parse("a = { x = 1 }\na.y = 2\n").is_err());
    }

    #[test]
    fn trailing_garbage_after_value_is_an_error() {
        assert!(parse("a = 1 garbage\n").is_err());
    }
}
