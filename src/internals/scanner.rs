//! Low-level cursor primitives shared by every layer above this one.
//!
//! Everything here is a plain `(source, pos) -> pos` function, not a `nom` combinator: the
//! document assembler needs exact byte offsets to slice table headers and key/value lines out of
//! the source, and threading that through `nom`'s `IResult` remainder type bought nothing over
//! just moving a `usize` around by hand. `nom` shows up one layer up, in `strings`/`numbers`/
//! `datetime`, where alternation and repetition actually pay for the combinator machinery.

use crate::types::TomlError;

/// A whitespace byte per the TOML grammar: space or tab. Nothing else counts, notably not
/// carriage return or newline.
pub(crate) fn is_ws(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Advances `pos` past a run of `is_ws` bytes.
pub(crate) fn skip_ws(source: &str, pos: usize) -> usize {
    let bytes = source.as_bytes();
    let mut pos = pos;
    while pos < bytes.len() && is_ws(bytes[pos]) {
        pos += 1;
    }
    pos
}

/// Recognizes `\n` or `\r\n` starting at `pos`, returning the position just past it. A bare `\r`
/// not followed by `\n` is not a newline and is left for the caller to reject.
pub(crate) fn newline(source: &str, pos: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    if pos < bytes.len() && bytes[pos] == b'\n' {
        Some(pos + 1)
    } else if pos + 1 < bytes.len() && bytes[pos] == b'\r' && bytes[pos + 1] == b'\n' {
        Some(pos + 2)
    } else {
        None
    }
}

/// Recognizes a `#`-comment starting at `pos` and running to (but not including) the next newline
/// or end of input. Control characters other than tab are not permitted inside a comment.
pub(crate) fn comment(source: &str, pos: usize) -> Result<usize, TomlError> {
    debug_assert_eq!(source.as_bytes().get(pos), Some(&b'#'));
    let mut iter = source[pos..].char_indices();
    iter.next(); // the '#' itself
    for (offset, ch) in iter {
        if ch == '\n' {
            return Ok(pos + offset);
        }
        if ch == '\r' && source[pos + offset..].starts_with("\r\n") {
            return Ok(pos + offset);
        }
        if is_forbidden_control_char(ch) {
            return Err(TomlError::new(
                format!("control character U+{:04X} is not allowed in a comment", ch as u32),
                pos + offset,
            ));
        }
    }
    Ok(source.len())
}

/// True for the control characters TOML forbids in comments and basic strings: C0 controls other
/// than tab, and DEL. Newline is handled separately by callers since it terminates rather than
/// merely offends.
pub(crate) fn is_forbidden_control_char(ch: char) -> bool {
    matches!(ch, '\u{0}'..='\u{8}' | '\u{A}'..='\u{1F}' | '\u{7F}')
}

/// Skips whitespace, comments, and — when `allow_newlines` is true — blank lines, stopping at the
/// first byte that is none of those (or at end of input).
///
/// This is the "void" the grammar refers to between expressions: the material that can appear
/// between a table header and the next key, or between a key/value pair and the trailing comment.
/// When `allow_newlines` is false (mid key/value line) a newline ends the skip rather than being
/// consumed, since a bare value line is not allowed to continue past one.
pub(crate) fn skip_void(source: &str, pos: usize, allow_newlines: bool) -> Result<usize, TomlError> {
    let mut pos = pos;
    loop {
        let next = skip_ws(source, pos);
        let next = match source.as_bytes().get(next) {
            Some(b'#') => comment(source, next)?,
            _ => next,
        };
        if allow_newlines {
            if let Some(after_nl) = newline(source, next) {
                pos = after_nl;
                continue;
            }
        }
        return Ok(next);
    }
}

/// Requires that `pos` is immediately followed by a newline or end of input, skipping leading
/// whitespace and an optional trailing comment first. Used after a key/value pair and after a
/// table header, where the TOML grammar allows nothing else on the rest of the line.
pub(crate) fn expect_newline_or_eof(source: &str, pos: usize) -> Result<usize, TomlError> {
    let pos = skip_ws(source, pos);
    let pos = match source.as_bytes().get(pos) {
        Some(b'#') => comment(source, pos)?,
        _ => pos,
    };
    if pos >= source.len() {
        return Ok(pos);
    }
    match newline(source, pos) {
        Some(after) => Ok(after),
        None => Err(TomlError::new(
            "expected a newline or end of input after this expression",
            pos,
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn skip_ws_stops_at_non_whitespace() {
        assert_eq!(skip_ws("  \tx", 0), 3);
        assert_eq!(skip_ws("x", 0), 0);
    }

    #[test]
    fn newline_recognizes_lf_and_crlf() {
        assert_eq!(newline("\nrest", 0), Some(1));
        assert_eq!(newline("\r\nrest", 0), Some(2));
        assert_eq!(newline("\rrest", 0), None);
    }

    #[test]
    fn comment_runs_to_newline() {
        let src = "# hello world\nnext";
        assert_eq!(comment(src, 0).unwrap(), 13);
    }

    #[test]
    fn comment_runs_to_eof() {
        let src = "# hello";
        assert_eq!(comment(src, 0).unwrap(), src.len());
    }

    #[test]
    fn comment_rejects_control_characters() {
        let src = "# bad\u{1}char";
        assert!(comment(src, 0).is_err());
    }

    #[test]
    fn skip_void_crosses_blank_lines_and_comments_when_allowed() {
        let src = "  \n  # comment\n\nkey";
        let pos = skip_void(src, 0, true).unwrap();
        assert_eq!(&src[pos..], "key");
    }

    #[test]
    fn skip_void_stops_at_newline_when_not_allowed() {
        let src = "   # trailing\nnext";
        let pos = skip_void(src, 0, false).unwrap();
        assert_eq!(&src[pos..], "\nnext");
    }

    #[test]
    fn expect_newline_or_eof_accepts_trailing_comment() {
        let src = "  # done\nnext";
        let pos = expect_newline_or_eof(src, 0).unwrap();
        assert_eq!(&src[pos..], "next");
    }

    #[test]
    fn expect_newline_or_eof_rejects_trailing_garbage() {
        let src = "  garbage";
        assert!(expect_newline_or_eof(src, 0).is_err());
    }
}
