//! Recognizers for the four TOML string forms: basic, literal, multi-line basic, and multi-line
//! literal. Each returns the unescaped `String` content plus the byte offset just past the
//! closing delimiter.
//!
//! The escape and quote-run handling below is hand-rolled rather than built from `nom`
//! combinators: every branch needs its own error message tied to an exact byte offset, which reads
//! more clearly as direct `match`es over the remaining input than as a combinator chain. `nom`
//! earns its keep one layer up, in [`crate::internals::numbers`] and
//! [`crate::internals::datetime`], where the grammars are flatter and alternation-heavy.

use crate::internals::scanner::is_forbidden_control_char;
use crate::types::TomlError;

/// Parses whichever of the four string forms begins at `pos`, returning its unescaped content and
/// the offset just past the closing delimiter.
pub(crate) fn parse_string(source: &str, pos: usize) -> Result<(String, usize), TomlError> {
    let rest = &source[pos..];
    if rest.starts_with("\"\"\"") {
        ml_basic_string(rest).map(|(tail, s)| (s, source.len() - tail.len()))
    } else if rest.starts_with('"') {
        basic_string(rest).map(|(tail, s)| (s, source.len() - tail.len()))
    } else if rest.starts_with("'''") {
        ml_literal_string(rest).map(|(tail, s)| (s, source.len() - tail.len()))
    } else if rest.starts_with('\'') {
        literal_string(rest).map(|(tail, s)| (s, source.len() - tail.len()))
    } else {
        Err(TomlError::new("expected a string", pos))
    }
    .map_err(|e| reposition(e, pos, rest))
}

fn reposition(err: StrError, base: usize, original_rest: &str) -> TomlError {
    match err {
        StrError::Message(msg, remaining_len) => {
            TomlError::new(msg, base + (original_rest.len() - remaining_len))
        }
    }
}

/// A parse failure paired with how much of the input was left unconsumed when it happened, which
/// is enough for [`reposition`] to recover an absolute byte offset.
enum StrError {
    Message(String, usize),
}

// --- basic string ---------------------------------------------------------

fn basic_string(input: &str) -> Result<(&str, String), StrError> {
    let mut rest = input.strip_prefix('"').ok_or_else(|| bad(input, "expected '\"'"))?;
    let mut out = String::new();
    loop {
        if let Some(tail) = rest.strip_prefix('"') {
            return Ok((tail, out));
        }
        if rest.is_empty() {
            return Err(bad(rest, "unterminated basic string"));
        }
        if let Some(tail) = rest.strip_prefix('\\') {
            let (tail, ch) = basic_escape(tail)?;
            if let Some(ch) = ch {
                out.push(ch);
            }
            rest = tail;
            continue;
        }
        let mut chars = rest.char_indices();
        let (_, ch) = chars.next().unwrap();
        if ch == '\n' {
            return Err(bad(rest, "basic strings cannot contain a literal newline"));
        }
        if ch == '\r' {
            return Err(bad(rest, "basic strings cannot contain a literal carriage return"));
        }
        if is_forbidden_control_char(ch) {
            return Err(bad(rest, "control characters are not allowed in basic strings"));
        }
        let next = chars.next().map(|(i, _)| i).unwrap_or(rest.len());
        out.push(ch);
        rest = &rest[next..];
    }
}

/// Handles one escape sequence, with the leading backslash already consumed. Returns the
/// remaining input and the character it decodes to, or `None` for a line-ending escape which
/// contributes no character itself (handled by the multi-line caller).
fn basic_escape(input: &str) -> Result<(&str, Option<char>), StrError> {
    let mut chars = input.chars();
    let c = chars.next().ok_or_else(|| bad(input, "unterminated escape sequence"))?;
    let rest = chars.as_str();
    match c {
        'b' => Ok((rest, Some('\u{8}'))),
        't' => Ok((rest, Some('\t'))),
        'n' => Ok((rest, Some('\n'))),
        'f' => Ok((rest, Some('\u{C}'))),
        'r' => Ok((rest, Some('\r'))),
        '"' => Ok((rest, Some('"'))),
        '\\' => Ok((rest, Some('\\'))),
        'u' => unicode_escape(rest, 4).map(|(tail, ch)| (tail, Some(ch))),
        'U' => unicode_escape(rest, 8).map(|(tail, ch)| (tail, Some(ch))),
        _ => Err(bad(input, "unknown escape sequence")),
    }
}

fn unicode_escape(input: &str, digits: usize) -> Result<(&str, char), StrError> {
    if input.len() < digits || !input.is_char_boundary(digits) {
        return Err(bad(input, "truncated unicode escape"));
    }
    let (hex, rest) = input.split_at(digits);
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(bad(input, "invalid hex digit in unicode escape"));
    }
    let code = u32::from_str_radix(hex, 16).map_err(|_| bad(input, "invalid unicode escape"))?;
    let ch = char::from_u32(code)
        .ok_or_else(|| bad(input, "escape does not encode a valid unicode scalar value"))?;
    Ok((rest, ch))
}

fn bad(at: &str, msg: &str) -> StrError {
    StrError::Message(msg.to_string(), at.len())
}

// --- literal string --------------------------------------------------------

fn literal_string(input: &str) -> Result<(&str, String), StrError> {
    let mut rest = input.strip_prefix('\'').ok_or_else(|| bad(input, "expected \"'\""))?;
    let mut out = String::new();
    loop {
        if let Some(tail) = rest.strip_prefix('\'') {
            return Ok((tail, out));
        }
        if rest.is_empty() {
            return Err(bad(rest, "unterminated literal string"));
        }
        let mut chars = rest.char_indices();
        let (_, ch) = chars.next().unwrap();
        if ch == '\n' || ch == '\r' {
            return Err(bad(rest, "literal strings cannot contain a literal newline"));
        }
        if is_forbidden_control_char(ch) {
            return Err(bad(rest, "control characters are not allowed in literal strings"));
        }
        let next = chars.next().map(|(i, _)| i).unwrap_or(rest.len());
        out.push(ch);
        rest = &rest[next..];
    }
}

// --- multi-line basic string ------------------------------------------------

fn ml_basic_string(input: &str) -> Result<(&str, String), StrError> {
    let mut rest = input
        .strip_prefix("\"\"\"")
        .ok_or_else(|| bad(input, "expected '\"\"\"'"))?;
    // A newline immediately following the opening delimiter is trimmed.
    if let Some(tail) = rest.strip_prefix("\r\n") {
        rest = tail;
    } else if let Some(tail) = rest.strip_prefix('\n') {
        rest = tail;
    }
    let mut out = String::new();
    loop {
        if rest.starts_with("\"\"\"") {
            return close_ml_quotes(rest, out, '"');
        }
        if rest.is_empty() {
            return Err(bad(rest, "unterminated multi-line basic string"));
        }
        if let Some(tail) = rest.strip_prefix('\\') {
            if let Some(tail) = skip_line_ending_backslash(tail) {
                rest = tail;
                continue;
            }
            let (tail, ch) = basic_escape(tail)?;
            if let Some(ch) = ch {
                out.push(ch);
            }
            rest = tail;
            continue;
        }
        let mut chars = rest.char_indices();
        let (_, ch) = chars.next().unwrap();
        if ch == '\r' && !rest.starts_with("\r\n") {
            return Err(bad(rest, "bare carriage return is not allowed"));
        }
        if ch != '\n' && ch != '\r' && is_forbidden_control_char(ch) {
            return Err(bad(rest, "control characters are not allowed in strings"));
        }
        let next = chars.next().map(|(i, _)| i).unwrap_or(rest.len());
        out.push(ch);
        rest = &rest[next..];
    }
}

fn ml_literal_string(input: &str) -> Result<(&str, String), StrError> {
    let mut rest = input
        .strip_prefix("'''")
        .ok_or_else(|| bad(input, "expected \"'''\""))?;
    if let Some(tail) = rest.strip_prefix("\r\n") {
        rest = tail;
    } else if let Some(tail) = rest.strip_prefix('\n') {
        rest = tail;
    }
    let mut out = String::new();
    loop {
        if rest.starts_with("'''") {
            return close_ml_quotes(rest, out, '\'');
        }
        if rest.is_empty() {
            return Err(bad(rest, "unterminated multi-line literal string"));
        }
        let mut chars = rest.char_indices();
        let (_, ch) = chars.next().unwrap();
        if ch == '\r' && !rest.starts_with("\r\n") {
            return Err(bad(rest, "bare carriage return is not allowed"));
        }
        if ch != '\n' && ch != '\r' && is_forbidden_control_char(ch) {
            return Err(bad(rest, "control characters are not allowed in strings"));
        }
        let next = chars.next().map(|(i, _)| i).unwrap_or(rest.len());
        out.push(ch);
        rest = &rest[next..];
    }
}

/// A backslash at the end of a line, followed only by whitespace and newlines, consumes all of
/// that trailing whitespace. Returns `None` if this backslash is an ordinary escape instead.
fn skip_line_ending_backslash(input: &str) -> Option<&str> {
    let mut probe = input;
    loop {
        probe = probe.trim_start_matches(|c| c == ' ' || c == '\t');
        if let Some(tail) = probe.strip_prefix("\r\n") {
            probe = tail;
        } else if let Some(tail) = probe.strip_prefix('\n') {
            probe = tail;
        } else {
            break;
        }
    }
    if probe.as_ptr() == input.as_ptr() && probe.len() == input.len() {
        None
    } else {
        Some(probe)
    }
}

/// Handles the "greedy close" rule: the first run of three quote characters closes the string, but
/// up to two more quotes immediately after that are literal content appended before the close. A
/// fourth or further trailing quote is a genuine error (more than five quotes in a row).
fn close_ml_quotes(rest: &str, mut out: String, q: char) -> Result<(&str, String), StrError> {
    debug_assert!(rest.starts_with(q) && rest[q.len_utf8()..].starts_with(q));
    let triple = &rest[..3 * q.len_utf8()];
    debug_assert_eq!(triple.chars().filter(|&c| c == q).count(), 3);
    let after = &rest[3 * q.len_utf8()..];
    let mut extra = 0;
    for c in after.chars() {
        if c == q && extra < 2 {
            extra += 1;
        } else {
            break;
        }
    }
    if after.chars().nth(extra) == Some(q) {
        return Err(bad(rest, "too many consecutive quotes at end of string"));
    }
    for _ in 0..extra {
        out.push(q);
    }
    Ok((&after[extra * q.len_utf8()..], out))
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(s: &str) -> String {
        parse_string(s, 0).unwrap().0
    }

    #[test]
    fn basic_string_unescapes_standard_sequences() {
        assert_eq!(parse(r#""a\tb\nc""#), "a\tb\nc");
        assert_eq!(parse(r#""\u00E9""#), "\u{E9}");
        assert_eq!(parse(r#""\U0001F600""#), "\u{1F600}");
    }

    #[test]
    fn basic_string_rejects_literal_newline() {
        assert!(parse_string("\"a\nb\"", 0).is_err());
    }

    #[test]
    fn literal_string_keeps_backslashes_verbatim() {
        assert_eq!(parse(r"'C:\Users\nodejs'"), r"C:\Users\nodejs");
    }

    #[test]
    fn literal_string_allows_empty() {
        assert_eq!(parse("''"), "");
    }

    #[test]
    fn ml_basic_strips_leading_newline_and_honors_line_escape() {
        let s = "\"\"\"\nRoses are red \\\n\n  Violets are blue\"\"\"";
        assert_eq!(parse(s), "Roses are red Violets are blue");
    }

    #[test]
    fn ml_literal_trims_leading_newline_and_keeps_rest_raw() {
        let s = "'''\nfirst line\nsecond line'''";
        assert_eq!(parse(s), "first line\nsecond line");
    }

    #[test]
    fn ml_basic_allows_two_trailing_quotes_as_content() {
        let s = "\"\"\"ends with quote\"\"\"\"\"";
        assert_eq!(parse(s), "ends with quote\"\"");
    }

    #[test]
    fn ml_basic_rejects_too_many_trailing_quotes() {
        let s = "\"\"\"oops\"\"\"\"\"\"";
        assert!(parse_string(s, 0).is_err());
    }

    #[test]
    fn unknown_escape_is_an_error() {
        assert!(parse_string(r#""\q""#, 0).is_err());
    }
}
