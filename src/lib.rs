//! A strict TOML 1.0.0 parser.
//!
//! tomlcore parses a TOML document into an owned [`Document`] of [`Value`]s. It does not preserve
//! whitespace, comments, or original formatting — if you need a round-trippable, format-preserving
//! document model, this is not that crate. What it does do is reject anything the TOML 1.0.0
//! specification rejects: duplicate keys, redefined tables, extending an inline table after its
//! closing brace, malformed numbers and date-times, and so on.
//!
//! The entry point is [`parse`]:
//!
//! ```
//! use tomlcore::{parse, Value};
//!
//! let doc = parse(r#"
//! title = "TOML Example"
//!
//! [owner]
//! name = "Tom Preston-Werner"
//!
//! [[fruits]]
//! name = "apple"
//!
//! [[fruits]]
//! name = "banana"
//! "#).unwrap();
//!
//! assert_eq!(doc.get("title"), Some(&Value::String("TOML Example".to_string())));
//! let owner = doc.get("owner").and_then(Value::as_table).unwrap();
//! assert_eq!(owner.get("name").and_then(Value::as_str), Some("Tom Preston-Werner"));
//! let fruits = doc.get("fruits").and_then(Value::as_array).unwrap();
//! assert_eq!(fruits.len(), 2);
//! ```
//!
//! Parse errors carry a byte offset rather than a pre-computed line and column, since most callers
//! never need one unless the parse actually fails:
//!
//! ```
//! use tomlcore::parse;
//!
//! let src = "a = 1\nb = \n";
//! let err = parse(src).unwrap_err();
//! let (line, col) = err.line_col(src);
//! assert_eq!(line, 2);
//! ```

mod internals;
pub mod types;

pub use types::{Date, DateTime, Offset, Table, Time, TomlError, Value};

/// A parsed TOML document. Currently just an alias for [`Table`]: a document and a table have the
/// same shape, and keeping them as one type means [`Value::Table`] and the document root share
/// all their accessors.
pub type Document = Table;

/// Parses `input` as a complete TOML 1.0.0 document.
///
/// Returns the assembled [`Document`], or a [`TomlError`] describing the first problem
/// encountered and the byte offset it occurred at.
pub fn parse(input: &str) -> Result<Document, TomlError> {
    internals::assembler::parse(input)
}

/// Installs the `env_logger` handler once before any `#[test]` runs, so that `RUST_LOG=debug
/// cargo test -- --nocapture` shows the `warn!` calls `TomlError::new` makes on every constructed
/// error. Mirrors the teacher's `env_logger::init()` call in its `tomlkit` binary, hooked up here
/// with `ctor` instead since a library crate's tests have no single `main` to call it from.
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    let _ = env_logger::try_init();
}
