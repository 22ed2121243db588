//! Per-type handler table: how each logical type renders as text
//!
//! Duplication and destruction are ordinary `Clone`/`Drop` on [`Value`];
//! the table only keeps what differs per logical type, the literal text
//! form (a fixed prefix/suffix pair around a rendered body). The table is
//! owned by the [`Runtime`](crate::Runtime), never global.

use std::fmt;
use std::fmt::Write as _;

use rustc_hash::FxHashMap;

use super::Value;
use crate::error::{Result, TuplexError};
use crate::types::{names, TypeTuple};

/// Render the body of a value (without prefix and suffix).
pub type RenderFn = fn(&Value, &mut String);

/// Text form of one logical type.
#[derive(Clone, Copy)]
pub struct TypeHandler {
    /// Emitted before the body
    pub prefix: &'static str,
    /// Emitted after the body
    pub suffix: &'static str,
    /// Body renderer
    pub render: RenderFn,
}

impl fmt::Debug for TypeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandler({}…{})", self.prefix, self.suffix)
    }
}

impl TypeHandler {
    /// Create a handler
    pub const fn new(prefix: &'static str, suffix: &'static str, render: RenderFn) -> Self {
        Self {
            prefix,
            suffix,
            render,
        }
    }

    /// Render `value` with prefix and suffix.
    pub fn format(&self, value: &Value) -> String {
        let mut out = String::from(self.prefix);
        (self.render)(value, &mut out);
        out.push_str(self.suffix);
        out
    }
}

/// Handler table keyed by leaf type name.
#[derive(Debug, Clone, Default)]
pub struct TypeHandlers {
    table: FxHashMap<String, TypeHandler>,
}

impl TypeHandlers {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with every builtin type registered.
    pub fn builtin() -> Self {
        let mut handlers = Self::new();
        for (name, handler) in BUILTIN_HANDLERS {
            handlers.table.insert(name.to_string(), *handler);
        }
        handlers
    }

    /// Register a handler for a new leaf type.
    pub fn register(&mut self, name: impl Into<String>, handler: TypeHandler) -> Result<()> {
        let name = name.into();
        if self.table.contains_key(&name) {
            return Err(TuplexError::DuplicateName(name));
        }
        self.table.insert(name, handler);
        Ok(())
    }

    /// Look up a handler.
    pub fn get(&self, name: &str) -> Option<&TypeHandler> {
        self.table.get(name)
    }

    /// Check if a leaf type has a handler.
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Render a scalar value of leaf type `ty`; `None` for unregistered types
    /// and sub-tree types (tuples render structurally).
    pub fn format(&self, ty: &TypeTuple, value: &Value) -> Option<String> {
        let handler = self.get(ty.leaf_name()?)?;
        Some(handler.format(value))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Builtin handlers
// ═══════════════════════════════════════════════════════════════════════

const BUILTIN_HANDLERS: &[(&str, TypeHandler)] = &[
    (names::VOID, TypeHandler::new("", "", render_void)),
    (names::BOOL, TypeHandler::new("", "", render_plain)),
    (names::BYTE, TypeHandler::new("b'", "'", render_hex)),
    (names::CHAR, TypeHandler::new("'", "'", render_char)),
    (names::INT, TypeHandler::new("", "", render_plain)),
    (names::LONG, TypeHandler::new("", "L", render_plain)),
    (names::INDEX, TypeHandler::new("", "u", render_plain)),
    (names::BITS, TypeHandler::new("0x", "", render_hex)),
    (names::FLOAT, TypeHandler::new("", "", render_float)),
    (names::NAME, TypeHandler::new("", "", render_plain)),
    (names::SYNTAX, TypeHandler::new("$", "", render_plain)),
    (names::BYTES, TypeHandler::new("B'", "'", render_hex)),
    (names::TEXT, TypeHandler::new("\"", "\"", render_escaped)),
    (names::REGEX, TypeHandler::new("R\"", "\"", render_escaped)),
    (names::NAME_PATH, TypeHandler::new("@", "", render_plain)),
    (names::PATH, TypeHandler::new("F\"", "\"", render_escaped)),
    (names::TYPE, TypeHandler::new("", "", render_plain)),
];

/// Text of a value whose type has no handler.
pub(crate) fn raw_text(value: &Value) -> String {
    let mut out = String::new();
    render_plain(value, &mut out);
    out
}

fn render_void(_: &Value, out: &mut String) {
    out.push_str("void");
}

fn render_plain(value: &Value, out: &mut String) {
    let _ = match value {
        Value::Void => write!(out, "void"),
        Value::Bool(b) => write!(out, "{}", b),
        Value::Byte(b) => write!(out, "{}", b),
        Value::Char(c) => write!(out, "{}", c),
        Value::Int(n) => write!(out, "{}", n),
        Value::Long(n) => write!(out, "{}", n),
        Value::Unsigned(n) => write!(out, "{}", n),
        Value::Float(n) => write!(out, "{:?}", n),
        Value::Name(n) => write!(out, "{}", n),
        Value::Bytes(b) => write!(out, "{:?}", b),
        Value::Text(s) => write!(out, "{}", s),
        Value::Regex(p) => write!(out, "{}", p.as_str()),
        Value::NamePath(p) => write!(out, "{}", p),
        Value::Path(p) => write!(out, "{}", p.display()),
        Value::Type(t) => write!(out, "{}", t),
        Value::Tuple(id) => write!(out, "{}", id),
    };
}

fn render_hex(value: &Value, out: &mut String) {
    match value {
        Value::Byte(b) => {
            let _ = write!(out, "{:02x}", b);
        }
        Value::Unsigned(n) => {
            let _ = write!(out, "{:x}", n);
        }
        Value::Bytes(bytes) => {
            for b in bytes {
                let _ = write!(out, "{:02x}", b);
            }
        }
        other => render_plain(other, out),
    }
}

fn render_float(value: &Value, out: &mut String) {
    match value {
        // `{:?}` keeps a fractional part (`3.0`), so the text reads back as a float
        Value::Float(n) => {
            let _ = write!(out, "{:?}", n);
        }
        other => render_plain(other, out),
    }
}

fn render_char(value: &Value, out: &mut String) {
    match value {
        Value::Char(c) => escape_into(&c.to_string(), '\'', out),
        other => render_plain(other, out),
    }
}

fn render_escaped(value: &Value, out: &mut String) {
    match value {
        Value::Text(s) => escape_into(s, '"', out),
        Value::Regex(p) => escape_into(p.as_str(), '"', out),
        Value::Path(p) => escape_into(&p.to_string_lossy(), '"', out),
        other => render_plain(other, out),
    }
}

/// Escape `text` for a literal delimited by `quote`.
pub(crate) fn escape_into(text: &str, quote: char, out: &mut String) {
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
}
