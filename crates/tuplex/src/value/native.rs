//! Mapping between Rust types and logical value types

use std::fmt;
use std::path::PathBuf;

use super::Value;
use crate::types::{names, TypeTuple};

/// Disambiguates native types that map to more than one logical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hint {
    /// Use the native type's default mapping
    #[default]
    None,
    /// `u64` as a count or position
    Index,
    /// `u64` as a fixed-width bit set
    Bits,
    /// [`Name`] as a piece of syntax
    Syntax,
}

/// A Rust type that can live inside an attribute cell.
pub trait NativeType: Clone + 'static {
    /// Logical type name of the default mapping.
    const TYPE_NAME: &'static str;

    /// Logical type name under `hint`, or `None` when the hint does not
    /// apply to this native type.
    fn hinted(hint: Hint) -> Option<&'static str> {
        match hint {
            Hint::None => Some(Self::TYPE_NAME),
            _ => None,
        }
    }

    /// Whether a cell of logical type `type_name` may be read as `Self`.
    fn accepts(type_name: &str) -> bool {
        type_name == Self::TYPE_NAME
    }

    /// Wrap into storage.
    fn into_value(self) -> Value;

    /// Borrow out of storage.
    fn from_value(value: &Value) -> Option<&Self>;

    /// Mutably borrow out of storage.
    fn from_value_mut(value: &mut Value) -> Option<&mut Self>;
}

macro_rules! native_type {
    ($ty:ty, $variant:ident, $name:expr) => {
        impl NativeType for $ty {
            const TYPE_NAME: &'static str = $name;

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: &Value) -> Option<&Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn from_value_mut(value: &mut Value) -> Option<&mut Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

native_type!(bool, Bool, names::BOOL);
native_type!(u8, Byte, names::BYTE);
native_type!(char, Char, names::CHAR);
native_type!(i32, Int, names::INT);
native_type!(i64, Long, names::LONG);
native_type!(f64, Float, names::FLOAT);
native_type!(Vec<u8>, Bytes, names::BYTES);
native_type!(String, Text, names::TEXT);
native_type!(Pattern, Regex, names::REGEX);
native_type!(NamePath, NamePath, names::NAME_PATH);
native_type!(PathBuf, Path, names::PATH);
native_type!(TypeTuple, Type, names::TYPE);

impl NativeType for u64 {
    const TYPE_NAME: &'static str = names::INDEX;

    fn hinted(hint: Hint) -> Option<&'static str> {
        match hint {
            Hint::None | Hint::Index => Some(names::INDEX),
            Hint::Bits => Some(names::BITS),
            Hint::Syntax => None,
        }
    }

    fn accepts(type_name: &str) -> bool {
        type_name == names::INDEX || type_name == names::BITS
    }

    fn into_value(self) -> Value {
        Value::Unsigned(self)
    }

    fn from_value(value: &Value) -> Option<&Self> {
        match value {
            Value::Unsigned(v) => Some(v),
            _ => None,
        }
    }

    fn from_value_mut(value: &mut Value) -> Option<&mut Self> {
        match value {
            Value::Unsigned(v) => Some(v),
            _ => None,
        }
    }
}

impl NativeType for Name {
    const TYPE_NAME: &'static str = names::NAME;

    fn hinted(hint: Hint) -> Option<&'static str> {
        match hint {
            Hint::None => Some(names::NAME),
            Hint::Syntax => Some(names::SYNTAX),
            Hint::Index | Hint::Bits => None,
        }
    }

    // A syntax cell is only readable as its underlying name.
    fn accepts(type_name: &str) -> bool {
        type_name == names::NAME || type_name == names::SYNTAX
    }

    fn into_value(self) -> Value {
        Value::Name(self)
    }

    fn from_value(value: &Value) -> Option<&Self> {
        match value {
            Value::Name(v) => Some(v),
            _ => None,
        }
    }

    fn from_value_mut(value: &mut Value) -> Option<&mut Self> {
        match value {
            Value::Name(v) => Some(v),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Newtypes for values that are strings underneath
// ═══════════════════════════════════════════════════════════════════════

/// An identifier value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Name(pub String);

impl Name {
    /// Create a name
    pub fn new(name: impl Into<String>) -> Self {
        Name(name.into())
    }

    /// The identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name(s.to_string())
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Source text of a regular expression.
///
/// Matching is left to an external regex engine; the core only stores and
/// renders the pattern.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pattern(pub String);

impl Pattern {
    /// Create a pattern from its source
    pub fn new(source: impl Into<String>) -> Self {
        Pattern(source.into())
    }

    /// The pattern source
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A dotted path of names: `@a.b.c`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NamePath(pub Vec<String>);

impl NamePath {
    /// Split `a.b.c` into its segments
    pub fn parse(path: &str) -> Self {
        NamePath(path.split('.').map(str::to_string).collect())
    }

    /// The path segments
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for NamePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}
