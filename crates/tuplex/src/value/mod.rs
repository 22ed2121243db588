//! Value representation for attribute cells

mod attribute;
mod handlers;
mod native;

pub use attribute::Attribute;
pub use handlers::{RenderFn, TypeHandler, TypeHandlers};
pub(crate) use handlers::{escape_into, raw_text};
pub use native::{Hint, Name, NamePath, NativeType, Pattern};

use std::path::PathBuf;

use crate::tuple::TupleId;
use crate::types::TypeTuple;

/// Storage for one attribute value.
///
/// `Value` is the storage kind only; the logical type lives in the owning
/// [`Attribute`]'s descriptor. Several logical types share one variant:
/// `index` and `bits` are both [`Value::Unsigned`], `name` and `syntax` are
/// both [`Value::Name`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    // ═══════════════════════════════════════════════════════════════════
    // Scalars
    // ═══════════════════════════════════════════════════════════════════
    /// No value
    #[default]
    Void,

    /// Boolean: `true` or `false`
    Bool(bool),

    /// A single byte
    Byte(u8),

    /// Unicode scalar value
    Char(char),

    /// 32-bit signed integer (default integer type)
    Int(i32),

    /// 64-bit signed integer
    Long(i64),

    /// 64-bit unsigned integer (`index` or `bits`)
    Unsigned(u64),

    /// 64-bit floating point
    Float(f64),

    // ═══════════════════════════════════════════════════════════════════
    // Heap values
    // ═══════════════════════════════════════════════════════════════════
    /// Identifier (`name` or `syntax`)
    Name(Name),

    /// Byte string
    Bytes(Vec<u8>),

    /// Text string
    Text(String),

    /// Regular expression source
    Regex(Pattern),

    /// Dotted name path
    NamePath(NamePath),

    /// File-system path
    Path(PathBuf),

    /// A type descriptor as a value
    Type(TypeTuple),

    // ═══════════════════════════════════════════════════════════════════
    // Nested tuples (owned by the runtime arena)
    // ═══════════════════════════════════════════════════════════════════
    /// Reference into the [`Runtime`](crate::Runtime) tuple arena
    Tuple(TupleId),
}

impl Value {
    /// Name of the storage variant (for error messages).
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::Char(_) => "char",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Unsigned(_) => "unsigned",
            Value::Float(_) => "float",
            Value::Name(_) => "name",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::Regex(_) => "regex",
            Value::NamePath(_) => "namepath",
            Value::Path(_) => "path",
            Value::Type(_) => "type",
            Value::Tuple(_) => "tuple",
        }
    }

    /// Check if value is void
    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    /// Extract the tuple id of a nested tuple
    pub fn as_tuple(&self) -> Option<TupleId> {
        match self {
            Value::Tuple(id) => Some(*id),
            _ => None,
        }
    }
}
