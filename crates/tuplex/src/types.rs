//! Structural type descriptors
//!
//! A [`TypeTuple`] is either a leaf name (`int`, `text`, `dynamic`) or an
//! ordered tree of child descriptors, some of which carry a name. Type
//! identity is purely structural: two descriptors are the same type iff they
//! compare equal.

use std::fmt;

use crate::error::{Result, TuplexError};
use crate::render::{render_to_string, TextBuilder};

/// Leaf names of the builtin types.
pub mod names {
    /// No value
    pub const VOID: &str = "void";
    /// Wildcard, compatible with every type (signatures only)
    pub const ANY: &str = "any";
    /// Boolean
    pub const BOOL: &str = "bool";
    /// Single byte
    pub const BYTE: &str = "byte";
    /// Unicode scalar
    pub const CHAR: &str = "char";
    /// 32-bit signed integer
    pub const INT: &str = "int";
    /// 64-bit signed integer
    pub const LONG: &str = "long";
    /// 64-bit unsigned integer used as a count or position
    pub const INDEX: &str = "index";
    /// 64-bit unsigned integer used as a bit set
    pub const BITS: &str = "bits";
    /// 64-bit float
    pub const FLOAT: &str = "float";
    /// Identifier
    pub const NAME: &str = "name";
    /// Identifier standing for a piece of syntax
    pub const SYNTAX: &str = "syntax";
    /// Byte string
    pub const BYTES: &str = "bytes";
    /// Text string
    pub const TEXT: &str = "text";
    /// Regular expression source
    pub const REGEX: &str = "regex";
    /// Dotted name path
    pub const NAME_PATH: &str = "namepath";
    /// File-system path
    pub const PATH: &str = "path";
    /// Type descriptor value
    pub const TYPE: &str = "type";
    /// Tag of dynamic tuples
    pub const DYNAMIC: &str = "dynamic";
    /// Tag of data tuples
    pub const DATA: &str = "data";
}

/// One child of a sub-tree descriptor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeField {
    /// Optional name, unique within its level
    pub name: Option<String>,
    /// The child's type
    pub ty: TypeTuple,
}

/// Structural type identity.
///
/// Ordering is total: leaves sort before trees, leaves by name, trees
/// lexicographically over `(name, type)` of their children.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeTuple {
    /// A plain type name
    Name(String),
    /// An ordered list of (optionally named) child descriptors
    Tree(Vec<TypeField>),
}

impl Default for TypeTuple {
    fn default() -> Self {
        TypeTuple::void()
    }
}

impl TypeTuple {
    /// Create a leaf descriptor.
    pub fn name(name: impl Into<String>) -> Self {
        TypeTuple::Name(name.into())
    }

    /// Create an empty sub-tree.
    pub fn tree() -> Self {
        TypeTuple::Tree(Vec::new())
    }

    /// The `void` leaf.
    pub fn void() -> Self {
        TypeTuple::name(names::VOID)
    }

    /// The `any` wildcard leaf.
    pub fn any() -> Self {
        TypeTuple::name(names::ANY)
    }

    /// Build an unnamed sub-tree from a list of children.
    pub fn of(children: impl IntoIterator<Item = TypeTuple>) -> Self {
        TypeTuple::Tree(
            children
                .into_iter()
                .map(|ty| TypeField { name: None, ty })
                .collect(),
        )
    }

    /// Append an unnamed child (builder pattern).
    pub fn with(mut self, ty: TypeTuple) -> Self {
        self.push(ty);
        self
    }

    /// Append a named child (builder pattern).
    pub fn with_named(mut self, name: impl Into<String>, ty: TypeTuple) -> Result<Self> {
        self.push_named(name, ty)?;
        Ok(self)
    }

    /// Append an unnamed child.
    ///
    /// Appending to a leaf turns it into a sub-tree whose first child is the
    /// former leaf.
    pub fn push(&mut self, ty: TypeTuple) {
        self.fields_mut().push(TypeField { name: None, ty });
    }

    /// Append a named child; the name must be unique at this level.
    pub fn push_named(&mut self, name: impl Into<String>, ty: TypeTuple) -> Result<()> {
        let name = name.into();
        if self.fields().iter().any(|f| f.name.as_deref() == Some(name.as_str())) {
            return Err(TuplexError::DuplicateName(name));
        }
        self.fields_mut().push(TypeField {
            name: Some(name),
            ty,
        });
        Ok(())
    }

    fn fields_mut(&mut self) -> &mut Vec<TypeField> {
        if let TypeTuple::Name(name) = self {
            let leaf = TypeTuple::Name(std::mem::take(name));
            *self = TypeTuple::Tree(vec![TypeField {
                name: None,
                ty: leaf,
            }]);
        }
        match self {
            TypeTuple::Tree(fields) => fields,
            TypeTuple::Name(_) => unreachable!("leaf converted above"),
        }
    }

    /// Children of a sub-tree (empty for a leaf).
    pub fn fields(&self) -> &[TypeField] {
        match self {
            TypeTuple::Tree(fields) => fields,
            TypeTuple::Name(_) => &[],
        }
    }

    /// Number of children (zero for a leaf).
    pub fn len(&self) -> usize {
        self.fields().len()
    }

    /// Check if this is a leaf or an empty sub-tree.
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Check if this is a leaf descriptor.
    pub fn is_leaf(&self) -> bool {
        matches!(self, TypeTuple::Name(_))
    }

    /// The leaf name, if this is a leaf.
    pub fn leaf_name(&self) -> Option<&str> {
        match self {
            TypeTuple::Name(name) => Some(name),
            TypeTuple::Tree(_) => None,
        }
    }

    /// Check if this is the leaf `name`.
    pub fn is(&self, name: &str) -> bool {
        self.leaf_name() == Some(name)
    }

    /// Check if this is the `any` wildcard.
    pub fn is_any(&self) -> bool {
        self.is(names::ANY)
    }

    /// Check if this is `void`.
    pub fn is_void(&self) -> bool {
        self.is(names::VOID)
    }

    /// Child at `index`.
    pub fn at(&self, index: usize) -> Option<&TypeTuple> {
        self.fields().get(index).map(|f| &f.ty)
    }

    /// Named child lookup.
    pub fn get(&self, name: &str) -> Result<&TypeTuple> {
        self.fields()
            .iter()
            .find(|f| f.name.as_deref() == Some(name))
            .map(|f| &f.ty)
            .ok_or_else(|| TuplexError::not_found(format!("type member `{}` in {}", name, self)))
    }

    /// One-way structural match.
    ///
    /// `self` is compatible with `other` when every named child of `self`
    /// exists in `other` with a compatible type, and every unnamed child of
    /// `self` has a compatible counterpart at the same position in `other`.
    /// `other` may have extra children. The `any` leaf is compatible with
    /// everything.
    pub fn compatible_with(&self, other: &TypeTuple) -> bool {
        match (self, other) {
            (TypeTuple::Name(name), _) if name == names::ANY => true,
            (TypeTuple::Name(a), TypeTuple::Name(b)) => a == b,
            (TypeTuple::Tree(fields), TypeTuple::Tree(others)) => {
                fields.iter().enumerate().all(|(i, field)| match &field.name {
                    Some(name) => others.iter().any(|o| {
                        o.name.as_deref() == Some(name.as_str()) && field.ty.compatible_with(&o.ty)
                    }),
                    None => others
                        .get(i)
                        .is_some_and(|o| field.ty.compatible_with(&o.ty)),
                })
            }
            _ => false,
        }
    }

    /// Render as a type literal: `T(...)`.
    pub fn render(&self, out: &mut dyn TextBuilder) {
        out.word("T");
        match self {
            TypeTuple::Name(name) => {
                out.punct("(");
                out.word(name);
                out.punct(")");
            }
            TypeTuple::Tree(fields) => render_fields(fields, out),
        }
    }

    /// Render without the `T` prefix (leaves bare, sub-trees parenthesized).
    pub fn render_inner(&self, out: &mut dyn TextBuilder) {
        match self {
            TypeTuple::Name(name) => out.word(name),
            TypeTuple::Tree(fields) => render_fields(fields, out),
        }
    }
}

fn render_fields(fields: &[TypeField], out: &mut dyn TextBuilder) {
    out.punct("(");
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.punct(",");
        }
        if let Some(name) = &field.name {
            out.word(name);
            out.punct("=");
        }
        field.ty.render_inner(out);
    }
    // A lone unnamed child needs a trailing comma, otherwise it reads
    // back as a parenthesized child.
    if fields.len() == 1 && fields[0].name.is_none() {
        out.punct(",");
    }
    out.punct(")");
}

impl fmt::Display for TypeTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_to_string(|out| self.render(out)))
    }
}

impl From<&str> for TypeTuple {
    fn from(name: &str) -> Self {
        TypeTuple::name(name)
    }
}
