//! Attribute collections: ordered, optionally named cells with permissions
//!
//! A [`Tuple`] never lives on its own: it is stored in the
//! [`Runtime`](crate::Runtime) arena and addressed by a [`TupleId`]. The
//! parent link is an id too, so a scope chain can never point at freed
//! memory; a stale id simply fails to resolve.
//!
//! Operations that only touch one tuple live here. Operations that follow
//! links (adding a sub-tuple, scope-chain lookups, rendering, releasing
//! nested tuples) live on the runtime.

mod display;

pub(crate) use display::{render_tuple, scalar_text};

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::action::{Action, Signature};
use crate::error::{Result, TuplexError};
use crate::types::{names, TypeTuple};
use crate::value::{Attribute, NativeType};

/// Generational handle into the runtime's tuple arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TupleId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for TupleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tuple#{}.{}", self.index, self.generation)
    }
}

bitflags! {
    /// What may be done to a tuple after construction.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct Permissions: u8 {
        /// Append attributes
        const ADD = 1 << 0;
        /// Remove attributes
        const REMOVE = 1 << 1;
        /// Mutate attribute values in place
        const MODIFY = 1 << 2;
        /// Register named types in the local type registry
        const REGISTER_TYPES = 1 << 3;
        /// Register actions in the local action table
        const REGISTER_ACTIONS = 1 << 4;
    }
}

/// The kind of a tuple, which fixes its type tag and text prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TupleKind {
    /// Fixed-shape record; its type is synthesized from its attributes
    Plain,
    /// Growable collection of anything
    Dynamic,
    /// Growable collection restricted to plain data values
    Data,
    /// Caller-defined kind with caller-supplied permissions
    Custom(String),
}

impl TupleKind {
    /// Leaf type name for non-plain kinds.
    pub fn tag(&self) -> &str {
        match self {
            TupleKind::Plain => "plain",
            TupleKind::Dynamic => names::DYNAMIC,
            TupleKind::Data => names::DATA,
            TupleKind::Custom(tag) => tag,
        }
    }

    /// Text prefix in front of the opening parenthesis.
    pub fn prefix(&self) -> &str {
        match self {
            TupleKind::Plain => "P",
            TupleKind::Dynamic => "D",
            TupleKind::Data => "E",
            TupleKind::Custom(tag) => tag,
        }
    }

    /// Kind for a text prefix.
    pub fn from_prefix(prefix: &str) -> Option<TupleKind> {
        match prefix {
            "P" => Some(TupleKind::Plain),
            "D" => Some(TupleKind::Dynamic),
            "E" => Some(TupleKind::Data),
            _ => None,
        }
    }

    /// Fixed permissions of the built-in kinds; `None` for custom kinds.
    pub fn fixed_permissions(&self) -> Option<Permissions> {
        match self {
            TupleKind::Plain => Some(Permissions::MODIFY),
            TupleKind::Dynamic | TupleKind::Data => {
                Some(Permissions::ADD | Permissions::REMOVE | Permissions::MODIFY)
            }
            TupleKind::Custom(_) => None,
        }
    }
}

/// Leaf types a data tuple accepts, besides nested data tuples.
const DATA_TYPES: &[&str] = &[
    names::BOOL,
    names::BYTE,
    names::CHAR,
    names::INT,
    names::LONG,
    names::INDEX,
    names::BITS,
    names::FLOAT,
    names::NAME,
    names::BYTES,
    names::TEXT,
    names::REGEX,
    names::NAME_PATH,
    names::PATH,
];

/// Check whether a data tuple may hold a value of type `ty`.
pub fn is_data_type(ty: &TypeTuple) -> bool {
    match ty.leaf_name() {
        Some(name) => name == names::DATA || DATA_TYPES.contains(&name),
        None => false,
    }
}

/// Position or name of an attribute.
///
/// Negative positions count from the end: `-1` is the last attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'a> {
    /// By position
    Index(isize),
    /// By name
    Name(&'a str),
}

impl<'a> From<&'a str> for Key<'a> {
    fn from(name: &'a str) -> Self {
        Key::Name(name)
    }
}

impl From<isize> for Key<'_> {
    fn from(index: isize) -> Self {
        Key::Index(index)
    }
}

impl From<usize> for Key<'_> {
    fn from(index: usize) -> Self {
        Key::Index(index as isize)
    }
}

impl fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "#{}", i),
            Key::Name(name) => write!(f, "`{}`", name),
        }
    }
}

/// One attribute slot.
#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) name: Option<String>,
    pub(crate) attr: Attribute,
}

/// An ordered collection of attributes with a permission mask and a parent
/// scope.
#[derive(Debug)]
pub struct Tuple {
    kind: TupleKind,
    permissions: Permissions,
    parent: Option<TupleId>,
    entries: Vec<Entry>,
    index: FxHashMap<String, usize>,
    types: IndexMap<String, TypeTuple>,
    actions: IndexMap<TypeTuple, Rc<Action>>,
    by_name: FxHashMap<String, Vec<TypeTuple>>,
}

impl Tuple {
    pub(crate) fn new(kind: TupleKind, permissions: Permissions, parent: Option<TupleId>) -> Self {
        Self {
            kind,
            permissions,
            parent,
            entries: Vec::new(),
            index: FxHashMap::default(),
            types: IndexMap::new(),
            actions: IndexMap::new(),
            by_name: FxHashMap::default(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Identity
    // ═══════════════════════════════════════════════════════════════════

    /// The tuple's kind
    pub fn kind(&self) -> &TupleKind {
        &self.kind
    }

    /// The tuple's permission mask
    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    /// Check a permission bit
    pub fn allows(&self, permission: Permissions) -> bool {
        self.permissions.contains(permission)
    }

    /// Enclosing scope
    pub fn parent(&self) -> Option<TupleId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<TupleId>) {
        self.parent = parent;
    }

    /// The tuple's type.
    ///
    /// A plain tuple's type is the tree of its attributes' types; every
    /// other kind is identified by its tag alone.
    pub fn type_tuple(&self) -> TypeTuple {
        match self.kind {
            TupleKind::Plain => TypeTuple::Tree(
                self.entries
                    .iter()
                    .map(|e| crate::types::TypeField {
                        name: e.name.clone(),
                        ty: e.attr.ty().clone(),
                    })
                    .collect(),
            ),
            _ => TypeTuple::name(self.kind.tag()),
        }
    }

    fn denied(&self, operation: &str) -> TuplexError {
        TuplexError::access_denied(operation, self.kind.tag())
    }

    fn require(&self, permission: Permissions, operation: &str) -> Result<()> {
        if self.allows(permission) {
            Ok(())
        } else {
            Err(self.denied(operation))
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Attributes
    // ═══════════════════════════════════════════════════════════════════

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the tuple has no attributes
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a key to a position.
    pub fn position<'k>(&self, key: impl Into<Key<'k>>) -> Result<usize> {
        match key.into() {
            Key::Name(name) => self
                .index
                .get(name)
                .copied()
                .ok_or_else(|| TuplexError::not_found(format!("attribute `{}`", name))),
            Key::Index(i) => {
                let len = self.entries.len() as isize;
                let pos = if i < 0 { len + i } else { i };
                if (0..len).contains(&pos) {
                    Ok(pos as usize)
                } else {
                    Err(TuplexError::not_found(format!(
                        "attribute #{} (tuple has {})",
                        i, len
                    )))
                }
            }
        }
    }

    /// Check if a named attribute exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Name of the attribute at `position`, if it has one
    pub fn name_at(&self, position: usize) -> Option<&str> {
        self.entries.get(position).and_then(|e| e.name.as_deref())
    }

    /// Borrow an attribute.
    pub fn attribute<'k>(&self, key: impl Into<Key<'k>>) -> Result<&Attribute> {
        let pos = self.position(key)?;
        Ok(&self.entries[pos].attr)
    }

    /// Mutably borrow an attribute; needs the modify permission.
    pub fn attribute_mut<'k>(&mut self, key: impl Into<Key<'k>>) -> Result<&mut Attribute> {
        let pos = self.position(key)?;
        self.require(Permissions::MODIFY, "modify")?;
        Ok(&mut self.entries[pos].attr)
    }

    /// Read an attribute as a native value.
    pub fn at<'k, T: NativeType>(&self, key: impl Into<Key<'k>>) -> Result<T> {
        self.attribute(key)?.value::<T>()
    }

    /// Overwrite an attribute with a native value of the same logical type.
    pub fn set<'k, T: NativeType>(&mut self, key: impl Into<Key<'k>>, value: T) -> Result<()> {
        self.attribute_mut(key)?.set(value)
    }

    /// Iterate over `(name, attribute)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &Attribute)> {
        self.entries.iter().map(|e| (e.name.as_deref(), &e.attr))
    }

    /// Append an attribute, checking permission, data whitelist and name.
    pub(crate) fn insert(&mut self, name: Option<String>, attr: Attribute) -> Result<usize> {
        self.require(Permissions::ADD, "add")?;
        self.insert_initial(name, attr)
    }

    /// Append during construction: the add permission is not consulted.
    pub(crate) fn insert_initial(&mut self, name: Option<String>, attr: Attribute) -> Result<usize> {
        if let Some(name) = &name {
            if self.index.contains_key(name) {
                return Err(TuplexError::DuplicateName(name.clone()));
            }
        }
        if self.kind == TupleKind::Data && !is_data_type(attr.ty()) {
            return Err(self.denied(&format!("store a value of type {}", attr.ty())));
        }
        let pos = self.entries.len();
        if let Some(name) = &name {
            self.index.insert(name.clone(), pos);
        }
        self.entries.push(Entry { name, attr });
        Ok(pos)
    }

    /// Detach an attribute and renumber the name index.
    pub(crate) fn take<'k>(&mut self, key: impl Into<Key<'k>>) -> Result<Attribute> {
        let pos = self.position(key)?;
        self.require(Permissions::REMOVE, "remove")?;
        let entry = self.entries.remove(pos);
        if let Some(name) = &entry.name {
            self.index.remove(name);
        }
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Ok(entry.attr)
    }

    /// Remove every attribute, type and action; returns the detached cells.
    pub(crate) fn drain(&mut self) -> Vec<Attribute> {
        self.index.clear();
        self.types.clear();
        self.actions.clear();
        self.by_name.clear();
        self.entries.drain(..).map(|e| e.attr).collect()
    }

    pub(crate) fn entry_mut(&mut self, position: usize) -> Option<&mut Attribute> {
        self.entries.get_mut(position).map(|e| &mut e.attr)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Local registries
    // ═══════════════════════════════════════════════════════════════════

    /// Type registered in this tuple (not its parents).
    pub fn local_type(&self, name: &str) -> Option<&TypeTuple> {
        self.types.get(name)
    }

    /// Names of locally registered types, in registration order.
    pub fn local_types(&self) -> impl Iterator<Item = (&str, &TypeTuple)> {
        self.types.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    pub(crate) fn insert_type(&mut self, name: &str, ty: TypeTuple) -> Result<()> {
        self.require(Permissions::REGISTER_TYPES, "register types")?;
        if self.types.contains_key(name) {
            return Err(TuplexError::DuplicateName(name.to_string()));
        }
        self.types.insert(name.to_string(), ty);
        Ok(())
    }

    pub(crate) fn remove_type(&mut self, name: &str) -> Option<TypeTuple> {
        self.types.shift_remove(name)
    }

    pub(crate) fn insert_action(&mut self, action: Action) -> Result<Rc<Action>> {
        self.require(Permissions::REGISTER_ACTIONS, "register actions")?;
        let key = action.signature().as_type().clone();
        if self.actions.contains_key(&key) {
            return Err(TuplexError::DuplicateName(action.signature().to_string()));
        }
        let name = action.signature().name().to_string();
        let action = Rc::new(action);
        self.actions.insert(key.clone(), Rc::clone(&action));
        self.by_name.entry(name).or_default().push(key);
        Ok(action)
    }

    /// Look up an action by its exact signature.
    pub fn action(&self, signature: &Signature) -> Option<&Rc<Action>> {
        self.actions.get(signature.as_type())
    }

    /// Number of locally registered actions
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Local actions named `name`, in registration order.
    pub fn local_actions<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Rc<Action>> + 'a {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|key| self.actions.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamic() -> Tuple {
        let perms = TupleKind::Dynamic.fixed_permissions().unwrap_or(Permissions::empty());
        Tuple::new(TupleKind::Dynamic, perms, None)
    }

    #[test]
    fn test_fixed_permissions() {
        assert_eq!(TupleKind::Plain.fixed_permissions(), Some(Permissions::MODIFY));
        assert!(TupleKind::Data
            .fixed_permissions()
            .unwrap()
            .contains(Permissions::ADD | Permissions::REMOVE));
        assert_eq!(TupleKind::Custom("x".into()).fixed_permissions(), None);
    }

    #[test]
    fn test_negative_positions() {
        let mut t = dynamic();
        t.insert(None, Attribute::of(1i32)).unwrap();
        t.insert(Some("b".into()), Attribute::of(2i32)).unwrap();
        assert_eq!(t.at::<i32>(Key::Index(-1)).unwrap(), 2);
        assert_eq!(t.at::<i32>(Key::Index(-2)).unwrap(), 1);
        assert!(t.position(Key::Index(-3)).is_err());
        assert!(t.position(Key::Index(2)).is_err());
    }

    #[test]
    fn test_remove_renumbers_index() {
        let mut t = dynamic();
        t.insert(Some("a".into()), Attribute::of(1i32)).unwrap();
        t.insert(Some("b".into()), Attribute::of(2i32)).unwrap();
        t.insert(Some("c".into()), Attribute::of(3i32)).unwrap();
        t.take("a").unwrap();
        assert_eq!(t.position("c").unwrap(), 1);
        assert_eq!(t.at::<i32>("b").unwrap(), 2);
        assert!(!t.contains("a"));
    }

    #[test]
    fn test_modify_requires_permission() {
        let mut t = Tuple::new(TupleKind::Custom("frozen".into()), Permissions::empty(), None);
        t.insert_initial(Some("x".into()), Attribute::of(1i32)).unwrap();
        assert!(matches!(
            t.set("x", 2i32),
            Err(TuplexError::AccessDenied { .. })
        ));
        assert_eq!(t.at::<i32>("x").unwrap(), 1);
    }

    #[test]
    fn test_data_whitelist() {
        let mut t = Tuple::new(TupleKind::Data, Permissions::all(), None);
        assert!(t.insert(None, Attribute::of(1.5f64)).is_ok());
        assert!(matches!(
            t.insert(None, Attribute::of(TypeTuple::name("int"))),
            Err(TuplexError::AccessDenied { .. })
        ));
    }

    #[test]
    fn test_plain_type_is_synthesized() {
        let mut t = Tuple::new(TupleKind::Plain, Permissions::MODIFY, None);
        t.insert_initial(Some("x".into()), Attribute::of(1i32)).unwrap();
        t.insert_initial(None, Attribute::of(String::from("s"))).unwrap();
        assert_eq!(t.type_tuple().to_string(), "T(x=int, text)");
        assert_eq!(dynamic().type_tuple(), TypeTuple::name("dynamic"));
    }
}
