//! The runtime: tuple arena, global scope and type handlers
//!
//! Everything that would otherwise be process-global state lives here and is
//! passed explicitly: the per-type handler table, the root scope holding all
//! globally registered types and actions, and the configuration. A runtime
//! is single threaded; hosts that share one across threads must serialize
//! access themselves.
//!
//! # Example
//!
//! ```
//! use tuplex::{Attribute, Runtime, TupleKind};
//!
//! let mut rt = Runtime::new();
//! let scope = rt.create(TupleKind::Dynamic, Some(rt.global()));
//! rt.add(scope, Some("x"), Attribute::of(42i32)).unwrap();
//!
//! let inner = rt.create(TupleKind::Plain, Some(scope));
//! let (owner, _) = rt.lookup_variable(inner, "x").unwrap();
//! assert_eq!(owner, scope);
//! ```

mod scope;

use std::rc::Rc;

use tracing::debug;

use crate::action::{category, Action, Signature};
use crate::context::EvalContext;
use crate::error::{Result, TuplexError};
use crate::render::{render_to_string, TextBuilder};
use crate::tuple::{Key, Permissions, Tuple, TupleId, TupleKind};
use crate::types::TypeTuple;
use crate::value::{Attribute, NativeType, TypeHandlers, Value};

#[derive(Debug)]
struct Slot {
    generation: u32,
    tuple: Option<Tuple>,
}

/// Explicitly constructed context for everything type- and scope-related.
#[derive(Debug)]
pub struct Runtime {
    slots: Vec<Slot>,
    free: Vec<u32>,
    handlers: TypeHandlers,
    global: TupleId,
    ctx: EvalContext,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Create a runtime with the default configuration and all builtins.
    pub fn new() -> Self {
        Self::with_context(EvalContext::default())
    }

    /// Create a runtime with a custom configuration and all builtins.
    pub fn with_context(ctx: EvalContext) -> Self {
        let mut rt = Self::bare(ctx);
        crate::builtins::install(&mut rt);
        rt
    }

    /// Create a runtime with builtin type handlers but no actions.
    pub fn bare(ctx: EvalContext) -> Self {
        let mut rt = Self {
            slots: Vec::new(),
            free: Vec::new(),
            handlers: TypeHandlers::builtin(),
            global: TupleId {
                index: 0,
                generation: 0,
            },
            ctx,
        };
        rt.global = rt.create_with(TupleKind::Custom("global".into()), Permissions::all(), None);
        rt
    }

    /// The root scope
    pub fn global(&self) -> TupleId {
        self.global
    }

    /// The configuration
    pub fn context(&self) -> &EvalContext {
        &self.ctx
    }

    /// Mutable configuration
    pub fn context_mut(&mut self) -> &mut EvalContext {
        &mut self.ctx
    }

    /// The type handler table
    pub fn handlers(&self) -> &TypeHandlers {
        &self.handlers
    }

    /// Mutable type handler table (for registering new leaf types)
    pub fn handlers_mut(&mut self) -> &mut TypeHandlers {
        &mut self.handlers
    }

    // ═══════════════════════════════════════════════════════════════════
    // Arena
    // ═══════════════════════════════════════════════════════════════════

    /// Create an empty tuple of a built-in kind (custom kinds get no
    /// permissions; use [`create_with`](Self::create_with)).
    pub fn create(&mut self, kind: TupleKind, parent: Option<TupleId>) -> TupleId {
        let permissions = kind.fixed_permissions().unwrap_or(Permissions::empty());
        self.alloc(Tuple::new(kind, permissions, parent))
    }

    /// Create an empty tuple with explicit permissions.
    ///
    /// Built-in kinds keep their fixed permissions.
    pub fn create_with(
        &mut self,
        kind: TupleKind,
        permissions: Permissions,
        parent: Option<TupleId>,
    ) -> TupleId {
        let permissions = kind.fixed_permissions().unwrap_or(permissions);
        self.alloc(Tuple::new(kind, permissions, parent))
    }

    /// Create a tuple from an initializer list.
    ///
    /// The add permission is not consulted (this is how fixed-shape plain
    /// tuples get their attributes); names and the data whitelist are.
    /// On failure nothing is leaked: the new tuple and every entry are
    /// released.
    pub fn create_from(
        &mut self,
        kind: TupleKind,
        parent: Option<TupleId>,
        entries: impl IntoIterator<Item = (Option<String>, Attribute)>,
    ) -> Result<TupleId> {
        let id = self.create(kind, parent);
        let mut entries = entries.into_iter();
        while let Some((name, attr)) = entries.next() {
            let child = attr.tuple_id();
            let owned = attr.is_owned();
            let inserted = self
                .tuple_mut(id)
                .and_then(|t| t.insert_initial(name, attr));
            match inserted {
                Ok(_) => {
                    if let (true, Some(child)) = (owned, child) {
                        self.adopt(id, child);
                    }
                }
                Err(err) => {
                    // The refused cell was dropped inside the tuple.
                    if let (true, Some(child)) = (owned, child) {
                        self.destroy(child);
                    }
                    for (_, rest) in entries.by_ref() {
                        self.release(rest);
                    }
                    self.destroy(id);
                    return Err(err);
                }
            }
        }
        Ok(id)
    }

    fn alloc(&mut self, tuple: Tuple) -> TupleId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.tuple = Some(tuple);
                TupleId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    tuple: Some(tuple),
                });
                TupleId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    /// Check if `id` refers to a live tuple
    pub fn contains(&self, id: TupleId) -> bool {
        self.tuple(id).is_ok()
    }

    /// Number of live tuples (including the global scope)
    pub fn live_tuples(&self) -> usize {
        self.slots.iter().filter(|s| s.tuple.is_some()).count()
    }

    /// Borrow a tuple.
    pub fn tuple(&self, id: TupleId) -> Result<&Tuple> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.tuple.as_ref())
            .ok_or_else(|| TuplexError::not_found(id.to_string()))
    }

    /// Mutably borrow a tuple.
    pub fn tuple_mut(&mut self, id: TupleId) -> Result<&mut Tuple> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.tuple.as_mut())
            .ok_or_else(|| TuplexError::not_found(id.to_string()))
    }

    fn adopt(&mut self, parent: TupleId, child: TupleId) {
        if let Ok(child) = self.tuple_mut(child) {
            child.set_parent(Some(parent));
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Attributes
    // ═══════════════════════════════════════════════════════════════════

    /// Append an attribute.
    ///
    /// Fails with `AccessDenied` without the add permission or when a data
    /// tuple refuses the type, and with `DuplicateName` when the name is
    /// taken. An owned sub-tuple's parent becomes `id`.
    pub fn add(&mut self, id: TupleId, name: Option<&str>, attr: Attribute) -> Result<usize> {
        let child = attr.tuple_id().filter(|_| attr.is_owned());
        let pos = self
            .tuple_mut(id)?
            .insert(name.map(str::to_string), attr)?;
        if let Some(child) = child {
            self.adopt(id, child);
        }
        Ok(pos)
    }

    /// Append a void attribute.
    pub fn add_void(&mut self, id: TupleId, name: Option<&str>) -> Result<usize> {
        self.add(id, name, Attribute::void())
    }

    /// Append a value with an explicit type.
    pub fn add_value(
        &mut self,
        id: TupleId,
        name: Option<&str>,
        ty: TypeTuple,
        value: Value,
    ) -> Result<usize> {
        self.add(id, name, Attribute::new(ty, value))
    }

    /// Append a native value using its default type mapping.
    pub fn add_native<T: NativeType>(
        &mut self,
        id: TupleId,
        name: Option<&str>,
        value: T,
    ) -> Result<usize> {
        self.add(id, name, Attribute::of(value))
    }

    /// Append a new empty sub-tuple and return its id.
    pub fn add_tuple(&mut self, id: TupleId, name: Option<&str>, kind: TupleKind) -> Result<TupleId> {
        let child = self.create(kind, Some(id));
        let ty = self.type_of(child)?;
        match self.add(id, name, Attribute::tuple(ty, child)) {
            Ok(_) => Ok(child),
            Err(err) => {
                self.destroy(child);
                Err(err)
            }
        }
    }

    /// Remove an attribute by position or name; owned sub-tuples are freed.
    pub fn remove<'k>(&mut self, id: TupleId, key: impl Into<Key<'k>>) -> Result<()> {
        let attr = self.tuple_mut(id)?.take(key)?;
        self.release(attr);
        Ok(())
    }

    /// Remove every attribute and every local type and action.
    ///
    /// The parent scope is untouched.
    pub fn clear(&mut self, id: TupleId) -> Result<()> {
        let cells = self.tuple_mut(id)?.drain();
        for cell in cells {
            self.release(cell);
        }
        Ok(())
    }

    /// Clear a tuple and free its arena slot. Stale ids to it resolve to
    /// `NotFound` from now on.
    pub fn destroy(&mut self, id: TupleId) {
        if id == self.global || self.clear(id).is_err() {
            return;
        }
        let slot = &mut self.slots[id.index as usize];
        slot.tuple = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
    }

    /// Drop a cell, freeing the nested tuple it owns (if any).
    pub fn release(&mut self, attr: Attribute) {
        if attr.is_owned() {
            if let Some(id) = attr.tuple_id() {
                self.destroy(id);
            }
        }
    }

    /// Deep copy: nested tuples owned by `attr` are copied too.
    ///
    /// Copies keep the original's parent scope.
    pub fn duplicate(&mut self, attr: &Attribute) -> Result<Attribute> {
        let Some(id) = attr.tuple_id() else {
            return Ok(attr.duplicate());
        };
        let copy = self.duplicate_tuple(id)?;
        Ok(Attribute::tuple(attr.ty().clone(), copy))
    }

    fn duplicate_tuple(&mut self, id: TupleId) -> Result<TupleId> {
        let (kind, permissions, parent, cells) = {
            let tuple = self.tuple(id)?;
            let cells: Vec<(Option<String>, Attribute)> = tuple
                .iter()
                .map(|(name, attr)| (name.map(str::to_string), attr.reborrow()))
                .collect();
            (tuple.kind().clone(), tuple.permissions(), tuple.parent(), cells)
        };
        let copy = self.create_with(kind, permissions, parent);
        if let Err(err) = self.copy_cells(copy, cells) {
            self.destroy(copy);
            return Err(err);
        }
        Ok(copy)
    }

    fn copy_cells(&mut self, copy: TupleId, cells: Vec<(Option<String>, Attribute)>) -> Result<()> {
        for (name, cell) in cells {
            // References to tuples owned elsewhere stay references.
            let owned = cell.is_owned();
            let cell = if owned { self.duplicate(&cell)? } else { cell };
            let child = cell.tuple_id();
            if let Err(err) = self.tuple_mut(copy)?.insert_initial(name, cell) {
                if let (true, Some(child)) = (owned, child) {
                    self.destroy(child);
                }
                return Err(err);
            }
            if let (true, Some(child)) = (owned, child) {
                self.adopt(copy, child);
            }
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Types and actions
    // ═══════════════════════════════════════════════════════════════════

    /// Register a named type in `id`'s local registry.
    ///
    /// A sub-tree type also gets a constructor action named after it, taking
    /// the type's children as arguments and building a plain tuple.
    ///
    /// Nothing is registered when either step fails.
    pub fn register_type(&mut self, id: TupleId, name: &str, ty: TypeTuple) -> Result<()> {
        self.tuple_mut(id)?.insert_type(name, ty.clone())?;
        if ty.is_leaf() {
            return Ok(());
        }
        let ctor = crate::builtins::constructor_for(name, &ty);
        let root = self.root_of(id);
        if self.action(root, ctor.signature()).is_some() {
            return Ok(());
        }
        match self.tuple_mut(root).and_then(|t| t.insert_action(ctor)) {
            Ok(_) => {
                debug!(type_name = name, %ty, "registered type with constructor");
                Ok(())
            }
            Err(err) => {
                if let Ok(tuple) = self.tuple_mut(id) {
                    tuple.remove_type(name);
                }
                Err(err)
            }
        }
    }

    /// Register an action in `id`'s local action table.
    pub fn register_action(&mut self, id: TupleId, action: Action) -> Result<Rc<Action>> {
        self.tuple_mut(id)?.insert_action(action)
    }

    /// Install an action into the global scope, replacing nothing.
    pub(crate) fn define(&mut self, action: Action) {
        let global = self.global;
        if let Err(err) = self.register_action(global, action) {
            tracing::error!(%err, "builtin action registered twice");
        }
    }

    /// Actions named `name`, resolved at the root of `id`'s scope chain.
    pub fn signatures(&self, id: TupleId, name: &str) -> Vec<Rc<Action>> {
        let root = self.root_of(id);
        self.tuple(root)
            .map(|t| t.local_actions(name).cloned().collect())
            .unwrap_or_default()
    }

    /// Actions named `name` whose signature accepts `owner` and `args`.
    pub fn signatures_matching(
        &self,
        id: TupleId,
        name: &str,
        owner: &TypeTuple,
        args: &TypeTuple,
    ) -> Vec<Rc<Action>> {
        self.signatures(id, name)
            .into_iter()
            .filter(|a| a.signature().accepts(owner, args))
            .collect()
    }

    /// Constructor actions of type `name` accepting `args`.
    pub fn constructors(&self, id: TupleId, name: &str, args: &TypeTuple) -> Vec<Rc<Action>> {
        self.signatures_matching(id, name, &TypeTuple::void(), args)
            .into_iter()
            .filter(|a| a.signature().category() == category::CONSTRUCTOR)
            .collect()
    }

    /// Find an action by exact signature, resolved at the root scope.
    pub fn action(&self, id: TupleId, signature: &Signature) -> Option<Rc<Action>> {
        let root = self.root_of(id);
        self.tuple(root).ok()?.action(signature).cloned()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Rendering
    // ═══════════════════════════════════════════════════════════════════

    /// A tuple's type.
    pub fn type_of(&self, id: TupleId) -> Result<TypeTuple> {
        Ok(self.tuple(id)?.type_tuple())
    }

    /// Render a tuple as text primitives.
    pub fn render(&self, id: TupleId, out: &mut dyn TextBuilder) -> Result<()> {
        crate::tuple::render_tuple(self, id, None, out)
    }

    /// Render a tuple with the default layout.
    pub fn to_text(&self, id: TupleId) -> Result<String> {
        let mut result = Ok(());
        let text = render_to_string(|out| result = self.render(id, out));
        result.map(|_| text)
    }

    /// Literal text of any attribute (tuples render in full).
    pub fn attribute_text(&self, attr: &Attribute) -> Result<String> {
        match attr.tuple_id() {
            Some(id) => self.to_text(id),
            None => Ok(crate::tuple::scalar_text(self, attr)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_scope_exists() {
        let rt = Runtime::bare(EvalContext::default());
        let global = rt.tuple(rt.global()).unwrap();
        assert_eq!(global.kind(), &TupleKind::Custom("global".into()));
        assert!(global.allows(Permissions::REGISTER_ACTIONS));
        assert_eq!(rt.live_tuples(), 1);
    }

    #[test]
    fn test_stale_ids_are_not_found() {
        let mut rt = Runtime::bare(EvalContext::default());
        let id = rt.create(TupleKind::Dynamic, None);
        rt.destroy(id);
        assert!(matches!(rt.tuple(id), Err(TuplexError::NotFound(_))));
        let reused = rt.create(TupleKind::Dynamic, None);
        assert_eq!(reused.index, id.index);
        assert!(!rt.contains(id));
        assert!(rt.contains(reused));
    }

    #[test]
    fn test_global_is_never_destroyed() {
        let mut rt = Runtime::bare(EvalContext::default());
        let global = rt.global();
        rt.destroy(global);
        assert!(rt.contains(global));
    }

    #[test]
    fn test_remove_frees_owned_subtuple() {
        let mut rt = Runtime::bare(EvalContext::default());
        let outer = rt.create(TupleKind::Dynamic, None);
        let inner = rt.add_tuple(outer, Some("inner"), TupleKind::Dynamic).unwrap();
        assert_eq!(rt.tuple(inner).unwrap().parent(), Some(outer));
        rt.remove(outer, "inner").unwrap();
        assert!(!rt.contains(inner));
    }

    #[test]
    fn test_duplicate_keeps_references_in_place() {
        let mut rt = Runtime::bare(EvalContext::default());
        let home = rt.create(TupleKind::Dynamic, None);
        let shared = rt.create(TupleKind::Dynamic, Some(home));
        let mut cell = Attribute::tuple(TypeTuple::name("dynamic"), shared);
        let reference = cell.alias();
        rt.add(home, Some("shared"), cell).unwrap();

        let outer = rt.create(TupleKind::Dynamic, None);
        rt.add(outer, Some("ref"), reference).unwrap();
        assert_eq!(rt.tuple(shared).unwrap().parent(), Some(home));

        let before = rt.live_tuples();
        let outer_ty = rt.type_of(outer).unwrap();
        let copy = rt.duplicate(&Attribute::tuple(outer_ty, outer)).unwrap();
        assert_eq!(rt.live_tuples(), before + 1);
        assert_eq!(rt.tuple(shared).unwrap().parent(), Some(home));

        let copy_id = copy.tuple_id().unwrap();
        let copied_ref = rt.tuple(copy_id).unwrap().attribute("ref").unwrap();
        assert_eq!(copied_ref.tuple_id(), Some(shared));
        assert!(!copied_ref.is_owned());

        rt.release(copy);
        assert!(rt.contains(shared));
    }

    #[test]
    fn test_create_from_failure_leaks_nothing() {
        let mut rt = Runtime::bare(EvalContext::default());
        let before = rt.live_tuples();
        let nested = rt.create(TupleKind::Dynamic, None);
        let result = rt.create_from(
            TupleKind::Plain,
            None,
            vec![
                (Some("a".into()), Attribute::tuple(TypeTuple::name("dynamic"), nested)),
                (Some("a".into()), Attribute::of(1i32)),
            ],
        );
        assert!(matches!(result, Err(TuplexError::DuplicateName(_))));
        assert_eq!(rt.live_tuples(), before);
    }

    #[test]
    fn test_duplicate_is_deep() {
        let mut rt = Runtime::bare(EvalContext::default());
        let outer = rt.create(TupleKind::Dynamic, None);
        let inner = rt.add_tuple(outer, None, TupleKind::Dynamic).unwrap();
        rt.add_native(inner, Some("n"), 1i32).unwrap();
        let attr = Attribute::tuple(TypeTuple::name("dynamic"), outer);
        let copy = rt.duplicate(&attr).unwrap();
        let copy_id = copy.tuple_id().unwrap();
        assert_ne!(copy_id, outer);
        let copy_inner = rt.tuple(copy_id).unwrap().attribute(0usize).unwrap().tuple_id().unwrap();
        assert_ne!(copy_inner, inner);
        assert_eq!(rt.tuple(copy_inner).unwrap().parent(), Some(copy_id));
        assert_eq!(rt.to_text(copy_id).unwrap(), rt.to_text(outer).unwrap());
    }
}
