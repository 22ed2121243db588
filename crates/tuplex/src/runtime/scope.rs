//! Scope chain lookups
//!
//! Variables and types resolve innermost first, walking parent links out to
//! the root. Actions always resolve at the root (see
//! [`Runtime::signatures`]).

use super::Runtime;
use crate::tuple::{Permissions, TupleId};
use crate::types::TypeTuple;
use crate::value::Attribute;

impl Runtime {
    /// Iterate over `id` and its ancestors, innermost first.
    ///
    /// Stops at the first id that no longer resolves.
    pub fn scope_chain(&self, id: TupleId) -> impl Iterator<Item = TupleId> + '_ {
        std::iter::successors(Some(id), move |current| {
            self.tuple(*current).ok().and_then(|t| t.parent())
        })
        .take_while(move |current| self.contains(*current))
        // No chain is longer than the arena unless it has a cycle.
        .take(self.slots.len())
    }

    /// The outermost scope reachable from `id`.
    pub fn root_of(&self, id: TupleId) -> TupleId {
        self.scope_chain(id).last().unwrap_or(self.global())
    }

    /// Find the tuple and position of the nearest attribute named `name`.
    pub fn lookup_variable(&self, id: TupleId, name: &str) -> Option<(TupleId, usize)> {
        self.scope_chain(id).find_map(|scope| {
            self.tuple(scope)
                .ok()
                .and_then(|t| t.position(name).ok())
                .map(|pos| (scope, pos))
        })
    }

    /// Borrow the nearest attribute named `name`.
    pub fn variable(&self, id: TupleId, name: &str) -> Option<&Attribute> {
        let (scope, pos) = self.lookup_variable(id, name)?;
        self.tuple(scope).ok()?.attribute(pos).ok()
    }

    /// A cell standing for the variable `name` as seen from `id`.
    ///
    /// Variables in modifiable tuples are aliased, so assignments write
    /// through. All others get a read-only handle: assigning to them fails
    /// with `AccessDenied`.
    pub fn variable_cell(&mut self, id: TupleId, name: &str) -> Option<Attribute> {
        let (scope, pos) = self.lookup_variable(id, name)?;
        let tuple = self.tuple_mut(scope).ok()?;
        if tuple.allows(Permissions::MODIFY) {
            tuple.entry_mut(pos).map(|attr| attr.alias())
        } else {
            let kind = tuple.kind().tag().to_string();
            tuple.attribute(pos).ok().map(|attr| attr.read_only(&kind))
        }
    }

    /// Find the nearest type registered as `name`.
    ///
    /// Builtin leaf types (those with a type handler) resolve to their leaf
    /// descriptor from anywhere.
    pub fn lookup_type(&self, id: TupleId, name: &str) -> Option<TypeTuple> {
        let registered = self
            .scope_chain(id)
            .find_map(|scope| self.tuple(scope).ok()?.local_type(name).cloned());
        registered.or_else(|| {
            self.handlers()
                .contains(name)
                .then(|| TypeTuple::name(name))
        })
    }

    /// Check if `name` is a type visible from `id`.
    pub fn is_type(&self, id: TupleId, name: &str) -> bool {
        self.lookup_type(id, name).is_some()
    }
}
