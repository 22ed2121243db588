//! Attribute cells: a value tagged with its type descriptor

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use super::{Hint, NativeType, Value};
use crate::error::{Result, TuplexError};
use crate::tuple::TupleId;
use crate::types::TypeTuple;

/// A type-erased value tagged with its [`TypeTuple`].
///
/// A cell either *owns* its value or *references* a value owned by another
/// cell. The two ways to derive one cell from another are kept apart:
///
/// - [`duplicate`](Attribute::duplicate) / [`clone_into`](Attribute::clone_into)
///   copy the value (the copy is owned);
/// - [`alias`](Attribute::alias) needs mutable access to the source and
///   shares its storage (the alias owns nothing).
///
/// A handle on a variable held by a tuple without the modify permission
/// is *read-only*: every write through it fails with `AccessDenied`.
///
/// Storage is reference counted, so an alias can never observe freed
/// memory. Nested tuples are the exception: the arena slot is released by
/// the owning cell (see [`Runtime::release`](crate::Runtime::release)) and
/// a stale alias then resolves to `NotFound`.
#[derive(Debug)]
pub struct Attribute {
    ty: TypeTuple,
    cell: Rc<RefCell<Value>>,
    owned: bool,
    /// Kind tag of the tuple that denies writes through this handle
    locked_by: Option<String>,
}

impl Default for Attribute {
    fn default() -> Self {
        Self::void()
    }
}

impl Attribute {
    // ═══════════════════════════════════════════════════════════════════
    // Construction
    // ═══════════════════════════════════════════════════════════════════

    /// A cell holding no value.
    pub fn void() -> Self {
        Self::new(TypeTuple::void(), Value::Void)
    }

    /// Explicit-type construction.
    pub fn new(ty: TypeTuple, value: Value) -> Self {
        Self {
            ty,
            cell: Rc::new(RefCell::new(value)),
            owned: true,
            locked_by: None,
        }
    }

    /// Implicit-type construction using the native type's default mapping.
    pub fn of<T: NativeType>(value: T) -> Self {
        Self::new(TypeTuple::name(T::TYPE_NAME), value.into_value())
    }

    /// Implicit-type construction with a disambiguating hint.
    ///
    /// Fails with `AccessDenied` when the hint gives the native type no
    /// logical mapping.
    pub fn hinted<T: NativeType>(value: T, hint: Hint) -> Result<Self> {
        let name = T::hinted(hint).ok_or_else(|| {
            TuplexError::access_denied(
                format!("map {} with hint {:?}", std::any::type_name::<T>(), hint),
                "native",
            )
        })?;
        Ok(Self::new(TypeTuple::name(name), value.into_value()))
    }

    /// A cell holding a nested tuple.
    pub fn tuple(ty: TypeTuple, id: TupleId) -> Self {
        Self::new(ty, Value::Tuple(id))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Copy and alias
    // ═══════════════════════════════════════════════════════════════════

    /// Copy the value into a new owned cell.
    ///
    /// Nested tuples are copied by id; use
    /// [`Runtime::duplicate`](crate::Runtime::duplicate) for a deep copy.
    pub fn duplicate(&self) -> Attribute {
        let value = self.cell.borrow().clone();
        Self::new(self.ty.clone(), value)
    }

    /// Share this cell's storage. The returned cell owns nothing.
    pub fn alias(&mut self) -> Attribute {
        self.handle()
    }

    fn handle(&self) -> Attribute {
        Attribute {
            ty: self.ty.clone(),
            cell: Rc::clone(&self.cell),
            owned: false,
            locked_by: self.locked_by.clone(),
        }
    }

    /// A non-owning handle that refuses writes, reporting `kind` as the
    /// tuple kind that denied them.
    pub(crate) fn read_only(&self, kind: &str) -> Attribute {
        Attribute {
            locked_by: Some(kind.to_string()),
            ..self.handle()
        }
    }

    /// Another handle on a referenced value; owned values are duplicated.
    ///
    /// Never turns an owned cell into shared storage, so the duplicate/alias
    /// split above still holds.
    pub(crate) fn reborrow(&self) -> Attribute {
        if self.owned {
            return self.duplicate();
        }
        self.handle()
    }

    /// A non-owning handle on this cell's storage.
    ///
    /// Used for nested tuples held by long-lived owners (parsed
    /// expressions): the handle may be dropped or released freely.
    pub(crate) fn shared(&self) -> Attribute {
        self.handle()
    }

    /// Copy-assign this value into `target`.
    ///
    /// `target` keeps its ownership mode: assigning into an alias writes
    /// through to the aliased storage. Fails when `target` is read-only.
    pub fn clone_into(&self, target: &mut Attribute) -> Result<()> {
        target.check_writable()?;
        // Clone before borrowing mutably: source and target may share storage.
        let value = self.cell.borrow().clone();
        *target.cell.borrow_mut() = value;
        target.ty = self.ty.clone();
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Inspection
    // ═══════════════════════════════════════════════════════════════════

    /// The cell's type descriptor
    pub fn ty(&self) -> &TypeTuple {
        &self.ty
    }

    /// Check if the cell holds no value
    pub fn is_void(&self) -> bool {
        self.ty.is_void()
    }

    /// Check if the cell owns its value
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Check if writes through this handle are refused
    pub fn is_read_only(&self) -> bool {
        self.locked_by.is_some()
    }

    /// Fail with `AccessDenied` if this handle is read-only.
    pub fn check_writable(&self) -> Result<()> {
        match &self.locked_by {
            Some(kind) => Err(TuplexError::access_denied("modify", kind.as_str())),
            None => Ok(()),
        }
    }

    /// Check if two cells share storage
    pub fn shares_storage(&self, other: &Attribute) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    /// Borrow the raw storage
    pub fn raw(&self) -> Ref<'_, Value> {
        self.cell.borrow()
    }

    /// Clone the raw storage
    pub fn get(&self) -> Value {
        self.cell.borrow().clone()
    }

    /// The nested tuple id, if this cell holds a tuple
    pub fn tuple_id(&self) -> Option<TupleId> {
        self.cell.borrow().as_tuple()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Typed access
    // ═══════════════════════════════════════════════════════════════════

    fn check<T: NativeType>(&self) -> Result<()> {
        match self.ty.leaf_name() {
            Some(name) if T::accepts(name) => Ok(()),
            _ => Err(self.wrong_type::<T>()),
        }
    }

    fn wrong_type<T: NativeType>(&self) -> TuplexError {
        TuplexError::WrongType {
            requested: T::TYPE_NAME.to_string(),
            actual: self.ty.to_string(),
        }
    }

    /// Read the value as `T` (cloned).
    pub fn value<T: NativeType>(&self) -> Result<T> {
        self.value_ref::<T>().map(|v| T::clone(&v))
    }

    /// Borrow the value as `T`.
    pub fn value_ref<T: NativeType>(&self) -> Result<Ref<'_, T>> {
        self.check::<T>()?;
        Ref::filter_map(self.cell.borrow(), T::from_value).map_err(|_| self.wrong_type::<T>())
    }

    /// Mutably borrow the value as `T`.
    pub fn value_mut<T: NativeType>(&mut self) -> Result<RefMut<'_, T>> {
        self.check_writable()?;
        self.check::<T>()?;
        let err = self.wrong_type::<T>();
        RefMut::filter_map(self.cell.borrow_mut(), T::from_value_mut).map_err(|_| err)
    }

    /// Replace the value, keeping the logical type.
    pub fn set<T: NativeType>(&mut self, value: T) -> Result<()> {
        self.check_writable()?;
        self.check::<T>()?;
        *self.cell.borrow_mut() = value.into_value();
        Ok(())
    }

    /// Replace type and storage at once.
    pub fn replace(&mut self, ty: TypeTuple, value: Value) -> Result<()> {
        self.check_writable()?;
        *self.cell.borrow_mut() = value;
        self.ty = ty;
        Ok(())
    }
}
