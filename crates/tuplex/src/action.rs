//! Actions: signature-bound callables operating on a value stack
//!
//! An action pops its arguments off a shared [`Stack`] (last argument
//! first), pushes exactly one result and reports how control continues via
//! a [`Signal`]. Expected runtime conditions are reported in-band: the
//! action pushes a `name` value and returns [`Signal::Raise`].

use std::fmt;
use std::rc::Rc;

use crate::error::{Result, TuplexError};
use crate::runtime::Runtime;
use crate::types::{names, TypeField, TypeTuple};
use crate::value::{Attribute, Name, NativeType};

// ═══════════════════════════════════════════════════════════════════════
// Signals
// ═══════════════════════════════════════════════════════════════════════

/// How control continues after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Signal {
    /// Normal completion
    #[default]
    Normal,
    /// Leave the enclosing loop
    Break,
    /// Skip to the next loop iteration
    Continue,
    /// Leave the enclosing expression with a value
    Return,
    /// An expected runtime condition; the stack top names it
    Raise,
}

impl Signal {
    /// Check for normal completion
    pub fn is_normal(self) -> bool {
        self == Signal::Normal
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Signatures
// ═══════════════════════════════════════════════════════════════════════

/// Action categories
pub mod category {
    /// Operator (infix, prefix or multi-token)
    pub const OPERATOR: &str = "operator";
    /// Free function called as `name(...)`
    pub const FUNCTION: &str = "function";
    /// Type constructor called as `type(...)`
    pub const CONSTRUCTOR: &str = "constructor";
}

/// An action's identity: owner type, category, name, return type and
/// argument types.
///
/// The whole signature is also kept as one type descriptor,
/// `T(owner=.., category=.., name=.., returns=.., args=(..))`, which is
/// what action tables are keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature {
    key: TypeTuple,
    owner: TypeTuple,
    category: String,
    name: String,
    returns: TypeTuple,
    args: TypeTuple,
}

impl Signature {
    /// Build a signature.
    ///
    /// `args` is a sub-tree whose children may be named (named call
    /// arguments); a leaf is taken as a single argument.
    pub fn new(
        owner: TypeTuple,
        category: &str,
        name: &str,
        returns: TypeTuple,
        args: TypeTuple,
    ) -> Self {
        let args = if args.is_leaf() {
            TypeTuple::of(vec![args])
        } else {
            args
        };
        let key = TypeTuple::Tree(
            [
                ("owner", owner.clone()),
                ("category", TypeTuple::name(category)),
                ("name", TypeTuple::name(name)),
                ("returns", returns.clone()),
                ("args", args.clone()),
            ]
            .into_iter()
            .map(|(field, ty)| TypeField {
                name: Some(field.to_string()),
                ty,
            })
            .collect(),
        );
        Self {
            key,
            owner,
            category: category.to_string(),
            name: name.to_string(),
            returns,
            args,
        }
    }

    /// Signature of an operator on `owner`.
    pub fn operator(owner: TypeTuple, name: &str, returns: TypeTuple, args: TypeTuple) -> Self {
        Self::new(owner, category::OPERATOR, name, returns, args)
    }

    /// Signature of a free function.
    pub fn function(name: &str, returns: TypeTuple, args: TypeTuple) -> Self {
        Self::new(TypeTuple::void(), category::FUNCTION, name, returns, args)
    }

    /// Signature of a type constructor.
    pub fn constructor(name: &str, returns: TypeTuple, args: TypeTuple) -> Self {
        Self::new(TypeTuple::void(), category::CONSTRUCTOR, name, returns, args)
    }

    /// The signature as a type descriptor
    pub fn as_type(&self) -> &TypeTuple {
        &self.key
    }

    /// Owner type (`void` for functions and constructors)
    pub fn owner(&self) -> &TypeTuple {
        &self.owner
    }

    /// Category name
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Action name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared return type
    pub fn returns(&self) -> &TypeTuple {
        &self.returns
    }

    /// Declared argument types
    pub fn args(&self) -> &TypeTuple {
        &self.args
    }

    /// Check if actual `owner` and `args` satisfy this signature.
    ///
    /// Arguments must agree in number. Named actual arguments are matched by
    /// name, unnamed ones by position.
    pub fn accepts(&self, owner: &TypeTuple, args: &TypeTuple) -> bool {
        self.owner().compatible_with(owner) && self.declared_positions(args).is_some()
    }

    /// For each actual argument, the position of the declared argument it
    /// binds to; `None` when the arguments do not fit.
    pub fn declared_positions(&self, args: &TypeTuple) -> Option<Vec<usize>> {
        let declared = self.args().fields();
        let actual = args.fields();
        if declared.len() != actual.len() {
            return None;
        }
        let mut taken = vec![false; declared.len()];
        let mut positions = Vec::with_capacity(actual.len());
        for (i, arg) in actual.iter().enumerate() {
            let pos = match &arg.name {
                Some(name) => declared
                    .iter()
                    .position(|d| d.name.as_deref() == Some(name.as_str()))?,
                None => i,
            };
            if taken[pos] || !declared[pos].ty.compatible_with(&arg.ty) {
                return None;
            }
            taken[pos] = true;
            positions.push(pos);
        }
        Some(positions)
    }

    /// Check if this signature is at least as specific as `other`: every
    /// owner and argument `self` accepts, `other` accepts too.
    pub fn refines(&self, other: &Signature) -> bool {
        other.owner().compatible_with(self.owner())
            && other.args().len() == self.args().len()
            && other
                .args()
                .fields()
                .iter()
                .zip(self.args().fields())
                .all(|(o, s)| o.ty.compatible_with(&s.ty))
    }

    /// Return type for actual `owner` and `args`.
    ///
    /// An `any` return type resolves to the actual type bound to the first
    /// declared `any` (owner first, then arguments in order).
    pub fn resolve_return(&self, owner: &TypeTuple, args: &TypeTuple) -> TypeTuple {
        if !self.returns().is_any() {
            return self.returns().clone();
        }
        if self.owner().is_any() {
            return owner.clone();
        }
        self.args()
            .fields()
            .iter()
            .zip(args.fields())
            .find(|(declared, _)| declared.ty.is_any())
            .map(|(_, actual)| actual.ty.clone())
            .unwrap_or_else(TypeTuple::any)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.category(), self.name())?;
        if !self.owner().is_void() {
            write!(f, " on {}", self.owner())?;
        }
        write!(f, " {} -> {}", self.args(), self.returns())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Value stack
// ═══════════════════════════════════════════════════════════════════════

/// The value stack an action runs against.
#[derive(Debug, Default)]
pub struct Stack {
    values: Vec<Attribute>,
    action: String,
}

impl Stack {
    /// Create an empty stack labelled with the action that will use it.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            values: Vec::new(),
            action: action.into(),
        }
    }

    /// Push a value
    pub fn push(&mut self, value: Attribute) {
        self.values.push(value);
    }

    /// Push a native value using its default type mapping
    pub fn push_native<T: NativeType>(&mut self, value: T) {
        self.values.push(Attribute::of(value));
    }

    /// Push the `name` value of a raised condition and return [`Signal::Raise`].
    pub fn raise(&mut self, condition: &str) -> Result<Signal> {
        self.values.push(Attribute::of(Name::new(condition)));
        Ok(Signal::Raise)
    }

    /// Pop the top value
    pub fn pop(&mut self) -> Result<Attribute> {
        self.values.pop().ok_or_else(|| TuplexError::StackUnderflow {
            action: self.action.clone(),
        })
    }

    /// Pop the top value as a native type
    pub fn pop_native<T: NativeType>(&mut self) -> Result<T> {
        self.pop()?.value::<T>()
    }

    /// Pop two values, returning them in push order
    pub fn pop_pair(&mut self) -> Result<(Attribute, Attribute)> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        Ok((lhs, rhs))
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the stack is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The single result left by an action; `void` when nothing was pushed.
    pub fn into_result(mut self) -> Attribute {
        self.values.pop().unwrap_or_default()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Actions
// ═══════════════════════════════════════════════════════════════════════

/// Body of an action.
pub type ActionFn = Rc<dyn Fn(&mut Runtime, &mut Stack) -> Result<Signal>>;

/// An immutable callable identified by its [`Signature`].
#[derive(Clone)]
pub struct Action {
    signature: Signature,
    body: ActionFn,
}

impl Action {
    /// Create an action.
    pub fn new(
        signature: Signature,
        body: impl Fn(&mut Runtime, &mut Stack) -> Result<Signal> + 'static,
    ) -> Self {
        Self {
            signature,
            body: Rc::new(body),
        }
    }

    /// The action's signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The action's name
    pub fn name(&self) -> &str {
        self.signature.name()
    }

    /// Run the action against `stack`.
    pub fn call(&self, rt: &mut Runtime, stack: &mut Stack) -> Result<Signal> {
        (self.body)(rt, stack)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action({})", self.signature)
    }
}

/// Type of the `name` value pushed by [`Stack::raise`].
pub fn raised_type() -> TypeTuple {
    TypeTuple::name(names::NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> TypeTuple {
        TypeTuple::name("int")
    }

    #[test]
    fn test_signature_parts() {
        let sig = Signature::operator(int(), "+", int(), TypeTuple::of(vec![int()]));
        assert_eq!(sig.owner(), &int());
        assert_eq!(sig.category(), "operator");
        assert_eq!(sig.name(), "+");
        assert_eq!(sig.returns(), &int());
        assert_eq!(sig.args().len(), 1);
    }

    #[test]
    fn test_accepts_checks_arity() {
        let sig = Signature::function("f", int(), TypeTuple::of(vec![int()]));
        assert!(sig.accepts(&TypeTuple::void(), &TypeTuple::of(vec![int()])));
        assert!(!sig.accepts(&TypeTuple::void(), &TypeTuple::of(vec![int(), int()])));
        assert!(!sig.accepts(&TypeTuple::void(), &TypeTuple::tree()));
    }

    #[test]
    fn test_named_arguments_bind_by_name() {
        let args = TypeTuple::tree()
            .with_named("x", int())
            .and_then(|t| t.with_named("y", TypeTuple::name("float")))
            .unwrap();
        let sig = Signature::constructor("point", TypeTuple::tree(), args);
        let actual = TypeTuple::tree()
            .with_named("y", TypeTuple::name("float"))
            .and_then(|t| t.with_named("x", int()))
            .unwrap();
        assert_eq!(sig.declared_positions(&actual), Some(vec![1, 0]));
        let positional = TypeTuple::of(vec![int(), TypeTuple::name("float")]);
        assert_eq!(sig.declared_positions(&positional), Some(vec![0, 1]));
    }

    #[test]
    fn test_refines() {
        let exact = Signature::operator(int(), "=", int(), TypeTuple::of(vec![int()]));
        let generic = Signature::operator(
            TypeTuple::any(),
            "=",
            TypeTuple::any(),
            TypeTuple::of(vec![TypeTuple::any()]),
        );
        assert!(exact.refines(&generic));
        assert!(!generic.refines(&exact));
    }

    #[test]
    fn test_any_return_resolves_to_operand() {
        let sig = Signature::operator(
            TypeTuple::name("bool"),
            "if",
            TypeTuple::any(),
            TypeTuple::of(vec![TypeTuple::any()]),
        );
        let ret = sig.resolve_return(
            &TypeTuple::name("bool"),
            &TypeTuple::of(vec![TypeTuple::name("text")]),
        );
        assert_eq!(ret, TypeTuple::name("text"));
    }

    #[test]
    fn test_stack_underflow_names_action() {
        let mut stack = Stack::new("+");
        assert_eq!(
            stack.pop().unwrap_err(),
            TuplexError::StackUnderflow {
                action: "+".to_string()
            }
        );
    }

    #[test]
    fn test_raise_pushes_name() {
        let mut stack = Stack::new("/");
        assert_eq!(stack.raise("division_by_zero").unwrap(), Signal::Raise);
        let top = stack.into_result();
        assert_eq!(top.ty(), &raised_type());
        assert_eq!(top.value::<Name>().unwrap(), Name::new("division_by_zero"));
    }
}
