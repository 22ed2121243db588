//! Builtin actions installed into every runtime's global scope
//!
//! - [`numeric`]: arithmetic, comparison and bit operators on numbers
//! - [`logic`]: boolean operators
//! - [`text`]: string concatenation
//! - [`convert`]: conversion and utility functions
//! - [`control`]: assignment, conditionals, type tests and signals
//!
//! Expected runtime conditions are raised in-band with a condition name from
//! [`conditions`] instead of failing the evaluation.

mod control;
mod convert;
mod logic;
mod numeric;
mod text;

use tracing::debug;

use crate::action::{Action, Signal, Signature, Stack};
use crate::error::Result;
use crate::runtime::Runtime;
use crate::tuple::TupleKind;
use crate::types::TypeTuple;
use crate::value::{Attribute, NativeType};

/// Names of the conditions raised by builtin actions
pub mod conditions {
    /// Integer division or remainder by zero
    pub const DIVISION_BY_ZERO: &str = "division_by_zero";
    /// Integer result does not fit the operand type
    pub const INTEGER_OVERFLOW: &str = "integer_overflow";
    /// Shift amount negative or not smaller than the bit width
    pub const BIT_INDEX_OUT_OF_RANGE: &str = "bit_index_out_of_range";
}

/// A condition raised by a builtin body.
type Raised = &'static str;

/// Install every builtin action into `rt`'s global scope.
pub(crate) fn install(rt: &mut Runtime) {
    numeric::install(rt);
    logic::install(rt);
    text::install(rt);
    convert::install(rt);
    control::install(rt);

    let global = rt.global();
    let count = rt.tuple(global).map(|t| t.action_count()).unwrap_or_default();
    debug!(actions = count, "builtins installed");
}

/// The constructor action of the sub-tree type `name`.
///
/// Takes the type's children as arguments (named children can be passed by
/// name) and builds a plain tuple whose entries carry the same names.
pub(crate) fn constructor_for(name: &str, ty: &TypeTuple) -> Action {
    let fields: Vec<Option<String>> = ty.fields().iter().map(|f| f.name.clone()).collect();
    let signature = Signature::constructor(name, ty.clone(), ty.clone());

    Action::new(signature, move |rt, stack| {
        let mut values = Vec::with_capacity(fields.len());
        for _ in 0..fields.len() {
            values.push(stack.pop()?);
        }
        values.reverse();

        let mut entries = Vec::with_capacity(values.len());
        for (field, value) in fields.iter().zip(values) {
            // Arguments that reference a variable are copied into the tuple.
            let value = if value.is_owned() {
                value
            } else {
                rt.duplicate(&value)?
            };
            entries.push((field.clone(), value));
        }

        let global = rt.global();
        let id = rt.create_from(TupleKind::Plain, Some(global), entries)?;
        stack.push(Attribute::tuple(rt.type_of(id)?, id));
        Ok(Signal::Normal)
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Registration helpers
// ═══════════════════════════════════════════════════════════════════════

fn leaf(name: &str) -> TypeTuple {
    TypeTuple::name(name)
}

fn leaves(names: &[&str]) -> TypeTuple {
    TypeTuple::of(names.iter().copied().map(leaf))
}

/// A cell of logical type `ty` holding `value`.
fn typed<T: NativeType>(ty: &str, value: T) -> Attribute {
    Attribute::new(leaf(ty), value.into_value())
}

/// Push `result` typed as `ty`, or raise its condition.
fn finish<T: NativeType>(
    stack: &mut Stack,
    ty: &str,
    result: std::result::Result<T, Raised>,
) -> Result<Signal> {
    match result {
        Ok(value) => {
            stack.push(typed(ty, value));
            Ok(Signal::Normal)
        }
        Err(condition) => stack.raise(condition),
    }
}

/// Define an operator with an untyped body.
fn operator(
    rt: &mut Runtime,
    name: &str,
    owner: &str,
    args: &[&str],
    returns: &str,
    body: impl Fn(&mut Runtime, &mut Stack) -> Result<Signal> + 'static,
) {
    let signature = Signature::operator(leaf(owner), name, leaf(returns), leaves(args));
    rt.define(Action::new(signature, body));
}

/// Define a free function with an untyped body.
fn function(
    rt: &mut Runtime,
    name: &str,
    args: &[&str],
    returns: &str,
    body: impl Fn(&mut Runtime, &mut Stack) -> Result<Signal> + 'static,
) {
    let signature = Signature::function(name, leaf(returns), leaves(args));
    rt.define(Action::new(signature, body));
}

/// Define `owner <op> arg` computing a native result.
fn binary<T, U, R>(
    rt: &mut Runtime,
    op: &str,
    owner: &'static str,
    arg: &'static str,
    returns: &'static str,
    f: impl Fn(T, U) -> std::result::Result<R, Raised> + 'static,
) where
    T: NativeType,
    U: NativeType,
    R: NativeType,
{
    operator(rt, op, owner, &[arg], returns, move |_, stack| {
        let (lhs, rhs) = stack.pop_pair()?;
        let result = f(lhs.value::<T>()?, rhs.value::<U>()?);
        finish(stack, returns, result)
    });
}

/// Define prefix `<op> owner` computing a native result.
fn unary<T, R>(
    rt: &mut Runtime,
    op: &str,
    owner: &'static str,
    returns: &'static str,
    f: impl Fn(T) -> std::result::Result<R, Raised> + 'static,
) where
    T: NativeType,
    R: NativeType,
{
    operator(rt, op, owner, &[], returns, move |_, stack| {
        let operand = stack.pop_native::<T>()?;
        finish(stack, returns, f(operand))
    });
}

/// Define a one-argument function computing a native result.
fn function1<T, R>(
    rt: &mut Runtime,
    name: &str,
    arg: &'static str,
    returns: &'static str,
    f: impl Fn(T) -> std::result::Result<R, Raised> + 'static,
) where
    T: NativeType,
    R: NativeType,
{
    function(rt, name, &[arg], returns, move |_, stack| {
        let value = stack.pop_native::<T>()?;
        finish(stack, returns, f(value))
    });
}

/// Define a compound assignment `owner <op>= arg` that writes through the
/// left operand and yields it.
fn compound<T, U>(
    rt: &mut Runtime,
    op: &str,
    owner: &'static str,
    arg: &'static str,
    f: impl Fn(T, U) -> std::result::Result<T, Raised> + 'static,
) where
    T: NativeType,
    U: NativeType,
{
    operator(rt, op, owner, &[arg], owner, move |_, stack| {
        let (mut target, rhs) = stack.pop_pair()?;
        match f(target.value::<T>()?, rhs.value::<U>()?) {
            Ok(value) => {
                target.set(value)?;
                stack.push(target);
                Ok(Signal::Normal)
            }
            Err(condition) => stack.raise(condition),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvalContext;
    use crate::types::TypeField;

    #[test]
    fn test_install_defines_core_operators() {
        let rt = Runtime::new();
        let global = rt.global();
        for name in ["+", "=", "if", "is", "<=>", "return", "len"] {
            assert!(!rt.signatures(global, name).is_empty(), "missing `{name}`");
        }
    }

    #[test]
    fn test_constructor_builds_named_tuple() {
        let mut rt = Runtime::bare(EvalContext::default());
        let ty = TypeTuple::Tree(vec![
            TypeField {
                name: Some("x".into()),
                ty: leaf("int"),
            },
            TypeField {
                name: Some("y".into()),
                ty: leaf("int"),
            },
        ]);
        let ctor = constructor_for("point", &ty);
        let mut stack = Stack::new("point");
        stack.push(Attribute::of(1i32));
        stack.push(Attribute::of(2i32));
        ctor.call(&mut rt, &mut stack).unwrap();

        let id = stack.into_result().tuple_id().unwrap();
        let tuple = rt.tuple(id).unwrap();
        assert_eq!(tuple.at::<i32>("x").unwrap(), 1);
        assert_eq!(tuple.at::<i32>("y").unwrap(), 2);
        assert_eq!(rt.type_of(id).unwrap(), ty);
    }
}
