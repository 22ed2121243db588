//! Assignment, conditionals, type tests and control signals

use super::operator;
use crate::action::Signal;
use crate::error::TuplexError;
use crate::runtime::Runtime;
use crate::types::names::{ANY, BOOL, NAME, TYPE, VOID};
use crate::types::TypeTuple;
use crate::value::{Attribute, Name};

pub(super) fn install(rt: &mut Runtime) {
    assignment(rt);
    conditionals(rt);
    type_tests(rt);
    signals(rt);
}

/// `target = value` copies `value` into `target` and yields `target`.
///
/// Assigning through a variable alias writes the variable, so the types
/// must be equal: the variable's own cell keeps its declared type. A tuple
/// previously held by the target is freed; an owned tuple value is moved in
/// and a referenced one is deep-copied.
fn assignment(rt: &mut Runtime) {
    operator(rt, "=", ANY, &[ANY], ANY, |rt, stack| {
        let (mut target, value) = stack.pop_pair()?;
        target.check_writable()?;
        if target.ty() != value.ty() {
            return Err(TuplexError::IncompatibleType {
                expected: target.ty().to_string(),
                got: value.ty().to_string(),
            });
        }
        let previous = target.tuple_id();
        let value = match value.tuple_id() {
            Some(_) if !value.is_owned() => rt.duplicate(&value)?,
            _ => value,
        };
        value.clone_into(&mut target)?;
        if let Some(previous) = previous.filter(|old| target.tuple_id() != Some(*old)) {
            rt.destroy(previous);
        }
        stack.push(target);
        Ok(Signal::Normal)
    });
}

/// `if c then a`, `if c then a else b` and `c ? a : b`.
///
/// The evaluator only runs the chosen branch and pushes void for the
/// other; the action picks the chosen value.
fn conditionals(rt: &mut Runtime) {
    for arity in [1, 2] {
        let branches = vec![ANY; arity];
        operator(rt, "if", BOOL, &branches, ANY, |_, stack| {
            let mut operands = Vec::with_capacity(stack.len());
            while !stack.is_empty() {
                operands.push(stack.pop()?);
            }
            operands.reverse();

            let mut operands = operands.into_iter();
            let condition = operands.next().ok_or_else(|| TuplexError::StackUnderflow {
                action: "if".to_string(),
            })?;
            let then = operands.next();
            let otherwise = operands.next();
            let chosen = if condition.value::<bool>()? { then } else { otherwise };
            stack.push(chosen.unwrap_or_default());
            Ok(Signal::Normal)
        });
    }
}

/// `x is T` and `x is not T` test the value's type against a descriptor.
fn type_tests(rt: &mut Runtime) {
    for (name, expected) in [("is", true), ("is not", false)] {
        operator(rt, name, ANY, &[TYPE], BOOL, move |_, stack| {
            let (value, ty) = stack.pop_pair()?;
            let matches = ty.value_ref::<TypeTuple>()?.compatible_with(value.ty());
            stack.push(Attribute::of(matches == expected));
            Ok(Signal::Normal)
        });
    }
}

fn signals(rt: &mut Runtime) {
    operator(rt, "return", ANY, &[], ANY, |_, stack| {
        let value = stack.pop()?;
        stack.push(value);
        Ok(Signal::Return)
    });

    operator(rt, "raise", NAME, &[], NAME, |_, stack| {
        let condition = stack.pop_native::<Name>()?;
        stack.raise(condition.as_str())
    });

    let nullary: [(&str, Signal); 2] = [("break", Signal::Break), ("continue", Signal::Continue)];
    for (name, signal) in nullary {
        operator(rt, name, VOID, &[], VOID, move |_, _| Ok(signal));
    }
}
