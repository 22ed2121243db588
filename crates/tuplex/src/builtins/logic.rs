//! Boolean operators

use super::{binary, unary};
use crate::runtime::Runtime;
use crate::types::names::BOOL;

pub(super) fn install(rt: &mut Runtime) {
    // Both operands are evaluated before the action runs.
    binary(rt, "&&", BOOL, BOOL, BOOL, |a: bool, b: bool| Ok(a && b));
    binary(rt, "||", BOOL, BOOL, BOOL, |a: bool, b: bool| Ok(a || b));
    unary(rt, "!", BOOL, BOOL, |a: bool| Ok(!a));
}
