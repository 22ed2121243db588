//! Text operators

use super::{binary, compound};
use crate::runtime::Runtime;
use crate::types::names::TEXT;

pub(super) fn install(rt: &mut Runtime) {
    binary(rt, "+", TEXT, TEXT, TEXT, |a: String, b: String| Ok(a + &b));
    compound(rt, "+=", TEXT, TEXT, |a: String, b: String| Ok(a + &b));
}
