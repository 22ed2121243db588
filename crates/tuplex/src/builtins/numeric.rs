//! Numeric operators
//!
//! Integer arithmetic is checked: overflow raises `integer_overflow` and a
//! zero divisor raises `division_by_zero`. Floats follow IEEE rules and have
//! no `%`. Floats only define `<=>`; their relational operators come from
//! the parser's rewrite through it.

use std::cmp::Ordering;
use std::ops::{BitAnd, BitOr, BitXor, Not};

use super::conditions::{BIT_INDEX_OUT_OF_RANGE, DIVISION_BY_ZERO, INTEGER_OVERFLOW};
use super::{binary, compound, unary, Raised};
use crate::runtime::Runtime;
use crate::types::names;
use crate::value::NativeType;

type Checked<T> = std::result::Result<T, Raised>;

/// Machine integers with checked arithmetic.
trait Integer:
    NativeType
    + Copy
    + Ord
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
{
    const ZERO: Self;

    fn checked_add(self, rhs: Self) -> Option<Self>;
    fn checked_sub(self, rhs: Self) -> Option<Self>;
    fn checked_mul(self, rhs: Self) -> Option<Self>;
    fn checked_div(self, rhs: Self) -> Option<Self>;
    fn checked_rem(self, rhs: Self) -> Option<Self>;
    fn checked_neg(self) -> Option<Self>;
    fn checked_shl(self, rhs: u32) -> Option<Self>;
    fn checked_shr(self, rhs: u32) -> Option<Self>;
}

macro_rules! integer {
    ($($ty:ty),*) => {$(
        impl Integer for $ty {
            const ZERO: Self = 0;

            fn checked_add(self, rhs: Self) -> Option<Self> {
                <$ty>::checked_add(self, rhs)
            }
            fn checked_sub(self, rhs: Self) -> Option<Self> {
                <$ty>::checked_sub(self, rhs)
            }
            fn checked_mul(self, rhs: Self) -> Option<Self> {
                <$ty>::checked_mul(self, rhs)
            }
            fn checked_div(self, rhs: Self) -> Option<Self> {
                <$ty>::checked_div(self, rhs)
            }
            fn checked_rem(self, rhs: Self) -> Option<Self> {
                <$ty>::checked_rem(self, rhs)
            }
            fn checked_neg(self) -> Option<Self> {
                <$ty>::checked_neg(self)
            }
            fn checked_shl(self, rhs: u32) -> Option<Self> {
                <$ty>::checked_shl(self, rhs)
            }
            fn checked_shr(self, rhs: u32) -> Option<Self> {
                <$ty>::checked_shr(self, rhs)
            }
        }
    )*};
}

integer!(i32, i64, u64);

fn overflow<T>(value: Option<T>) -> Checked<T> {
    value.ok_or(INTEGER_OVERFLOW)
}

fn divide<T: Integer>(lhs: T, rhs: T) -> Checked<T> {
    if rhs == T::ZERO {
        return Err(DIVISION_BY_ZERO);
    }
    overflow(lhs.checked_div(rhs))
}

fn remainder<T: Integer>(lhs: T, rhs: T) -> Checked<T> {
    if rhs == T::ZERO {
        return Err(DIVISION_BY_ZERO);
    }
    overflow(lhs.checked_rem(rhs))
}

fn shift_amount(rhs: i32) -> Checked<u32> {
    u32::try_from(rhs).map_err(|_| BIT_INDEX_OUT_OF_RANGE)
}

fn ordering(order: Ordering) -> i32 {
    match order {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

pub(super) fn install(rt: &mut Runtime) {
    arithmetic::<i32>(rt, names::INT);
    arithmetic::<i64>(rt, names::LONG);
    arithmetic::<u64>(rt, names::INDEX);
    negation::<i32>(rt, names::INT);
    negation::<i64>(rt, names::LONG);

    bitwise::<i32>(rt, names::INT);
    bitwise::<i64>(rt, names::LONG);
    bitwise::<u64>(rt, names::BITS);

    comparisons::<u8>(rt, names::BYTE);
    comparisons::<char>(rt, names::CHAR);
    comparisons::<i32>(rt, names::INT);
    comparisons::<i64>(rt, names::LONG);
    comparisons::<u64>(rt, names::INDEX);
    comparisons::<u64>(rt, names::BITS);
    comparisons::<String>(rt, names::TEXT);
    equality::<bool>(rt, names::BOOL);

    floats(rt);
}

fn arithmetic<T: Integer>(rt: &mut Runtime, ty: &'static str) {
    binary(rt, "+", ty, ty, ty, |a: T, b: T| overflow(a.checked_add(b)));
    binary(rt, "-", ty, ty, ty, |a: T, b: T| overflow(a.checked_sub(b)));
    binary(rt, "*", ty, ty, ty, |a: T, b: T| overflow(a.checked_mul(b)));
    binary(rt, "/", ty, ty, ty, divide::<T>);
    binary(rt, "%", ty, ty, ty, remainder::<T>);

    compound(rt, "+=", ty, ty, |a: T, b: T| overflow(a.checked_add(b)));
    compound(rt, "-=", ty, ty, |a: T, b: T| overflow(a.checked_sub(b)));
    compound(rt, "*=", ty, ty, |a: T, b: T| overflow(a.checked_mul(b)));
    compound(rt, "/=", ty, ty, divide::<T>);
    compound(rt, "%=", ty, ty, remainder::<T>);
}

fn negation<T: Integer>(rt: &mut Runtime, ty: &'static str) {
    unary(rt, "-", ty, ty, |a: T| overflow(a.checked_neg()));
}

fn bitwise<T: Integer>(rt: &mut Runtime, ty: &'static str) {
    binary(rt, "&", ty, ty, ty, |a: T, b: T| Ok(a & b));
    binary(rt, "|", ty, ty, ty, |a: T, b: T| Ok(a | b));
    binary(rt, "^", ty, ty, ty, |a: T, b: T| Ok(a ^ b));
    unary(rt, "~", ty, ty, |a: T| Ok(!a));
    binary(rt, "<<", ty, names::INT, ty, |a: T, n: i32| {
        a.checked_shl(shift_amount(n)?).ok_or(BIT_INDEX_OUT_OF_RANGE)
    });
    binary(rt, ">>", ty, names::INT, ty, |a: T, n: i32| {
        a.checked_shr(shift_amount(n)?).ok_or(BIT_INDEX_OUT_OF_RANGE)
    });
}

fn equality<T: NativeType + PartialEq>(rt: &mut Runtime, ty: &'static str) {
    binary(rt, "==", ty, ty, names::BOOL, |a: T, b: T| Ok(a == b));
    binary(rt, "!=", ty, ty, names::BOOL, |a: T, b: T| Ok(a != b));
}

fn comparisons<T: NativeType + Ord>(rt: &mut Runtime, ty: &'static str) {
    equality::<T>(rt, ty);
    binary(rt, "<", ty, ty, names::BOOL, |a: T, b: T| Ok(a < b));
    binary(rt, "<=", ty, ty, names::BOOL, |a: T, b: T| Ok(a <= b));
    binary(rt, ">", ty, ty, names::BOOL, |a: T, b: T| Ok(a > b));
    binary(rt, ">=", ty, ty, names::BOOL, |a: T, b: T| Ok(a >= b));
    binary(rt, "<=>", ty, ty, names::INT, |a: T, b: T| Ok(ordering(a.cmp(&b))));
}

/// Float arithmetic and `<=>`.
///
/// Floats define no relational operators of their own, so `==`, `<` and
/// the rest go through the `(a <=> b) op 0` fallback. `<=>` uses the IEEE
/// total order: `-0.0 < 0.0`, so `0.0 == -0.0` is false, and a NaN equals
/// a NaN with the same bits.
fn floats(rt: &mut Runtime) {
    let ty = names::FLOAT;
    binary(rt, "+", ty, ty, ty, |a: f64, b: f64| Ok(a + b));
    binary(rt, "-", ty, ty, ty, |a: f64, b: f64| Ok(a - b));
    binary(rt, "*", ty, ty, ty, |a: f64, b: f64| Ok(a * b));
    binary(rt, "/", ty, ty, ty, |a: f64, b: f64| Ok(a / b));
    compound(rt, "+=", ty, ty, |a: f64, b: f64| Ok(a + b));
    compound(rt, "-=", ty, ty, |a: f64, b: f64| Ok(a - b));
    compound(rt, "*=", ty, ty, |a: f64, b: f64| Ok(a * b));
    compound(rt, "/=", ty, ty, |a: f64, b: f64| Ok(a / b));
    unary(rt, "-", ty, ty, |a: f64| Ok(-a));
    binary(rt, "<=>", ty, ty, names::INT, |a: f64, b: f64| {
        Ok(ordering(a.total_cmp(&b)))
    });
}
