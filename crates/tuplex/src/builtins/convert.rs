//! Conversion and utility functions

use super::conditions::INTEGER_OVERFLOW;
use super::{finish, function, function1, Raised};
use crate::action::Signal;
use crate::error::{Result, TuplexError};
use crate::runtime::Runtime;
use crate::types::names::{ANY, BYTE, CHAR, FLOAT, INDEX, INT, LONG, TEXT, TYPE};
use crate::value::{Attribute, Value};

type Checked<T> = std::result::Result<T, Raised>;

fn fits<T, U: TryFrom<T>>(value: T) -> Checked<U> {
    U::try_from(value).map_err(|_| INTEGER_OVERFLOW)
}

fn float_to_i32(value: f64) -> Checked<i32> {
    if value.is_finite() && value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
        Ok(value as i32)
    } else {
        Err(INTEGER_OVERFLOW)
    }
}

fn float_to_i64(value: f64) -> Checked<i64> {
    // 2^63 is exactly representable; everything below it fits.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if value.is_finite() && value >= -LIMIT && value < LIMIT {
        Ok(value as i64)
    } else {
        Err(INTEGER_OVERFLOW)
    }
}

pub(super) fn install(rt: &mut Runtime) {
    conversions(rt);
    magnitudes(rt);

    function(rt, "text", &[ANY], TEXT, |rt, stack| {
        let value = stack.pop()?;
        let text = match &*value.raw() {
            Value::Text(text) => text.clone(),
            _ => rt.attribute_text(&value)?,
        };
        stack.push(Attribute::of(text));
        Ok(Signal::Normal)
    });

    function(rt, "len", &[ANY], INDEX, |rt, stack| {
        let value = stack.pop()?;
        let len = length(rt, &value)?;
        stack.push(Attribute::of(len));
        Ok(Signal::Normal)
    });

    function(rt, "type_of", &[ANY], TYPE, |_, stack| {
        let value = stack.pop()?;
        stack.push(Attribute::of(value.ty().clone()));
        Ok(Signal::Normal)
    });
}

fn conversions(rt: &mut Runtime) {
    function1(rt, "int", LONG, INT, fits::<i64, i32>);
    function1(rt, "int", INDEX, INT, fits::<u64, i32>);
    function1(rt, "int", FLOAT, INT, float_to_i32);
    function1(rt, "int", BYTE, INT, |b: u8| Ok(i32::from(b)));
    function1(rt, "int", CHAR, INT, |c: char| fits::<u32, i32>(u32::from(c)));

    function1(rt, "long", INT, LONG, |v: i32| Ok(i64::from(v)));
    function1(rt, "long", INDEX, LONG, fits::<u64, i64>);
    function1(rt, "long", FLOAT, LONG, float_to_i64);

    function1(rt, "float", INT, FLOAT, |v: i32| Ok(f64::from(v)));
    function1(rt, "float", LONG, FLOAT, |v: i64| Ok(v as f64));
    function1(rt, "float", INDEX, FLOAT, |v: u64| Ok(v as f64));

    function1(rt, "index", INT, INDEX, fits::<i32, u64>);
    function1(rt, "index", LONG, INDEX, fits::<i64, u64>);
}

fn magnitudes(rt: &mut Runtime) {
    function1(rt, "abs", INT, INT, |v: i32| v.checked_abs().ok_or(INTEGER_OVERFLOW));
    function1(rt, "abs", LONG, LONG, |v: i64| v.checked_abs().ok_or(INTEGER_OVERFLOW));
    function1(rt, "abs", FLOAT, FLOAT, |v: f64| Ok(v.abs()));

    extremes::<i32>(rt, INT);
    extremes::<i64>(rt, LONG);
    extremes::<u64>(rt, INDEX);

    function(rt, "min", &[FLOAT, FLOAT], FLOAT, |_, stack| {
        let (a, b) = stack.pop_pair()?;
        finish(stack, FLOAT, Ok(a.value::<f64>()?.min(b.value::<f64>()?)))
    });
    function(rt, "max", &[FLOAT, FLOAT], FLOAT, |_, stack| {
        let (a, b) = stack.pop_pair()?;
        finish(stack, FLOAT, Ok(a.value::<f64>()?.max(b.value::<f64>()?)))
    });
}

fn extremes<T: crate::value::NativeType + Ord>(rt: &mut Runtime, ty: &'static str) {
    function(rt, "min", &[ty, ty], ty, move |_, stack| {
        let (a, b) = stack.pop_pair()?;
        finish(stack, ty, Ok(a.value::<T>()?.min(b.value::<T>()?)))
    });
    function(rt, "max", &[ty, ty], ty, move |_, stack| {
        let (a, b) = stack.pop_pair()?;
        finish(stack, ty, Ok(a.value::<T>()?.max(b.value::<T>()?)))
    });
}

/// Element count of a sized value.
fn length(rt: &Runtime, value: &Attribute) -> Result<u64> {
    let len = match &*value.raw() {
        Value::Text(text) => text.chars().count(),
        Value::Bytes(bytes) => bytes.len(),
        Value::NamePath(path) => path.segments().len(),
        Value::Type(ty) => ty.len(),
        Value::Tuple(id) => rt.tuple(*id)?.len(),
        _ => {
            return Err(TuplexError::WrongType {
                requested: "sized value".to_string(),
                actual: value.ty().to_string(),
            })
        }
    };
    Ok(len as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_to_int_range() {
        assert_eq!(float_to_i32(3.9), Ok(3));
        assert_eq!(float_to_i32(-3.9), Ok(-3));
        assert_eq!(float_to_i32(f64::NAN), Err(INTEGER_OVERFLOW));
        assert_eq!(float_to_i32(3e10), Err(INTEGER_OVERFLOW));
        assert_eq!(float_to_i64(9.3e18), Err(INTEGER_OVERFLOW));
    }

    #[test]
    fn test_narrowing() {
        assert_eq!(fits::<i64, i32>(5), Ok(5));
        assert_eq!(fits::<i64, i32>(1 << 40), Err(INTEGER_OVERFLOW));
        assert_eq!(fits::<i32, u64>(-1), Err(INTEGER_OVERFLOW));
    }

    #[test]
    fn test_length_of_unsized_value() {
        let rt = Runtime::new();
        assert_eq!(length(&rt, &Attribute::of(String::from("héllo"))).unwrap(), 5);
        assert!(length(&rt, &Attribute::of(1i32)).is_err());
    }
}
