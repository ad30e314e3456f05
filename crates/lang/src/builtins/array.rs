//! `Array` natives.
//!
//! Indices may be negative (counting from the end). Element equality and
//! hashing go through the runtime so user-defined `==`/`hash` are honoured.

use std::rc::Rc;

use super::{expect_int, pair, receiver_error, single};
use crate::class::Class;
use crate::method::Arity;
use crate::object::{Array, ErrorObject};
use crate::registry::ErrorKind;
use crate::runtime::{NativeResult, Runtime};
use crate::value::Value;

fn this<'a>(rt: &dyn Runtime, recv: &'a Value) -> Result<&'a Rc<Array>, Rc<ErrorObject>> {
    match recv {
        Value::Array(array) => Ok(array),
        other => Err(receiver_error(rt, "Array", other)),
    }
}

fn other_array(rt: &dyn Runtime, value: &Value) -> Result<Vec<Value>, Rc<ErrorObject>> {
    match value {
        Value::Array(array) => Ok(array.to_vec()),
        other => Err(rt.new_error(
            ErrorKind::Type,
            format!("no implicit conversion of {} into Array", rt.class_name(other)),
        )),
    }
}

/// Resolve a possibly negative index against `len`.
fn resolve_index(rt: &dyn Runtime, index: &Value, len: usize) -> Result<usize, Rc<ErrorObject>> {
    let index = expect_int(rt, index)?;
    let resolved = if index < 0 { len as i64 + index } else { index };
    if resolved < 0 || resolved >= len as i64 {
        return Err(rt.new_error(ErrorKind::Runtime, "IndexOutOfBoundsException".to_string()));
    }
    Ok(resolved as usize)
}

fn element_at(rt: &dyn Runtime, array: &Array, index: &Value) -> NativeResult {
    let position = resolve_index(rt, index, array.len())?;
    Ok(array.get(position).unwrap_or(Value::None))
}

fn get(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    let array = this(rt, recv)?;
    element_at(rt, array, single(rt, args)?)
}

fn values_at(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    let array = this(rt, recv)?;
    let values = args
        .iter()
        .map(|index| element_at(rt, array, index))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::array(values))
}

fn insert(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    let array = this(rt, recv)?;
    let (index, value) = pair(rt, args)?;
    let position = resolve_index(rt, index, array.len())?;
    array.set(position, value.clone());
    Ok(value.clone())
}

fn push(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    let array = this(rt, recv)?;
    for value in args {
        array.push(value.clone());
    }
    Ok(recv.clone())
}

fn equal(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    let lhs = this(rt, recv)?.to_vec();
    let Value::Array(rhs) = single(rt, args)? else {
        return Ok(Value::Bool(false));
    };
    let rhs = rhs.to_vec();
    if lhs.len() != rhs.len() {
        return Ok(Value::Bool(false));
    }
    for (a, b) in lhs.iter().zip(&rhs) {
        if !rt.values_equal(a, b)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn hash(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    let mut code = 0i64;
    for element in this(rt, recv)?.to_vec() {
        code = code.wrapping_mul(31).wrapping_add(rt.hash_code(&element)?);
    }
    Ok(Value::Int(code))
}

fn concat(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    let mut elements = this(rt, recv)?.to_vec();
    elements.extend(other_array(rt, single(rt, args)?)?);
    Ok(Value::array(elements))
}

fn contains(rt: &mut dyn Runtime, haystack: &[Value], needle: &Value) -> Result<bool, Rc<ErrorObject>> {
    for candidate in haystack {
        if rt.values_equal(needle, candidate)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn difference(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    let elements = this(rt, recv)?.to_vec();
    let removed = other_array(rt, single(rt, args)?)?;
    let mut kept = Vec::new();
    for element in elements {
        if !contains(rt, &removed, &element)? {
            kept.push(element);
        }
    }
    Ok(Value::array(kept))
}

fn uniq(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    let mut kept: Vec<Value> = Vec::new();
    for element in this(rt, recv)?.to_vec() {
        if !contains(rt, &kept, &element)? {
            kept.push(element);
        }
    }
    Ok(Value::array(kept))
}

fn reverse(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    let mut elements = this(rt, recv)?.to_vec();
    elements.reverse();
    Ok(Value::array(elements))
}

fn length(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Int(this(rt, recv)?.len() as i64))
}

fn inspect(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    let mut parts = Vec::new();
    for element in this(rt, recv)?.to_vec() {
        parts.push(rt.inspect(&element)?);
    }
    Ok(Value::string(format!("[{}]", parts.join(", "))))
}

fn flatten_into(
    rt: &dyn Runtime,
    array: &Rc<Array>,
    seen: &mut Vec<*const Array>,
    out: &mut Vec<Value>,
) -> Result<(), Rc<ErrorObject>> {
    if seen.contains(&Rc::as_ptr(array)) {
        return Err(rt.new_error(
            ErrorKind::Argument,
            "tried to flatten recursive array".to_string(),
        ));
    }
    seen.push(Rc::as_ptr(array));
    for element in array.to_vec() {
        match element {
            Value::Array(inner) => flatten_into(rt, &inner, seen, out)?,
            other => out.push(other),
        }
    }
    seen.pop();
    Ok(())
}

fn flatten(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    let array = this(rt, recv)?;
    let mut out = Vec::new();
    flatten_into(rt, array, &mut Vec::new(), &mut out)?;
    Ok(Value::array(out))
}

/// `shift(1)` returns the first element; `shift(n)` returns an array of up
/// to `n` leading elements. Both remove what they return.
fn shift(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    let array = this(rt, recv)?;
    let count = expect_int(rt, single(rt, args)?)?;
    if count < 0 {
        return Err(rt.new_error(ErrorKind::Argument, "negative array size".to_string()));
    }
    let mut removed = array.shift(count as usize);
    if count == 1 {
        return Ok(removed.pop().unwrap_or(Value::None));
    }
    Ok(Value::array(removed))
}

pub(crate) fn install(class: &Rc<Class>) {
    class.define_native("==", Arity::Fixed(1), equal);
    class.define_native("hash", Arity::Fixed(0), hash);
    class.define_native("at", Arity::Fixed(1), get);
    class.define_native("get", Arity::Fixed(1), get);
    class.define_native("+", Arity::Fixed(1), concat);
    class.define_native("-", Arity::Fixed(1), difference);
    class.define_native("values_at", Arity::Variadic, values_at);
    class.define_native("push", Arity::Variadic, push);
    class.define_native("insert", Arity::Fixed(2), insert);
    class.define_native("reverse", Arity::Fixed(0), reverse);
    class.define_native("length", Arity::Fixed(0), length);
    class.define_native("size", Arity::Fixed(0), length);
    class.define_native("inspect", Arity::Fixed(0), inspect);
    class.define_native("to_str", Arity::Fixed(0), inspect);
    class.define_native("flatten", Arity::Fixed(0), flatten);
    class.define_native("uniq", Arity::Fixed(0), uniq);
    class.define_native("shift", Arity::Fixed(1), shift);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::testing::{error_of, int_array, unwrap_array, TestRuntime};

    fn ints(values: &[Value]) -> Vec<i64> {
        values
            .iter()
            .map(|v| match v {
                Value::Int(n) => *n,
                other => panic!("expected int, got {other:?}"),
            })
            .collect()
    }

    #[test]
    fn get_supports_negative_indices() {
        let mut rt = TestRuntime::new();
        let array = int_array(&[10, 20, 30]);
        assert_eq!(rt.call(&array, "get", &[Value::Int(0)]).unwrap(), Value::Int(10));
        assert_eq!(rt.call(&array, "at", &[Value::Int(-1)]).unwrap(), Value::Int(30));
        assert_eq!(rt.call(&array, "get", &[Value::Int(-3)]).unwrap(), Value::Int(10));
    }

    #[test]
    fn out_of_range_raises_runtime_error() {
        let mut rt = TestRuntime::new();
        let array = int_array(&[1, 2]);
        for index in [2, -3] {
            let (class, message) = error_of(rt.call(&array, "get", &[Value::Int(index)]));
            assert_eq!(class, "RuntimeError");
            assert_eq!(message, "IndexOutOfBoundsException");
        }
        let (class, _) = error_of(rt.call(&array, "insert", &[Value::Int(5), Value::None]));
        assert_eq!(class, "RuntimeError");
    }

    #[test]
    fn non_integer_index_is_type_error() {
        let mut rt = TestRuntime::new();
        let (class, message) = error_of(rt.call(&int_array(&[1]), "get", &[Value::string("0")]));
        assert_eq!(class, "TypeError");
        assert_eq!(message, "no implicit conversion of String into Int");
    }

    #[test]
    fn insert_overwrites_and_returns_value() {
        let mut rt = TestRuntime::new();
        let array = int_array(&[1, 2, 3]);
        let result = rt.call(&array, "insert", &[Value::Int(-1), Value::Int(9)]).unwrap();
        assert_eq!(result, Value::Int(9));
        assert_eq!(ints(&unwrap_array(&array)), [1, 2, 9]);
    }

    #[test]
    fn push_is_variadic_and_returns_receiver() {
        let mut rt = TestRuntime::new();
        let array = int_array(&[]);
        let result = rt.call(&array, "push", &[Value::Int(1), Value::Int(2)]).unwrap();
        assert!(result.same(&array));
        assert_eq!(ints(&unwrap_array(&array)), [1, 2]);
    }

    #[test]
    fn concat_and_difference() {
        let mut rt = TestRuntime::new();
        let joined = rt.call(&int_array(&[1, 2]), "+", &[int_array(&[3])]).unwrap();
        assert_eq!(ints(&unwrap_array(&joined)), [1, 2, 3]);
        let (class, message) = error_of(rt.call(&int_array(&[1]), "+", &[Value::Int(3)]));
        assert_eq!(class, "TypeError");
        assert_eq!(message, "no implicit conversion of Int into Array");
        let rest = rt.call(&int_array(&[1, 2, 3, 2]), "-", &[int_array(&[2])]).unwrap();
        assert_eq!(ints(&unwrap_array(&rest)), [1, 3]);
    }

    #[test]
    fn values_at_collects_indices() {
        let mut rt = TestRuntime::new();
        let picked = rt
            .call(&int_array(&[5, 6, 7]), "values_at", &[Value::Int(2), Value::Int(0)])
            .unwrap();
        assert_eq!(ints(&unwrap_array(&picked)), [7, 5]);
    }

    #[test]
    fn structural_equality_and_hash() {
        let mut rt = TestRuntime::new();
        let a = int_array(&[1, 2]);
        let b = int_array(&[1, 2]);
        assert_eq!(rt.call(&a, "==", &[b.clone()]).unwrap(), Value::Bool(true));
        assert_eq!(rt.call(&a, "==", &[int_array(&[1])]).unwrap(), Value::Bool(false));
        assert_eq!(rt.call(&a, "==", &[Value::Int(1)]).unwrap(), Value::Bool(false));
        assert_eq!(rt.call(&a, "hash", &[]).unwrap(), rt.call(&b, "hash", &[]).unwrap());
        assert_eq!(rt.call(&a, "hash", &[]).unwrap(), Value::Int(31 + 2));
    }

    #[test]
    fn reverse_size_and_inspect() {
        let mut rt = TestRuntime::new();
        let array = int_array(&[1, 2, 3]);
        let reversed = rt.call(&array, "reverse", &[]).unwrap();
        assert_eq!(ints(&unwrap_array(&reversed)), [3, 2, 1]);
        assert_eq!(ints(&unwrap_array(&array)), [1, 2, 3]);
        assert_eq!(rt.call(&array, "length", &[]).unwrap(), Value::Int(3));
        assert_eq!(rt.call(&array, "size", &[]).unwrap(), Value::Int(3));
        assert_eq!(rt.call(&array, "inspect", &[]).unwrap(), Value::string("[1, 2, 3]"));
        assert_eq!(rt.call(&array, "to_str", &[]).unwrap(), Value::string("[1, 2, 3]"));
    }

    #[test]
    fn flatten_is_recursive() {
        let mut rt = TestRuntime::new();
        let nested = Value::array(vec![
            Value::Int(1),
            Value::array(vec![Value::Int(2), int_array(&[3, 4])]),
        ]);
        let flat = rt.call(&nested, "flatten", &[]).unwrap();
        assert_eq!(ints(&unwrap_array(&flat)), [1, 2, 3, 4]);
    }

    #[test]
    fn flatten_rejects_cycles() {
        let mut rt = TestRuntime::new();
        let array = int_array(&[1]);
        rt.call(&array, "push", &[array.clone()]).unwrap();
        let (class, _) = error_of(rt.call(&array, "flatten", &[]));
        assert_eq!(class, "ArgumentError");
    }

    #[test]
    fn uniq_keeps_first_occurrences() {
        let mut rt = TestRuntime::new();
        let unique = rt.call(&int_array(&[3, 1, 3, 2, 1]), "uniq", &[]).unwrap();
        assert_eq!(ints(&unwrap_array(&unique)), [3, 1, 2]);
    }

    #[test]
    fn shift_variants() {
        let mut rt = TestRuntime::new();
        let array = int_array(&[1, 2, 3, 4]);
        assert_eq!(rt.call(&array, "shift", &[Value::Int(1)]).unwrap(), Value::Int(1));
        let two = rt.call(&array, "shift", &[Value::Int(2)]).unwrap();
        assert_eq!(ints(&unwrap_array(&two)), [2, 3]);
        let rest = rt.call(&array, "shift", &[Value::Int(10)]).unwrap();
        assert_eq!(ints(&unwrap_array(&rest)), [4]);
        assert_eq!(rt.call(&array, "shift", &[Value::Int(1)]).unwrap(), Value::None);
        let (class, message) = error_of(rt.call(&array, "shift", &[Value::Int(-1)]));
        assert_eq!(class, "ArgumentError");
        assert_eq!(message, "negative array size");
    }
}
