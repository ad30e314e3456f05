//! `String` natives. Strings are byte strings; `inspect` is the string itself.

use std::rc::Rc;

use super::{receiver_error, single};
use crate::class::Class;
use crate::method::Arity;
use crate::object::ErrorObject;
use crate::registry::ErrorKind;
use crate::runtime::{NativeResult, Runtime};
use crate::value::Value;

fn bytes<'a>(rt: &dyn Runtime, recv: &'a Value) -> Result<&'a [u8], Rc<ErrorObject>> {
    recv.as_bytes().ok_or_else(|| receiver_error(rt, "String", recv))
}

fn equal(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    let lhs = bytes(rt, recv)?;
    let rhs = single(rt, args)?;
    Ok(Value::Bool(rhs.as_bytes() == Some(lhs)))
}

fn concat(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    let lhs = bytes(rt, recv)?;
    let rhs = single(rt, args)?;
    let Some(rhs) = rhs.as_bytes() else {
        return Err(rt.new_error(
            ErrorKind::Type,
            format!("no implicit conversion of {} into String", rt.class_name(rhs)),
        ));
    };
    Ok(Value::string([lhs, rhs].concat()))
}

fn size(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Int(bytes(rt, recv)?.len() as i64))
}

/// `31 * h + byte` over the bytes, wrapping.
fn hash(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    let code = bytes(rt, recv)?
        .iter()
        .fold(0i64, |h, b| h.wrapping_mul(31).wrapping_add(i64::from(*b)));
    Ok(Value::Int(code))
}

fn inspect(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    bytes(rt, recv)?;
    Ok(recv.clone())
}

pub(crate) fn install(class: &Rc<Class>) {
    class.define_native("==", Arity::Fixed(1), equal);
    class.define_native("+", Arity::Fixed(1), concat);
    class.define_native("size", Arity::Fixed(0), size);
    class.define_native("hash", Arity::Fixed(0), hash);
    class.define_native("inspect", Arity::Fixed(0), inspect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::testing::{error_of, TestRuntime};

    #[test]
    fn equality_compares_bytes() {
        let mut rt = TestRuntime::new();
        let a = Value::string("iracema");
        assert_eq!(rt.call(&a, "==", &[Value::string("iracema")]).unwrap(), Value::Bool(true));
        assert_eq!(rt.call(&a, "==", &[Value::string("other")]).unwrap(), Value::Bool(false));
        assert_eq!(rt.call(&a, "==", &[Value::Int(1)]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn concatenation() {
        let mut rt = TestRuntime::new();
        let joined = rt
            .call(&Value::string("ira"), "+", &[Value::string("cema")])
            .unwrap();
        assert_eq!(joined, Value::string("iracema"));
        let (class, message) = error_of(rt.call(&Value::string("a"), "+", &[Value::Int(1)]));
        assert_eq!(class, "TypeError");
        assert_eq!(message, "no implicit conversion of Int into String");
    }

    #[test]
    fn size_counts_bytes() {
        let mut rt = TestRuntime::new();
        assert_eq!(rt.call(&Value::string("héllo"), "size", &[]).unwrap(), Value::Int(6));
    }

    #[test]
    fn equal_strings_hash_equally() {
        let mut rt = TestRuntime::new();
        let a = rt.call(&Value::string("key"), "hash", &[]).unwrap();
        let b = rt.call(&Value::string("key"), "hash", &[]).unwrap();
        assert_eq!(a, b);
        assert_eq!(rt.call(&Value::string("a"), "hash", &[]).unwrap(), Value::Int(97));
    }

    #[test]
    fn inspect_is_the_string_itself() {
        let mut rt = TestRuntime::new();
        assert_eq!(rt.call(&Value::string("hi"), "inspect", &[]).unwrap(), Value::string("hi"));
    }
}
