//! `Hash` natives and the key protocol shared with `BUILD_HASH`.

use std::rc::Rc;

use super::{pair, receiver_error, single};
use crate::class::Class;
use crate::hash::Hash;
use crate::method::Arity;
use crate::object::ErrorObject;
use crate::runtime::{NativeResult, Runtime};
use crate::value::Value;

fn this<'a>(rt: &dyn Runtime, recv: &'a Value) -> Result<&'a Rc<Hash>, Rc<ErrorObject>> {
    match recv {
        Value::Hash(hash) => Ok(hash),
        other => Err(receiver_error(rt, "Hash", other)),
    }
}

/// Hash code of `key` and the chain position of an equal key, if present.
fn find(
    rt: &mut dyn Runtime,
    hash: &Hash,
    key: &Value,
) -> Result<(i64, Option<usize>), Rc<ErrorObject>> {
    let code = rt.hash_code(key)?;
    for (position, candidate) in hash.candidates(code) {
        if rt.values_equal(key, &candidate)? {
            return Ok((code, Some(position)));
        }
    }
    Ok((code, None))
}

/// Store `value` under `key`, replacing the value of an equal key.
pub fn insert(
    rt: &mut dyn Runtime,
    hash: &Hash,
    key: Value,
    value: Value,
) -> Result<(), Rc<ErrorObject>> {
    let (code, position) = find(rt, hash, &key)?;
    match position {
        Some(position) if hash.replace_at(code, position, value.clone()) => {}
        _ => hash.insert_new(code, key, value),
    }
    Ok(())
}

/// The value stored under a key equal to `key`.
pub fn lookup(rt: &mut dyn Runtime, hash: &Hash, key: &Value) -> Result<Option<Value>, Rc<ErrorObject>> {
    match find(rt, hash, key)? {
        (code, Some(position)) => Ok(hash.value_at(code, position)),
        (_, None) => Ok(None),
    }
}

fn put(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    let hash = this(rt, recv)?;
    let (key, value) = pair(rt, args)?;
    insert(rt, hash, key.clone(), value.clone())?;
    Ok(value.clone())
}

fn get(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    let hash = this(rt, recv)?;
    let key = single(rt, args)?;
    Ok(lookup(rt, hash, key)?.unwrap_or(Value::None))
}

fn has_key(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    let hash = this(rt, recv)?;
    let key = single(rt, args)?;
    Ok(Value::Bool(find(rt, hash, key)?.1.is_some()))
}

fn keys(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    let entries = this(rt, recv)?.entries();
    Ok(Value::array(entries.into_iter().map(|(key, _)| key).collect()))
}

fn values(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    let entries = this(rt, recv)?.entries();
    Ok(Value::array(entries.into_iter().map(|(_, value)| value).collect()))
}

fn size(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Int(this(rt, recv)?.len() as i64))
}

fn values_at(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    let hash = this(rt, recv)?;
    let mut found = Vec::with_capacity(args.len());
    for key in args {
        found.push(lookup(rt, hash, key)?.unwrap_or(Value::None));
    }
    Ok(Value::array(found))
}

fn inspect(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    let mut parts = Vec::new();
    for (key, value) in this(rt, recv)?.entries() {
        parts.push(format!("{}: {}", rt.inspect(&key)?, rt.inspect(&value)?));
    }
    Ok(Value::string(format!("{{{}}}", parts.join(", "))))
}

pub(crate) fn install(class: &Rc<Class>) {
    class.define_native("put", Arity::Fixed(2), put);
    class.define_native("insert", Arity::Fixed(2), put);
    class.define_native("get", Arity::Fixed(1), get);
    class.define_native("key?", Arity::Fixed(1), has_key);
    class.define_native("keys", Arity::Fixed(0), keys);
    class.define_native("values", Arity::Fixed(0), values);
    class.define_native("size", Arity::Fixed(0), size);
    class.define_native("values_at", Arity::Variadic, values_at);
    class.define_native("inspect", Arity::Fixed(0), inspect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::testing::{int_array, unwrap_array, TestRuntime};

    fn new_hash() -> Value {
        Value::Hash(Rc::new(Hash::new()))
    }

    #[test]
    fn put_then_get() {
        let mut rt = TestRuntime::new();
        let hash = new_hash();
        let stored = rt
            .call(&hash, "put", &[Value::string("a"), Value::Int(1)])
            .unwrap();
        assert_eq!(stored, Value::Int(1));
        assert_eq!(rt.call(&hash, "get", &[Value::string("a")]).unwrap(), Value::Int(1));
        assert_eq!(rt.call(&hash, "get", &[Value::string("b")]).unwrap(), Value::None);
    }

    #[test]
    fn equal_keys_share_an_entry() {
        let mut rt = TestRuntime::new();
        let hash = new_hash();
        rt.call(&hash, "insert", &[Value::Int(1), Value::string("one")]).unwrap();
        rt.call(&hash, "insert", &[Value::Int(1), Value::string("uno")]).unwrap();
        // Int and Float hash differently, so 1.0 is a distinct key.
        rt.call(&hash, "insert", &[Value::Float(1.0), Value::string("float")]).unwrap();
        assert_eq!(rt.call(&hash, "size", &[]).unwrap(), Value::Int(2));
        assert_eq!(rt.call(&hash, "get", &[Value::Int(1)]).unwrap(), Value::string("uno"));
    }

    #[test]
    fn arrays_are_keys_by_content() {
        let mut rt = TestRuntime::new();
        let hash = new_hash();
        rt.call(&hash, "put", &[int_array(&[1, 2]), Value::Bool(true)]).unwrap();
        assert_eq!(
            rt.call(&hash, "key?", &[int_array(&[1, 2])]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            rt.call(&hash, "key?", &[int_array(&[2, 1])]).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn keys_values_and_values_at() {
        let mut rt = TestRuntime::new();
        let hash = new_hash();
        for n in 1..=3 {
            rt.call(&hash, "put", &[Value::Int(n), Value::Int(n * 100)]).unwrap();
        }
        let keys = unwrap_array(&rt.call(&hash, "keys", &[]).unwrap());
        let values = unwrap_array(&rt.call(&hash, "values", &[]).unwrap());
        assert_eq!(keys, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(values, vec![Value::Int(100), Value::Int(200), Value::Int(300)]);
        let picked = rt
            .call(&hash, "values_at", &[Value::Int(3), Value::Int(9)])
            .unwrap();
        assert_eq!(unwrap_array(&picked), vec![Value::Int(300), Value::None]);
    }

    #[test]
    fn survives_growth() {
        let mut rt = TestRuntime::new();
        let hash = new_hash();
        for n in 0..100 {
            rt.call(&hash, "put", &[Value::Int(n), Value::Int(-n)]).unwrap();
        }
        assert_eq!(rt.call(&hash, "size", &[]).unwrap(), Value::Int(100));
        for n in 0..100 {
            assert_eq!(rt.call(&hash, "get", &[Value::Int(n)]).unwrap(), Value::Int(-n));
        }
    }

    #[test]
    fn inspect_renders_pairs() {
        let mut rt = TestRuntime::new();
        let hash = new_hash();
        rt.call(&hash, "put", &[Value::string("a"), Value::Int(1)]).unwrap();
        assert_eq!(rt.call(&hash, "inspect", &[]).unwrap(), Value::string("{a: 1}"));
        assert_eq!(
            rt.call(&new_hash(), "inspect", &[]).unwrap(),
            Value::string("{}")
        );
    }
}
