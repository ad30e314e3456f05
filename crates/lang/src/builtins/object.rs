//! Natives every class inherits from `Object`.

use std::rc::Rc;

use super::single;
use crate::class::Class;
use crate::method::Arity;
use crate::registry::ErrorKind;
use crate::runtime::{NativeResult, Runtime};
use crate::value::Value;

fn equal(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    let rhs = single(rt, args)?;
    Ok(Value::Bool(recv.same(rhs)))
}

/// `!=` negates whatever `==` the receiver's class defines.
fn not_equal(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    let rhs = single(rt, args)?;
    Ok(Value::Bool(!rt.values_equal(recv, rhs)?))
}

fn identity(_: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Int(recv.identity()))
}

fn inspect(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    let class = rt.class_name(recv);
    Ok(Value::string(format!("#<{class}:{:#x}>", recv.identity())))
}

fn script_inspect(_: &mut dyn Runtime, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::string("script"))
}

fn is_nil(_: &mut dyn Runtime, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Bool(false))
}

fn init(_: &mut dyn Runtime, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::None)
}

/// Write the `inspect` of each argument on its own line.
fn puts(rt: &mut dyn Runtime, _: &Value, args: &[Value]) -> NativeResult {
    let mut lines = Vec::with_capacity(args.len().max(1));
    for arg in args {
        lines.push(rt.inspect(arg)?);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    for line in lines {
        if let Err(e) = writeln!(rt.output(), "{line}") {
            return Err(rt.new_error(ErrorKind::Runtime, format!("puts failed: {e}")));
        }
    }
    Ok(Value::None)
}

pub(crate) fn install(class: &Rc<Class>) {
    class.define_native("==", Arity::Fixed(1), equal);
    class.define_native("!=", Arity::Fixed(1), not_equal);
    class.define_native("hash", Arity::Fixed(0), identity);
    class.define_native("object_id", Arity::Fixed(0), identity);
    class.define_native("inspect", Arity::Fixed(0), inspect);
    class.define_native("nil?", Arity::Fixed(0), is_nil);
    class.define_native("init", Arity::Fixed(0), init);
    class.define_native("puts", Arity::Variadic, puts);
}

/// The top-level receiver prints as `script`.
pub(crate) fn install_script(class: &Rc<Class>) {
    class.define_native("inspect", Arity::Fixed(0), script_inspect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::testing::{error_of, int_array, TestRuntime};

    #[test]
    fn equality_is_identity() {
        let mut rt = TestRuntime::new();
        let a = int_array(&[1]);
        let class = Value::Class(Rc::clone(&rt.registry.primordials().object));
        assert_eq!(rt.call(&class, "==", &[class.clone()]).unwrap(), Value::Bool(true));
        assert_eq!(rt.call(&class, "==", &[a.clone()]).unwrap(), Value::Bool(false));
        assert_eq!(rt.call(&class, "!=", &[a]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn not_equal_uses_class_equality() {
        let mut rt = TestRuntime::new();
        // Int overrides `==`, so `!=` compares by value.
        assert_eq!(rt.call(&Value::Int(3), "!=", &[Value::Int(3)]).unwrap(), Value::Bool(false));
        assert_eq!(rt.call(&Value::Int(3), "!=", &[Value::Int(4)]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn inspect_shows_class_and_address() {
        let mut rt = TestRuntime::new();
        let iterator_class = Rc::clone(&rt.registry.primordials().iterator);
        let array = Rc::new(crate::object::Array::new(vec![]));
        let iter = Value::Iterator(Rc::new(crate::object::ArrayIterator::new(array)));
        let Value::String(text) = rt.call(&iter, "inspect", &[]).unwrap() else {
            panic!("inspect must return a string");
        };
        let text = String::from_utf8(text.to_vec()).unwrap();
        assert!(text.starts_with(&format!("#<{}:0x", iterator_class.name())));
        assert!(text.ends_with('>'));
    }

    #[test]
    fn puts_writes_one_line_per_argument() {
        let mut rt = TestRuntime::new();
        let result = rt
            .call(&Value::None, "puts", &[Value::Int(1), Value::string("two"), Value::Bool(true)])
            .unwrap();
        assert_eq!(result, Value::None);
        assert_eq!(rt.output_text(), "1\ntwo\ntrue\n");
    }

    #[test]
    fn puts_without_arguments_writes_empty_line() {
        let mut rt = TestRuntime::new();
        rt.call(&Value::None, "puts", &[]).unwrap();
        assert_eq!(rt.output_text(), "\n");
    }

    #[test]
    fn fixed_arity_is_enforced() {
        let mut rt = TestRuntime::new();
        let (class, message) = error_of(rt.call(&Value::None, "nil?", &[Value::Int(1)]));
        assert_eq!(class, "ArgumentError");
        assert_eq!(message, "wrong number of arguments (given 1, expected 0)");
    }

    #[test]
    fn missing_method_is_no_method_error() {
        let mut rt = TestRuntime::new();
        let (class, message) = error_of(rt.call(&Value::Int(1), "frobnicate", &[]));
        assert_eq!(class, "NoMethodError");
        assert_eq!(message, "undefined method 'frobnicate' for Int");
    }
}
