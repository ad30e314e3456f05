//! Natives of `Error` and its descendants.

use std::rc::Rc;

use super::{receiver_error, single};
use crate::class::Class;
use crate::method::Arity;
use crate::object::ErrorObject;
use crate::runtime::{NativeResult, Runtime};
use crate::value::Value;

fn this<'a>(rt: &dyn Runtime, recv: &'a Value) -> Result<&'a Rc<ErrorObject>, Rc<ErrorObject>> {
    match recv {
        Value::Error(error) => Ok(error),
        other => Err(receiver_error(rt, "Error", other)),
    }
}

/// Strings are taken as-is; anything else is rendered with `inspect`.
fn init(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    let error = Rc::clone(this(rt, recv)?);
    let message = match single(rt, args)? {
        Value::String(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        other => rt.inspect(other)?,
    };
    error.set_message(message);
    Ok(Value::None)
}

fn message(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::string(this(rt, recv)?.message()))
}

pub(crate) fn install(class: &Rc<Class>) {
    class.define_native("init", Arity::Fixed(1), init);
    class.define_native("message", Arity::Fixed(0), message);
    class.define_native("inspect", Arity::Fixed(0), message);
    class.define_native("to_str", Arity::Fixed(0), message);
}
