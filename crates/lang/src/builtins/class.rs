//! Natives of class values: allocation and naming.

use std::rc::Rc;

use super::receiver_error;
use crate::class::{Class, InstanceKind};
use crate::hash::Hash;
use crate::method::Arity;
use crate::object::{ErrorObject, UserObject};
use crate::registry::ErrorKind;
use crate::runtime::{NativeResult, Runtime};
use crate::value::Value;

fn this<'a>(rt: &dyn Runtime, recv: &'a Value) -> Result<&'a Rc<Class>, Rc<ErrorObject>> {
    match recv {
        Value::Class(class) => Ok(class),
        other => Err(receiver_error(rt, "Class", other)),
    }
}

/// Allocate an instance and run its `init` with the arguments.
fn new(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    let class = this(rt, recv)?;
    let instance = match class.instance_kind() {
        InstanceKind::Object => Value::Object(Rc::new(UserObject::new(Rc::clone(class)))),
        InstanceKind::Error => Value::Error(Rc::new(ErrorObject::new(Rc::clone(class), ""))),
        InstanceKind::Array => Value::array(Vec::new()),
        InstanceKind::Hash => Value::Hash(Rc::new(Hash::new())),
        InstanceKind::Builtin => {
            return Err(rt.new_error(
                ErrorKind::Type,
                format!("allocator undefined for {}", class.name()),
            ));
        }
    };
    rt.call_method(&instance, "init", args)?;
    Ok(instance)
}

fn name(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::string(this(rt, recv)?.name()))
}

pub(crate) fn install(class: &Rc<Class>) {
    class.define_native("new", Arity::Variadic, new);
    class.define_native("name", Arity::Fixed(0), name);
    class.define_native("inspect", Arity::Fixed(0), name);
}
