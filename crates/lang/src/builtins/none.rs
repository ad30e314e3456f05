//! The `None` class and its single value's natives.

use std::rc::Rc;

use crate::class::Class;
use crate::method::Arity;
use crate::runtime::{NativeResult, Runtime};
use crate::value::Value;

fn inspect(_: &mut dyn Runtime, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::string("none"))
}

fn is_none(_: &mut dyn Runtime, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Bool(true))
}

pub(crate) fn install(class: &Rc<Class>) {
    class.define_native("inspect", Arity::Fixed(0), inspect);
    class.define_native("none?", Arity::Fixed(0), is_none);
}
