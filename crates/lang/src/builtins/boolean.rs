//! `Bool` natives.

use std::rc::Rc;

use super::receiver_error;
use crate::class::Class;
use crate::method::Arity;
use crate::runtime::{NativeResult, Runtime};
use crate::value::Value;

fn inspect(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    match recv {
        Value::Bool(b) => Ok(Value::string(if *b { "true" } else { "false" })),
        other => Err(receiver_error(rt, "Bool", other)),
    }
}

pub(crate) fn install(class: &Rc<Class>) {
    class.define_native("inspect", Arity::Fixed(0), inspect);
}
