//! Native methods of the primordial classes.
//!
//! Each submodule installs the methods of one class family. Natives receive
//! arguments already checked against their declared arity by the caller.

use std::rc::Rc;

use crate::object::ErrorObject;
use crate::registry::{ErrorKind, Primordials};
use crate::runtime::Runtime;
use crate::value::Value;

pub mod array;
mod boolean;
mod class;
mod exception;
pub mod hash;
mod none;
pub mod numeric;
mod object;
mod string;

/// Install every native method on the primordial classes.
pub(crate) fn install(p: &Primordials) {
    object::install(&p.object);
    object::install_script(&p.script);
    class::install(&p.class);
    numeric::install(&p.int, &p.float);
    boolean::install(&p.bool);
    none::install(&p.none);
    string::install(&p.string);
    array::install(&p.array);
    hash::install(&p.hash);
    exception::install(&p.error);
}

/// The single argument of a one-argument native.
pub(crate) fn single<'a>(
    rt: &dyn Runtime,
    args: &'a [Value],
) -> Result<&'a Value, Rc<ErrorObject>> {
    match args {
        [value] => Ok(value),
        _ => Err(rt.registry().arity_error(args.len(), 1)),
    }
}

/// The two arguments of a two-argument native.
pub(crate) fn pair<'a>(
    rt: &dyn Runtime,
    args: &'a [Value],
) -> Result<(&'a Value, &'a Value), Rc<ErrorObject>> {
    match args {
        [first, second] => Ok((first, second)),
        _ => Err(rt.registry().arity_error(args.len(), 2)),
    }
}

/// An `Int` argument, or `TypeError`.
pub(crate) fn expect_int(rt: &dyn Runtime, value: &Value) -> Result<i64, Rc<ErrorObject>> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(rt.new_error(
            ErrorKind::Type,
            format!("no implicit conversion of {} into Int", rt.class_name(other)),
        )),
    }
}

/// `TypeError` for a receiver of the wrong kind. Only reachable when a
/// native is invoked on a value of an unrelated class.
pub(crate) fn receiver_error(rt: &dyn Runtime, expected: &str, got: &Value) -> Rc<ErrorObject> {
    rt.new_error(
        ErrorKind::Type,
        format!("expected {expected} receiver, got {}", rt.class_name(got)),
    )
}
