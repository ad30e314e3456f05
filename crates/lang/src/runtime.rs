//! The interface native methods use to call back into the interpreter.

use std::io::Write;
use std::rc::Rc;

use crate::object::ErrorObject;
use crate::registry::{ClassRegistry, ErrorKind};
use crate::value::Value;

/// Result of a native method. `Err` carries the raised language error and
/// starts unwinding in the dispatch loop.
pub type NativeResult = Result<Value, Rc<ErrorObject>>;

/// Host function backing a native method: `(runtime, receiver, args)`.
pub type NativeFn = fn(&mut dyn Runtime, &Value, &[Value]) -> NativeResult;

/// Services the interpreter offers to native methods.
pub trait Runtime {
    /// The class registry of the running VM.
    fn registry(&self) -> &ClassRegistry;

    /// Dispatch `name` on `receiver`, running bytecode methods to
    /// completion before returning.
    fn call_method(&mut self, receiver: &Value, name: &str, args: &[Value]) -> NativeResult;

    /// Where `puts` writes.
    fn output(&mut self) -> &mut dyn Write;

    /// A fresh error object of the given kind.
    fn new_error(&self, kind: ErrorKind, message: String) -> Rc<ErrorObject> {
        self.registry().new_error(kind, message)
    }

    /// Name of the class of `value`, for error messages.
    fn class_name(&self, value: &Value) -> String {
        value.class(self.registry()).name().to_string()
    }

    /// Render a value through its `inspect` method.
    fn inspect(&mut self, value: &Value) -> Result<String, Rc<ErrorObject>> {
        match self.call_method(value, "inspect", &[])? {
            Value::String(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            other => Err(self.new_error(
                ErrorKind::Type,
                format!("inspect returned {} instead of String", self.class_name(&other)),
            )),
        }
    }

    /// Hash code of a value through its `hash` method.
    fn hash_code(&mut self, value: &Value) -> Result<i64, Rc<ErrorObject>> {
        match self.call_method(value, "hash", &[])? {
            Value::Int(code) => Ok(code),
            other => Err(self.new_error(
                ErrorKind::Type,
                format!("hash returned {} instead of Int", self.class_name(&other)),
            )),
        }
    }

    /// Language-level equality: `lhs == rhs`, by truthiness of the result.
    fn values_equal(&mut self, lhs: &Value, rhs: &Value) -> Result<bool, Rc<ErrorObject>> {
        let result = self.call_method(lhs, "==", std::slice::from_ref(rhs))?;
        Ok(result.is_truthy())
    }
}
