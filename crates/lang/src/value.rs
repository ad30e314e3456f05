//! Runtime value representation for the Iracema VM.
//!
//! Scalars (`none`, booleans, integers, floats) are stored inline; every
//! compound value is a shared reference so that aliasing through several
//! local slots observes the same object.

use std::fmt;
use std::rc::Rc;

use crate::class::Class;
use crate::hash::Hash;
use crate::method::{CallInfo, Method};
use crate::object::{Array, ArrayIterator, ErrorObject, UserObject};
use crate::registry::ClassRegistry;

/// Runtime value representation.
#[derive(Debug, Clone)]
pub enum Value {
    /// The `none` singleton.
    None,
    /// `true` or `false`.
    Bool(bool),
    /// Machine-word signed integer.
    Int(i64),
    /// IEEE 754 64-bit float.
    Float(f64),
    /// Immutable byte string.
    String(Rc<[u8]>),
    /// Growable array.
    Array(Rc<Array>),
    /// Hash table keyed through `hash` and `==`.
    Hash(Rc<Hash>),
    /// Instance of a user-defined class.
    Object(Rc<UserObject>),
    /// A class.
    Class(Rc<Class>),
    /// A method, as stored in constant pools.
    Method(Rc<Method>),
    /// Instance of `Error` or one of its descendants.
    Error(Rc<ErrorObject>),
    /// Cursor over an array, created by `NEW_ITERATOR`.
    Iterator(Rc<ArrayIterator>),
    /// Call-site descriptor, as stored in constant pools.
    CallInfo(Rc<CallInfo>),
}

// Scalars and strings compare by value; every other variant compares by
// identity. Language-level equality goes through the `==` method instead.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            _ => self.same(other),
        }
    }
}

impl Value {
    /// Build a string value from text.
    pub fn string(text: impl AsRef<[u8]>) -> Self {
        Value::String(Rc::from(text.as_ref()))
    }

    /// Build an array value from elements.
    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(Array::new(elements)))
    }

    /// `none` and `false` are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::None | Value::Bool(false))
    }

    /// Identity comparison: scalars by value, references by pointer.
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Hash(a), Value::Hash(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Method(a), Value::Method(b)) => Rc::ptr_eq(a, b),
            (Value::Error(a), Value::Error(b)) => Rc::ptr_eq(a, b),
            (Value::Iterator(a), Value::Iterator(b)) => Rc::ptr_eq(a, b),
            (Value::CallInfo(a), Value::CallInfo(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Identity number consistent with [`Value::same`].
    pub fn identity(&self) -> i64 {
        fn address<T: ?Sized>(rc: &Rc<T>) -> i64 {
            Rc::as_ptr(rc) as *const () as usize as i64
        }
        match self {
            Value::None => 0,
            Value::Bool(b) => i64::from(*b) + 1,
            Value::Int(n) => *n,
            Value::Float(f) => f.to_bits() as i64,
            Value::String(s) => address(s),
            Value::Array(a) => address(a),
            Value::Hash(h) => address(h),
            Value::Object(o) => address(o),
            Value::Class(c) => address(c),
            Value::Method(m) => address(m),
            Value::Error(e) => address(e),
            Value::Iterator(i) => address(i),
            Value::CallInfo(c) => address(c),
        }
    }

    /// The class of this value.
    pub fn class(&self, registry: &ClassRegistry) -> Rc<Class> {
        let p = registry.primordials();
        let class = match self {
            Value::None => &p.none,
            Value::Bool(_) => &p.bool,
            Value::Int(_) => &p.int,
            Value::Float(_) => &p.float,
            Value::String(_) => &p.string,
            Value::Array(_) => &p.array,
            Value::Hash(_) => &p.hash,
            Value::Object(object) => return Rc::clone(object.class()),
            Value::Class(_) => &p.class,
            Value::Method(_) => &p.method,
            Value::Error(error) => return Rc::clone(error.class()),
            Value::Iterator(_) => &p.iterator,
            Value::CallInfo(_) => &p.call_info,
        };
        Rc::clone(class)
    }

    /// Whether this value's class is `class` or one of its descendants.
    pub fn is_a(&self, class: &Class, registry: &ClassRegistry) -> bool {
        self.class(registry).is_a(class)
    }

    /// Whether this value is an `Int` or a `Float`.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// The string contents, if this is a string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::String(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Host-side rendering used in diagnostics and the disassembler.
/// Language-level rendering goes through the `inspect` method.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{}", format_float(*x)),
            Value::String(s) => write!(f, "{:?}", String::from_utf8_lossy(s)),
            Value::Array(a) => write!(f, "<array of {}>", a.len()),
            Value::Hash(h) => write!(f, "<hash of {}>", h.len()),
            Value::Object(o) => write!(f, "<{} object>", o.class().name()),
            Value::Class(c) => write!(f, "{}", c.name()),
            Value::Method(m) => write!(f, "<method {}>", m.name()),
            Value::Error(e) => write!(f, "{}: {}", e.class().name(), e.message()),
            Value::Iterator(_) => write!(f, "<iterator>"),
            Value::CallInfo(ci) => write!(f, "name: {} argc: {}", ci.name, ci.argc),
        }
    }
}

/// Shortest round-trip decimal, always with a fractional part.
pub fn format_float(x: f64) -> String {
    let text = x.to_string();
    if x.is_finite() && !text.contains(|c| c == '.' || c == 'e') {
        format!("{text}.0")
    } else {
        text
    }
}
