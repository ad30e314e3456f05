//! Methods and call-site descriptors.
//!
//! A [`Method`] is either native (a host function) or bytecode produced by
//! the compiler. Methods are immutable once built; classes share them by
//! reference.

use std::fmt;
use std::rc::Rc;

use crate::instruction::Instruction;
use crate::runtime::NativeFn;
use crate::value::Value;

/// Number of arguments a method accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(u8),
    Variadic,
}

impl Arity {
    /// Whether a call with `argc` arguments is allowed.
    pub fn accepts(&self, argc: usize) -> bool {
        match self {
            Arity::Fixed(n) => *n as usize == argc,
            Arity::Variadic => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{n}"),
            Arity::Variadic => write!(f, "-1"),
        }
    }
}

/// A compiled method body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    /// Encoded instruction words.
    pub code: Vec<u16>,
    /// Heterogeneous constant pool.
    pub constants: Vec<Value>,
    /// Named local slots, parameters first. Its length is the local count.
    pub locals: Vec<String>,
    /// Word offset of the first handler, if the method has catch clauses.
    pub catch_offset: Option<usize>,
}

impl Bytecode {
    pub fn local_count(&self) -> usize {
        self.locals.len()
    }

    /// Decode the word at `offset`, if it exists and is valid.
    pub fn instruction(&self, offset: usize) -> Option<Instruction> {
        self.code
            .get(offset)
            .and_then(|word| Instruction::decode(*word).ok())
    }
}

/// What runs when a method is invoked.
#[derive(Clone)]
pub enum MethodBody {
    Native(NativeFn),
    Bytecode(Rc<Bytecode>),
}

/// A named, arity-checked method.
#[derive(Clone)]
pub struct Method {
    name: String,
    arity: Arity,
    body: MethodBody,
}

impl Method {
    pub fn native(name: impl Into<String>, arity: Arity, function: NativeFn) -> Self {
        Self {
            name: name.into(),
            arity,
            body: MethodBody::Native(function),
        }
    }

    pub fn bytecode(name: impl Into<String>, arity: u8, code: Bytecode) -> Self {
        Self {
            name: name.into(),
            arity: Arity::Fixed(arity),
            body: MethodBody::Bytecode(Rc::new(code)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn body(&self) -> &MethodBody {
        &self.body
    }

    /// The compiled body, if this is a bytecode method.
    pub fn as_bytecode(&self) -> Option<&Rc<Bytecode>> {
        match &self.body {
            MethodBody::Bytecode(code) => Some(code),
            MethodBody::Native(_) => None,
        }
    }

    /// Methods stored in this method's constant pool, in pool order.
    pub fn nested_methods(&self) -> impl Iterator<Item = &Rc<Method>> {
        self.as_bytecode()
            .into_iter()
            .flat_map(|code| code.constants.iter())
            .filter_map(|constant| match constant {
                Value::Method(method) => Some(method),
                _ => None,
            })
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.body {
            MethodBody::Native(_) => "native",
            MethodBody::Bytecode(_) => "bytecode",
        };
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("kind", &kind)
            .finish()
    }
}

/// Constant-pool record describing a call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInfo {
    pub name: String,
    pub argc: u8,
}

impl CallInfo {
    pub fn new(name: impl Into<String>, argc: u8) -> Self {
        Self {
            name: name.into(),
            argc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_arity_accepts_exact_count() {
        assert!(Arity::Fixed(2).accepts(2));
        assert!(!Arity::Fixed(2).accepts(1));
        assert!(Arity::Variadic.accepts(0));
        assert!(Arity::Variadic.accepts(9));
    }

    #[test]
    fn nested_methods_follow_pool_order() {
        let inner_a = Rc::new(Method::bytecode("a", 0, Bytecode::default()));
        let inner_b = Rc::new(Method::bytecode("b", 1, Bytecode::default()));
        let outer = Method::bytecode(
            "main",
            0,
            Bytecode {
                constants: vec![
                    Value::Method(Rc::clone(&inner_a)),
                    Value::Int(3),
                    Value::Method(Rc::clone(&inner_b)),
                ],
                ..Bytecode::default()
            },
        );
        let names: Vec<&str> = outer.nested_methods().map(|m| m.name()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn local_count_is_number_of_named_slots() {
        let code = Bytecode {
            locals: vec!["a".into(), "b".into()],
            ..Bytecode::default()
        };
        assert_eq!(code.local_count(), 2);
    }
}
