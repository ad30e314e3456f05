//! The class registry and the primordial classes built at startup.

use std::collections::HashMap;
use std::rc::Rc;

use crate::builtins;
use crate::class::{Class, InstanceKind};
use crate::object::ErrorObject;

/// Built-in error classes the runtime raises on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    Name,
    NoMethod,
    Argument,
    Runtime,
    Type,
    ZeroDivision,
    Regexp,
}

/// Classes installed before any user code runs.
#[derive(Debug, Clone)]
pub struct Primordials {
    pub object: Rc<Class>,
    pub class: Rc<Class>,
    pub script: Rc<Class>,
    pub int: Rc<Class>,
    pub float: Rc<Class>,
    pub bool: Rc<Class>,
    pub none: Rc<Class>,
    pub string: Rc<Class>,
    pub array: Rc<Class>,
    pub hash: Rc<Class>,
    pub iterator: Rc<Class>,
    pub method: Rc<Class>,
    pub call_info: Rc<Class>,
    pub error: Rc<Class>,
    pub name_error: Rc<Class>,
    pub no_method_error: Rc<Class>,
    pub argument_error: Rc<Class>,
    pub runtime_error: Rc<Class>,
    pub type_error: Rc<Class>,
    pub zero_division_error: Rc<Class>,
    pub regexp_error: Rc<Class>,
}

impl Primordials {
    fn build() -> Self {
        let object = Class::with_instance_kind("Object", None, InstanceKind::Object);
        let sub = |name: &str, kind: InstanceKind| {
            Class::with_instance_kind(name, Some(Rc::clone(&object)), kind)
        };
        let class = sub("Class", InstanceKind::Builtin);
        let script = sub("Script", InstanceKind::Object);
        let int = sub("Int", InstanceKind::Builtin);
        let float = sub("Float", InstanceKind::Builtin);
        let bool = sub("Bool", InstanceKind::Builtin);
        let none = sub("None", InstanceKind::Builtin);
        let string = sub("String", InstanceKind::Builtin);
        let array = sub("Array", InstanceKind::Array);
        let hash = sub("Hash", InstanceKind::Hash);
        let iterator = sub("Iterator", InstanceKind::Builtin);
        let method = sub("Method", InstanceKind::Builtin);
        let call_info = sub("CallInfo", InstanceKind::Builtin);
        let error = sub("Error", InstanceKind::Error);

        let child = |name: &str, parent: &Rc<Class>| Class::new(name, Some(Rc::clone(parent)));
        let name_error = child("NameError", &error);
        let no_method_error = child("NoMethodError", &name_error);
        let argument_error = child("ArgumentError", &error);
        let runtime_error = child("RuntimeError", &error);
        let type_error = child("TypeError", &runtime_error);
        let zero_division_error = child("ZeroDivisionError", &runtime_error);
        let regexp_error = child("RegexpError", &error);

        Self {
            object,
            class,
            script,
            int,
            float,
            bool,
            none,
            string,
            array,
            hash,
            iterator,
            method,
            call_info,
            error,
            name_error,
            no_method_error,
            argument_error,
            runtime_error,
            type_error,
            zero_division_error,
            regexp_error,
        }
    }

    fn all(&self) -> [&Rc<Class>; 21] {
        [
            &self.object,
            &self.class,
            &self.script,
            &self.int,
            &self.float,
            &self.bool,
            &self.none,
            &self.string,
            &self.array,
            &self.hash,
            &self.iterator,
            &self.method,
            &self.call_info,
            &self.error,
            &self.name_error,
            &self.no_method_error,
            &self.argument_error,
            &self.runtime_error,
            &self.type_error,
            &self.zero_division_error,
            &self.regexp_error,
        ]
    }
}

/// Maps constant names to classes. Owned by one VM; grows monotonically
/// as object declarations run.
#[derive(Debug)]
pub struct ClassRegistry {
    classes: HashMap<String, Rc<Class>>,
    primordials: Primordials,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassRegistry {
    /// Build the primordial classes and install their native methods.
    pub fn new() -> Self {
        let primordials = Primordials::build();
        builtins::install(&primordials);
        let classes = primordials
            .all()
            .into_iter()
            .map(|class| (class.name().to_string(), Rc::clone(class)))
            .collect();
        Self {
            classes,
            primordials,
        }
    }

    pub fn primordials(&self) -> &Primordials {
        &self.primordials
    }

    /// The class bound to `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<Rc<Class>> {
        self.classes.get(name).cloned()
    }

    /// Bind `class` under its own name, replacing any previous binding.
    pub fn register(&mut self, class: Rc<Class>) {
        self.bind(class.name().to_string(), class);
    }

    /// Bind `class` under an arbitrary constant name.
    pub fn bind(&mut self, name: String, class: Rc<Class>) {
        log::debug!("binding constant {name} to class {}", class.name());
        self.classes.insert(name, class);
    }

    /// The class used for an [`ErrorKind`].
    pub fn error_class(&self, kind: ErrorKind) -> &Rc<Class> {
        let p = &self.primordials;
        match kind {
            ErrorKind::Error => &p.error,
            ErrorKind::Name => &p.name_error,
            ErrorKind::NoMethod => &p.no_method_error,
            ErrorKind::Argument => &p.argument_error,
            ErrorKind::Runtime => &p.runtime_error,
            ErrorKind::Type => &p.type_error,
            ErrorKind::ZeroDivision => &p.zero_division_error,
            ErrorKind::Regexp => &p.regexp_error,
        }
    }

    /// A fresh error object of the given kind.
    pub fn new_error(&self, kind: ErrorKind, message: impl Into<String>) -> Rc<ErrorObject> {
        Rc::new(ErrorObject::new(Rc::clone(self.error_class(kind)), message))
    }

    /// `NoMethodError` for a failed lookup.
    pub fn no_method_error(&self, name: &str, class: &Class) -> Rc<ErrorObject> {
        self.new_error(
            ErrorKind::NoMethod,
            format!("undefined method '{name}' for {}", class.name()),
        )
    }

    /// `ArgumentError` for a call with the wrong number of arguments.
    pub fn arity_error(&self, given: usize, expected: usize) -> Rc<ErrorObject> {
        self.new_error(
            ErrorKind::Argument,
            format!("wrong number of arguments (given {given}, expected {expected})"),
        )
    }

    /// `NameError` for an unbound constant.
    pub fn name_error(&self, name: &str) -> Rc<ErrorObject> {
        self.new_error(ErrorKind::Name, format!("uninitialized constant {name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primordials_are_registered_by_name() {
        let registry = ClassRegistry::new();
        for name in [
            "Object",
            "Int",
            "Float",
            "Bool",
            "String",
            "None",
            "Array",
            "Hash",
            "Error",
            "NameError",
            "NoMethodError",
            "ArgumentError",
            "RuntimeError",
            "TypeError",
            "ZeroDivisionError",
            "RegexpError",
        ] {
            let class = registry.lookup(name).unwrap();
            assert_eq!(class.name(), name);
        }
        assert!(registry.lookup("Point").is_none());
    }

    #[test]
    fn error_hierarchy() {
        let registry = ClassRegistry::new();
        let p = registry.primordials();
        assert!(p.no_method_error.is_a(&p.name_error));
        assert!(p.type_error.is_a(&p.runtime_error));
        assert!(p.zero_division_error.is_a(&p.runtime_error));
        assert!(p.zero_division_error.is_a(&p.error));
        assert!(p.error.is_a(&p.object));
        assert!(!p.argument_error.is_a(&p.runtime_error));
    }

    #[test]
    fn every_chain_ends_at_object() {
        let registry = ClassRegistry::new();
        for class in registry.primordials().all() {
            let root = class.ancestors().last().unwrap();
            assert_eq!(root.name(), "Object");
        }
    }

    #[test]
    fn register_replaces_binding() {
        let mut registry = ClassRegistry::new();
        let object = Rc::clone(&registry.primordials().object);
        let first = Class::new("Point", Some(Rc::clone(&object)));
        let second = Class::new("Point", Some(object));
        registry.register(Rc::clone(&first));
        registry.register(Rc::clone(&second));
        assert!(Rc::ptr_eq(&registry.lookup("Point").unwrap(), &second));
    }

    #[test]
    fn error_messages() {
        let registry = ClassRegistry::new();
        let int = Rc::clone(&registry.primordials().int);
        assert_eq!(
            registry.no_method_error("foo", &int).message(),
            "undefined method 'foo' for Int"
        );
        assert_eq!(
            registry.arity_error(1, 2).message(),
            "wrong number of arguments (given 1, expected 2)"
        );
        let error = registry.name_error("Missing");
        assert_eq!(error.message(), "uninitialized constant Missing");
        assert_eq!(error.class().name(), "NameError");
    }
}
