//! Classes: named method tables with single inheritance.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::method::{Arity, Method};
use crate::runtime::NativeFn;

/// What `Class#new` allocates for instances of a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceKind {
    /// A [`UserObject`](crate::object::UserObject) with attribute slots.
    Object,
    /// An [`ErrorObject`](crate::object::ErrorObject) with a message.
    Error,
    /// An empty array.
    Array,
    /// An empty hash.
    Hash,
    /// Instances only come from literals or the runtime.
    Builtin,
}

/// A class: name, optional parent, method table and attribute table.
///
/// Method and attribute tables grow while the program runs (`DEFINE_FUNCTION`
/// and first assignment of an attribute), hence the interior mutability.
pub struct Class {
    name: String,
    parent: Option<Rc<Class>>,
    methods: RefCell<HashMap<String, Rc<Method>>>,
    attributes: RefCell<Vec<String>>,
    instance_kind: Option<InstanceKind>,
}

impl Class {
    /// Create a class that inherits its instance kind from `parent`.
    pub fn new(name: impl Into<String>, parent: Option<Rc<Class>>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            parent,
            methods: RefCell::new(HashMap::new()),
            attributes: RefCell::new(Vec::new()),
            instance_kind: None,
        })
    }

    /// Create a class with an explicit instance kind.
    pub fn with_instance_kind(
        name: impl Into<String>,
        parent: Option<Rc<Class>>,
        kind: InstanceKind,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            parent,
            methods: RefCell::new(HashMap::new()),
            attributes: RefCell::new(Vec::new()),
            instance_kind: Some(kind),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Rc<Class>> {
        self.parent.as_ref()
    }

    /// Iterate over this class and its ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &Class> {
        std::iter::successors(Some(self), |class| class.parent.as_deref())
    }

    /// Install (or replace) a method under its own name.
    pub fn define_method(&self, method: Rc<Method>) {
        self.methods
            .borrow_mut()
            .insert(method.name().to_string(), method);
    }

    /// Install a native method.
    pub fn define_native(&self, name: &str, arity: Arity, function: NativeFn) {
        self.define_method(Rc::new(Method::native(name, arity, function)));
    }

    /// A method defined directly on this class, ignoring ancestors.
    pub fn own_method(&self, name: &str) -> Option<Rc<Method>> {
        self.methods.borrow().get(name).cloned()
    }

    /// Walk the class chain and return the first method named `name`.
    pub fn lookup_method(&self, name: &str) -> Option<Rc<Method>> {
        self.ancestors().find_map(|class| class.own_method(name))
    }

    /// Like [`Class::lookup_method`], also returning the defining class.
    pub fn lookup_method_with_owner(self: &Rc<Self>, name: &str) -> Option<(Rc<Class>, Rc<Method>)> {
        let mut current = Some(Rc::clone(self));
        while let Some(class) = current {
            if let Some(method) = class.own_method(name) {
                return Some((class, method));
            }
            current = class.parent.clone();
        }
        None
    }

    /// Whether `self` is `other` or descends from it.
    pub fn is_a(&self, other: &Class) -> bool {
        self.ancestors().any(|class| std::ptr::eq(class, other))
    }

    /// The instance kind, inherited from the nearest ancestor declaring one.
    pub fn instance_kind(&self) -> InstanceKind {
        self.ancestors()
            .find_map(|class| class.instance_kind)
            .unwrap_or(InstanceKind::Builtin)
    }

    /// Slot index of an attribute, if the class has seen it.
    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes.borrow().iter().position(|attr| attr == name)
    }

    /// Slot index of an attribute, registering it on first use.
    pub fn define_attribute(&self, name: &str) -> usize {
        if let Some(index) = self.attribute_index(name) {
            return index;
        }
        let mut attributes = self.attributes.borrow_mut();
        attributes.push(name.to_string());
        attributes.len() - 1
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.clone()))
            .finish()
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
