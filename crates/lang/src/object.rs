//! Heap-allocated runtime objects: arrays, iterators, user objects, errors.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::class::Class;
use crate::value::Value;

/// A growable, shared array.
#[derive(Debug, Default)]
pub struct Array {
    elements: RefCell<Vec<Value>>,
}

impl Array {
    pub fn new(elements: Vec<Value>) -> Self {
        Self {
            elements: RefCell::new(elements),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.elements.borrow().get(index).cloned()
    }

    /// Overwrite an existing element. Returns `false` if out of range.
    pub fn set(&self, index: usize, value: Value) -> bool {
        match self.elements.borrow_mut().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn push(&self, value: Value) {
        self.elements.borrow_mut().push(value);
    }

    /// Remove and return up to `count` leading elements.
    pub fn shift(&self, count: usize) -> Vec<Value> {
        let mut elements = self.elements.borrow_mut();
        let count = count.min(elements.len());
        elements.drain(..count).collect()
    }

    /// Snapshot of the elements. Callers iterate the copy so that user code
    /// run in between may mutate the array freely.
    pub fn to_vec(&self) -> Vec<Value> {
        self.elements.borrow().clone()
    }
}

/// Cursor over an array.
#[derive(Debug)]
pub struct ArrayIterator {
    array: Rc<Array>,
    index: Cell<usize>,
}

impl ArrayIterator {
    pub fn new(array: Rc<Array>) -> Self {
        Self {
            array,
            index: Cell::new(0),
        }
    }

    pub fn has_next(&self) -> bool {
        self.index.get() < self.array.len()
    }

    /// The next element, advancing the cursor.
    pub fn next_value(&self) -> Option<Value> {
        let value = self.array.get(self.index.get())?;
        self.index.set(self.index.get() + 1);
        Some(value)
    }
}

/// Instance of a user-defined class.
///
/// Slots are indexed by the class attribute table; a slot is `None` until
/// the attribute is first assigned on this instance.
#[derive(Debug)]
pub struct UserObject {
    class: Rc<Class>,
    slots: RefCell<Vec<Option<Value>>>,
}

impl UserObject {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            slots: RefCell::new(Vec::new()),
        }
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    /// Read an attribute. `None` if it was never assigned on this instance.
    pub fn get_attr(&self, name: &str) -> Option<Value> {
        let index = self.class.attribute_index(name)?;
        self.slots.borrow().get(index).cloned().flatten()
    }

    /// Assign an attribute, registering its name on the class.
    pub fn set_attr(&self, name: &str, value: Value) {
        let index = self.class.define_attribute(name);
        let mut slots = self.slots.borrow_mut();
        if slots.len() <= index {
            slots.resize(index + 1, None);
        }
        slots[index] = Some(value);
    }
}

/// Instance of `Error` or a descendant.
#[derive(Debug)]
pub struct ErrorObject {
    class: Rc<Class>,
    message: RefCell<String>,
}

impl ErrorObject {
    pub fn new(class: Rc<Class>, message: impl Into<String>) -> Self {
        Self {
            class,
            message: RefCell::new(message.into()),
        }
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    pub fn message(&self) -> String {
        self.message.borrow().clone()
    }

    pub fn set_message(&self, message: impl Into<String>) {
        *self.message.borrow_mut() = message.into();
    }
}
