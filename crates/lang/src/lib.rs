//! Iracema runtime object model and instruction set.
//!
//! This crate holds everything the compiler and the VM share:
//!
//! - [`Opcode`], [`BinaryOp`] and [`Instruction`]: the 16-bit bytecode word
//! - [`Value`]: runtime values, scalars inline and compound values shared
//! - [`Class`], [`Method`], [`CallInfo`]: dispatch by name through the
//!   class chain
//! - [`ClassRegistry`]: constant names to classes, with the primordial
//!   classes and their native methods installed at construction
//! - [`Runtime`]: the callback surface native methods use to re-enter the
//!   interpreter
//!
//! Language-level errors are values ([`ErrorObject`]); host-level decode
//! failures are [`DecodeError`].

pub mod builtins;
pub mod class;
pub mod error;
pub mod hash;
pub mod instruction;
pub mod method;
pub mod object;
pub mod opcode;
pub mod registry;
pub mod runtime;
pub mod value;

// Re-export commonly used types at the crate root.
pub use class::{Class, InstanceKind};
pub use error::DecodeError;
pub use hash::Hash;
pub use instruction::Instruction;
pub use method::{Arity, Bytecode, CallInfo, Method, MethodBody};
pub use object::{Array, ArrayIterator, ErrorObject, UserObject};
pub use opcode::{BinaryOp, Opcode};
pub use registry::{ClassRegistry, ErrorKind, Primordials};
pub use runtime::{NativeFn, NativeResult, Runtime};
pub use value::Value;

#[cfg(test)]
mod proptests {
    use std::rc::Rc;

    use super::*;
    use proptest::prelude::*;

    /// Strategy that generates a random valid Instruction.
    fn arb_instruction() -> impl Strategy<Value = Instruction> {
        (prop::sample::select(&opcode::ALL_OPCODES[..]), any::<u8>()).prop_map(|(op, operand)| {
            let operand = if op == Opcode::Binary { operand % 10 } else { operand };
            Instruction::new(op, operand)
        })
    }

    fn noop(_: &mut dyn Runtime, _: &Value, _: &[Value]) -> NativeResult {
        Ok(Value::None)
    }

    proptest! {
        /// Encoding a valid instruction loses nothing.
        #[test]
        fn encode_is_lossless(instr in arb_instruction()) {
            prop_assert_eq!(Instruction::decode(instr.encode()), Ok(instr));
        }

        /// Any word either fails to decode or re-encodes to itself.
        #[test]
        fn decode_reencodes(word in any::<u16>()) {
            if let Ok(instr) = Instruction::decode(word) {
                prop_assert_eq!(instr.encode(), word);
            }
        }

        /// A child resolves a name to its parent's method unless it defines
        /// the name itself.
        #[test]
        fn lookup_is_monotonic(
            parent_names in prop::collection::hash_set("[a-e]", 0..5),
            child_names in prop::collection::hash_set("[a-e]", 0..5),
            probe in "[a-e]",
        ) {
            let parent = Class::new("Parent", None);
            let child = Class::new("Child", Some(Rc::clone(&parent)));
            for name in &parent_names {
                parent.define_native(name, Arity::Fixed(0), noop);
            }
            for name in &child_names {
                child.define_native(name, Arity::Fixed(1), noop);
            }
            let from_child = child.lookup_method(&probe);
            match parent.lookup_method(&probe) {
                Some(from_parent) if !child_names.contains(&probe) => {
                    prop_assert!(Rc::ptr_eq(&from_child.unwrap(), &from_parent));
                }
                _ => prop_assert_eq!(from_child.is_some(), child_names.contains(&probe)),
            }
        }

        /// An iterator over `n` elements yields exactly `n` values.
        #[test]
        fn iterator_exhaustion(values in prop::collection::vec(any::<i64>(), 0..40)) {
            let array = Rc::new(Array::new(values.iter().copied().map(Value::Int).collect()));
            let iter = ArrayIterator::new(array);
            let mut seen = Vec::new();
            while iter.has_next() {
                match iter.next_value() {
                    Some(Value::Int(n)) => seen.push(n),
                    other => prop_assert!(false, "unexpected {:?}", other),
                }
            }
            prop_assert_eq!(seen, values);
            prop_assert!(iter.next_value().is_none());
        }
    }
}
