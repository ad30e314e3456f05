//! Iracema virtual machine: executes compiled methods.
//!
//! The VM is a stack-based machine with:
//! - One value stack shared by all frames, each frame owning a window of
//!   locals and operands
//! - A chain of call frames for bytecode methods
//! - A class registry holding the primordial and user-defined classes
//! - Error unwinding through per-method handler sequences
//!
//! # Usage
//!
//! ```
//! use iracema_lang::Value;
//! use iracema_vm::Vm;
//!
//! let (file, errors) = iracema_syntax::parse_str("1 + 2");
//! assert!(errors.is_empty());
//! let main = iracema_compiler::compile(&file).unwrap();
//!
//! let mut vm = Vm::new(Vec::new());
//! assert_eq!(vm.run(&main).unwrap(), Value::Int(3));
//! ```

pub mod error;
pub mod execute;
pub mod machine;

pub use error::VmError;
pub use machine::{Vm, VmOptions, DEFAULT_STACK_SIZE};

use std::io::Write;
use std::rc::Rc;

use iracema_lang::{Method, Value};

/// Run a top-level method on a fresh VM with default options.
///
/// # Errors
///
/// Returns [`VmError::Uncaught`] if a language error escapes every handler,
/// or another [`VmError`] if the machine cannot continue (stack overflow,
/// malformed bytecode).
pub fn run<W: Write>(main: &Rc<Method>, output: W) -> Result<Value, VmError> {
    Vm::new(output).run(main)
}
