//! Iracema bytecode compiler: syntax tree to methods.
//!
//! # Usage
//!
//! ```
//! use iracema_compiler::{compile, disassemble};
//!
//! let (file, errors) = iracema_syntax::parse_str("1 + 2");
//! assert!(errors.is_empty());
//! let main = compile(&file).unwrap();
//! assert!(disassemble(&main).starts_with("== disasm: main "));
//! ```
//!
//! The file body becomes a method named `main`. Every object body and
//! function is a method of its own, stored in the constant pool of the
//! method that declares it. Jumps are resolved per method once all of its
//! basic blocks are known.

pub mod error;

mod compiler;
mod disassembler;
mod expr;
mod fragment;

pub use disassembler::disassemble;
pub use error::CompileError;

use std::rc::Rc;

use iracema_lang::Method;
use iracema_syntax::ast::File;

/// Compile a parsed file into its root method.
///
/// Stops at the first error.
pub fn compile(file: &File) -> Result<Rc<Method>, CompileError> {
    let method = compiler::Compiler::compile_file(file)?;
    log::debug!(
        "compiled {} top-level statements, {} nested methods",
        file.stmts.len(),
        method.nested_methods().count()
    );
    Ok(Rc::new(method))
}
