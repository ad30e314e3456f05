//! Iracema verifier: static checks over compiled methods.
//!
//! The verifier checks a [`Method`] and every method nested in its constant
//! pool BEFORE execution. It collects ALL errors (not just the first) and
//! returns them.
//!
//! # Usage
//!
//! ```
//! use iracema_lang::{Bytecode, Instruction, Method, Opcode};
//! use iracema_verifier::verify;
//!
//! let code = Bytecode {
//!     code: vec![
//!         Instruction::new(Opcode::PushNone, 0).encode(),
//!         Instruction::new(Opcode::Return, 0).encode(),
//!     ],
//!     ..Bytecode::default()
//! };
//! assert!(verify(&Method::bytecode("main", 0, code)).is_ok());
//! ```
//!
//! # Passes
//!
//! 1. **Structural**: decoding, constant kinds, local and jump ranges,
//!    catch offset, terminating instruction
//! 2. **Stack**: depth consistency over the control-flow graph

pub mod error;
pub mod stack;
pub mod structural;

pub use error::VerifyError;

use iracema_lang::{Arity, Method};

/// Verify a method and everything nested in it.
///
/// Returns `Ok(())` if every method passes all checks, or
/// `Err(Vec<VerifyError>)` with all errors found.
///
/// If the structural pass finds fatal errors in a method (e.g. an
/// undecodable word), its stack pass is skipped.
pub fn verify(method: &Method) -> Result<(), Vec<VerifyError>> {
    let mut all_errors = Vec::new();
    verify_into(method, &mut all_errors);

    if all_errors.is_empty() {
        Ok(())
    } else {
        log::debug!(
            "'{}' failed verification with {} errors",
            method.name(),
            all_errors.len()
        );
        Err(all_errors)
    }
}

fn verify_into(method: &Method, all_errors: &mut Vec<VerifyError>) {
    // Natives have nothing to check.
    let Some(code) = method.as_bytecode() else {
        return;
    };
    let arity = match method.arity() {
        Arity::Fixed(n) => n,
        Arity::Variadic => 0,
    };

    // Pass 1: Structural (builds MethodContext)
    let (ctx, structural_errors) = structural::check_structural(method.name(), arity, code);
    all_errors.extend(structural_errors);

    // Pass 2: Stack, skipped on fatal structural errors
    if !ctx.fatal {
        all_errors.extend(stack::check_stack(&ctx));
    }

    for nested in method.nested_methods() {
        verify_into(nested, all_errors);
    }
}
