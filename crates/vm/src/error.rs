//! Host-level errors for the Iracema VM.
//!
//! Language errors raised by a running program are values and are caught by
//! handlers inside the program. A `VmError` ends the run: either an error
//! escaped every frame, or the machine itself could not continue.

use iracema_lang::DecodeError;
use thiserror::Error;

/// Errors that stop execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// A language error unwound past the top frame.
    #[error("{class}: {message}")]
    Uncaught { class: String, message: String },

    /// The shared value stack is full.
    #[error("stack overflow (limit {limit} slots)")]
    StackOverflow { limit: usize },

    /// A pop below the current frame's window.
    #[error("stack underflow at {at} in '{method}'")]
    StackUnderflow { method: String, at: usize },

    /// A word that does not decode.
    #[error("invalid instruction at {at} in '{method}': {reason}")]
    InvalidInstruction {
        method: String,
        at: usize,
        reason: DecodeError,
    },

    /// The instruction pointer left the method.
    #[error("execution ran off the end of '{method}' at {at}")]
    CodeOutOfBounds { method: String, at: usize },

    /// A constant operand that is missing or of the wrong kind.
    #[error("bad constant {index} at {at} in '{method}': expected {expected}")]
    BadConstant {
        method: String,
        at: usize,
        index: u8,
        expected: &'static str,
    },

    /// A local operand past the end of the local table.
    #[error("local {index} out of range at {at} in '{method}'")]
    BadLocal { method: String, at: usize, index: u8 },

    /// The method given to [`crate::Vm::run`] has no bytecode body.
    #[error("method '{method}' is native and cannot be run as a program")]
    NotBytecode { method: String },

    /// An instruction executed with no frame on the call stack.
    #[error("no active frame")]
    NoFrame,
}
