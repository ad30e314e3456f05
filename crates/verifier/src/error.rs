//! Verification errors for the Iracema verifier.
//!
//! Every error names the method it was found in, and instruction-level
//! errors carry the word offset (`at`). The verifier collects ALL errors,
//! not just the first.

use iracema_lang::DecodeError;
use thiserror::Error;

/// Errors found during static verification of a compiled method.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    // --- Structural ---
    /// A word that does not decode to an instruction.
    #[error("invalid instruction {word:#06x} at {at} in '{method}': {reason}")]
    InvalidInstruction {
        method: String,
        at: usize,
        word: u16,
        reason: DecodeError,
    },

    /// The method has no instructions at all.
    #[error("method '{method}' has no instructions")]
    EmptyMethod { method: String },

    /// Control can fall off the end of the method.
    #[error("method '{method}' does not end with RETURN or THROW")]
    MissingReturn { method: String },

    /// A constant operand past the end of the pool.
    #[error("constant {index} out of range at {at} in '{method}' (pool size {pool_size})")]
    ConstantOutOfRange {
        method: String,
        at: usize,
        index: u8,
        pool_size: usize,
    },

    /// A constant of the wrong kind for its opcode.
    #[error("{opcode} at {at} in '{method}' expects a {expected} constant, found {found}")]
    ConstantKind {
        method: String,
        at: usize,
        opcode: &'static str,
        expected: &'static str,
        found: String,
    },

    /// A local operand past the end of the local table.
    #[error("local {index} out of range at {at} in '{method}' ({local_count} locals)")]
    LocalOutOfRange {
        method: String,
        at: usize,
        index: u8,
        local_count: usize,
    },

    /// A jump to an offset outside the method.
    #[error("jump target {target} out of range at {at} in '{method}' (length {len})")]
    JumpOutOfRange {
        method: String,
        at: usize,
        target: usize,
        len: usize,
    },

    /// The handler offset does not start a `MATCH_TYPE` sequence.
    #[error("catch offset {offset} in '{method}' does not point at MATCH_TYPE")]
    BadCatchOffset { method: String, offset: usize },

    /// Fewer local slots than parameters.
    #[error("method '{method}' has arity {arity} but only {local_count} locals")]
    ArityExceedsLocals {
        method: String,
        arity: u8,
        local_count: usize,
    },

    /// `ITERATE` must be followed by the `JUMP_IF_FALSE` that consumes its flag.
    #[error("ITERATE at {at} in '{method}' is not followed by JUMP_IF_FALSE")]
    UnpairedIterate { method: String, at: usize },

    // --- Stack ---
    /// An instruction pops more values than the operand stack holds.
    #[error("stack underflow at {at} in '{method}'")]
    StackUnderflow { method: String, at: usize },

    /// Two control-flow paths reach an instruction with different depths.
    #[error("inconsistent stack depth at {at} in '{method}': {first} vs {second}")]
    InconsistentDepth {
        method: String,
        at: usize,
        first: usize,
        second: usize,
    },

    /// `RETURN` with anything but the return value on the operand stack.
    #[error("unbalanced stack at RETURN ({at}) in '{method}': depth {depth}, expected 1")]
    UnbalancedReturn {
        method: String,
        at: usize,
        depth: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_variants_display() {
        let m = || "main".to_string();
        let errors: Vec<VerifyError> = vec![
            VerifyError::InvalidInstruction {
                method: m(),
                at: 0,
                word: 0,
                reason: DecodeError::IllegalOpcode,
            },
            VerifyError::EmptyMethod { method: m() },
            VerifyError::MissingReturn { method: m() },
            VerifyError::ConstantOutOfRange {
                method: m(),
                at: 0,
                index: 3,
                pool_size: 1,
            },
            VerifyError::ConstantKind {
                method: m(),
                at: 0,
                opcode: "CALL_METHOD",
                expected: "call-info",
                found: "1".to_string(),
            },
            VerifyError::LocalOutOfRange {
                method: m(),
                at: 0,
                index: 1,
                local_count: 0,
            },
            VerifyError::JumpOutOfRange {
                method: m(),
                at: 0,
                target: 9,
                len: 2,
            },
            VerifyError::BadCatchOffset {
                method: m(),
                offset: 1,
            },
            VerifyError::ArityExceedsLocals {
                method: m(),
                arity: 2,
                local_count: 1,
            },
            VerifyError::UnpairedIterate { method: m(), at: 0 },
            VerifyError::StackUnderflow { method: m(), at: 0 },
            VerifyError::InconsistentDepth {
                method: m(),
                at: 0,
                first: 1,
                second: 2,
            },
            VerifyError::UnbalancedReturn {
                method: m(),
                at: 0,
                depth: 2,
            },
        ];
        for e in &errors {
            let msg = e.to_string();
            assert!(!msg.is_empty());
            assert!(msg.contains("main"), "missing method name: {msg}");
        }
    }

    #[test]
    fn invalid_instruction_display() {
        let e = VerifyError::InvalidInstruction {
            method: "f".to_string(),
            at: 3,
            word: 0x1363,
            reason: DecodeError::InvalidBinaryOp(0x63),
        };
        assert_eq!(
            e.to_string(),
            "invalid instruction 0x1363 at 3 in 'f': invalid binary operator: 99"
        );
    }

    #[test]
    fn unbalanced_return_display() {
        let e = VerifyError::UnbalancedReturn {
            method: "main".to_string(),
            at: 4,
            depth: 0,
        };
        assert_eq!(
            e.to_string(),
            "unbalanced stack at RETURN (4) in 'main': depth 0, expected 1"
        );
    }
}
