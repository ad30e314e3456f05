//! Decode errors for Iracema instruction words.

use thiserror::Error;

/// Errors that occur while decoding an instruction word.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Opcode 0x00 is illegal and always rejected.
    #[error("illegal opcode 0x00")]
    IllegalOpcode,

    /// Opcode byte does not name any instruction.
    #[error("invalid opcode: {0:#04x}")]
    InvalidOpcode(u8),

    /// `BINARY` operand does not name an arithmetic or comparison operator.
    #[error("invalid binary operator: {0}")]
    InvalidBinaryOp(u8),
}
