//! Instruction encoding and decoding.
//!
//! Every instruction is one 16-bit word:
//! ```text
//! bits 15-8: opcode (u8)
//! bits  7-0: operand (u8)
//! ```
//! The operand is a constant index, a local slot, a jump target (absolute
//! word offset), an argument count or a [`BinaryOp`], depending on the opcode.

use std::fmt;

use crate::error::DecodeError;
use crate::opcode::{BinaryOp, Opcode};

/// A single decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// The operation to perform.
    pub opcode: Opcode,
    /// Operand byte. Meaning depends on opcode.
    pub operand: u8,
}

impl Instruction {
    /// Create a new instruction.
    pub fn new(opcode: Opcode, operand: u8) -> Self {
        Self { opcode, operand }
    }

    /// Encode this instruction into a word.
    pub fn encode(&self) -> u16 {
        ((self.opcode as u16) << 8) | self.operand as u16
    }

    /// Decode a word. `BINARY` operands are validated too.
    pub fn decode(word: u16) -> Result<Self, DecodeError> {
        let opcode = Opcode::try_from((word >> 8) as u8)?;
        let operand = (word & 0xFF) as u8;
        if opcode == Opcode::Binary {
            BinaryOp::try_from(operand)?;
        }
        Ok(Self { opcode, operand })
    }

    /// The binary sub-operation, for `BINARY` instructions.
    pub fn binary_op(&self) -> Option<BinaryOp> {
        if self.opcode != Opcode::Binary {
            return None;
        }
        BinaryOp::try_from(self.operand).ok()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.opcode.mnemonic(), self.operand)
    }
}
