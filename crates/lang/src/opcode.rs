//! Opcode definitions for the Iracema bytecode.
//!
//! The high byte of every instruction word is an [`Opcode`]; for `BINARY`
//! the low byte is a [`BinaryOp`].

use crate::error::DecodeError;

/// Identifies the operation to perform.
///
/// The `#[repr(u8)]` attribute gives each variant a stable byte value.
/// Zero is never assigned so that a zeroed word cannot decode.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Stack
    /// Discard the top of stack.
    Pop = 0x01,
    /// Push constant `k`.
    Push = 0x02,
    /// Push the `none` singleton.
    PushNone = 0x03,
    /// Push `self`.
    PushSelf = 0x04,

    // Operators
    /// Pop a value, push the negation of its truthiness.
    UnaryNot = 0x10,
    /// Pop a value, dispatch `uadd` on it.
    UnaryAdd = 0x11,
    /// Pop a value, dispatch `usub` on it.
    UnarySub = 0x12,
    /// Pop rhs and lhs, apply the [`BinaryOp`] in the operand.
    Binary = 0x13,

    // Variables
    /// Pop into local slot `i`.
    SetLocal = 0x20,
    /// Push local slot `i`.
    GetLocal = 0x21,
    /// Pop into attribute `C[k]` of `self`.
    SetAttr = 0x22,
    /// Push attribute `C[k]` of `self`.
    GetAttr = 0x23,
    /// Pop a class and bind it to the constant named `C[k]`.
    SetConstant = 0x24,
    /// Push the class named `C[k]`.
    GetConstant = 0x25,

    // Construction
    /// Pop `n` values, push an array of them in order.
    BuildArray = 0x30,
    /// Pop `n` key/value pairs, push a hash of them.
    BuildHash = 0x31,
    /// Pop a value, push an iterator over it.
    NewIterator = 0x32,
    /// Advance the iterator on top of the stack.
    Iterate = 0x33,

    // Control flow
    /// Jump to absolute word offset.
    Jump = 0x40,
    /// Pop, jump if falsy.
    JumpIfFalse = 0x41,
    /// Pop, jump if truthy.
    JumpIfTrue = 0x42,

    // Calls
    /// Call the method described by call-info `C[k]`.
    CallMethod = 0x50,
    /// Call the same-named method on the parent of the owning class.
    CallSuper = 0x51,
    /// Pop the return value and leave the frame.
    Return = 0x52,

    // Definitions
    /// Create a class from body method `C[k]` and run the body.
    DefineObject = 0x60,
    /// Install method `C[k]` on `self`.
    DefineFunction = 0x61,

    // Errors
    /// Peek the error on top, push whether it is-a class `C[k]`.
    MatchType = 0x70,
    /// Pop an error and start unwinding.
    Throw = 0x71,
}

/// All valid opcodes, in definition order. Useful for exhaustive testing.
pub const ALL_OPCODES: [Opcode; 28] = [
    Opcode::Pop,
    Opcode::Push,
    Opcode::PushNone,
    Opcode::PushSelf,
    Opcode::UnaryNot,
    Opcode::UnaryAdd,
    Opcode::UnarySub,
    Opcode::Binary,
    Opcode::SetLocal,
    Opcode::GetLocal,
    Opcode::SetAttr,
    Opcode::GetAttr,
    Opcode::SetConstant,
    Opcode::GetConstant,
    Opcode::BuildArray,
    Opcode::BuildHash,
    Opcode::NewIterator,
    Opcode::Iterate,
    Opcode::Jump,
    Opcode::JumpIfFalse,
    Opcode::JumpIfTrue,
    Opcode::CallMethod,
    Opcode::CallSuper,
    Opcode::Return,
    Opcode::DefineObject,
    Opcode::DefineFunction,
    Opcode::MatchType,
    Opcode::Throw,
];

impl TryFrom<u8> for Opcode {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value == 0x00 {
            return Err(DecodeError::IllegalOpcode);
        }
        ALL_OPCODES
            .iter()
            .copied()
            .find(|op| *op as u8 == value)
            .ok_or(DecodeError::InvalidOpcode(value))
    }
}

impl Opcode {
    /// Returns the disassembly mnemonic for this opcode.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Pop => "POP",
            Opcode::Push => "PUSH",
            Opcode::PushNone => "PUSH_NONE",
            Opcode::PushSelf => "PUSH_SELF",
            Opcode::UnaryNot => "UNARY_NOT",
            Opcode::UnaryAdd => "UNARY_ADD",
            Opcode::UnarySub => "UNARY_SUB",
            Opcode::Binary => "BINARY",
            Opcode::SetLocal => "SET_LOCAL",
            Opcode::GetLocal => "GET_LOCAL",
            Opcode::SetAttr => "SET_ATTR",
            Opcode::GetAttr => "GET_ATTR",
            Opcode::SetConstant => "SET_CONSTANT",
            Opcode::GetConstant => "GET_CONSTANT",
            Opcode::BuildArray => "BUILD_ARRAY",
            Opcode::BuildHash => "BUILD_HASH",
            Opcode::NewIterator => "NEW_ITERATOR",
            Opcode::Iterate => "ITERATE",
            Opcode::Jump => "JUMP",
            Opcode::JumpIfFalse => "JUMP_IF_FALSE",
            Opcode::JumpIfTrue => "JUMP_IF_TRUE",
            Opcode::CallMethod => "CALL_METHOD",
            Opcode::CallSuper => "CALL_SUPER",
            Opcode::Return => "RETURN",
            Opcode::DefineObject => "DEFINE_OBJECT",
            Opcode::DefineFunction => "DEFINE_FUNCTION",
            Opcode::MatchType => "MATCH_TYPE",
            Opcode::Throw => "THROW",
        }
    }

    /// Whether the operand is an absolute jump target.
    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            Opcode::Jump | Opcode::JumpIfFalse | Opcode::JumpIfTrue
        )
    }

    /// Whether the operand indexes the constant pool.
    pub fn uses_constant(&self) -> bool {
        matches!(
            self,
            Opcode::Push
                | Opcode::SetAttr
                | Opcode::GetAttr
                | Opcode::SetConstant
                | Opcode::GetConstant
                | Opcode::CallMethod
                | Opcode::CallSuper
                | Opcode::DefineObject
                | Opcode::DefineFunction
                | Opcode::MatchType
        )
    }

    /// Whether the operand indexes the local slots.
    pub fn uses_local(&self) -> bool {
        matches!(self, Opcode::SetLocal | Opcode::GetLocal)
    }

    /// Whether control never falls through to the next instruction.
    pub fn is_terminator(&self) -> bool {
        matches!(self, Opcode::Jump | Opcode::Return | Opcode::Throw)
    }
}

/// Arithmetic and comparison sub-operations of `BINARY`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add = 0,
    Sub = 1,
    Mul = 2,
    Div = 3,
    Eq = 4,
    Ne = 5,
    Gt = 6,
    Ge = 7,
    Lt = 8,
    Le = 9,
}

/// All binary operators, in operand order.
pub const ALL_BINARY_OPS: [BinaryOp; 10] = [
    BinaryOp::Add,
    BinaryOp::Sub,
    BinaryOp::Mul,
    BinaryOp::Div,
    BinaryOp::Eq,
    BinaryOp::Ne,
    BinaryOp::Gt,
    BinaryOp::Ge,
    BinaryOp::Lt,
    BinaryOp::Le,
];

impl TryFrom<u8> for BinaryOp {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ALL_BINARY_OPS
            .get(value as usize)
            .copied()
            .ok_or(DecodeError::InvalidBinaryOp(value))
    }
}

impl BinaryOp {
    /// The method dispatched when an operand is not numeric.
    pub fn method_name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
        }
    }

    /// Sub-operation name used by the disassembler.
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
        }
    }

    /// Whether the operator yields a boolean.
    pub fn is_comparison(&self) -> bool {
        !matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div
        )
    }
}
