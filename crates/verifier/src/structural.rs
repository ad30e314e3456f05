//! Structural validation pass for compiled methods.
//!
//! Decodes every word, checks operands against the constant pool, the local
//! table and the code length, and builds the [`MethodContext`] used by the
//! stack pass.

use iracema_lang::{Bytecode, Instruction, Opcode, Value};

use crate::error::VerifyError;

/// A method's decoded instructions, consumed by later passes.
#[derive(Debug, Clone)]
pub struct MethodContext<'a> {
    pub name: &'a str,
    pub code: &'a Bytecode,
    /// One entry per word. Empty when any word failed to decode.
    pub instrs: Vec<Instruction>,
    /// Whether a structural error makes the stack pass meaningless.
    pub fatal: bool,
}

impl MethodContext<'_> {
    /// Argument count of the call-info a call instruction refers to.
    pub fn call_argc(&self, instr: &Instruction) -> Option<usize> {
        match self.code.constants.get(instr.operand as usize) {
            Some(Value::CallInfo(info)) => Some(info.argc as usize),
            _ => None,
        }
    }
}

/// Kind of constant an opcode expects, or `None` if its operand is not a
/// pool index.
fn expected_constant(opcode: Opcode) -> Option<&'static str> {
    match opcode {
        Opcode::Push => Some("literal"),
        Opcode::MatchType
        | Opcode::GetConstant
        | Opcode::SetConstant
        | Opcode::GetAttr
        | Opcode::SetAttr => Some("name"),
        Opcode::CallMethod | Opcode::CallSuper => Some("call-info"),
        Opcode::DefineObject | Opcode::DefineFunction => Some("method"),
        _ => None,
    }
}

fn constant_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "literal" => matches!(
            value,
            Value::None | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_)
        ),
        "name" => matches!(value, Value::String(_)),
        "call-info" => matches!(value, Value::CallInfo(_)),
        "method" => matches!(value, Value::Method(_)),
        _ => false,
    }
}

/// Run the structural validation pass.
///
/// Returns the MethodContext and any errors found.
pub fn check_structural<'a>(
    name: &'a str,
    arity: u8,
    code: &'a Bytecode,
) -> (MethodContext<'a>, Vec<VerifyError>) {
    let mut errors = Vec::new();
    let mut instrs = Vec::with_capacity(code.code.len());
    let mut fatal = false;
    let method = || name.to_string();
    let len = code.code.len();

    if len == 0 {
        errors.push(VerifyError::EmptyMethod { method: method() });
        fatal = true;
    }

    if (arity as usize) > code.local_count() {
        errors.push(VerifyError::ArityExceedsLocals {
            method: method(),
            arity,
            local_count: code.local_count(),
        });
    }

    for (at, &word) in code.code.iter().enumerate() {
        let instr = match Instruction::decode(word) {
            Ok(instr) => instr,
            Err(reason) => {
                errors.push(VerifyError::InvalidInstruction {
                    method: method(),
                    at,
                    word,
                    reason,
                });
                fatal = true;
                continue;
            }
        };
        let operand = instr.operand as usize;

        if let Some(expected) = expected_constant(instr.opcode) {
            match code.constants.get(operand) {
                None => {
                    errors.push(VerifyError::ConstantOutOfRange {
                        method: method(),
                        at,
                        index: instr.operand,
                        pool_size: code.constants.len(),
                    });
                    fatal = true;
                }
                Some(value) if !constant_matches(expected, value) => {
                    errors.push(VerifyError::ConstantKind {
                        method: method(),
                        at,
                        opcode: instr.opcode.mnemonic(),
                        expected,
                        found: value.to_string(),
                    });
                    fatal = true;
                }
                Some(_) => {}
            }
        }

        if instr.opcode.uses_local() && operand >= code.local_count() {
            errors.push(VerifyError::LocalOutOfRange {
                method: method(),
                at,
                index: instr.operand,
                local_count: code.local_count(),
            });
        }

        if instr.opcode.is_jump() && operand >= len {
            errors.push(VerifyError::JumpOutOfRange {
                method: method(),
                at,
                target: operand,
                len,
            });
            fatal = true;
        }

        if instr.opcode == Opcode::Iterate {
            let paired = code
                .instruction(at + 1)
                .is_some_and(|next| next.opcode == Opcode::JumpIfFalse);
            if !paired {
                errors.push(VerifyError::UnpairedIterate {
                    method: method(),
                    at,
                });
                fatal = true;
            }
        }

        instrs.push(instr);
    }

    if let Some(last) = code.code.last() {
        let ends = Instruction::decode(*last)
            .is_ok_and(|instr| matches!(instr.opcode, Opcode::Return | Opcode::Throw));
        if !ends {
            errors.push(VerifyError::MissingReturn { method: method() });
        }
    }

    if let Some(offset) = code.catch_offset {
        if code.instruction(offset).map(|i| i.opcode) != Some(Opcode::MatchType) {
            errors.push(VerifyError::BadCatchOffset {
                method: method(),
                offset,
            });
            fatal = true;
        }
    }

    if fatal {
        instrs.clear();
    }
    (
        MethodContext {
            name,
            code,
            instrs,
            fatal,
        },
        errors,
    )
}
