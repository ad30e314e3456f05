//! Disassembler: compiled method → listing text.
//!
//! One listing per fragment: the method itself, then every method nested in
//! its constant pool, depth first in pool order. Offsets are byte offsets
//! (word index × 2), as are printed jump targets.

use std::fmt::Write;

use iracema_lang::{Bytecode, Instruction, Method, Opcode, Value};

/// Disassemble `method` and all methods nested in it.
pub fn disassemble(method: &Method) -> String {
    let mut out = String::new();
    listing(method, &mut out);
    out
}

fn listing(method: &Method, out: &mut String) {
    let Some(code) = method.as_bytecode() else {
        return;
    };
    let name = method.name();
    let rule = "=".repeat(40usize.saturating_sub(name.len() + 10));
    let _ = writeln!(out, "== disasm: {name} {rule}");
    for (index, word) in code.code.iter().enumerate() {
        let _ = write!(out, "{:04} ", index * 2);
        match Instruction::decode(*word) {
            Ok(instr) => match detail(code, &instr) {
                Some(detail) => {
                    let _ = writeln!(out, "{:<30}{detail}", instr.opcode.mnemonic());
                }
                None => {
                    let _ = writeln!(out, "{}", instr.opcode.mnemonic());
                }
            },
            Err(e) => {
                let _ = writeln!(out, "{:<30}{e}", format!("{word:#06x}"));
            }
        }
    }
    out.push('\n');

    for nested in method.nested_methods() {
        listing(nested, out);
    }
}

fn detail(code: &Bytecode, instr: &Instruction) -> Option<String> {
    let operand = instr.operand as usize;
    let constant = || code.constants.get(operand);
    let text = match instr.opcode {
        Opcode::Push => constant()?.to_string(),
        Opcode::MatchType
        | Opcode::GetConstant
        | Opcode::SetConstant
        | Opcode::GetAttr
        | Opcode::SetAttr => match constant()? {
            Value::String(name) => String::from_utf8_lossy(name).into_owned(),
            other => other.to_string(),
        },
        Opcode::CallMethod | Opcode::CallSuper => constant()?.to_string(),
        Opcode::DefineObject | Opcode::DefineFunction => match constant()? {
            Value::Method(method) => method.name().to_string(),
            other => other.to_string(),
        },
        Opcode::SetLocal | Opcode::GetLocal => {
            format!("{}@{}", code.locals.get(operand)?, operand)
        }
        Opcode::Binary => instr.binary_op()?.name().to_string(),
        Opcode::Jump | Opcode::JumpIfFalse | Opcode::JumpIfTrue => (operand * 2).to_string(),
        Opcode::BuildArray | Opcode::BuildHash => format!("size: {operand}"),
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use iracema_lang::CallInfo;
    use std::rc::Rc;

    fn word(opcode: Opcode, operand: u8) -> u16 {
        Instruction::new(opcode, operand).encode()
    }

    #[test]
    fn header_and_lines() {
        let bytecode = Bytecode {
            code: vec![
                word(Opcode::Push, 0),
                word(Opcode::SetLocal, 0),
                word(Opcode::PushSelf, 0),
                word(Opcode::GetLocal, 0),
                word(Opcode::CallMethod, 1),
                word(Opcode::Return, 0),
            ],
            constants: vec![
                Value::string("hi"),
                Value::CallInfo(Rc::new(CallInfo::new("puts", 1))),
            ],
            locals: vec!["a".to_string()],
            catch_offset: None,
        };
        let text = disassemble(&Method::bytecode("main", 0, bytecode));
        let expected = "\
== disasm: main ==========================
0000 PUSH                          \"hi\"
0002 SET_LOCAL                     a@0
0004 PUSH_SELF
0006 GET_LOCAL                     a@0
0008 CALL_METHOD                   name: puts argc: 1
0010 RETURN

";
        assert_eq!(text, expected);
    }

    #[test]
    fn jumps_print_byte_targets() {
        let bytecode = Bytecode {
            code: vec![
                word(Opcode::PushNone, 0),
                word(Opcode::JumpIfFalse, 3),
                word(Opcode::Jump, 0),
                word(Opcode::PushNone, 0),
                word(Opcode::Return, 0),
            ],
            ..Bytecode::default()
        };
        let text = disassemble(&Method::bytecode("loop", 0, bytecode));
        assert!(text.contains("0002 JUMP_IF_FALSE                 6\n"));
        assert!(text.contains("0004 JUMP                          0\n"));
    }

    #[test]
    fn binary_prints_sub_operation() {
        let bytecode = Bytecode {
            code: vec![word(Opcode::Binary, 8), word(Opcode::Return, 0)],
            ..Bytecode::default()
        };
        let text = disassemble(&Method::bytecode("cmp", 0, bytecode));
        assert!(text.contains("0000 BINARY                        lt\n"));
    }

    #[test]
    fn nested_methods_follow_their_parent() {
        let inner = Method::bytecode(
            "x",
            0,
            Bytecode {
                code: vec![word(Opcode::GetAttr, 0), word(Opcode::Return, 0)],
                constants: vec![Value::string("x")],
                ..Bytecode::default()
            },
        );
        let outer = Method::bytecode(
            "main",
            0,
            Bytecode {
                code: vec![word(Opcode::DefineFunction, 0), word(Opcode::Return, 0)],
                constants: vec![Value::Method(Rc::new(inner))],
                ..Bytecode::default()
            },
        );
        let text = disassemble(&outer);
        let main_at = text.find("== disasm: main").unwrap();
        let x_at = text.find("== disasm: x ").unwrap();
        assert!(main_at < x_at);
        assert!(text.contains("0000 DEFINE_FUNCTION               x\n"));
        assert!(text.contains("0000 GET_ATTR                      x\n"));
    }

    #[test]
    fn invalid_words_are_marked() {
        let bytecode = Bytecode {
            code: vec![0x0000],
            ..Bytecode::default()
        };
        let text = disassemble(&Method::bytecode("bad", 0, bytecode));
        assert!(text.contains("0000 0x0000"));
    }
}
