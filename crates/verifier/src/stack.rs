//! Stack balance analysis for compiled methods.
//!
//! Depths are counted from the top of the locals window. Every reachable
//! instruction gets exactly one depth; paths that meet must agree. The body
//! starts empty, the handler sequence starts with the caught error, and
//! every `RETURN` must see exactly the return value.

use iracema_lang::{Instruction, Opcode};

use crate::error::VerifyError;
use crate::structural::MethodContext;

/// Run the stack balance check.
pub fn check_stack(ctx: &MethodContext<'_>) -> Vec<VerifyError> {
    let mut errors = Vec::new();
    let len = ctx.instrs.len();
    if ctx.fatal || len == 0 {
        return errors;
    }

    let mut depths: Vec<Option<usize>> = vec![None; len];
    let mut worklist = Vec::new();
    enter(ctx, &mut depths, &mut worklist, &mut errors, 0, 0);
    if let Some(offset) = ctx.code.catch_offset {
        enter(ctx, &mut depths, &mut worklist, &mut errors, offset, 1);
    }

    while let Some(pc) = worklist.pop() {
        let Some(depth) = depths[pc] else {
            continue;
        };
        let instr = &ctx.instrs[pc];
        let pops = stack_pops(ctx, instr);
        if depth < pops {
            errors.push(VerifyError::StackUnderflow {
                method: ctx.name.to_string(),
                at: pc,
            });
            continue;
        }

        match instr.opcode {
            Opcode::Return => {
                if depth != 1 {
                    errors.push(VerifyError::UnbalancedReturn {
                        method: ctx.name.to_string(),
                        at: pc,
                        depth,
                    });
                }
            }
            Opcode::Throw => {}
            Opcode::Jump => {
                let target = instr.operand as usize;
                enter(ctx, &mut depths, &mut worklist, &mut errors, target, depth);
            }
            Opcode::JumpIfFalse | Opcode::JumpIfTrue => {
                let target = instr.operand as usize;
                enter(ctx, &mut depths, &mut worklist, &mut errors, target, depth - 1);
                enter(ctx, &mut depths, &mut worklist, &mut errors, pc + 1, depth - 1);
            }
            Opcode::Iterate => {
                // ITERATE and its JUMP_IF_FALSE run as one step: the element
                // is left on top of the iterator, or the iterator is gone.
                let branch = &ctx.instrs[pc + 1];
                let target = branch.operand as usize;
                enter(ctx, &mut depths, &mut worklist, &mut errors, target, depth - 1);
                enter(ctx, &mut depths, &mut worklist, &mut errors, pc + 2, depth + 1);
            }
            _ => {
                let next = depth - pops + stack_pushes(instr);
                enter(ctx, &mut depths, &mut worklist, &mut errors, pc + 1, next);
            }
        }
    }

    errors
}

/// Record that control reaches `pc` with `depth`.
fn enter(
    ctx: &MethodContext<'_>,
    depths: &mut [Option<usize>],
    worklist: &mut Vec<usize>,
    errors: &mut Vec<VerifyError>,
    pc: usize,
    depth: usize,
) {
    let Some(slot) = depths.get_mut(pc) else {
        // Falling off the end is reported by the structural pass.
        return;
    };
    match *slot {
        None => {
            *slot = Some(depth);
            worklist.push(pc);
        }
        Some(first) if first != depth => errors.push(VerifyError::InconsistentDepth {
            method: ctx.name.to_string(),
            at: pc,
            first,
            second: depth,
        }),
        Some(_) => {}
    }
}

/// Number of values an instruction needs on the operand stack.
fn stack_pops(ctx: &MethodContext<'_>, instr: &Instruction) -> usize {
    let operand = instr.operand as usize;
    match instr.opcode {
        Opcode::Push
        | Opcode::PushNone
        | Opcode::PushSelf
        | Opcode::GetLocal
        | Opcode::GetAttr
        | Opcode::GetConstant
        | Opcode::Jump
        | Opcode::DefineFunction => 0,

        Opcode::Pop
        | Opcode::SetLocal
        | Opcode::SetAttr
        | Opcode::SetConstant
        | Opcode::UnaryNot
        | Opcode::UnaryAdd
        | Opcode::UnarySub
        | Opcode::NewIterator
        | Opcode::Iterate
        | Opcode::JumpIfFalse
        | Opcode::JumpIfTrue
        | Opcode::Return
        | Opcode::Throw
        | Opcode::DefineObject
        | Opcode::MatchType => 1,

        Opcode::Binary => 2,
        Opcode::BuildArray => operand,
        Opcode::BuildHash => operand * 2,
        Opcode::CallMethod | Opcode::CallSuper => ctx.call_argc(instr).unwrap_or(0) + 1,
    }
}

/// Number of values an instruction leaves after popping its inputs.
/// `MATCH_TYPE` peeks, so it gives its input back.
fn stack_pushes(instr: &Instruction) -> usize {
    match instr.opcode {
        Opcode::Pop
        | Opcode::SetLocal
        | Opcode::SetAttr
        | Opcode::SetConstant
        | Opcode::Jump
        | Opcode::JumpIfFalse
        | Opcode::JumpIfTrue
        | Opcode::Return
        | Opcode::Throw
        | Opcode::DefineFunction => 0,

        Opcode::MatchType => 2,

        Opcode::Push
        | Opcode::PushNone
        | Opcode::PushSelf
        | Opcode::GetLocal
        | Opcode::GetAttr
        | Opcode::GetConstant
        | Opcode::UnaryNot
        | Opcode::UnaryAdd
        | Opcode::UnarySub
        | Opcode::Binary
        | Opcode::BuildArray
        | Opcode::BuildHash
        | Opcode::NewIterator
        | Opcode::Iterate
        | Opcode::CallMethod
        | Opcode::CallSuper
        | Opcode::DefineObject => 1,
    }
}
