//! The method under construction.
//!
//! A fragment owns an arena of basic blocks plus the order in which they
//! were placed. Jumps name their target block; [`Fragment::finish`] lays the
//! blocks out in placement order and rewrites every jump operand to the
//! target block's start offset.

use std::rc::Rc;

use iracema_lang::{Bytecode, Instruction, Method, Opcode, Value};

use crate::error::CompileError;

pub(crate) type BlockId = usize;

/// What kind of body a fragment compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    /// The file body.
    Top,
    /// An object declaration body; `self` is the class.
    Object,
    /// A function body. `method` is set when it is declared in an object.
    Function { method: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopKind {
    While,
    /// Keeps its iterator on the operand stack while running.
    For,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Loop {
    pub(crate) kind: LoopKind,
    pub(crate) header: BlockId,
    pub(crate) exit: BlockId,
}

#[derive(Debug)]
struct Local {
    name: String,
    initialized: bool,
}

#[derive(Debug, Default)]
struct BasicBlock {
    code: Vec<Instruction>,
    /// (index into `code`, target block) for every jump in the block.
    jumps: Vec<(usize, BlockId)>,
}

#[derive(Debug)]
pub(crate) struct Fragment {
    name: String,
    scope: Scope,
    arity: u8,
    blocks: Vec<BasicBlock>,
    layout: Vec<BlockId>,
    current: BlockId,
    constants: Vec<Value>,
    locals: Vec<Local>,
    loops: Vec<Loop>,
    catch_block: Option<BlockId>,
}

impl Fragment {
    pub(crate) fn new(name: impl Into<String>, scope: Scope) -> Self {
        Self {
            name: name.into(),
            scope,
            arity: 0,
            blocks: vec![BasicBlock::default()],
            layout: vec![0],
            current: 0,
            constants: Vec::new(),
            locals: Vec::new(),
            loops: Vec::new(),
            catch_block: None,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn scope(&self) -> Scope {
        self.scope
    }

    pub(crate) fn arity(&self) -> u8 {
        self.arity
    }

    pub(crate) fn set_arity(&mut self, arity: u8) {
        self.arity = arity;
    }

    // ---- Blocks ----

    /// Allocate a block without placing it.
    pub(crate) fn new_block(&mut self) -> BlockId {
        self.blocks.push(BasicBlock::default());
        self.blocks.len() - 1
    }

    /// Place `block` after the blocks placed so far and emit into it.
    pub(crate) fn use_block(&mut self, block: BlockId) {
        self.layout.push(block);
        self.current = block;
    }

    pub(crate) fn emit(&mut self, opcode: Opcode, operand: u8) {
        self.blocks[self.current]
            .code
            .push(Instruction::new(opcode, operand));
    }

    /// Emit a jump whose operand is resolved when the fragment finishes.
    pub(crate) fn emit_jump(&mut self, opcode: Opcode, target: BlockId) {
        let block = &mut self.blocks[self.current];
        block.jumps.push((block.code.len(), target));
        block.code.push(Instruction::new(opcode, 0));
    }

    /// Whether control cannot fall off the end of the current block.
    pub(crate) fn is_terminated(&self) -> bool {
        self.blocks[self.current]
            .code
            .last()
            .is_some_and(|instr| instr.opcode.is_terminator())
    }

    pub(crate) fn set_catch_block(&mut self, block: BlockId) {
        self.catch_block = Some(block);
    }

    // ---- Constants and locals ----

    pub(crate) fn add_constant(&mut self, value: Value) -> Result<u8, CompileError> {
        let index = u8::try_from(self.constants.len()).map_err(|_| CompileError::ConstantOverflow {
            method: self.name.clone(),
        })?;
        self.constants.push(value);
        Ok(index)
    }

    /// Slot of `name`, allocating an uninitialised one when it is new.
    pub(crate) fn define_local(&mut self, name: &str) -> Result<u8, CompileError> {
        if let Some((slot, _)) = self.local(name) {
            return Ok(slot);
        }
        let slot = u8::try_from(self.locals.len()).map_err(|_| CompileError::LocalOverflow {
            method: self.name.clone(),
        })?;
        self.locals.push(Local {
            name: name.to_string(),
            initialized: false,
        });
        Ok(slot)
    }

    /// Slot of `name` and whether it has been assigned.
    pub(crate) fn local(&self, name: &str) -> Option<(u8, bool)> {
        self.locals
            .iter()
            .position(|local| local.name == name)
            .map(|index| (index as u8, self.locals[index].initialized))
    }

    pub(crate) fn mark_initialized(&mut self, slot: u8) {
        if let Some(local) = self.locals.get_mut(slot as usize) {
            local.initialized = true;
        }
    }

    // ---- Loops ----

    pub(crate) fn push_loop(&mut self, kind: LoopKind, header: BlockId, exit: BlockId) {
        self.loops.push(Loop { kind, header, exit });
    }

    pub(crate) fn pop_loop(&mut self) {
        self.loops.pop();
    }

    pub(crate) fn innermost_loop(&self) -> Option<Loop> {
        self.loops.last().copied()
    }

    /// Number of enclosing `for` loops, whose iterators sit on the stack.
    pub(crate) fn open_iterators(&self) -> usize {
        self.loops
            .iter()
            .filter(|l| l.kind == LoopKind::For)
            .count()
    }

    // ---- Assembly ----

    /// Lay out the blocks, patch jumps and build the method.
    pub(crate) fn finish(self) -> Result<Method, CompileError> {
        let mut starts = vec![None; self.blocks.len()];
        let mut offset = 0;
        for &block in &self.layout {
            starts[block] = Some(offset);
            offset += self.blocks[block].code.len();
        }
        let total = offset;

        let mut code = Vec::with_capacity(total);
        for &block in &self.layout {
            let block = &self.blocks[block];
            let mut instrs = block.code.clone();
            for &(index, target) in &block.jumps {
                let start = self.start_of(&starts, target)?;
                instrs[index].operand =
                    u8::try_from(start).map_err(|_| CompileError::JumpOutOfRange {
                        method: self.name.clone(),
                        target: start,
                    })?;
            }
            code.extend(instrs.iter().map(Instruction::encode));
        }

        let catch_offset = self
            .catch_block
            .map(|block| self.start_of(&starts, block))
            .transpose()?;
        log::debug!(
            "assembled '{}': {} words, {} constants, {} locals, {} blocks",
            self.name,
            code.len(),
            self.constants.len(),
            self.locals.len(),
            self.layout.len()
        );

        let bytecode = Bytecode {
            code,
            constants: self.constants,
            locals: self.locals.into_iter().map(|local| local.name).collect(),
            catch_offset,
        };
        Ok(Method::bytecode(self.name, self.arity, bytecode))
    }

    fn start_of(&self, starts: &[Option<usize>], block: BlockId) -> Result<usize, CompileError> {
        starts
            .get(block)
            .copied()
            .flatten()
            .ok_or_else(|| CompileError::UnplacedBlock {
                method: self.name.clone(),
                block,
            })
    }
}

/// Pool a nested method.
pub(crate) fn method_constant(method: Method) -> Value {
    Value::Method(Rc::new(method))
}
