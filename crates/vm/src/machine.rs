//! VM state management: call frames, the shared value stack, the class
//! registry.

use std::io::Write;
use std::rc::Rc;

use iracema_lang::{
    Bytecode, CallInfo, Class, ClassRegistry, DecodeError, ErrorObject, Instruction, Method, Value,
};

use crate::error::VmError;

/// Default size of the shared value stack, in slots.
pub const DEFAULT_STACK_SIZE: usize = 1024;

/// Tunables for a [`Vm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmOptions {
    /// Capacity of the value stack shared by all frames.
    pub stack_size: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

/// An activation of a bytecode method.
///
/// The frame's window on the value stack starts at `base`: locals occupy
/// `[base, base + local_count)` and the operand stack sits above them. The
/// receiver occupies the slot just below `base`.
#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) method: Rc<Method>,
    pub(crate) code: Rc<Bytecode>,
    /// Index of the next word to execute.
    pub(crate) ip: usize,
    pub(crate) base: usize,
    pub(crate) receiver: Value,
    /// Class the method was found on; `CALL_SUPER` starts at its parent.
    pub(crate) owner: Rc<Class>,
    /// `RETURN` hands the value to the host instead of the caller frame.
    pub(crate) returns_to_host: bool,
    /// The handler sequence is running; further errors leave the frame.
    pub(crate) handling: bool,
}

impl Frame {
    /// First stack index above the locals.
    pub(crate) fn floor(&self) -> usize {
        self.base + self.code.local_count()
    }
}

/// Why the dispatch loop stopped before a normal return.
#[derive(Debug)]
pub(crate) enum Unwind {
    /// A language error, still catchable by frames below.
    Raised(Rc<ErrorObject>),
    /// A host error; ends the run.
    Fatal(VmError),
}

impl From<VmError> for Unwind {
    fn from(e: VmError) -> Self {
        Unwind::Fatal(e)
    }
}

impl From<Rc<ErrorObject>> for Unwind {
    fn from(e: Rc<ErrorObject>) -> Self {
        Unwind::Raised(e)
    }
}

/// The Iracema virtual machine.
///
/// One VM owns a class registry, so classes defined by one run stay
/// visible to later runs on the same VM. `puts` writes to `output`.
pub struct Vm<W: Write> {
    pub(crate) registry: ClassRegistry,
    pub(crate) stack: Vec<Value>,
    pub(crate) frames: Vec<Frame>,
    pub(crate) options: VmOptions,
    pub(crate) output: W,
    /// Host error raised beneath a native, reported once the native returns.
    pub(crate) pending: Option<VmError>,
}

impl<W: Write> Vm<W> {
    /// Create a VM with default options.
    pub fn new(output: W) -> Self {
        Self::with_options(output, VmOptions::default())
    }

    pub fn with_options(output: W, options: VmOptions) -> Self {
        Self {
            registry: ClassRegistry::new(),
            stack: Vec::with_capacity(options.stack_size),
            frames: Vec::new(),
            options,
            output,
            pending: None,
        }
    }

    pub fn options(&self) -> VmOptions {
        self.options
    }

    /// Consume the VM, returning its output sink.
    pub fn into_output(self) -> W {
        self.output
    }

    pub(crate) fn frame(&self) -> Result<&Frame, VmError> {
        self.frames.last().ok_or(VmError::NoFrame)
    }

    pub(crate) fn frame_mut(&mut self) -> Result<&mut Frame, VmError> {
        self.frames.last_mut().ok_or(VmError::NoFrame)
    }

    /// Name of the running method and offset of the current instruction.
    fn location(&self) -> (String, usize) {
        match self.frames.last() {
            Some(frame) => (frame.method.name().to_string(), frame.ip.saturating_sub(1)),
            None => ("<host>".to_string(), 0),
        }
    }

    fn floor(&self) -> usize {
        self.frames.last().map_or(0, Frame::floor)
    }

    fn underflow(&self) -> VmError {
        let (method, at) = self.location();
        VmError::StackUnderflow { method, at }
    }

    /// Push a value onto the stack, checking for overflow.
    pub(crate) fn push(&mut self, value: Value) -> Result<(), VmError> {
        if self.stack.len() >= self.options.stack_size {
            return Err(VmError::StackOverflow {
                limit: self.options.stack_size,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    /// Pop a value from the current frame's operand stack.
    pub(crate) fn pop(&mut self) -> Result<Value, VmError> {
        if self.stack.len() <= self.floor() {
            return Err(self.underflow());
        }
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => Err(self.underflow()),
        }
    }

    /// Pop the top `n` values, oldest first.
    pub(crate) fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, VmError> {
        let len = self.stack.len();
        if len < self.floor() + n {
            return Err(self.underflow());
        }
        Ok(self.stack.split_off(len - n))
    }

    /// The value `depth` slots below the top; `0` is the top.
    pub(crate) fn peek_at(&self, depth: usize) -> Result<&Value, VmError> {
        let len = self.stack.len();
        if len < self.floor() + depth + 1 {
            return Err(self.underflow());
        }
        Ok(&self.stack[len - 1 - depth])
    }

    pub(crate) fn peek(&self) -> Result<&Value, VmError> {
        self.peek_at(0)
    }

    /// Fetch and decode the instruction at the current ip, advancing it.
    pub(crate) fn fetch(&mut self) -> Result<Instruction, VmError> {
        let frame = self.frame_mut()?;
        let at = frame.ip;
        let word = match frame.code.code.get(at) {
            Some(word) => *word,
            None => {
                return Err(VmError::CodeOutOfBounds {
                    method: frame.method.name().to_string(),
                    at,
                })
            }
        };
        frame.ip += 1;
        Instruction::decode(word).map_err(|reason| VmError::InvalidInstruction {
            method: frame.method.name().to_string(),
            at,
            reason,
        })
    }

    /// A decode failure at the current instruction.
    pub(crate) fn invalid(&self, reason: DecodeError) -> VmError {
        let (method, at) = self.location();
        VmError::InvalidInstruction { method, at, reason }
    }

    fn bad_constant(&self, index: u8, expected: &'static str) -> VmError {
        let (method, at) = self.location();
        VmError::BadConstant {
            method,
            at,
            index,
            expected,
        }
    }

    fn constant(&self, index: u8, expected: &'static str) -> Result<&Value, VmError> {
        self.frame()?
            .code
            .constants
            .get(index as usize)
            .ok_or_else(|| self.bad_constant(index, expected))
    }

    pub(crate) fn literal(&self, index: u8) -> Result<Value, VmError> {
        self.constant(index, "literal").cloned()
    }

    /// A name stored as a string constant.
    pub(crate) fn name_constant(&self, index: u8) -> Result<String, VmError> {
        match self.constant(index, "name")? {
            Value::String(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
            _ => Err(self.bad_constant(index, "name")),
        }
    }

    pub(crate) fn call_info(&self, index: u8) -> Result<Rc<CallInfo>, VmError> {
        match self.constant(index, "call-info")? {
            Value::CallInfo(info) => Ok(Rc::clone(info)),
            _ => Err(self.bad_constant(index, "call-info")),
        }
    }

    pub(crate) fn method_constant(&self, index: u8) -> Result<Rc<Method>, VmError> {
        match self.constant(index, "method")? {
            Value::Method(method) => Ok(Rc::clone(method)),
            _ => Err(self.bad_constant(index, "method")),
        }
    }

    /// Stack index of local `index` in the current frame.
    pub(crate) fn local_slot(&self, index: u8) -> Result<usize, VmError> {
        let frame = self.frame()?;
        if (index as usize) < frame.code.local_count() {
            Ok(frame.base + index as usize)
        } else {
            let (method, at) = self.location();
            Err(VmError::BadLocal { method, at, index })
        }
    }

    /// Enter `method` with its receiver and `argc` arguments already on
    /// the stack. The arguments become the first locals; the remaining
    /// locals start as `none`.
    pub(crate) fn push_frame(
        &mut self,
        method: Rc<Method>,
        code: Rc<Bytecode>,
        owner: Rc<Class>,
        argc: usize,
        returns_to_host: bool,
    ) -> Result<(), VmError> {
        if self.stack.len() < self.floor() + argc + 1 {
            return Err(self.underflow());
        }
        let base = self.stack.len() - argc;
        let receiver = self.stack[base - 1].clone();
        let extra = code.local_count().saturating_sub(argc);
        if self.stack.len() + extra > self.options.stack_size {
            return Err(VmError::StackOverflow {
                limit: self.options.stack_size,
            });
        }
        self.stack.resize(self.stack.len() + extra, Value::None);
        log::debug!(
            "enter '{}' on {} (frame {})",
            method.name(),
            owner.name(),
            self.frames.len()
        );
        self.frames.push(Frame {
            method,
            code,
            ip: 0,
            base,
            receiver,
            owner,
            returns_to_host,
            handling: false,
        });
        Ok(())
    }

    /// Leave the current frame, dropping its window and receiver slot.
    pub(crate) fn pop_frame(&mut self) -> Result<Frame, VmError> {
        let frame = self.frames.pop().ok_or(VmError::NoFrame)?;
        self.stack.truncate(frame.base.saturating_sub(1));
        log::debug!("leave '{}' (frame {})", frame.method.name(), self.frames.len());
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iracema_lang::Opcode;

    fn vm(stack_size: usize) -> Vm<Vec<u8>> {
        Vm::with_options(Vec::new(), VmOptions { stack_size })
    }

    fn method_with_locals(locals: usize) -> (Rc<Method>, Rc<Bytecode>) {
        let code = Bytecode {
            code: vec![Instruction::new(Opcode::PushNone, 0).encode()],
            locals: (0..locals).map(|i| format!("l{i}")).collect(),
            ..Bytecode::default()
        };
        let method = Rc::new(Method::bytecode("f", 0, code));
        let code = Rc::clone(method.as_bytecode().unwrap());
        (method, code)
    }

    #[test]
    fn push_respects_the_limit() {
        let mut vm = vm(2);
        vm.push(Value::Int(1)).unwrap();
        vm.push(Value::Int(2)).unwrap();
        assert_eq!(vm.push(Value::Int(3)), Err(VmError::StackOverflow { limit: 2 }));
    }

    #[test]
    fn frame_window_covers_arguments_and_locals() {
        let mut vm = vm(16);
        let object = Rc::clone(&vm.registry.primordials().object);
        let (method, code) = method_with_locals(3);
        vm.push(Value::Int(0)).unwrap();
        vm.push(Value::Int(10)).unwrap();
        vm.push_frame(method, code, object, 1, false).unwrap();

        let frame = vm.frame().unwrap();
        assert_eq!(frame.base, 1);
        assert_eq!(frame.floor(), 4);
        assert_eq!(frame.receiver, Value::Int(0));
        assert_eq!(vm.stack, vec![Value::Int(0), Value::Int(10), Value::None, Value::None]);

        // Locals are below the operand stack.
        assert!(matches!(vm.pop(), Err(VmError::StackUnderflow { .. })));
        vm.push(Value::Int(5)).unwrap();
        assert_eq!(vm.peek().unwrap(), &Value::Int(5));

        vm.pop_frame().unwrap();
        assert!(vm.stack.is_empty());
        assert!(vm.frames.is_empty());
    }

    #[test]
    fn locals_past_the_table_are_rejected() {
        let mut vm = vm(16);
        let object = Rc::clone(&vm.registry.primordials().object);
        let (method, code) = method_with_locals(1);
        vm.push(Value::None).unwrap();
        vm.push_frame(method, code, object, 0, false).unwrap();
        assert_eq!(vm.local_slot(0), Ok(1));
        assert!(matches!(vm.local_slot(1), Err(VmError::BadLocal { index: 1, .. })));
    }

    #[test]
    fn locals_count_against_the_limit() {
        let mut vm = vm(3);
        let object = Rc::clone(&vm.registry.primordials().object);
        let (method, code) = method_with_locals(4);
        vm.push(Value::None).unwrap();
        assert_eq!(
            vm.push_frame(method, code, object, 0, false),
            Err(VmError::StackOverflow { limit: 3 })
        );
    }
}
