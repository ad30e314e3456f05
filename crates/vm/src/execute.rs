//! Main execution loop, opcode dispatch and error unwinding.

use std::io::Write;
use std::rc::Rc;

use iracema_lang::builtins::{hash, numeric};
use iracema_lang::{
    Arity, ArrayIterator, Class, ClassRegistry, DecodeError, ErrorKind, ErrorObject, Hash,
    Instruction, Method, MethodBody, NativeFn, NativeResult, Opcode, Runtime, UserObject, Value,
};

use crate::error::VmError;
use crate::machine::{Unwind, Vm};

impl<W: Write> Vm<W> {
    /// Run a top-level method to completion and return its value.
    ///
    /// `self` of the top-level method is a fresh instance of `Script`, so
    /// top-level functions become methods of `Script`.
    pub fn run(&mut self, main: &Rc<Method>) -> Result<Value, VmError> {
        let code = main
            .as_bytecode()
            .cloned()
            .ok_or_else(|| VmError::NotBytecode {
                method: main.name().to_string(),
            })?;
        self.stack.clear();
        self.frames.clear();
        self.pending = None;

        let script = Rc::clone(&self.registry.primordials().script);
        self.push(Value::Object(Rc::new(UserObject::new(Rc::clone(&script)))))?;
        self.push_frame(Rc::clone(main), code, script, 0, true)?;
        self.dispatch().map_err(escape)
    }

    /// Render a value through its `inspect` method.
    pub fn inspect_value(&mut self, value: &Value) -> Result<String, VmError> {
        let result = self.inspect(value);
        if let Some(fatal) = self.pending.take() {
            return Err(fatal);
        }
        result.map_err(|error| escape(Unwind::Raised(error)))
    }

    /// Execute until the frame marked `returns_to_host` returns.
    pub(crate) fn dispatch(&mut self) -> Result<Value, Unwind> {
        loop {
            let result = self.step();
            if let Some(fatal) = self.pending.take() {
                return Err(Unwind::Fatal(fatal));
            }
            match result {
                Ok(None) => {}
                Ok(Some(value)) => return Ok(value),
                Err(Unwind::Raised(error)) => self.unwind(error)?,
                Err(fatal) => return Err(fatal),
            }
        }
    }

    /// Execute one instruction. `Some` carries a value returned to the host.
    fn step(&mut self) -> Result<Option<Value>, Unwind> {
        let instr = self.fetch()?;
        log::trace!("{instr} (depth {})", self.stack.len());

        match instr.opcode {
            // Stack and locals
            Opcode::Push => {
                let value = self.literal(instr.operand)?;
                self.push(value)?;
            }
            Opcode::PushNone => self.push(Value::None)?,
            Opcode::PushSelf => {
                let receiver = self.frame()?.receiver.clone();
                self.push(receiver)?;
            }
            Opcode::Pop => {
                self.pop()?;
            }
            Opcode::SetLocal => {
                let value = self.pop()?;
                let slot = self.local_slot(instr.operand)?;
                self.stack[slot] = value;
            }
            Opcode::GetLocal => {
                let slot = self.local_slot(instr.operand)?;
                let value = self.stack[slot].clone();
                self.push(value)?;
            }

            // Attributes and constants
            Opcode::SetAttr => self.exec_set_attr(instr.operand)?,
            Opcode::GetAttr => self.exec_get_attr(instr.operand)?,
            Opcode::GetConstant => self.exec_get_constant(instr.operand)?,
            Opcode::SetConstant => self.exec_set_constant(instr.operand)?,

            // Literals and iteration
            Opcode::BuildArray => {
                let elements = self.pop_n(instr.operand as usize)?;
                self.push(Value::array(elements))?;
            }
            Opcode::BuildHash => self.exec_build_hash(instr.operand)?,
            Opcode::NewIterator => self.exec_new_iterator()?,
            Opcode::Iterate => self.exec_iterate()?,
            Opcode::MatchType => self.exec_match_type(instr.operand)?,

            // Control flow
            Opcode::Jump => self.frame_mut()?.ip = instr.operand as usize,
            Opcode::JumpIfFalse => {
                if !self.pop()?.is_truthy() {
                    self.frame_mut()?.ip = instr.operand as usize;
                }
            }
            Opcode::JumpIfTrue => {
                if self.pop()?.is_truthy() {
                    self.frame_mut()?.ip = instr.operand as usize;
                }
            }

            // Operators
            Opcode::UnaryNot => {
                let value = self.pop()?;
                self.push(Value::Bool(!value.is_truthy()))?;
            }
            Opcode::UnaryAdd => self.send("uadd", 0)?,
            Opcode::UnarySub => self.send("usub", 0)?,
            Opcode::Binary => self.exec_binary(&instr)?,

            // Calls and definitions
            Opcode::CallMethod => {
                let info = self.call_info(instr.operand)?;
                self.send(&info.name, info.argc as usize)?;
            }
            Opcode::CallSuper => self.exec_call_super(instr.operand)?,
            Opcode::DefineObject => self.exec_define_object(instr.operand)?,
            Opcode::DefineFunction => self.exec_define_function(instr.operand)?,
            Opcode::Return => return self.exec_return(),
            Opcode::Throw => return Err(self.exec_throw()),
        }
        Ok(None)
    }

    /// Walk frames from the top until one can handle `error`.
    ///
    /// A frame handles at most one error: its handler sequence runs with
    /// the error on an otherwise empty operand stack, and errors raised
    /// while it runs leave the frame.
    fn unwind(&mut self, error: Rc<ErrorObject>) -> Result<(), Unwind> {
        loop {
            let frame = self.frame_mut()?;
            if let (Some(offset), false) = (frame.code.catch_offset, frame.handling) {
                frame.handling = true;
                frame.ip = offset;
                let floor = frame.floor();
                log::debug!(
                    "{} caught by '{}' at {offset}",
                    error.class().name(),
                    frame.method.name()
                );
                self.stack.truncate(floor);
                self.push(Value::Error(error))?;
                return Ok(());
            }
            let frame = self.pop_frame()?;
            if frame.returns_to_host {
                return Err(Unwind::Raised(error));
            }
        }
    }

    // ---- Calls ----

    /// Dispatch `name` on the receiver sitting below `argc` arguments.
    fn send(&mut self, name: &str, argc: usize) -> Result<(), Unwind> {
        let class = self.peek_at(argc)?.class(&self.registry);
        let (owner, method) = class
            .lookup_method_with_owner(name)
            .ok_or_else(|| self.registry.no_method_error(name, &class))?;
        self.invoke(owner, method, argc)
    }

    /// Call a method whose receiver and arguments are on the stack.
    fn invoke(&mut self, owner: Rc<Class>, method: Rc<Method>, argc: usize) -> Result<(), Unwind> {
        check_arity(&self.registry, &method, argc)?;
        match method.body() {
            MethodBody::Native(function) => self.call_native(*function, argc),
            MethodBody::Bytecode(code) => {
                let code = Rc::clone(code);
                self.push_frame(Rc::clone(&method), code, owner, argc, false)?;
                Ok(())
            }
        }
    }

    fn call_native(&mut self, function: NativeFn, argc: usize) -> Result<(), Unwind> {
        let args = self.pop_n(argc)?;
        let receiver = self.pop()?;
        let value = function(self, &receiver, &args)?;
        self.push(value)?;
        Ok(())
    }

    /// Run a bytecode method on a single-call frame and wait for it.
    fn call_bytecode(
        &mut self,
        owner: Rc<Class>,
        method: Rc<Method>,
        receiver: &Value,
        args: &[Value],
    ) -> Result<Value, Unwind> {
        let code = method.as_bytecode().cloned().ok_or_else(|| VmError::NotBytecode {
            method: method.name().to_string(),
        })?;
        self.push(receiver.clone())?;
        for arg in args {
            self.push(arg.clone())?;
        }
        self.push_frame(method, code, owner, args.len(), true)?;
        self.dispatch()
    }

    fn exec_call_super(&mut self, operand: u8) -> Result<(), Unwind> {
        let info = self.call_info(operand)?;
        let owner = Rc::clone(&self.frame()?.owner);
        let found = owner
            .parent()
            .and_then(|parent| parent.lookup_method_with_owner(&info.name));
        match found {
            Some((owner, method)) => self.invoke(owner, method, info.argc as usize),
            None => Err(self
                .registry
                .new_error(
                    ErrorKind::NoMethod,
                    format!("super: no superclass method '{}' for {}", info.name, owner.name()),
                )
                .into()),
        }
    }

    fn exec_return(&mut self) -> Result<Option<Value>, Unwind> {
        let value = self.pop()?;
        let frame = self.pop_frame()?;
        if frame.returns_to_host {
            return Ok(Some(value));
        }
        self.push(value)?;
        Ok(None)
    }

    fn exec_throw(&mut self) -> Unwind {
        match self.pop() {
            Ok(Value::Error(error)) => Unwind::Raised(error),
            Ok(other) => Unwind::Raised(self.registry.new_error(
                ErrorKind::Type,
                format!("exceptions must be Error instances, not {}", self.class_name(&other)),
            )),
            Err(e) => Unwind::Fatal(e),
        }
    }

    // ---- Definitions ----

    /// Create a class from a body method and run the body with the class
    /// as `self`. The body's return value is left on the caller's stack.
    fn exec_define_object(&mut self, operand: u8) -> Result<(), Unwind> {
        let body = self.method_constant(operand)?;
        let parent = match self.pop()? {
            Value::None => Rc::clone(&self.registry.primordials().object),
            Value::Class(class) => class,
            other => {
                return Err(self
                    .registry
                    .new_error(
                        ErrorKind::Type,
                        format!("superclass must be a Class, not {}", self.class_name(&other)),
                    )
                    .into())
            }
        };
        let code = body.as_bytecode().cloned().ok_or_else(|| VmError::NotBytecode {
            method: body.name().to_string(),
        })?;
        let class = Class::new(body.name(), Some(Rc::clone(&parent)));
        log::debug!("defining class {} < {}", class.name(), parent.name());
        self.registry.register(Rc::clone(&class));

        self.push(Value::Class(Rc::clone(&class)))?;
        self.push_frame(body, code, class, 0, false)?;
        Ok(())
    }

    /// Install a method on `self` if it is a class, else on its class.
    fn exec_define_function(&mut self, operand: u8) -> Result<(), Unwind> {
        let method = self.method_constant(operand)?;
        let target = match &self.frame()?.receiver {
            Value::Class(class) => Rc::clone(class),
            other => other.class(&self.registry),
        };
        log::debug!("defining method {}#{}", target.name(), method.name());
        target.define_method(method);
        Ok(())
    }

    // ---- Attributes and constants ----

    fn attribute_error(&self, receiver: &Value, name: &str) -> Unwind {
        Unwind::Raised(self.registry.new_error(
            ErrorKind::Runtime,
            format!(
                "cannot access attribute '{name}' on instance of '{}'",
                self.class_name(receiver)
            ),
        ))
    }

    fn exec_get_attr(&mut self, operand: u8) -> Result<(), Unwind> {
        let name = self.name_constant(operand)?;
        let value = match &self.frame()?.receiver {
            Value::Object(object) => object.get_attr(&name).ok_or_else(|| {
                self.registry.new_error(
                    ErrorKind::Runtime,
                    format!("'{}' object has no field '{name}'", object.class().name()),
                )
            })?,
            other => return Err(self.attribute_error(other, &name)),
        };
        self.push(value)?;
        Ok(())
    }

    fn exec_set_attr(&mut self, operand: u8) -> Result<(), Unwind> {
        let name = self.name_constant(operand)?;
        let value = self.pop()?;
        match &self.frame()?.receiver {
            Value::Object(object) => {
                object.set_attr(&name, value);
                Ok(())
            }
            other => Err(self.attribute_error(other, &name)),
        }
    }

    fn exec_get_constant(&mut self, operand: u8) -> Result<(), Unwind> {
        let name = self.name_constant(operand)?;
        let class = self
            .registry
            .lookup(&name)
            .ok_or_else(|| self.registry.name_error(&name))?;
        self.push(Value::Class(class))?;
        Ok(())
    }

    fn exec_set_constant(&mut self, operand: u8) -> Result<(), Unwind> {
        let name = self.name_constant(operand)?;
        match self.pop()? {
            Value::Class(class) => {
                self.registry.bind(name, class);
                Ok(())
            }
            other => Err(self
                .registry
                .new_error(
                    ErrorKind::Type,
                    format!(
                        "constant {name} must be bound to a Class, not {}",
                        self.class_name(&other)
                    ),
                )
                .into()),
        }
    }

    // ---- Literals and iteration ----

    /// Pairs are inserted in source order, so a repeated key keeps the
    /// last value.
    fn exec_build_hash(&mut self, operand: u8) -> Result<(), Unwind> {
        let items = self.pop_n(operand as usize * 2)?;
        let table = Rc::new(Hash::new());
        let mut items = items.into_iter();
        while let (Some(key), Some(value)) = (items.next(), items.next()) {
            hash::insert(self, &table, key, value)?;
        }
        self.push(Value::Hash(table))?;
        Ok(())
    }

    fn exec_new_iterator(&mut self) -> Result<(), Unwind> {
        match self.pop()? {
            Value::Array(array) => {
                self.push(Value::Iterator(Rc::new(ArrayIterator::new(array))))?;
                Ok(())
            }
            other => Err(self
                .registry
                .new_error(
                    ErrorKind::Type,
                    format!("'{}' object is not iterable", self.class_name(&other)),
                )
                .into()),
        }
    }

    /// Leaves `element, true` above the iterator, or replaces the
    /// exhausted iterator with `false`.
    fn exec_iterate(&mut self) -> Result<(), Unwind> {
        let iterator = match self.peek()? {
            Value::Iterator(iterator) => Rc::clone(iterator),
            other => {
                return Err(self
                    .registry
                    .new_error(
                        ErrorKind::Type,
                        format!("'{}' object is not an iterator", self.class_name(other)),
                    )
                    .into())
            }
        };
        match iterator.next_value() {
            Some(element) => {
                self.push(element)?;
                self.push(Value::Bool(true))?;
            }
            None => {
                self.pop()?;
                self.push(Value::Bool(false))?;
            }
        }
        Ok(())
    }

    fn exec_match_type(&mut self, operand: u8) -> Result<(), Unwind> {
        let name = self.name_constant(operand)?;
        let class = self
            .registry
            .lookup(&name)
            .ok_or_else(|| self.registry.name_error(&name))?;
        let matched = self.peek()?.is_a(&class, &self.registry);
        self.push(Value::Bool(matched))?;
        Ok(())
    }

    // ---- Operators ----

    /// Numbers are combined directly; anything else dispatches the
    /// operator's method on the left operand.
    fn exec_binary(&mut self, instr: &Instruction) -> Result<(), Unwind> {
        let op = instr
            .binary_op()
            .ok_or_else(|| self.invalid(DecodeError::InvalidBinaryOp(instr.operand)))?;
        let direct = {
            let rhs = self.peek_at(0)?;
            let lhs = self.peek_at(1)?;
            numeric::apply(&self.registry, op, lhs, rhs)
        };
        match direct {
            Some(result) => {
                self.pop_n(2)?;
                self.push(result?)?;
                Ok(())
            }
            None => self.send(op.method_name(), 1),
        }
    }
}

/// Turn an unwind that reached the host into a [`VmError`].
fn escape(unwind: Unwind) -> VmError {
    match unwind {
        Unwind::Raised(error) => {
            log::debug!("uncaught {}: {}", error.class().name(), error.message());
            VmError::Uncaught {
                class: error.class().name().to_string(),
                message: error.message(),
            }
        }
        Unwind::Fatal(e) => e,
    }
}

/// `ArgumentError` unless `method` accepts `argc` arguments.
fn check_arity(
    registry: &ClassRegistry,
    method: &Method,
    argc: usize,
) -> Result<(), Rc<ErrorObject>> {
    match method.arity() {
        Arity::Fixed(expected) if expected as usize != argc => {
            Err(registry.arity_error(argc, expected as usize))
        }
        _ => Ok(()),
    }
}

impl<W: Write> Runtime for Vm<W> {
    fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    fn call_method(&mut self, receiver: &Value, name: &str, args: &[Value]) -> NativeResult {
        let class = receiver.class(&self.registry);
        let (owner, method) = class
            .lookup_method_with_owner(name)
            .ok_or_else(|| self.registry.no_method_error(name, &class))?;
        check_arity(&self.registry, &method, args.len())?;
        if let MethodBody::Native(function) = method.body() {
            return function(self, receiver, args);
        }
        match self.call_bytecode(owner, method, receiver, args) {
            Ok(value) => Ok(value),
            Err(Unwind::Raised(error)) => Err(error),
            Err(Unwind::Fatal(fatal)) => {
                let error = self.registry.new_error(ErrorKind::Runtime, fatal.to_string());
                self.pending.get_or_insert(fatal);
                Err(error)
            }
        }
    }

    fn output(&mut self) -> &mut dyn Write {
        &mut self.output
    }
}
