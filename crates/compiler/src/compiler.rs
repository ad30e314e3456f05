//! Statement lowering.
//!
//! One [`Compiler`] builds one method. Object and function declarations
//! spin up a nested compiler, finish it, and store the resulting method in
//! the enclosing constant pool.
//!
//! Bodies that produce a value (the file, functions, catch handlers) are
//! compiled in *tail* mode: the last statement's value is returned when it
//! is an expression, and `if`/`switch` carry tail mode into each branch so
//! every path ends in its own `RETURN`.

use std::rc::Rc;

use iracema_lang::{CallInfo, Method, Opcode, Value};
use iracema_syntax::ast::{
    Assign, Else, Expr, File, For, FunDecl, If, IdentKind, ObjectDecl, Return, Stmt, Switch,
    While,
};
use iracema_syntax::Position;

use crate::error::CompileError;
use crate::fragment::{method_constant, Fragment, LoopKind, Scope};

pub(crate) struct Compiler {
    pub(crate) fragment: Fragment,
}

impl Compiler {
    fn new(name: &str, scope: Scope) -> Self {
        Self {
            fragment: Fragment::new(name, scope),
        }
    }

    /// Compile a file into its `main` method.
    pub(crate) fn compile_file(file: &File) -> Result<Method, CompileError> {
        let mut compiler = Compiler::new("main", Scope::Top);
        compiler.tail_body(&file.stmts)?;
        compiler.fragment.finish()
    }

    pub(crate) fn constant(&mut self, value: Value) -> Result<u8, CompileError> {
        self.fragment.add_constant(value)
    }

    pub(crate) fn name_constant(&mut self, name: &str) -> Result<u8, CompileError> {
        self.fragment.add_constant(Value::string(name))
    }

    /// Emit `CALL_METHOD` (or `CALL_SUPER`) for a call site.
    pub(crate) fn call(
        &mut self,
        opcode: Opcode,
        name: &str,
        argc: usize,
        position: Position,
    ) -> Result<(), CompileError> {
        let argc = u8::try_from(argc).map_err(|_| CompileError::TooMany {
            what: "arguments",
            position,
        })?;
        let info = self.constant(Value::CallInfo(Rc::new(CallInfo::new(name, argc))))?;
        self.fragment.emit(opcode, info);
        Ok(())
    }

    fn return_none(&mut self) {
        if !self.fragment.is_terminated() {
            self.fragment.emit(Opcode::PushNone, 0);
            self.fragment.emit(Opcode::Return, 0);
        }
    }

    // ---- Bodies ----

    fn block(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
        stmts.iter().try_for_each(|stmt| self.stmt(stmt))
    }

    fn tail_body(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
        match stmts.split_last() {
            None => {
                self.return_none();
                Ok(())
            }
            Some((last, init)) => {
                self.block(init)?;
                self.tail_stmt(last)
            }
        }
    }

    fn tail_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Expr(expr) => {
                self.expr(expr)?;
                self.fragment.emit(Opcode::Return, 0);
            }
            Stmt::If(node) => self.tail_if(node)?,
            Stmt::Switch(node) => self.tail_switch(node)?,
            other => {
                self.stmt(other)?;
                self.return_none();
            }
        }
        Ok(())
    }

    fn tail_if(&mut self, node: &If) -> Result<(), CompileError> {
        self.expr(&node.cond)?;
        let alternative = self.fragment.new_block();
        self.fragment.emit_jump(Opcode::JumpIfFalse, alternative);
        self.tail_body(&node.then.stmts)?;
        self.fragment.use_block(alternative);
        match &node.otherwise {
            Some(Else::If(nested)) => self.tail_if(nested),
            Some(Else::Block(block)) => self.tail_body(&block.stmts),
            None => {
                self.return_none();
                Ok(())
            }
        }
    }

    fn tail_switch(&mut self, node: &Switch) -> Result<(), CompileError> {
        for case in &node.cases {
            self.case_test(&node.key, &case.value)?;
            let next = self.fragment.new_block();
            self.fragment.emit_jump(Opcode::JumpIfFalse, next);
            self.tail_body(&case.body.stmts)?;
            self.fragment.use_block(next);
        }
        match &node.default {
            Some(block) => self.tail_body(&block.stmts),
            None => {
                self.return_none();
                Ok(())
            }
        }
    }

    /// `key == value`, leaving the boolean on the stack.
    fn case_test(&mut self, key: &Expr, value: &Expr) -> Result<(), CompileError> {
        self.expr(key)?;
        self.expr(value)?;
        self.call(Opcode::CallMethod, "==", 1, value.position())
    }

    // ---- Statements ----

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Object(decl) => self.object_decl(decl),
            Stmt::Fun(decl) => self.fun_decl(decl),
            Stmt::Assign(node) => self.assign(node),
            Stmt::If(node) => self.if_stmt(node),
            Stmt::While(node) => self.while_stmt(node),
            Stmt::For(node) => self.for_stmt(node),
            Stmt::Switch(node) => self.switch_stmt(node),
            Stmt::Return(node) => self.return_stmt(node),
            Stmt::Stop(position) => self.loop_jump("stop", *position),
            Stmt::Next(position) => self.loop_jump("next", *position),
            Stmt::Expr(expr) if expr.is_literal() => Ok(()),
            Stmt::Expr(expr) => {
                self.expr(expr)?;
                self.fragment.emit(Opcode::Pop, 0);
                Ok(())
            }
        }
    }

    fn assign(&mut self, node: &Assign) -> Result<(), CompileError> {
        for (target, value) in node.targets.iter().zip(&node.values) {
            match target {
                Expr::Ident(ident) => match ident.kind() {
                    IdentKind::Plain => {
                        let slot = self.fragment.define_local(&ident.name)?;
                        self.expr(value)?;
                        self.fragment.mark_initialized(slot);
                        self.fragment.emit(Opcode::SetLocal, slot);
                    }
                    IdentKind::Attribute => {
                        self.expr(value)?;
                        let name = self.name_constant(ident.bare_name())?;
                        self.fragment.emit(Opcode::SetAttr, name);
                    }
                    IdentKind::Constant => {
                        self.expr(value)?;
                        let name = self.name_constant(&ident.name)?;
                        self.fragment.emit(Opcode::SetConstant, name);
                    }
                },
                Expr::Index {
                    receiver,
                    index,
                    position,
                } => {
                    self.expr(receiver)?;
                    self.expr(index)?;
                    self.expr(value)?;
                    self.call(Opcode::CallMethod, "insert", 2, *position)?;
                    self.fragment.emit(Opcode::Pop, 0);
                }
                other => {
                    return Err(CompileError::InvalidExpression {
                        position: other.position(),
                    })
                }
            }
        }
        Ok(())
    }

    fn if_stmt(&mut self, node: &If) -> Result<(), CompileError> {
        self.expr(&node.cond)?;
        let Some(otherwise) = &node.otherwise else {
            let end = self.fragment.new_block();
            self.fragment.emit_jump(Opcode::JumpIfFalse, end);
            self.block(&node.then.stmts)?;
            self.fragment.use_block(end);
            return Ok(());
        };
        let alternative = self.fragment.new_block();
        let end = self.fragment.new_block();
        self.fragment.emit_jump(Opcode::JumpIfFalse, alternative);
        self.block(&node.then.stmts)?;
        self.fragment.emit_jump(Opcode::Jump, end);
        self.fragment.use_block(alternative);
        match otherwise {
            Else::If(nested) => self.if_stmt(nested)?,
            Else::Block(block) => self.block(&block.stmts)?,
        }
        self.fragment.use_block(end);
        Ok(())
    }

    fn while_stmt(&mut self, node: &While) -> Result<(), CompileError> {
        let header = self.fragment.new_block();
        let exit = self.fragment.new_block();
        self.fragment.use_block(header);
        self.expr(&node.cond)?;
        self.fragment.emit_jump(Opcode::JumpIfFalse, exit);

        self.fragment.push_loop(LoopKind::While, header, exit);
        self.block(&node.body.stmts)?;
        self.fragment.pop_loop();

        self.fragment.emit_jump(Opcode::Jump, header);
        self.fragment.use_block(exit);
        Ok(())
    }

    fn for_stmt(&mut self, node: &For) -> Result<(), CompileError> {
        self.expr(&node.iterable)?;
        self.fragment.emit(Opcode::NewIterator, 0);

        let header = self.fragment.new_block();
        let exit = self.fragment.new_block();
        self.fragment.use_block(header);
        self.fragment.emit(Opcode::Iterate, 0);
        self.fragment.emit_jump(Opcode::JumpIfFalse, exit);
        let slot = self.fragment.define_local(&node.element.name)?;
        self.fragment.mark_initialized(slot);
        self.fragment.emit(Opcode::SetLocal, slot);

        self.fragment.push_loop(LoopKind::For, header, exit);
        self.block(&node.body.stmts)?;
        self.fragment.pop_loop();

        self.fragment.emit_jump(Opcode::Jump, header);
        self.fragment.use_block(exit);
        Ok(())
    }

    fn switch_stmt(&mut self, node: &Switch) -> Result<(), CompileError> {
        let end = self.fragment.new_block();
        let last = node.cases.len().saturating_sub(1);
        for (i, case) in node.cases.iter().enumerate() {
            self.case_test(&node.key, &case.value)?;
            let next = self.fragment.new_block();
            self.fragment.emit_jump(Opcode::JumpIfFalse, next);
            self.block(&case.body.stmts)?;
            if i != last || node.default.is_some() {
                self.fragment.emit_jump(Opcode::Jump, end);
            }
            self.fragment.use_block(next);
        }
        if let Some(block) = &node.default {
            self.block(&block.stmts)?;
        }
        self.fragment.use_block(end);
        Ok(())
    }

    fn return_stmt(&mut self, node: &Return) -> Result<(), CompileError> {
        for _ in 0..self.fragment.open_iterators() {
            self.fragment.emit(Opcode::Pop, 0);
        }
        match &node.value {
            Some(value) => self.expr(value)?,
            None => self.fragment.emit(Opcode::PushNone, 0),
        }
        self.fragment.emit(Opcode::Return, 0);
        Ok(())
    }

    fn loop_jump(&mut self, keyword: &'static str, position: Position) -> Result<(), CompileError> {
        let Some(innermost) = self.fragment.innermost_loop() else {
            return Err(CompileError::OutsideLoop { keyword, position });
        };
        if keyword == "next" {
            self.fragment.emit_jump(Opcode::Jump, innermost.header);
            return Ok(());
        }
        if innermost.kind == LoopKind::For {
            self.fragment.emit(Opcode::Pop, 0);
        }
        self.fragment.emit_jump(Opcode::Jump, innermost.exit);
        Ok(())
    }

    // ---- Declarations ----

    fn object_decl(&mut self, decl: &ObjectDecl) -> Result<(), CompileError> {
        if self.fragment.scope() != Scope::Top {
            return Err(CompileError::NestedObject {
                position: decl.position,
            });
        }
        match &decl.parent {
            Some(parent) => {
                let name = self.name_constant(&parent.name)?;
                self.fragment.emit(Opcode::GetConstant, name);
            }
            None => self.fragment.emit(Opcode::PushNone, 0),
        }

        let mut body = Compiler::new(&decl.name.name, Scope::Object);
        body.block(&decl.body.stmts)?;
        body.return_none();
        let method = body.fragment.finish()?;

        let index = self.constant(method_constant(method))?;
        self.fragment.emit(Opcode::DefineObject, index);
        self.fragment.emit(Opcode::Pop, 0);
        Ok(())
    }

    fn fun_decl(&mut self, decl: &FunDecl) -> Result<(), CompileError> {
        let scope = match self.fragment.scope() {
            Scope::Function { .. } => {
                return Err(CompileError::NestedFunction {
                    position: decl.position,
                })
            }
            Scope::Object => Scope::Function { method: true },
            Scope::Top => Scope::Function { method: false },
        };
        let arity = u8::try_from(decl.params.len()).map_err(|_| CompileError::TooMany {
            what: "parameters",
            position: decl.position,
        })?;

        let mut fun = Compiler::new(&decl.name.name, scope);
        fun.fragment.set_arity(arity);
        for param in &decl.params {
            if fun.fragment.local(&param.name.name).is_some() {
                return Err(CompileError::DuplicateParameter {
                    name: param.name.name.clone(),
                    position: param.name.position,
                });
            }
            let slot = fun.fragment.define_local(&param.name.name)?;
            fun.fragment.mark_initialized(slot);
        }
        fun.tail_body(&decl.body.stmts)?;

        if !decl.catches.is_empty() {
            let handlers = fun.fragment.new_block();
            fun.fragment.use_block(handlers);
            fun.fragment.set_catch_block(handlers);
            for catch in &decl.catches {
                let ty = fun.name_constant(&catch.ty.name)?;
                fun.fragment.emit(Opcode::MatchType, ty);
                let next = fun.fragment.new_block();
                fun.fragment.emit_jump(Opcode::JumpIfFalse, next);
                match &catch.reference {
                    Some(reference) => {
                        let slot = fun.fragment.define_local(&reference.name)?;
                        fun.fragment.mark_initialized(slot);
                        fun.fragment.emit(Opcode::SetLocal, slot);
                    }
                    None => fun.fragment.emit(Opcode::Pop, 0),
                }
                fun.tail_body(&catch.body.stmts)?;
                fun.fragment.use_block(next);
            }
            fun.fragment.emit(Opcode::Throw, 0);
        }

        let method = fun.fragment.finish()?;
        let index = self.constant(method_constant(method))?;
        self.fragment.emit(Opcode::DefineFunction, index);
        Ok(())
    }
}
