//! Expression lowering. Every expression leaves exactly one value on the
//! operand stack.

use iracema_lang::{BinaryOp, Opcode, Value};
use iracema_syntax::ast::{self, Expr, Ident, IdentKind, Literal, UnaryOp};
use iracema_syntax::Position;

use crate::compiler::Compiler;
use crate::error::CompileError;
use crate::fragment::Scope;

fn binary_op(op: ast::BinaryOp) -> BinaryOp {
    match op {
        ast::BinaryOp::Add => BinaryOp::Add,
        ast::BinaryOp::Sub => BinaryOp::Sub,
        ast::BinaryOp::Mul => BinaryOp::Mul,
        ast::BinaryOp::Div => BinaryOp::Div,
        ast::BinaryOp::Eq => BinaryOp::Eq,
        ast::BinaryOp::Ne => BinaryOp::Ne,
        ast::BinaryOp::Gt => BinaryOp::Gt,
        ast::BinaryOp::Ge => BinaryOp::Ge,
        ast::BinaryOp::Lt => BinaryOp::Lt,
        ast::BinaryOp::Le => BinaryOp::Le,
    }
}

fn count(len: usize, what: &'static str, position: Position) -> Result<u8, CompileError> {
    u8::try_from(len).map_err(|_| CompileError::TooMany { what, position })
}

impl Compiler {
    pub(crate) fn expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Ident(ident) => self.ident(ident),
            Expr::Literal(literal, _) => self.literal(literal),
            Expr::Unary { op, operand, .. } => {
                self.expr(operand)?;
                let opcode = match op {
                    UnaryOp::Not => Opcode::UnaryNot,
                    UnaryOp::Plus => Opcode::UnaryAdd,
                    UnaryOp::Minus => Opcode::UnarySub,
                };
                self.fragment.emit(opcode, 0);
                Ok(())
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                self.expr(lhs)?;
                self.expr(rhs)?;
                self.fragment.emit(Opcode::Binary, binary_op(*op) as u8);
                Ok(())
            }
            Expr::Group(inner) => self.expr(inner),
            Expr::Array(elements, position) => {
                let size = count(elements.len(), "array elements", *position)?;
                for element in elements {
                    self.expr(element)?;
                }
                self.fragment.emit(Opcode::BuildArray, size);
                Ok(())
            }
            Expr::Hash(entries, position) => {
                let size = count(entries.len(), "hash entries", *position)?;
                for (key, value) in entries {
                    self.expr(key)?;
                    self.expr(value)?;
                }
                self.fragment.emit(Opcode::BuildHash, size);
                Ok(())
            }
            Expr::Index {
                receiver,
                index,
                position,
            } => {
                self.expr(receiver)?;
                self.expr(index)?;
                self.call(Opcode::CallMethod, "get", 1, *position)
            }
            Expr::Call {
                receiver,
                name,
                args,
            } => {
                match receiver {
                    Some(receiver) => self.expr(receiver)?,
                    None => self.fragment.emit(Opcode::PushSelf, 0),
                }
                for arg in args {
                    self.expr(arg)?;
                }
                self.call(Opcode::CallMethod, &name.name, args.len(), name.position)
            }
            Expr::Super { args, position } => self.super_call(args.as_deref(), *position),
            Expr::Block { position, .. } => Err(CompileError::BlockExpression {
                position: *position,
            }),
            Expr::Bad(position) => Err(CompileError::InvalidExpression {
                position: *position,
            }),
        }
    }

    fn ident(&mut self, ident: &Ident) -> Result<(), CompileError> {
        match ident.kind() {
            IdentKind::Constant => {
                let name = self.name_constant(&ident.name)?;
                self.fragment.emit(Opcode::GetConstant, name);
            }
            IdentKind::Attribute => {
                let name = self.name_constant(ident.bare_name())?;
                self.fragment.emit(Opcode::GetAttr, name);
            }
            IdentKind::Plain => match self.fragment.local(&ident.name) {
                Some((slot, true)) => self.fragment.emit(Opcode::GetLocal, slot),
                Some((_, false)) => {
                    return Err(CompileError::UndefinedLocal {
                        name: ident.name.clone(),
                        position: ident.position,
                    })
                }
                None => {
                    self.fragment.emit(Opcode::PushSelf, 0);
                    self.call(Opcode::CallMethod, &ident.name, 0, ident.position)?;
                }
            },
        }
        Ok(())
    }

    fn literal(&mut self, literal: &Literal) -> Result<(), CompileError> {
        let value = match literal {
            Literal::None => {
                self.fragment.emit(Opcode::PushNone, 0);
                return Ok(());
            }
            Literal::Int(n) => Value::Int(*n),
            Literal::Float(x) => Value::Float(*x),
            Literal::String(bytes) => Value::string(bytes),
            Literal::Bool(b) => Value::Bool(*b),
        };
        let index = self.constant(value)?;
        self.fragment.emit(Opcode::Push, index);
        Ok(())
    }

    /// `super(args)` calls the running method's name starting at the parent
    /// of its owner; bare `super` forwards the method's own parameters.
    fn super_call(&mut self, args: Option<&[Expr]>, position: Position) -> Result<(), CompileError> {
        if self.fragment.scope() != (Scope::Function { method: true }) {
            return Err(CompileError::SuperOutsideMethod { position });
        }
        self.fragment.emit(Opcode::PushSelf, 0);
        let argc = match args {
            Some(args) => {
                for arg in args {
                    self.expr(arg)?;
                }
                args.len()
            }
            None => {
                let arity = self.fragment.arity();
                for slot in 0..arity {
                    self.fragment.emit(Opcode::GetLocal, slot);
                }
                arity as usize
            }
        };
        let name = self.fragment.name().to_string();
        self.call(Opcode::CallSuper, &name, argc, position)
    }
}
