//! Syntax tree produced by the parser.
//!
//! Every node that can be the subject of a diagnostic carries the
//! [`Position`] of its first token.

use crate::token::Position;

/// A whole source file: the top-level statement list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct File {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Object(ObjectDecl),
    Fun(FunDecl),
    Assign(Assign),
    If(If),
    While(While),
    For(For),
    Switch(Switch),
    Return(Return),
    Stop(Position),
    Next(Position),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDecl {
    pub name: Ident,
    pub parent: Option<Ident>,
    pub body: Block,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: Option<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunDecl {
    pub name: Ident,
    pub params: Vec<Param>,
    pub returns: Option<Ident>,
    pub body: Block,
    pub catches: Vec<Catch>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catch {
    pub reference: Option<Ident>,
    pub ty: Ident,
    pub body: Block,
}

/// `targets = values`, paired left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub targets: Vec<Expr>,
    pub values: Vec<Expr>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub cond: Expr,
    pub then: Block,
    pub otherwise: Option<Else>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Else {
    If(Box<If>),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub struct While {
    pub cond: Expr,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct For {
    pub element: Ident,
    pub iterable: Expr,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    pub key: Expr,
    pub cases: Vec<Case>,
    pub default: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub value: Expr,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Return {
    pub value: Option<Expr>,
    pub position: Position,
}

/// What an identifier refers to, decided by its spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentKind {
    /// Starts with an uppercase letter.
    Constant,
    /// Starts with `@`.
    Attribute,
    /// A local variable or a zero-argument call on `self`.
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub position: Position,
}

impl Ident {
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }

    pub fn kind(&self) -> IdentKind {
        match self.name.as_bytes().first() {
            Some(b'@') => IdentKind::Attribute,
            Some(b) if b.is_ascii_uppercase() => IdentKind::Constant,
            _ => IdentKind::Plain,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.kind() == IdentKind::Constant
    }

    /// The name without an attribute's `@`.
    pub fn bare_name(&self) -> &str {
        self.name.strip_prefix('@').unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    /// Escapes already decoded.
    String(Vec<u8>),
    Bool(bool),
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(Ident),
    Literal(Literal, Position),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        position: Position,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        position: Position,
    },
    Group(Box<Expr>),
    Array(Vec<Expr>, Position),
    Hash(Vec<(Expr, Expr)>, Position),
    Index {
        receiver: Box<Expr>,
        index: Box<Expr>,
        position: Position,
    },
    /// `receiver.name(args)`; a missing receiver means `self`.
    Call {
        receiver: Option<Box<Expr>>,
        name: Ident,
        args: Vec<Expr>,
    },
    /// `super(args)`, or bare `super` when `args` is `None`.
    Super {
        args: Option<Vec<Expr>>,
        position: Position,
    },
    Block {
        params: Vec<Param>,
        body: Block,
        position: Position,
    },
    /// Placeholder left where a syntax error was reported.
    Bad(Position),
}

impl Expr {
    pub fn position(&self) -> Position {
        match self {
            Expr::Ident(ident) => ident.position,
            Expr::Literal(_, position)
            | Expr::Unary { position, .. }
            | Expr::Binary { position, .. }
            | Expr::Array(_, position)
            | Expr::Hash(_, position)
            | Expr::Index { position, .. }
            | Expr::Super { position, .. }
            | Expr::Block { position, .. }
            | Expr::Bad(position) => *position,
            Expr::Group(inner) => inner.position(),
            Expr::Call { receiver, name, .. } => match receiver {
                Some(receiver) => receiver.position(),
                None => name.position,
            },
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal(..))
    }
}
