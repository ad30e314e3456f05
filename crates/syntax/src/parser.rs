//! Recursive-descent parser for statements.
//!
//! The parser never stops at the first problem: each error is recorded and
//! the parser resynchronises at the next statement boundary, so a single
//! pass reports every independent mistake. Expressions are handled in
//! [`expr`].

mod expr;

use crate::ast::{
    Assign, Block, Case, Catch, Else, Expr, File, For, FunDecl, Ident, IdentKind, If, ObjectDecl,
    Param, Return, Stmt, Switch, While,
};
use crate::error::SyntaxError;
use crate::token::{Kind, Position, Token};

/// Deepest nesting of blocks and expressions the parser accepts.
pub(crate) const MAX_DEPTH: usize = 128;

pub(crate) struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<SyntaxError>,
    depth: usize,
}

impl Parser {
    /// `tokens` must end with `Eof`.
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            errors: Vec::new(),
            depth: 0,
        }
    }

    pub(crate) fn parse_file(mut self) -> (File, Vec<SyntaxError>) {
        let mut stmts = Vec::new();
        loop {
            stmts.extend(self.stmt_list());
            if self.at(Kind::Eof) {
                break;
            }
            let found = self.describe();
            self.error_here(format!("unexpected {found}, expecting statement"));
            self.advance();
        }
        (File { stmts }, self.errors)
    }

    // ---- Token cursor ----

    fn tok(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.current.min(last)]
    }

    fn peek_kind(&self, distance: usize) -> Kind {
        self.tokens
            .get(self.current + distance)
            .map_or(Kind::Eof, |t| t.kind)
    }

    fn at(&self, kind: Kind) -> bool {
        self.tok().kind == kind
    }

    fn position(&self) -> Position {
        self.tok().position
    }

    fn advance(&mut self) -> Token {
        let token = self.tok().clone();
        if !token.is(Kind::Eof) {
            self.current += 1;
        }
        token
    }

    fn consume(&mut self, kind: Kind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a token of `kind`; on mismatch record an error and leave the
    /// offending token in place.
    fn expect(&mut self, kind: Kind) -> Option<Token> {
        if self.at(kind) {
            return Some(self.advance());
        }
        let message = match self.tok().kind {
            Kind::Illegal => self.tok().text.clone(),
            found => format!("expected '{kind}', found '{found}'"),
        };
        self.error_here(message);
        None
    }

    fn skip_newlines(&mut self) {
        while self.consume(Kind::NewLine) {}
    }

    /// Skip a line break when the token after it continues the construct.
    fn continues_with(&mut self, kind: Kind) -> bool {
        if self.at(Kind::NewLine) && self.peek_kind(1) == kind {
            self.advance();
        }
        self.at(kind)
    }

    fn describe(&self) -> String {
        let token = self.tok();
        match token.kind {
            Kind::Illegal => token.text.clone(),
            kind => format!("'{kind}'"),
        }
    }

    // ---- Diagnostics ----

    fn error(&mut self, position: Position, message: impl Into<String>) {
        if self
            .errors
            .last()
            .is_some_and(|last| last.position.line == position.line)
        {
            return;
        }
        self.errors.push(SyntaxError::new(position, message));
    }

    fn error_here(&mut self, message: impl Into<String>) {
        let position = self.position();
        self.error(position, message);
    }

    /// Skip to the end of the current statement.
    fn synchronize(&mut self) {
        while !self.at_block_end() {
            if self.advance().is(Kind::NewLine) {
                return;
            }
        }
    }

    /// Enter one more level of nesting. Past [`MAX_DEPTH`] the error is
    /// recorded, the rest of the input is skipped and `false` is returned.
    fn descend(&mut self, what: &str) -> bool {
        if self.depth >= MAX_DEPTH {
            self.error_here(format!("{what} nested too deeply"));
            self.current = self.tokens.len() - 1;
            return false;
        }
        self.depth += 1;
        true
    }

    fn ascend(&mut self, levels: usize) {
        self.depth -= levels;
    }

    /// Run `parse` one level deeper.
    fn nested<T>(&mut self, what: &str, parse: impl FnOnce(&mut Self) -> T) -> Option<T> {
        if !self.descend(what) {
            return None;
        }
        let result = parse(self);
        self.ascend(1);
        Some(result)
    }

    fn at_block_end(&self) -> bool {
        matches!(
            self.tok().kind,
            Kind::Eof | Kind::RightBrace | Kind::Case | Kind::Default
        )
    }

    // ---- Statements ----

    fn stmt_list(&mut self) -> Vec<Stmt> {
        self.nested("block", Self::statements).unwrap_or_default()
    }

    fn statements(&mut self) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_block_end() {
                return stmts;
            }
            stmts.push(self.stmt());
            if self.consume(Kind::NewLine) || self.at_block_end() {
                continue;
            }
            let found = self.describe();
            self.error_here(format!("unexpected {found}, expecting new line or '}}'"));
            self.synchronize();
        }
    }

    fn block(&mut self) -> Block {
        let position = self.position();
        if self.expect(Kind::LeftBrace).is_none() {
            return Block {
                stmts: Vec::new(),
                position,
            };
        }
        let stmts = self.stmt_list();
        self.expect(Kind::RightBrace);
        Block { stmts, position }
    }

    fn stmt(&mut self) -> Stmt {
        match self.tok().kind {
            Kind::Object => Stmt::Object(self.object_decl()),
            Kind::Fun => Stmt::Fun(self.fun_decl()),
            Kind::If => Stmt::If(self.if_stmt()),
            Kind::While => self.while_stmt(),
            Kind::For => self.for_stmt(),
            Kind::Switch => self.switch_stmt(),
            Kind::Return => self.return_stmt(),
            Kind::Stop => Stmt::Stop(self.advance().position),
            Kind::Next => Stmt::Next(self.advance().position),
            _ => self.simple_stmt(),
        }
    }

    /// A plain identifier token.
    fn ident(&mut self) -> Ident {
        let position = self.position();
        match self.expect(Kind::Ident) {
            Some(token) => Ident::new(token.text, token.position),
            None => Ident::new("", position),
        }
    }

    /// An identifier that must name a constant.
    fn constant(&mut self) -> Ident {
        let ident = self.ident();
        if !ident.name.is_empty() && !ident.is_constant() {
            self.error(
                ident.position,
                format!("expected a constant, found '{}'", ident.name),
            );
        }
        ident
    }

    fn object_decl(&mut self) -> ObjectDecl {
        let position = self.advance().position;
        let name = self.constant();
        let parent = self.consume(Kind::Is).then(|| self.constant());
        let body = self.block();
        ObjectDecl {
            name,
            parent,
            body,
            position,
        }
    }

    fn fun_decl(&mut self) -> FunDecl {
        let position = self.advance().position;
        let name = self.ident();
        if name.kind() == IdentKind::Attribute {
            self.error(name.position, "function name cannot be an attribute");
        }
        let params = if self.at(Kind::LeftParen) {
            self.param_list()
        } else {
            Vec::new()
        };
        let returns = self.consume(Kind::Arrow).then(|| self.constant());
        let body = self.block();
        let mut catches = Vec::new();
        while self.continues_with(Kind::Catch) {
            catches.push(self.catch_clause());
        }
        FunDecl {
            name,
            params,
            returns,
            body,
            catches,
            position,
        }
    }

    /// `catch(ref: Type) { ... }` or `catch(Type) { ... }`.
    fn catch_clause(&mut self) -> Catch {
        self.advance();
        self.expect(Kind::LeftParen);
        let first = self.ident();
        let (reference, ty) = if self.consume(Kind::Colon) {
            (Some(first), self.constant())
        } else {
            if !first.name.is_empty() && !first.is_constant() {
                self.error(first.position, format!("expected ':', found '{}'", self.tok().kind));
            }
            (None, first)
        };
        self.expect(Kind::RightParen);
        let body = self.block();
        Catch {
            reference,
            ty,
            body,
        }
    }

    pub(crate) fn param_list(&mut self) -> Vec<Param> {
        let mut params = Vec::new();
        self.expect(Kind::LeftParen);
        while !self.at(Kind::RightParen) && !self.at(Kind::Eof) {
            let name = self.ident();
            if name.kind() != IdentKind::Plain && !name.name.is_empty() {
                self.error(
                    name.position,
                    format!("invalid parameter name '{}'", name.name),
                );
            }
            let ty = (self.at(Kind::Ident) && self.tok().text.starts_with(|c: char| c.is_ascii_uppercase()))
                .then(|| self.ident());
            params.push(Param { name, ty });
            if !self.comma_or(Kind::RightParen) {
                return params;
            }
        }
        self.expect(Kind::RightParen);
        params
    }

    /// After a list element: consume a comma, or accept the closer.
    fn comma_or(&mut self, closer: Kind) -> bool {
        self.skip_newlines();
        if self.consume(Kind::Comma) {
            self.skip_newlines();
            return true;
        }
        if self.at(closer) {
            return true;
        }
        let found = self.describe();
        self.error_here(format!("missing ',' or '{closer}', found {found}"));
        false
    }

    fn if_stmt(&mut self) -> If {
        self.advance();
        let cond = self.expr();
        let then = self.block();
        let otherwise = if self.continues_with(Kind::Else) {
            self.advance();
            match self.tok().kind {
                Kind::If => self
                    .nested("block", Self::if_stmt)
                    .map(|chained| Else::If(Box::new(chained))),
                Kind::LeftBrace => Some(Else::Block(self.block())),
                _ => {
                    let found = self.describe();
                    self.error_here(format!("expected '{{' or 'if' after 'else', found {found}"));
                    None
                }
            }
        } else {
            None
        };
        If {
            cond,
            then,
            otherwise,
        }
    }

    fn while_stmt(&mut self) -> Stmt {
        self.advance();
        let cond = self.expr();
        let body = self.block();
        Stmt::While(While { cond, body })
    }

    fn for_stmt(&mut self) -> Stmt {
        self.advance();
        let element = self.ident();
        self.expect(Kind::In);
        let iterable = self.expr();
        let body = self.block();
        Stmt::For(For {
            element,
            iterable,
            body,
        })
    }

    fn switch_stmt(&mut self) -> Stmt {
        self.advance();
        let key = self.expr();
        let mut cases = Vec::new();
        let mut default = None;
        if self.expect(Kind::LeftBrace).is_some() {
            self.skip_newlines();
            while !self.at(Kind::RightBrace) && !self.at(Kind::Eof) {
                let position = self.position();
                match self.tok().kind {
                    Kind::Case => {
                        self.advance();
                        let value = self.expr();
                        self.expect(Kind::Colon);
                        let stmts = self.stmt_list();
                        cases.push(Case {
                            value,
                            body: Block { stmts, position },
                        });
                    }
                    Kind::Default => {
                        self.advance();
                        self.expect(Kind::Colon);
                        let stmts = self.stmt_list();
                        if default.is_some() {
                            self.error(position, "multiple defaults in switch");
                        }
                        default = Some(Block { stmts, position });
                    }
                    _ => {
                        let found = self.describe();
                        self.error_here(format!(
                            "expected 'case', 'default' or '}}', found {found}"
                        ));
                        while !matches!(
                            self.tok().kind,
                            Kind::Case | Kind::Default | Kind::RightBrace | Kind::Eof
                        ) {
                            self.advance();
                        }
                    }
                }
            }
            self.expect(Kind::RightBrace);
        }
        Stmt::Switch(Switch {
            key,
            cases,
            default,
        })
    }

    fn return_stmt(&mut self) -> Stmt {
        let position = self.advance().position;
        let value = if self.at(Kind::NewLine) || self.at_block_end() {
            None
        } else {
            Some(self.expr())
        };
        Stmt::Return(Return { value, position })
    }

    /// An expression statement or an assignment.
    fn simple_stmt(&mut self) -> Stmt {
        let position = self.position();
        let targets = self.expr_list();
        if !self.consume(Kind::Assign) {
            if targets.len() > 1 {
                self.error(position, "expected '=' after expression list");
            }
            return match targets.into_iter().next() {
                Some(expr) => Stmt::Expr(expr),
                None => Stmt::Expr(Expr::Bad(position)),
            };
        }
        for target in &targets {
            let assignable = match target {
                Expr::Ident(_) | Expr::Index { .. } => true,
                Expr::Bad(_) => true,
                _ => false,
            };
            if !assignable {
                self.error(target.position(), "cannot assign to this expression");
            }
        }
        let values = self.expr_list();
        if targets.len() != values.len() {
            self.error(
                position,
                format!(
                    "assignment mismatch: {} targets but {} values",
                    targets.len(),
                    values.len()
                ),
            );
        }
        Stmt::Assign(Assign {
            targets,
            values,
            position,
        })
    }

    fn expr_list(&mut self) -> Vec<Expr> {
        let mut list = vec![self.expr()];
        while self.consume(Kind::Comma) {
            list.push(self.expr());
        }
        list
    }
}
