//! Expression parsing: precedence climbing over unary and postfix forms.

use super::Parser;
use crate::ast::{BinaryOp, Expr, Ident, IdentKind, Literal, UnaryOp};
use crate::token::Kind;

fn binary_op(kind: Kind) -> Option<BinaryOp> {
    Some(match kind {
        Kind::Plus => BinaryOp::Add,
        Kind::Minus => BinaryOp::Sub,
        Kind::Star => BinaryOp::Mul,
        Kind::Slash => BinaryOp::Div,
        Kind::Equal => BinaryOp::Eq,
        Kind::NotEqual => BinaryOp::Ne,
        Kind::Great => BinaryOp::Gt,
        Kind::GreatEqual => BinaryOp::Ge,
        Kind::Less => BinaryOp::Lt,
        Kind::LessEqual => BinaryOp::Le,
        _ => return None,
    })
}

/// Decode the escapes of a string literal body.
pub(crate) fn unescape(raw: &str) -> Vec<u8> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        i += 1;
        if byte != b'\\' || i == bytes.len() {
            out.push(byte);
            continue;
        }
        let escaped = bytes[i];
        i += 1;
        match escaped {
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'v' => out.push(0x0b),
            b'\\' => out.push(b'\\'),
            b'"' => out.push(b'"'),
            other => out.extend_from_slice(&[b'\\', other]),
        }
    }
    out
}

impl Parser {
    pub(crate) fn expr(&mut self) -> Expr {
        let position = self.position();
        self.nested("expression", |p| p.binary(0))
            .unwrap_or(Expr::Bad(position))
    }

    /// Each folded operator deepens the left operand, so it counts as a
    /// nesting level.
    fn binary(&mut self, min_precedence: u8) -> Expr {
        let mut lhs = self.unary();
        let mut height = 0;
        loop {
            let kind = self.tok().kind;
            let precedence = kind.precedence();
            let Some(op) = binary_op(kind).filter(|_| precedence > min_precedence) else {
                break;
            };
            if !self.descend("expression") {
                break;
            }
            height += 1;
            self.advance();
            let rhs = self.binary(precedence);
            let position = lhs.position();
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                position,
            };
        }
        self.ascend(height);
        lhs
    }

    fn unary(&mut self) -> Expr {
        let op = match self.tok().kind {
            Kind::Not => UnaryOp::Not,
            Kind::Plus => UnaryOp::Plus,
            Kind::Minus => UnaryOp::Minus,
            _ => return self.primary(),
        };
        let position = self.advance().position;
        let operand = self
            .nested("expression", Self::unary)
            .unwrap_or(Expr::Bad(position));
        Expr::Unary {
            op,
            operand: Box::new(operand),
            position,
        }
    }

    /// An operand followed by any chain of `.member`, `(args)` and `[index]`.
    fn primary(&mut self) -> Expr {
        let mut expr = self.operand();
        let mut height = 0;
        loop {
            if matches!(
                self.tok().kind,
                Kind::Dot | Kind::LeftParen | Kind::LeftBracket
            ) {
                if !self.descend("expression") {
                    break;
                }
                height += 1;
            }
            expr = match self.tok().kind {
                Kind::Dot => {
                    self.advance();
                    let name = self.ident();
                    let args = if self.at(Kind::LeftParen) {
                        self.arguments()
                    } else {
                        Vec::new()
                    };
                    Expr::Call {
                        receiver: Some(Box::new(expr)),
                        name,
                        args,
                    }
                }
                Kind::LeftParen => match expr {
                    Expr::Ident(name) if name.kind() == IdentKind::Plain => {
                        let args = self.arguments();
                        Expr::Call {
                            receiver: None,
                            name,
                            args,
                        }
                    }
                    other => {
                        self.error_here("invalid call expression");
                        self.arguments();
                        Expr::Bad(other.position())
                    }
                },
                Kind::LeftBracket => {
                    let position = expr.position();
                    self.advance();
                    self.skip_newlines();
                    let index = self.expr();
                    self.skip_newlines();
                    self.expect(Kind::RightBracket);
                    Expr::Index {
                        receiver: Box::new(expr),
                        index: Box::new(index),
                        position,
                    }
                }
                _ => break,
            };
        }
        self.ascend(height);
        expr
    }

    fn operand(&mut self) -> Expr {
        let token = self.tok().clone();
        let position = token.position;
        match token.kind {
            Kind::Int => {
                self.advance();
                match token.text.parse::<i64>() {
                    Ok(value) => Expr::Literal(Literal::Int(value), position),
                    Err(_) => {
                        self.error(position, format!("integer literal '{}' out of range", token.text));
                        Expr::Bad(position)
                    }
                }
            }
            Kind::Float => {
                self.advance();
                match token.text.parse::<f64>() {
                    Ok(value) => Expr::Literal(Literal::Float(value), position),
                    Err(_) => {
                        self.error(position, format!("invalid float literal '{}'", token.text));
                        Expr::Bad(position)
                    }
                }
            }
            Kind::String => {
                self.advance();
                Expr::Literal(Literal::String(unescape(&token.text)), position)
            }
            Kind::Bool => {
                self.advance();
                Expr::Literal(Literal::Bool(token.text == "true"), position)
            }
            Kind::None => {
                self.advance();
                Expr::Literal(Literal::None, position)
            }
            Kind::Ident => {
                self.advance();
                Expr::Ident(Ident::new(token.text, position))
            }
            Kind::LeftParen => {
                self.advance();
                self.skip_newlines();
                let inner = self.expr();
                self.skip_newlines();
                self.expect(Kind::RightParen);
                Expr::Group(Box::new(inner))
            }
            Kind::LeftBracket => self.array(),
            Kind::LeftBrace => self.hash(),
            Kind::Super => {
                self.advance();
                let args = self.at(Kind::LeftParen).then(|| self.arguments());
                Expr::Super { args, position }
            }
            Kind::Block => {
                self.advance();
                let params = if self.at(Kind::LeftParen) {
                    self.param_list()
                } else {
                    Vec::new()
                };
                let body = self.block();
                Expr::Block {
                    params,
                    body,
                    position,
                }
            }
            Kind::Illegal => {
                self.error(position, token.text);
                self.advance();
                Expr::Bad(position)
            }
            found => {
                self.error(position, format!("unexpected '{found}', expecting expression"));
                if !matches!(found, Kind::NewLine) && !self.at_block_end() {
                    self.advance();
                }
                Expr::Bad(position)
            }
        }
    }

    fn arguments(&mut self) -> Vec<Expr> {
        let mut args = Vec::new();
        self.expect(Kind::LeftParen);
        self.skip_newlines();
        while !self.at(Kind::RightParen) && !self.at(Kind::Eof) {
            args.push(self.expr());
            if !self.comma_or(Kind::RightParen) {
                return args;
            }
        }
        self.expect(Kind::RightParen);
        args
    }

    fn array(&mut self) -> Expr {
        let position = self.advance().position;
        let mut elements = Vec::new();
        self.skip_newlines();
        while !self.at(Kind::RightBracket) && !self.at(Kind::Eof) {
            elements.push(self.expr());
            if !self.comma_or(Kind::RightBracket) {
                return Expr::Array(elements, position);
            }
        }
        self.expect(Kind::RightBracket);
        Expr::Array(elements, position)
    }

    fn hash(&mut self) -> Expr {
        let position = self.advance().position;
        let mut entries = Vec::new();
        self.skip_newlines();
        while !self.at(Kind::RightBrace) && !self.at(Kind::Eof) {
            let key = self.expr();
            self.expect(Kind::Colon);
            let value = self.expr();
            entries.push((key, value));
            if !self.comma_or(Kind::RightBrace) {
                return Expr::Hash(entries, position);
            }
        }
        self.expect(Kind::RightBrace);
        Expr::Hash(entries, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{File, Stmt};
    use crate::parse_str;

    fn expr_of(source: &str) -> Expr {
        let (file, errors) = parse_str(source);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        let File { mut stmts } = file;
        match stmts.remove(0) {
            Stmt::Expr(expr) => expr,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    /// Fully parenthesised rendering, for precedence checks.
    fn render(expr: &Expr) -> String {
        match expr {
            Expr::Literal(Literal::Int(n), _) => n.to_string(),
            Expr::Ident(ident) => ident.name.clone(),
            Expr::Group(inner) => render(inner),
            Expr::Unary { op, operand, .. } => format!("({:?} {})", op, render(operand)),
            Expr::Binary { op, lhs, rhs, .. } => {
                format!("({} {:?} {})", render(lhs), op, render(rhs))
            }
            Expr::Call {
                receiver,
                name,
                args,
            } => {
                let args: Vec<String> = args.iter().map(render).collect();
                match receiver {
                    Some(receiver) => {
                        format!("{}.{}({})", render(receiver), name.name, args.join(", "))
                    }
                    None => format!("{}({})", name.name, args.join(", ")),
                }
            }
            Expr::Index {
                receiver, index, ..
            } => format!("{}[{}]", render(receiver), render(index)),
            other => format!("{other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter() {
        assert_eq!(render(&expr_of("1 + 2 * 3")), "(1 Add (2 Mul 3))");
    }

    #[test]
    fn grouping_overrides_precedence() {
        assert_eq!(render(&expr_of("(1 + 2) * 3")), "((1 Add 2) Mul 3)");
    }

    #[test]
    fn left_associative() {
        assert_eq!(render(&expr_of("1 - 2 - 3")), "((1 Sub 2) Sub 3)");
        assert_eq!(render(&expr_of("8 / 4 * 2")), "((8 Div 4) Mul 2)");
    }

    #[test]
    fn comparison_is_loosest() {
        assert_eq!(render(&expr_of("a + 1 >= b * 2")), "((a Add 1) Ge (b Mul 2))");
    }

    #[test]
    fn unary_binds_to_operand() {
        assert_eq!(render(&expr_of("-a + !b")), "((Minus a) Add (Not b))");
    }

    #[test]
    fn postfix_chain() {
        assert_eq!(
            render(&expr_of("list.get(0).inspect[1]")),
            "list.get(0).inspect()[1]"
        );
        assert_eq!(render(&expr_of("Point.new")), "Point.new()");
        assert_eq!(render(&expr_of("puts(1, 2)")), "puts(1, 2)");
    }

    #[test]
    fn call_on_non_identifier_is_an_error() {
        let (_, errors) = parse_str("(f)(1)");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "invalid call expression");
    }

    #[test]
    fn literals() {
        assert_eq!(
            expr_of("2.5"),
            Expr::Literal(Literal::Float(2.5), crate::token::Position::new(1, 1))
        );
        assert!(matches!(expr_of("none"), Expr::Literal(Literal::None, _)));
        assert!(matches!(expr_of("false"), Expr::Literal(Literal::Bool(false), _)));
    }

    #[test]
    fn integer_overflow_is_reported() {
        let (_, errors) = parse_str("99999999999999999999");
        assert_eq!(
            errors[0].message,
            "integer literal '99999999999999999999' out of range"
        );
    }

    #[test]
    fn hash_and_array_literals() {
        let Expr::Hash(entries, _) = expr_of("{a: 1, \"b\": [2, 3]}") else {
            panic!("expected hash literal");
        };
        assert_eq!(entries.len(), 2);
        assert!(matches!(&entries[1].1, Expr::Array(elements, _) if elements.len() == 2));
    }

    #[test]
    fn multiline_array() {
        let Expr::Array(elements, _) = expr_of("[\n  1,\n  2\n]") else {
            panic!("expected array");
        };
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn super_forms() {
        assert!(matches!(expr_of("super"), Expr::Super { args: None, .. }));
        assert!(
            matches!(expr_of("super(1, 2)"), Expr::Super { args: Some(args), .. } if args.len() == 2)
        );
    }

    #[test]
    fn block_expression() {
        let Expr::Block { params, body, .. } = expr_of("block (x) { x + 1 }") else {
            panic!("expected block");
        };
        assert_eq!(params.len(), 1);
        assert_eq!(body.stmts.len(), 1);
    }

    #[test]
    fn escapes() {
        assert_eq!(unescape(r#"a\nb"#), b"a\nb");
        assert_eq!(unescape(r#"\"q\""#), b"\"q\"");
        assert_eq!(unescape(r#"\\"#), b"\\");
        assert_eq!(unescape(r#"\a\b\f\r\t\v"#), vec![7, 8, 12, 13, 9, 11]);
        assert_eq!(unescape(r#"\q"#), b"\\q");
    }

    #[test]
    fn missing_operand_position() {
        let (_, errors) = parse_str("x = 1 +\n  *");
        assert_eq!(errors[0].position, crate::token::Position::new(2, 3));
        assert_eq!(errors[0].message, "unexpected '*', expecting expression");
    }
}
