//! Hand-written scanner from source bytes to tokens.
//!
//! Line breaks and `;` become `NewLine` tokens only after a token that can
//! end a statement, so an expression may continue on the next line after an
//! operator, comma or opening bracket.

use crate::token::{Kind, Position, Token};

pub struct Lexer<'a> {
    source: &'a [u8],
    offset: usize,
    line: usize,
    column: usize,
    last: Kind,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 1,
            last: Kind::NewLine,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.offset).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.source.get(self.offset + 1).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.offset += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(byte)
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn text(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.source[start..self.offset]).into_owned()
    }

    /// The next token; `Eof` once the input is exhausted.
    pub fn next_token(&mut self) -> Token {
        let token = self.scan();
        self.last = token.kind;
        token
    }

    fn scan(&mut self) -> Token {
        loop {
            let position = self.position();
            let Some(byte) = self.peek() else {
                return Token::new(Kind::Eof, "", position);
            };
            match byte {
                b' ' | b'\t' | b'\r' => {
                    self.bump();
                }
                b'#' => {
                    while self.peek().is_some_and(|b| b != b'\n') {
                        self.bump();
                    }
                }
                b'\n' | b';' => {
                    self.bump();
                    if self.last.ends_statement() {
                        return Token::new(Kind::NewLine, "\n", position);
                    }
                }
                b'"' => return self.string(position),
                b'@' => return self.attribute(position),
                b if b.is_ascii_digit() => return self.number(position),
                b if is_ident_start(b) => return self.identifier(position),
                _ => return self.operator(position),
            }
        }
    }

    fn identifier(&mut self, position: Position) -> Token {
        let start = self.offset;
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        if matches!(self.peek(), Some(b'?' | b'!')) && self.peek_next() != Some(b'=') {
            self.bump();
        }
        let text = self.text(start);
        Token::new(Kind::lookup(&text), text, position)
    }

    fn attribute(&mut self, position: Position) -> Token {
        let start = self.offset;
        self.bump();
        match self.peek() {
            Some(b) if b.is_ascii_digit() => {
                Token::new(Kind::Illegal, "attribute name cannot start with a digit", position)
            }
            Some(b) if is_ident_start(b) => {
                while self.peek().is_some_and(is_ident_continue) {
                    self.bump();
                }
                Token::new(Kind::Ident, self.text(start), position)
            }
            _ => Token::new(Kind::Illegal, "expected attribute name after '@'", position),
        }
    }

    fn number(&mut self, position: Position) -> Token {
        let start = self.offset;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.bump();
        }
        let mut kind = Kind::Int;
        if self.peek() == Some(b'.') && self.peek_next().is_some_and(|b| b.is_ascii_digit()) {
            kind = Kind::Float;
            self.bump();
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.bump();
            }
        }
        Token::new(kind, self.text(start), position)
    }

    /// Text of a string literal without its quotes, escapes left raw.
    fn string(&mut self, position: Position) -> Token {
        self.bump();
        let start = self.offset;
        loop {
            match self.peek() {
                None => return Token::new(Kind::Illegal, "string not terminated", position),
                Some(b'\n') => return Token::new(Kind::Illegal, "newline in string", position),
                Some(b'"') => break,
                Some(b'\\') => {
                    self.bump();
                    if self.peek().is_some_and(|b| b != b'\n') {
                        self.bump();
                    }
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        let text = self.text(start);
        self.bump();
        Token::new(Kind::String, text, position)
    }

    fn operator(&mut self, position: Position) -> Token {
        let Some(byte) = self.bump() else {
            return Token::new(Kind::Eof, "", position);
        };
        let follows = |lexer: &mut Self, expected: u8| {
            if lexer.peek() == Some(expected) {
                lexer.bump();
                true
            } else {
                false
            }
        };
        let kind = match byte {
            b'+' => Kind::Plus,
            b'*' => Kind::Star,
            b'/' => Kind::Slash,
            b'.' => Kind::Dot,
            b':' => Kind::Colon,
            b',' => Kind::Comma,
            b'(' => Kind::LeftParen,
            b')' => Kind::RightParen,
            b'[' => Kind::LeftBracket,
            b']' => Kind::RightBracket,
            b'{' => Kind::LeftBrace,
            b'}' => Kind::RightBrace,
            b'-' if follows(self, b'>') => Kind::Arrow,
            b'-' => Kind::Minus,
            b'=' if follows(self, b'=') => Kind::Equal,
            b'=' => Kind::Assign,
            b'!' if follows(self, b'=') => Kind::NotEqual,
            b'!' => Kind::Not,
            b'<' if follows(self, b'=') => Kind::LessEqual,
            b'<' => Kind::Less,
            b'>' if follows(self, b'=') => Kind::GreatEqual,
            b'>' => Kind::Great,
            other => {
                let reason = format!("unexpected character '{}'", other.escape_ascii());
                return Token::new(Kind::Illegal, reason, position);
            }
        };
        Token::new(kind, kind.as_str(), position)
    }
}

fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

fn is_ident_continue(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Scan the whole input, ending with a single `Eof` token.
pub fn tokenize(source: &[u8]) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let done = token.is(Kind::Eof);
        tokens.push(token);
        if done {
            return tokens;
        }
    }
}
