//! Token kinds and source positions.

use std::fmt;

/// A 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Illegal,
    Eof,
    NewLine,

    // Keywords
    If,
    Is,
    For,
    Switch,
    Case,
    Default,
    In,
    Stop,
    Next,
    While,
    Else,
    Fun,
    None,
    Catch,
    Block,
    Object,
    Return,
    Super,

    // Literals
    Int,
    Float,
    String,
    Bool,
    Ident,

    // Operators
    Minus,
    Plus,
    Slash,
    Star,
    Dot,
    Colon,
    Not,
    Arrow,
    Comma,
    Assign,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Great,
    GreatEqual,

    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
}

/// Reserved words and the kinds they lex to.
const KEYWORDS: [(&str, Kind); 18] = [
    ("if", Kind::If),
    ("is", Kind::Is),
    ("for", Kind::For),
    ("switch", Kind::Switch),
    ("case", Kind::Case),
    ("default", Kind::Default),
    ("in", Kind::In),
    ("stop", Kind::Stop),
    ("next", Kind::Next),
    ("while", Kind::While),
    ("else", Kind::Else),
    ("fun", Kind::Fun),
    ("none", Kind::None),
    ("catch", Kind::Catch),
    ("block", Kind::Block),
    ("object", Kind::Object),
    ("return", Kind::Return),
    ("super", Kind::Super),
];

impl Kind {
    /// Kind of an identifier-shaped word: a keyword, `Bool`, or `Ident`.
    pub fn lookup(word: &str) -> Kind {
        if word == "true" || word == "false" {
            return Kind::Bool;
        }
        KEYWORDS
            .iter()
            .find(|(text, _)| *text == word)
            .map(|(_, kind)| *kind)
            .unwrap_or(Kind::Ident)
    }

    pub fn is_keyword(self) -> bool {
        KEYWORDS.iter().any(|(_, kind)| *kind == self)
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Kind::Int | Kind::Float | Kind::String | Kind::Bool | Kind::Ident
        )
    }

    /// Binary operator precedence; 0 for anything that is not one.
    pub fn precedence(self) -> u8 {
        match self {
            Kind::Equal
            | Kind::NotEqual
            | Kind::Less
            | Kind::LessEqual
            | Kind::Great
            | Kind::GreatEqual => 2,
            Kind::Plus | Kind::Minus => 3,
            Kind::Star | Kind::Slash => 4,
            _ => 0,
        }
    }

    /// Whether a line break after this token separates statements.
    pub fn ends_statement(self) -> bool {
        self.is_literal()
            || self.is_keyword()
            || matches!(
                self,
                Kind::RightParen | Kind::RightBracket | Kind::RightBrace
            )
    }

    /// Source text for fixed tokens, the class name for the rest.
    pub fn as_str(self) -> &'static str {
        if let Some((text, _)) = KEYWORDS.iter().find(|(_, kind)| *kind == self) {
            return text;
        }
        match self {
            Kind::Illegal => "Illegal",
            Kind::Eof => "EOF",
            Kind::NewLine => "new line",
            Kind::Int => "Int",
            Kind::Float => "Float",
            Kind::String => "String",
            Kind::Bool => "Bool",
            Kind::Ident => "Ident",
            Kind::Minus => "-",
            Kind::Plus => "+",
            Kind::Slash => "/",
            Kind::Star => "*",
            Kind::Dot => ".",
            Kind::Colon => ":",
            Kind::Not => "!",
            Kind::Arrow => "->",
            Kind::Comma => ",",
            Kind::Assign => "=",
            Kind::Equal => "==",
            Kind::NotEqual => "!=",
            Kind::Less => "<",
            Kind::LessEqual => "<=",
            Kind::Great => ">",
            Kind::GreatEqual => ">=",
            Kind::LeftParen => "(",
            Kind::RightParen => ")",
            Kind::LeftBracket => "[",
            Kind::RightBracket => "]",
            Kind::LeftBrace => "{",
            Kind::RightBrace => "}",
            _ => "keyword",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lexeme with its kind and position.
///
/// For `Illegal` tokens the text holds the reason the input was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: Kind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: Kind, text: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    pub fn is(&self, kind: Kind) -> bool {
        self.kind == kind
    }
}
