//! Iracema front end: source bytes to syntax tree.
//!
//! # Usage
//!
//! ```
//! use iracema_syntax::{parse_str, ast::Stmt};
//!
//! let (file, errors) = parse_str("a = 1 + 2\na");
//! assert!(errors.is_empty());
//! assert!(matches!(file.stmts[0], Stmt::Assign(_)));
//! ```
//!
//! Parsing never fails outright. The returned [`ast::File`] is always
//! produced on a best-effort basis together with every [`SyntaxError`]
//! found; callers decide whether a non-empty error list is fatal.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod token;

mod parser;

pub use error::SyntaxError;
pub use token::{Kind, Position, Token};

use parser::Parser;

/// Parse a whole source file.
pub fn parse(source: &[u8]) -> (ast::File, Vec<SyntaxError>) {
    let tokens = lexer::tokenize(source);
    log::debug!("lexed {} tokens", tokens.len());
    let (file, errors) = Parser::new(tokens).parse_file();
    log::debug!(
        "parsed {} top-level statements, {} syntax errors",
        file.stmts.len(),
        errors.len()
    );
    (file, errors)
}

/// Parse source held in a string.
pub fn parse_str(source: &str) -> (ast::File, Vec<SyntaxError>) {
    parse(source.as_bytes())
}
