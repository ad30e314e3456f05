//! Error type for the Iracema parser.

use thiserror::Error;

use crate::token::Position;

/// A syntax error at a source position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[Lin: {} Col: {}] syntax error: {message}", .position.line, .position.column)]
pub struct SyntaxError {
    pub position: Position,
    pub message: String,
}

impl SyntaxError {
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}
