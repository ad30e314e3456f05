//! Error types for the Iracema compiler.

use iracema_syntax::Position;
use thiserror::Error;

/// Errors that abort compilation.
///
/// Source-level problems carry the position of the offending node; operand
/// overflows name the method being built instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// `stop` or `next` with no enclosing loop.
    #[error("[Lin: {} Col: {}] compile error: '{keyword}' outside of a loop", .position.line, .position.column)]
    OutsideLoop {
        keyword: &'static str,
        position: Position,
    },

    /// A local read inside its own initialiser.
    #[error("[Lin: {} Col: {}] compile error: undefined local variable '{name}'", .position.line, .position.column)]
    UndefinedLocal { name: String, position: Position },

    /// An object declaration below the top level.
    #[error("[Lin: {} Col: {}] compile error: objects can only be declared at the top level", .position.line, .position.column)]
    NestedObject { position: Position },

    /// A function declaration inside a function body.
    #[error("[Lin: {} Col: {}] compile error: functions cannot be nested", .position.line, .position.column)]
    NestedFunction { position: Position },

    /// Two parameters of one function share a name.
    #[error("[Lin: {} Col: {}] compile error: duplicate parameter '{name}'", .position.line, .position.column)]
    DuplicateParameter { name: String, position: Position },

    /// `super` outside a function declared in an object body.
    #[error("[Lin: {} Col: {}] compile error: super called outside of a method", .position.line, .position.column)]
    SuperOutsideMethod { position: Position },

    /// `block { ... }` expressions have no lowering.
    #[error("[Lin: {} Col: {}] compile error: block expressions are not supported", .position.line, .position.column)]
    BlockExpression { position: Position },

    /// A node the parser left behind after a syntax error.
    #[error("[Lin: {} Col: {}] compile error: invalid expression", .position.line, .position.column)]
    InvalidExpression { position: Position },

    /// A parameter list, argument list or literal with more than 255 entries.
    #[error("[Lin: {} Col: {}] compile error: too many {what} (limit 255)", .position.line, .position.column)]
    TooMany {
        what: &'static str,
        position: Position,
    },

    /// The constant pool outgrew the one-byte operand.
    #[error("too many constants in '{method}' (limit 256)")]
    ConstantOverflow { method: String },

    /// The local table outgrew the one-byte operand.
    #[error("too many local variables in '{method}' (limit 256)")]
    LocalOverflow { method: String },

    /// A jump target beyond the one-byte operand.
    #[error("jump target {target} out of range in '{method}' (limit 255)")]
    JumpOutOfRange { method: String, target: usize },

    /// A jump or handler naming a block that was never laid out.
    #[error("block {block} of '{method}' was never placed")]
    UnplacedBlock { method: String, block: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_outside_loop() {
        let e = CompileError::OutsideLoop {
            keyword: "stop",
            position: Position::new(4, 3),
        };
        assert_eq!(
            e.to_string(),
            "[Lin: 4 Col: 3] compile error: 'stop' outside of a loop"
        );
    }

    #[test]
    fn error_display_undefined_local() {
        let e = CompileError::UndefinedLocal {
            name: "x".to_string(),
            position: Position::new(1, 5),
        };
        assert_eq!(
            e.to_string(),
            "[Lin: 1 Col: 5] compile error: undefined local variable 'x'"
        );
    }

    #[test]
    fn error_display_too_many() {
        let e = CompileError::TooMany {
            what: "arguments",
            position: Position::new(2, 1),
        };
        assert_eq!(
            e.to_string(),
            "[Lin: 2 Col: 1] compile error: too many arguments (limit 255)"
        );
    }

    #[test]
    fn error_display_jump_out_of_range() {
        let e = CompileError::JumpOutOfRange {
            method: "main".to_string(),
            target: 300,
        };
        assert_eq!(
            e.to_string(),
            "jump target 300 out of range in 'main' (limit 255)"
        );
    }

    #[test]
    fn error_display_unplaced_block() {
        let e = CompileError::UnplacedBlock {
            method: "f".to_string(),
            block: 3,
        };
        assert_eq!(e.to_string(), "block 3 of 'f' was never placed");
    }
}
