//! The Iracema pipeline behind the `iracema` binary.
//!
//! Source text is parsed, compiled, verified and run on a fresh VM. Each
//! stage's failure maps to one process exit code:
//! - 0: success
//! - 1: invalid invocation or unreadable input
//! - 68: syntax error
//! - 70: compile, verification or runtime error

use std::io::Write;
use std::rc::Rc;

use iracema_compiler::CompileError;
use iracema_lang::Method;
use iracema_syntax::SyntaxError;
use iracema_verifier::VerifyError;
use iracema_vm::{Vm, VmError, VmOptions};
use thiserror::Error;

/// Exit code for invalid invocation or unreadable input.
pub const EXIT_USAGE: i32 = 1;
/// Exit code for syntax errors.
pub const EXIT_SYNTAX: i32 = 68;
/// Exit code for compile, verification and runtime errors.
pub const EXIT_SOFTWARE: i32 = 70;

/// A failure in one stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Every syntax error found in the file.
    #[error("{}", lines(.0))]
    Syntax(Vec<SyntaxError>),

    #[error("{0}")]
    Compile(CompileError),

    /// Every verification error, across all methods.
    #[error("{}", lines(.0))]
    Verify(Vec<VerifyError>),

    #[error("{0}")]
    Runtime(VmError),
}

impl PipelineError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Syntax(_) => EXIT_SYNTAX,
            PipelineError::Compile(_) | PipelineError::Verify(_) | PipelineError::Runtime(_) => {
                EXIT_SOFTWARE
            }
        }
    }
}

fn lines<T: ToString>(errors: &[T]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_and_compile(source: &[u8]) -> Result<Rc<Method>, PipelineError> {
    let (file, errors) = iracema_syntax::parse(source);
    if !errors.is_empty() {
        return Err(PipelineError::Syntax(errors));
    }
    iracema_compiler::compile(&file).map_err(PipelineError::Compile)
}

/// Parse, compile and verify a script.
pub fn compile_source(source: &[u8]) -> Result<Rc<Method>, PipelineError> {
    let main = parse_and_compile(source)?;
    iracema_verifier::verify(&main).map_err(PipelineError::Verify)?;
    Ok(main)
}

/// Parse and compile a script, returning the listing of every fragment.
pub fn disassemble_source(source: &[u8]) -> Result<String, PipelineError> {
    let main = parse_and_compile(source)?;
    Ok(iracema_compiler::disassemble(&main))
}

/// Compile and run a script, returning the `inspect` of its result.
///
/// Whatever the script prints goes to `output`.
pub fn run_source<W: Write>(
    source: &[u8],
    options: VmOptions,
    output: W,
) -> Result<String, PipelineError> {
    let main = compile_source(source)?;
    let mut vm = Vm::with_options(output, options);
    let value = vm.run(&main).map_err(PipelineError::Runtime)?;
    log::debug!("script returned {value}");
    vm.inspect_value(&value).map_err(PipelineError::Runtime)
}

/// Wrap a message in the terminal's red color.
pub fn red(message: &str) -> String {
    format!("\x1b[0;31m{message}\x1b[0;0m")
}
