//! Iracema CLI: run or disassemble a script.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Invalid invocation or unreadable input
//! - 68: Syntax error
//! - 70: Compile, verification or runtime error

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use iracema_cli::{red, PipelineError, EXIT_USAGE};
use iracema_vm::{VmOptions, DEFAULT_STACK_SIZE};

#[derive(Parser, Debug)]
#[command(name = "iracema", version, about = "Run Iracema scripts", long_about = None)]
struct Cli {
    /// Print the bytecode of every fragment instead of running
    #[arg(short, long)]
    disassemble: bool,

    /// Slots in the VM value stack
    #[arg(long, default_value_t = DEFAULT_STACK_SIZE)]
    stack_size: usize,

    /// The script to run
    file: PathBuf,
}

fn main() {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not failures.
            let code = if e.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    let source = match fs::read(&cli.file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{}", red(&format!("cannot read '{}': {e}", cli.file.display())));
            process::exit(EXIT_USAGE);
        }
    };

    if let Err(e) = execute(&cli, &source) {
        eprintln!("{}", red(&e.to_string()));
        process::exit(e.exit_code());
    }
}

fn execute(cli: &Cli, source: &[u8]) -> Result<(), PipelineError> {
    if cli.disassemble {
        print!("{}", iracema_cli::disassemble_source(source)?);
        return Ok(());
    }
    let options = VmOptions {
        stack_size: cli.stack_size,
    };
    let result = iracema_cli::run_source(source, options, io::stdout())?;
    println!("{result}");
    Ok(())
}
